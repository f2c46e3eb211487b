// valvewatch - Streaming trend monitor for sensor networks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Connection supervision.
//!
//! The supervisor waits for the simulator to accept a connection, discards
//! whatever the socket already buffered, then runs the ingestion loop on its
//! own thread and watches it until it ends or a shutdown is requested.
//!
//! ```text
//! Disconnected ──► Connecting ──► FlushingBacklog ──► Streaming ──► Stopped
//!      ▲               │ refused
//!      └── wait delay ─┘
//! ```

use std::fmt;
use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::ingest::{IngestMetrics, Pipeline};
use crate::window::WindowStore;

/// Retry policy while the endpoint refuses connections
///
/// A fixed delay between attempts; no backoff growth. The default never
/// gives up, which is what waiting for a simulator to come up needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay between attempts
    pub delay: Duration,
    /// Maximum number of attempts (`None` = unbounded)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(2))
    }
}

impl ReconnectPolicy {
    /// Retry forever with a fixed delay
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Retry with a fixed delay, at most `max_attempts` attempts in total
    pub fn limited(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    /// Delay before the next attempt, after `attempts` failed ones
    ///
    /// Returns None if no more attempts should be made
    pub fn delay_after(&self, attempts: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempts >= max => None,
            _ => Some(self.delay),
        }
    }
}

/// Supervisor lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    /// No connection; waiting before the next attempt
    #[default]
    Disconnected,
    /// Connection attempt in progress (1-based)
    Connecting { attempt: u32 },
    /// Connected; discarding the pre-existing backlog
    FlushingBacklog,
    /// Ingestion loop running
    Streaming,
    /// Done, either interrupted or the stream ended
    Stopped,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Disconnected => write!(f, "DISCONNECTED"),
            SupervisorState::Connecting { attempt } => write!(f, "CONNECTING(#{})", attempt),
            SupervisorState::FlushingBacklog => write!(f, "FLUSHING-BACKLOG"),
            SupervisorState::Streaming => write!(f, "STREAMING"),
            SupervisorState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Cloneable shutdown request, set from a signal handler.
///
/// Waiters are woken as soon as it is triggered.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiter
    pub fn trigger(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }

    /// Check if shutdown was requested
    pub fn is_triggered(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep up to `timeout`; returns true if shutdown was requested
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = condvar
            .wait_timeout_while(guard, timeout, |stop| !*stop)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// How a supervised run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Shutdown was requested
    Interrupted,
    /// The peer closed the stream
    StreamClosed,
    /// The ingestion loop hit an I/O error
    StreamFailed { reason: String },
}

/// Summary of a supervised run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Connection attempts made, including the successful one
    pub connect_attempts: u32,
    /// Bytes discarded by the backlog flush
    pub backlog_bytes: usize,
    /// Ingestion counters at the end of the run
    pub metrics: IngestMetrics,
}

/// Owns the connection lifecycle and the ingestion thread
#[derive(Debug)]
pub struct Supervisor {
    config: MonitorConfig,
    store: Arc<WindowStore>,
    shutdown: ShutdownSignal,
    state: SupervisorState,
    attempts: u32,
}

impl Supervisor {
    /// Create a supervisor.
    ///
    /// Fails if the configuration is invalid or if `store` was built with
    /// different window settings than `config.window`.
    pub fn new(config: MonitorConfig, store: Arc<WindowStore>, shutdown: ShutdownSignal) -> Result<Self> {
        config.validate()?;
        let store_window = *store.lock().config();
        if store_window != config.window {
            return Err(MonitorError::InvalidConfig(format!(
                "window store uses {:?} but the configuration has {:?}",
                store_window, config.window
            )));
        }
        Ok(Self {
            config,
            store,
            shutdown,
            state: SupervisorState::Disconnected,
            attempts: 0,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Connection attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The store the ingestion loop records into
    pub fn store(&self) -> &Arc<WindowStore> {
        &self.store
    }

    fn transition(&mut self, next: SupervisorState) {
        debug!("Supervisor: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Connect, retrying refusals per the reconnect policy.
    ///
    /// Returns `Ok(None)` if shutdown was requested before a connection
    /// was made. Errors other than a refusal are returned immediately.
    pub fn connect(&mut self) -> Result<Option<TcpStream>> {
        let addr = self.config.address();

        loop {
            if self.shutdown.is_triggered() {
                return Ok(None);
            }

            self.attempts += 1;
            self.transition(SupervisorState::Connecting {
                attempt: self.attempts,
            });
            info!("Connecting to {}...", addr);

            match TcpStream::connect(&addr) {
                Ok(stream) => {
                    info!("Connected to {}", addr);
                    return Ok(Some(stream));
                }
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    self.transition(SupervisorState::Disconnected);
                    let Some(delay) = self.config.reconnect.delay_after(self.attempts) else {
                        return Err(MonitorError::RetriesExhausted {
                            addr,
                            attempts: self.attempts,
                        });
                    };
                    warn!("Connection refused, retrying in {:?}...", delay);
                    if self.shutdown.wait_timeout(delay) {
                        return Ok(None);
                    }
                }
                Err(source) => {
                    self.transition(SupervisorState::Disconnected);
                    return Err(MonitorError::Connect { addr, source });
                }
            }
        }
    }

    /// Discard bytes already buffered on a fresh connection.
    ///
    /// Reads with a short timeout until one times out (or the peer closes),
    /// then restores blocking reads. Returns the number of bytes dropped.
    pub fn flush_backlog(&mut self, stream: &mut TcpStream) -> Result<usize> {
        self.transition(SupervisorState::FlushingBacklog);
        stream.set_read_timeout(Some(self.config.flush_timeout))?;

        let mut buf = vec![0u8; self.config.read_chunk];
        let mut discarded = 0;
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => discarded += n,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        stream.set_read_timeout(None)?;
        info!("Buffer flushed ({} bytes); starting live processing", discarded);
        Ok(discarded)
    }

    /// Connect, flush, stream until the peer goes away or shutdown is
    /// requested, then stop.
    ///
    /// On shutdown the socket is closed in both directions, which releases
    /// the ingestion thread's blocking read. No reconnect is attempted
    /// once streaming has started.
    pub fn run(mut self) -> Result<RunReport> {
        let Some(mut stream) = self.connect()? else {
            info!("Shutdown requested before a connection was made");
            self.transition(SupervisorState::Stopped);
            return Ok(self.report(RunOutcome::Interrupted, 0, IngestMetrics::default()));
        };
        let backlog_bytes = self.flush_backlog(&mut stream)?;

        let reader = stream.try_clone()?;
        let writer = stream.try_clone()?;
        let pipeline = Pipeline::new(Arc::clone(&self.store), self.config.slope_threshold)
            .with_read_chunk(self.config.read_chunk);
        let stats = pipeline.stats();

        self.transition(SupervisorState::Streaming);
        let handle = thread::Builder::new()
            .name("valvewatch-ingest".to_string())
            .spawn(move || pipeline.run(reader, writer))?;

        let mut interrupted = false;
        while !handle.is_finished() {
            if self.shutdown.wait_timeout(self.config.poll_interval) {
                info!("Shutting down monitor");
                interrupted = true;
                if let Err(e) = stream.shutdown(Shutdown::Both) {
                    debug!("Closing stream: {}", e);
                }
                break;
            }
        }

        let result = handle.join().map_err(|_| {
            error!("Ingestion thread panicked");
            MonitorError::IngestPanicked
        })?;
        self.transition(SupervisorState::Stopped);

        let outcome = match (interrupted, result) {
            (true, _) => RunOutcome::Interrupted,
            (false, Ok(())) => RunOutcome::StreamClosed,
            (false, Err(e)) => RunOutcome::StreamFailed {
                reason: e.to_string(),
            },
        };
        Ok(self.report(outcome, backlog_bytes, stats.snapshot()))
    }

    fn report(&self, outcome: RunOutcome, backlog_bytes: usize, metrics: IngestMetrics) -> RunReport {
        RunReport {
            outcome,
            connect_attempts: self.attempts,
            backlog_bytes,
            metrics,
        }
    }
}
