// valvewatch Testdata - Fake border router
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Loopback stand-in for the simulator's serial socket.
//!
//! Accepts one client, plays a [`Script`] of lines at it and collects every
//! command line the client writes back.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use valvewatch::Command;

/// What the fake router sends once a client connects
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Lines written right after accept, before the client is expected to
    /// be listening
    pub backlog: Vec<String>,
    /// Quiet period after the backlog
    pub settle: Duration,
    /// Live lines
    pub lines: Vec<String>,
    /// Pause between live lines
    pub line_interval: Duration,
    /// How long to keep collecting commands after the last line
    pub linger: Duration,
}

impl Script {
    /// Script with live lines only
    pub fn live(lines: Vec<String>) -> Self {
        Self {
            lines,
            ..Default::default()
        }
    }

    pub fn with_backlog(mut self, backlog: Vec<String>, settle: Duration) -> Self {
        self.backlog = backlog;
        self.settle = settle;
        self
    }

    /// Quiet period before the live lines, so a connecting monitor can
    /// finish its backlog flush
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_line_interval(mut self, interval: Duration) -> Self {
        self.line_interval = interval;
        self
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }
}

/// Bound but not yet serving
#[derive(Debug)]
pub struct FakeBorderRouter {
    listener: TcpListener,
}

impl FakeBorderRouter {
    /// Bind to an ephemeral loopback port
    pub fn bind() -> io::Result<Self> {
        Self::bind_to("127.0.0.1:0")
    }

    pub fn bind_to<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr)?,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn port(&self) -> io::Result<u16> {
        Ok(self.local_addr()?.port())
    }

    /// Serve one client in the background
    pub fn serve(self, script: Script) -> RouterHandle {
        let handle = thread::Builder::new()
            .name("fake-border-router".into())
            .spawn(move || serve_one(self.listener, script));
        RouterHandle { handle }
    }
}

/// Running fake router
#[derive(Debug)]
pub struct RouterHandle {
    handle: io::Result<JoinHandle<io::Result<Vec<Command>>>>,
}

impl RouterHandle {
    /// Wait for the script to finish and return the commands received
    pub fn join(self) -> io::Result<Vec<Command>> {
        self.handle?
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "fake border router panicked"))
            .and_then(|result| result)
    }
}

fn serve_one(listener: TcpListener, script: Script) -> io::Result<Vec<Command>> {
    let (mut stream, _) = listener.accept()?;
    let collector = spawn_collector(stream.try_clone()?)?;

    write_lines(&mut stream, &script.backlog)?;
    thread::sleep(script.settle);

    for line in &script.lines {
        write_lines(&mut stream, std::slice::from_ref(line))?;
        if !script.line_interval.is_zero() {
            thread::sleep(script.line_interval);
        }
    }

    thread::sleep(script.linger);
    // the client may already be gone
    let _ = stream.shutdown(Shutdown::Both);

    collector
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "command collector panicked"))
}

fn write_lines(stream: &mut TcpStream, lines: &[String]) -> io::Result<()> {
    for line in lines {
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
    }
    stream.flush()
}

fn spawn_collector(stream: TcpStream) -> io::Result<JoinHandle<Vec<Command>>> {
    thread::Builder::new()
        .name("fake-border-router-commands".into())
        .spawn(move || {
            let mut commands = Vec::new();
            for line in BufReader::new(stream).lines() {
                let Ok(line) = line else { break };
                if let Ok(command) = Command::from_str(&line) {
                    commands.push(command);
                }
            }
            commands
        })
}
