// valvewatch - Supervisor integration tests
//
// These run the supervisor against real loopback sockets:
// 1. Backlog flush and live triggering
// 2. Refusal retry policy
// 3. Shutdown

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use valvewatch::{
    MonitorConfig, MonitorError, ReconnectPolicy, RunOutcome, ShutdownSignal, Supervisor,
    WindowConfig, WindowStore,
};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn test_config(port: u16) -> MonitorConfig {
    let mut config = MonitorConfig::with_endpoint("127.0.0.1", port)
        .window(WindowConfig::new(3, Duration::from_secs(300)))
        .slope_threshold(0.5)
        .reconnect(ReconnectPolicy::unbounded(Duration::from_millis(50)));
    config.flush_timeout = Duration::from_millis(200);
    config.poll_interval = Duration::from_millis(20);
    config
}

fn supervisor(config: MonitorConfig, shutdown: ShutdownSignal) -> Supervisor {
    let store = Arc::new(WindowStore::new(config.window));
    Supervisor::new(config, store, shutdown).unwrap()
}

fn write_lines(stream: &mut TcpStream, node: u32, values: &[u64]) {
    for v in values {
        writeln!(stream, "PROCESS : Server got ID={}, value={}", node, v).unwrap();
    }
    stream.flush().unwrap();
}

// ============================================================================
// Backlog flush and live triggering
// ============================================================================

#[test]
fn test_backlog_discarded_then_live_rise_triggers() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        // would trigger node 1 if it were processed
        write_lines(&mut stream, 1, &[1, 2, 3]);
        thread::sleep(Duration::from_millis(800));

        write_lines(&mut stream, 2, &[10, 20, 30]);
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut command = String::new();
        BufReader::new(stream.try_clone().unwrap())
            .read_line(&mut command)
            .unwrap();
        tx.send(command).unwrap();
        // dropping the stream ends the run
    });

    let store = Arc::new(WindowStore::new(WindowConfig::new(3, Duration::from_secs(300))));
    let config = test_config(port);
    let supervisor = Supervisor::new(config, Arc::clone(&store), ShutdownSignal::new()).unwrap();
    let report = supervisor.run().unwrap();
    server.join().unwrap();

    assert_eq!(rx.recv().unwrap(), "3 2 1\n");
    assert_eq!(report.outcome, RunOutcome::StreamClosed);
    assert!(report.backlog_bytes > 0);
    assert_eq!(report.metrics.triggers, 1);
    assert_eq!(store.len(1), 0);
    assert_eq!(store.node_ids(), vec![2]);
}

// ============================================================================
// Refusal retry policy
// ============================================================================

#[test]
fn test_refused_connection_is_retried_until_listener_appears() {
    let port = free_port();

    let server = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        let listener = TcpListener::bind(("127.0.0.1", port)).unwrap();
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
    });

    let report = supervisor(test_config(port), ShutdownSignal::new())
        .run()
        .unwrap();
    server.join().unwrap();

    assert_eq!(report.outcome, RunOutcome::StreamClosed);
    assert!(report.connect_attempts >= 2);
}

#[test]
fn test_limited_policy_gives_up() {
    let port = free_port();
    let config =
        test_config(port).reconnect(ReconnectPolicy::limited(Duration::from_millis(10), 3));

    let mut supervisor = supervisor(config, ShutdownSignal::new());
    let result = supervisor.connect();

    assert!(matches!(
        result,
        Err(MonitorError::RetriesExhausted { attempts: 3, .. })
    ));
    assert_eq!(supervisor.attempts(), 3);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_shutdown_while_streaming() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_millis(400));
        write_lines(&mut stream, 5, &[7]);
        // keep the connection open until the test is over
        let _ = done_rx.recv_timeout(Duration::from_secs(10));
    });

    let shutdown = ShutdownSignal::new();
    let trigger = shutdown.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(800));
        trigger.trigger();
    });

    let start = Instant::now();
    let report = supervisor(test_config(port), shutdown).run().unwrap();
    done_tx.send(()).unwrap();
    server.join().unwrap();

    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.metrics.readings, 1);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_shutdown_while_waiting_to_retry() {
    let port = free_port();
    let config = test_config(port).reconnect(ReconnectPolicy::unbounded(Duration::from_secs(30)));

    let shutdown = ShutdownSignal::new();
    let trigger = shutdown.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        trigger.trigger();
    });

    let start = Instant::now();
    let report = supervisor(config, shutdown).run().unwrap();

    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.connect_attempts, 1);
    assert!(start.elapsed() < Duration::from_secs(10));
}
