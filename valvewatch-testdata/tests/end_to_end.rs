// valvewatch Testdata - End-to-end tests
//
// A real Supervisor against the fake border router.

use std::sync::Arc;
use std::time::Duration;

use valvewatch::{
    Command, MonitorConfig, RunOutcome, ShutdownSignal, Supervisor, WindowConfig, WindowStore,
};
use valvewatch_testdata::{reading_line, FakeBorderRouter, NodeFeed, Script, SignalPattern};

fn monitor_config(port: u16, window: usize) -> MonitorConfig {
    let mut config = MonitorConfig::with_endpoint("127.0.0.1", port)
        .window(WindowConfig::new(window, Duration::from_secs(300)))
        .slope_threshold(0.5);
    config.flush_timeout = Duration::from_millis(100);
    config.poll_interval = Duration::from_millis(20);
    config
}

#[test]
fn test_rising_node_gets_one_command_per_full_window() {
    let router = FakeBorderRouter::bind().unwrap();
    let port = router.port().unwrap();

    let mut feed = NodeFeed::new(7)
        .with_chatter(0.2)
        .with_node(2, SignalPattern::Linear { start: 500.0, step: 5.0 })
        .with_node(3, SignalPattern::Constant { value: 480.0 });

    // node 4 would trigger if the backlog were processed
    let backlog = (0..5).map(|i| reading_line(4, i * 100)).collect();

    let handle = router.serve(
        Script::live(feed.take_rounds(12))
            .with_backlog(backlog, Duration::from_millis(600))
            .with_line_interval(Duration::from_millis(2))
            .with_linger(Duration::from_millis(300)),
    );

    let config = monitor_config(port, 5);
    let store = Arc::new(WindowStore::new(config.window));
    let supervisor = Supervisor::new(config, Arc::clone(&store), ShutdownSignal::new()).unwrap();
    let report = supervisor.run().unwrap();
    let commands = handle.join().unwrap();

    assert_eq!(commands, vec![Command::open_valve(2), Command::open_valve(2)]);
    assert_eq!(report.outcome, RunOutcome::StreamClosed);
    assert_eq!(report.metrics.readings, 24);
    assert_eq!(report.metrics.triggers, 2);
    assert!(report.backlog_bytes > 0);

    // 12 readings, reset after the 5th and 10th
    assert_eq!(store.values(2), vec![550, 555]);
    assert_eq!(store.len(3), 5);
    assert_eq!(store.len(4), 0);
}

#[test]
fn test_flat_network_stays_quiet() {
    let router = FakeBorderRouter::bind().unwrap();
    let port = router.port().unwrap();

    let mut feed = NodeFeed::new(11)
        .with_node(1, SignalPattern::Constant { value: 300.0 })
        .with_node(2, SignalPattern::Sawtooth { min: 100.0, max: 104.0, period: 5 });

    let handle = router.serve(
        Script::live(feed.take_rounds(20))
            .with_settle(Duration::from_millis(500))
            .with_linger(Duration::from_millis(200)),
    );

    let config = monitor_config(port, 10);
    let store = Arc::new(WindowStore::new(config.window));
    let report = Supervisor::new(config, store, ShutdownSignal::new())
        .unwrap()
        .run()
        .unwrap();
    let commands = handle.join().unwrap();

    assert!(commands.is_empty());
    assert_eq!(report.metrics.triggers, 0);
}
