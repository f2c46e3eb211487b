// valvewatch - Pipeline integration tests
//
// Behaviour of the line-to-command pipeline as seen from the outside:
// 1. Window filling and triggering
// 2. Sliding and expiry
// 3. Extraction and command text

use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use valvewatch::{Command, LineOutcome, Pipeline, SensorReading, WindowConfig, WindowStore};

const EXPIRY: Duration = Duration::from_secs(300);

fn setup(size: usize, threshold: f64) -> (Arc<WindowStore>, Pipeline) {
    let store = Arc::new(WindowStore::new(WindowConfig::new(size, EXPIRY)));
    let pipeline = Pipeline::new(Arc::clone(&store), threshold);
    (store, pipeline)
}

fn reading_line(node: u32, value: u64) -> String {
    format!("PROCESS : Server got ID={}, value={}", node, value)
}

fn feed(pipeline: &Pipeline, node: u32, values: &[u64], start: Instant, out: &mut Vec<u8>) -> Vec<LineOutcome> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let now = start + Duration::from_secs(i as u64);
            pipeline.handle_line(&reading_line(node, v), now, out)
        })
        .collect()
}

// ============================================================================
// Window filling and triggering
// ============================================================================

#[test]
fn test_no_command_below_capacity() {
    let (store, pipeline) = setup(5, 0.5);
    let mut out = Vec::new();

    let outcomes = feed(&pipeline, 1, &[1, 100, 1000, 10_000], Instant::now(), &mut out);

    assert!(outcomes
        .iter()
        .all(|o| matches!(o, LineOutcome::Recorded(_))));
    assert!(out.is_empty());
    assert_eq!(store.len(1), 4);
}

#[test]
fn test_rising_values_trigger_open_valve() {
    let (store, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();

    let outcomes = feed(&pipeline, 9, &[1, 2, 3], Instant::now(), &mut out);

    assert!(matches!(
        outcomes.last(),
        Some(LineOutcome::Triggered { command, .. }) if *command == Command::open_valve(9)
    ));
    assert_eq!(out, b"3 9 1\n");
    assert_eq!(store.len(9), 0);
}

#[test]
fn test_reset_requires_fresh_full_window() {
    let (store, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();
    let start = Instant::now();

    feed(&pipeline, 2, &[1, 2, 3], start, &mut out);
    assert_eq!(store.len(2), 0);

    // two more rising readings are not enough for another evaluation
    let outcomes = feed(&pipeline, 2, &[4, 5], start + Duration::from_secs(10), &mut out);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, LineOutcome::Recorded(_))));
    assert_eq!(out, b"3 2 1\n");

    feed(&pipeline, 2, &[6], start + Duration::from_secs(20), &mut out);
    assert_eq!(out, b"3 2 1\n3 2 1\n");
}

#[test]
fn test_nodes_trigger_independently() {
    let (store, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();
    let now = Instant::now();

    for (node, value) in [(1, 1), (2, 5), (1, 2), (2, 5), (1, 3), (2, 5)] {
        pipeline.handle_line(&reading_line(node, value), now, &mut out);
    }

    assert_eq!(out, b"3 1 1\n");
    assert_eq!(store.len(1), 0);
    assert_eq!(store.values(2), vec![5, 5, 5]);
}

/// Peer that has gone away
struct ClosedPeer;

impl Write for ClosedPeer {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_failed_command_write_still_resets_window() {
    let (store, pipeline) = setup(3, 0.5);
    let mut peer = ClosedPeer;
    let now = Instant::now();

    let outcomes: Vec<LineOutcome> = [1, 2, 3]
        .iter()
        .map(|&v| pipeline.handle_line(&reading_line(8, v), now, &mut peer))
        .collect();

    assert!(matches!(
        outcomes.last(),
        Some(LineOutcome::Triggered { delivered: false, command, .. })
            if *command == Command::open_valve(8)
    ));
    assert_eq!(store.len(8), 0);

    let metrics = pipeline.stats().snapshot();
    assert_eq!(metrics.failed_writes, 1);
    assert_eq!(metrics.triggers, 1);
}

// ============================================================================
// Sliding and expiry
// ============================================================================

#[test]
fn test_flat_window_slides_instead_of_resetting() {
    let (store, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();
    let start = Instant::now();

    let outcomes = feed(&pipeline, 4, &[5, 5, 5], start, &mut out);
    assert!(matches!(
        outcomes.last(),
        Some(LineOutcome::Evaluated { slope, .. }) if *slope == 0.0
    ));
    assert_eq!(store.len(4), 3);

    pipeline.handle_line(&reading_line(4, 6), start + Duration::from_secs(5), &mut out);
    assert_eq!(store.values(4), vec![5, 5, 6]);
    assert!(out.is_empty());
}

#[test]
fn test_slow_rise_slides_until_trigger() {
    let (store, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();

    // slope 0 then 0.5 (not strictly above) then 1.0
    let outcomes = feed(&pipeline, 3, &[5, 5, 5, 6, 7], Instant::now(), &mut out);

    assert!(matches!(outcomes[2], LineOutcome::Evaluated { .. }));
    assert!(matches!(outcomes[3], LineOutcome::Evaluated { .. }));
    assert!(matches!(outcomes[4], LineOutcome::Triggered { .. }));
    assert_eq!(out, b"3 3 1\n");
    assert_eq!(store.len(3), 0);
}

#[test]
fn test_gap_longer_than_expiry_prunes_full_window() {
    let (store, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();
    let start = Instant::now();

    feed(&pipeline, 6, &[5, 5, 5], start, &mut out);
    assert_eq!(store.len(6), 3);

    let later = start + EXPIRY + Duration::from_secs(60);
    let outcome = pipeline.handle_line(&reading_line(6, 100), later, &mut out);

    assert_eq!(outcome, LineOutcome::Recorded(SensorReading::new(6, 100)));
    assert_eq!(store.values(6), vec![100]);
    assert!(out.is_empty());
}

// ============================================================================
// Extraction and command text
// ============================================================================

#[test]
fn test_lines_without_markers_never_touch_windows() {
    let (store, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();
    let now = Instant::now();

    pipeline.handle_line(&reading_line(1, 10), now, &mut out);

    for line in [
        "TREE : HELLO Node 5: broadcast rank 1",
        "PROCESS : Node 2: valve OPEN",
        "ID=1 but no reading",
        "value=3 before ID=1",
        "",
    ] {
        assert_eq!(pipeline.handle_line(line, now, &mut out), LineOutcome::Ignored);
    }

    assert_eq!(store.node_count(), 1);
    assert_eq!(store.values(1), vec![10]);
}

#[test]
fn test_recorded_value_is_exact() {
    let (store, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();

    let big = 9_007_199_254_740_993; // not representable as f64
    pipeline.handle_line(&reading_line(1, big), Instant::now(), &mut out);

    assert_eq!(store.values(1), vec![big]);
}

#[test]
fn test_command_text_independent_of_slope_magnitude() {
    let (_, pipeline) = setup(3, 0.5);
    let mut out = Vec::new();

    feed(&pipeline, 7, &[0, 1_000_000, 2_000_000], Instant::now(), &mut out);

    assert_eq!(out, b"3 7 1\n");
}
