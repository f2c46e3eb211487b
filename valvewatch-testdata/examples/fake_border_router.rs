//! Fake border router for running the monitor by hand.
//!
//! ```bash
//! cargo run -p valvewatch-testdata --example fake_border_router -- 60001
//! cargo run -p valvewatch-monitor -- --port 60001
//! ```

use std::time::Duration;
use valvewatch_testdata::{FakeBorderRouter, NodeFeed, Script, SignalPattern};

fn main() -> std::io::Result<()> {
    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(60001);

    let mut feed = NodeFeed::new(2025)
        .with_noise(1.5)
        .with_chatter(0.1)
        .with_node(2, SignalPattern::Linear { start: 480.0, step: 2.0 })
        .with_node(3, SignalPattern::Constant { value: 510.0 })
        .with_node(4, SignalPattern::RandomWalk { start: 450.0, step_std: 3.0 })
        .with_node(5, SignalPattern::Sawtooth { min: 400.0, max: 520.0, period: 40 });

    let router = FakeBorderRouter::bind_to(("127.0.0.1", port))?;
    println!("Fake border router listening on {}", router.local_addr()?);

    let script = Script::live(feed.take_rounds(300))
        .with_backlog(feed.take_rounds(10), Duration::from_secs(1))
        .with_line_interval(Duration::from_millis(20))
        .with_linger(Duration::from_secs(2));

    let commands = router.serve(script).join()?;
    println!("Received {} commands:", commands.len());
    for command in commands {
        println!("  {}", command);
    }
    Ok(())
}
