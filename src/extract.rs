// valvewatch - Streaming trend monitor for sensor networks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Reading extraction from free-form log lines.
//!
//! The border router prints lines such as
//! `PROCESS : Server got ID=3, value=42`, interleaved with routing chatter.
//! [`extract`] looks for a `value=<digits>` marker with an `ID=<digits>`
//! marker anywhere before it.

use std::str::FromStr;

use crate::protocol::{NodeId, SensorReading};

/// Marker preceding the node id
pub const ID_MARKER: &str = "ID=";

/// Marker preceding the reading value
pub const VALUE_MARKER: &str = "value=";

/// Extract the `(node id, value)` pair embedded in `line`, if any.
///
/// The first `value=<digits>` that has an `ID=<digits>` somewhere before it
/// wins, paired with the nearest such `ID=`: `ID=1 ID=2, value=3` reads as
/// node 2. Digit runs too large for their integer type do not match.
pub fn extract(line: &str) -> Option<SensorReading> {
    line.match_indices(VALUE_MARKER).find_map(|(pos, _)| {
        let (value, _) = leading_number::<u64>(&line[pos + VALUE_MARKER.len()..])?;
        let node_id = last_tagged_number::<NodeId>(&line[..pos], ID_MARKER)?;
        Some(SensorReading::new(node_id, value))
    })
}

/// Last `marker<digits>` in `text`, parsed
fn last_tagged_number<T: FromStr>(text: &str, marker: &str) -> Option<T> {
    text.rmatch_indices(marker)
        .find_map(|(pos, _)| leading_number(&text[pos + marker.len()..]).map(|(n, _)| n))
}

/// Parse the ASCII digit run at the start of `text`, returning the rest too
fn leading_number<T: FromStr>(text: &str) -> Option<(T, &str)> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let number = text[..digits].parse().ok()?;
    Some((number, &text[digits..]))
}
