// valvewatch Report - Offline run-log analysis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Command-line front end for the run-log report.
//!
//! ```bash
//! valvewatch-report energised/result.txt
//! valvewatch-report result.txt --cutoff 1:30:00 --json
//! valvewatch-report result.txt --cutoff-secs 5400
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use valvewatch_report::{
    cutoff_from_secs, parse_cutoff, LogReport, Result, DEFAULT_CUTOFF_SECS,
};

/// Count message categories in a Cooja run log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run log to analyze
    log: PathBuf,

    /// Keep lines logged at or before this simulated time (H:MM:SS or seconds) [default: 2:00:00]
    #[arg(short, long)]
    cutoff: Option<String>,

    /// Same as --cutoff, in seconds
    #[arg(long, conflicts_with = "cutoff")]
    cutoff_secs: Option<f64>,

    /// Print the counts as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let report = LogReport::new(cutoff(args)?);
    let counts = report.analyze_file(&args.log)?;
    if args.json {
        counts.to_json()
    } else {
        Ok(counts.to_string())
    }
}

fn cutoff(args: &Args) -> Result<f64> {
    match (&args.cutoff, args.cutoff_secs) {
        (Some(arg), _) => parse_cutoff(arg),
        (None, Some(secs)) => cutoff_from_secs(secs),
        (None, None) => Ok(DEFAULT_CUTOFF_SECS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_cutoff() {
        let args = parse(&["valvewatch-report", "run.log"]);
        assert_eq!(cutoff(&args).unwrap(), DEFAULT_CUTOFF_SECS);
    }

    #[test]
    fn test_cutoff_forms() {
        let args = parse(&["valvewatch-report", "run.log", "--cutoff", "1:30:00"]);
        assert_eq!(cutoff(&args).unwrap(), 5400.0);

        let args = parse(&["valvewatch-report", "run.log", "--cutoff-secs", "90"]);
        assert_eq!(cutoff(&args).unwrap(), 90.0);
    }

    #[test]
    fn test_cutoff_flags_conflict() {
        let result = Args::try_parse_from([
            "valvewatch-report",
            "run.log",
            "--cutoff",
            "1:00:00",
            "--cutoff-secs",
            "60",
        ]);
        assert!(result.is_err());
    }
}
