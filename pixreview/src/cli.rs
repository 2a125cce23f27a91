//! Command-line surface of the `pixreview` binary.
//!
//! `open` starts the interactive reviewer; `diff`, `reset` and `status` run
//! headless and exit.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pixreview_core::ResetScope;

#[derive(Debug, Parser)]
#[command(name = "pixreview")]
#[command(version, about = "Review visual-regression screenshots in the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (default: $XDG_CONFIG_HOME/pixreview/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Review database, overrides `db_path` from the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Baseline-update endpoint, overrides `endpoint` from the config
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open an index or single-case document in the reviewer
    Open {
        /// Path to the JSON document written by the test runner
        document: PathBuf,

        /// Skip already classified cases when moving to the next one
        #[arg(long)]
        skip_classified: bool,

        /// Delay between animation frames in milliseconds
        #[arg(long)]
        frame_delay_ms: Option<u64>,
    },

    /// Compare two screenshots and report the mismatch count
    Diff {
        /// Recorded (baseline) image
        recorded: PathBuf,

        /// Actual image
        actual: PathBuf,

        /// Write the diff raster as PNG
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Matching threshold in [0, 1]; smaller is more sensitive
        #[arg(long, default_value_t = 0.1, value_parser = parse_threshold)]
        threshold: f64,

        /// Count anti-aliased pixels as mismatches
        #[arg(long)]
        include_aa: bool,

        /// Draw only the differing pixels on a transparent background
        #[arg(long)]
        mask: bool,
    },

    /// Remove stored verdicts
    Reset {
        /// Which verdicts to remove: accepted, rejected or all
        scope: ResetScope,

        /// With `all`, also clear cases waiting on a baseline update
        #[arg(long)]
        include_pending: bool,
    },

    /// Print every case of an index with its classification
    Status {
        /// Path to the index document
        document: PathBuf,

        /// One JSON object per line instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Accepts a finite threshold in `[0, 1]`. NaN would make every pixel match.
fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{raw} is not in 0..=1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_diff_flags() {
        let cli = Cli::try_parse_from([
            "pixreview", "diff", "a.png", "b.png", "--out", "d.png", "--threshold", "0", "--include-aa",
        ])
        .unwrap();
        match cli.command {
            Command::Diff { recorded, out, threshold, include_aa, mask, .. } => {
                assert_eq!(recorded, PathBuf::from("a.png"));
                assert_eq!(out, Some(PathBuf::from("d.png")));
                assert_eq!(threshold, 0.0);
                assert!(include_aa);
                assert!(!mask);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_reset_scope_and_global_db() {
        let cli = Cli::try_parse_from(["pixreview", "reset", "all", "--db", "/tmp/r.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/r.db")));
        assert!(matches!(cli.command, Command::Reset { scope: ResetScope::All, include_pending: false }));
    }

    #[test]
    fn rejects_unknown_reset_scope() {
        assert!(Cli::try_parse_from(["pixreview", "reset", "pending"]).is_err());
    }

    #[test]
    fn threshold_must_be_within_unit_range() {
        for bad in ["NaN", "-0.1", "1.5", "inf", "fast"] {
            assert!(
                Cli::try_parse_from(["pixreview", "diff", "a.png", "b.png", "--threshold", bad]).is_err(),
                "accepted {bad}"
            );
        }
        let cli = Cli::try_parse_from(["pixreview", "diff", "a.png", "b.png", "--threshold", "1"]).unwrap();
        assert!(matches!(cli.command, Command::Diff { threshold, .. } if threshold == 1.0));
    }
}
