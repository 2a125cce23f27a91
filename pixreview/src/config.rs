//! User configuration for pixreview.
//!
//! Read from `$XDG_CONFIG_HOME/pixreview/config.toml` (falling back to
//! `~/.config/pixreview/config.toml`). Every key is optional. A missing file
//! yields the defaults; a malformed one also yields the defaults, plus a
//! warning the caller logs once logging is up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pixreview_core::playback::DEFAULT_FRAME_DELAY;
use pixreview_core::ResetPolicy;
use serde::Deserialize;

use crate::cli::Cli;

/// Settings resolved from the config file and command-line overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `dark` or `catppuccin-mocha`.
    pub theme: String,
    pub db_path: PathBuf,
    /// Baseline-update endpoint receiving `{"test", "hash"}` POSTs.
    pub endpoint: String,
    pub frame_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Whether resetting "all" also clears cases stuck in a pending update.
    pub reset_all_includes_pending: bool,
    /// Whether "next case" skips cases that already carry a verdict.
    pub skip_classified: bool,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "catppuccin-mocha".to_owned(),
            db_path: PathBuf::from(".pixreview/reviews.db"),
            endpoint: "http://localhost:8000/fixtures.json".to_owned(),
            frame_delay_ms: DEFAULT_FRAME_DELAY.as_millis() as u64,
            request_timeout_secs: 10,
            reset_all_includes_pending: false,
            skip_classified: false,
            log_file: PathBuf::from(".pixreview/pixreview.log"),
        }
    }
}

impl Config {
    /// Loads the config at `path`.
    ///
    /// Returns the config together with a warning to log when the file exists
    /// but could not be used.
    pub fn load(path: &Path) -> (Self, Option<String>) {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (Self::default(), None),
            Err(e) => {
                return (Self::default(), Some(format!("cannot read config {}: {e}", path.display())));
            }
        };
        Self::parse(&raw).map_or_else(
            |e| (Self::default(), Some(format!("config parse error in {}: {e}", path.display()))),
            |c| (c, None),
        )
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(db) = &cli.db {
            self.db_path = db.clone();
        }
        if let Some(endpoint) = &cli.endpoint {
            self.endpoint = endpoint.clone();
        }
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        ResetPolicy { all_includes_pending: self.reset_all_includes_pending }
    }
}

/// Returns the path to the pixreview config file.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("pixreview").join("config.toml")
}
