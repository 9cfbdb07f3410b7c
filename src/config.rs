//! Optional TOML defaults for command-line options
//!
//! ```toml
//! dir = "/srv/incoming"
//! timeout = 30
//! log_file = "/var/log/txf.log"
//! journal = "/var/log/txf.jsonl"
//! verbose = false
//! progress = true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dir: Option<PathBuf>,     // where received files go
    pub timeout: Option<u64>,     // seconds; 0 = no deadline
    pub log_file: Option<PathBuf>,
    pub journal: Option<PathBuf>,
    pub verbose: bool,
    pub progress: bool,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let s: Settings =
            toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
        Ok(s)
    }

    /// Values from `over` win wherever they are set
    pub fn overlay(mut self, over: Settings) -> Self {
        if over.dir.is_some() {
            self.dir = over.dir;
        }
        if over.timeout.is_some() {
            self.timeout = over.timeout;
        }
        if over.log_file.is_some() {
            self.log_file = over.log_file;
        }
        if over.journal.is_some() {
            self.journal = over.journal;
        }
        self.verbose |= over.verbose;
        self.progress |= over.progress;
        self
    }

    pub fn receive_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        match self.timeout {
            None | Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }
}
