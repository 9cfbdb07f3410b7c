//! Byte progress bar for the payload phase
//!
//! Hooked in as a `Logger`: the header sets the length, every block advances
//! the bar, and the terminal state finishes or abandons it.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::logger::Logger;
use crate::transfer::TransferState;

pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Progress that renders nowhere; used when stdout is not wanted
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {msg} [{bar:30.green}] {bytes}/{total_bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for TransferProgress {
    fn header(&self, name: &str, size: u64) {
        self.bar.set_length(size);
        self.bar.set_message(name.to_string());
    }

    fn block(&self, _offset: u64, len: usize) {
        self.bar.inc(len as u64);
    }

    fn state(&self, state: TransferState) {
        match state {
            TransferState::Done => self.bar.finish(),
            TransferState::Failed => self.bar.abandon(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_advance_position() {
        let p = TransferProgress::hidden();
        p.header("report.txt", 1500);
        p.block(0, 1024);
        p.block(1024, 476);
        assert_eq!(p.position(), 1500);
        p.state(TransferState::Done);
        assert!(p.bar.is_finished());
    }
}
