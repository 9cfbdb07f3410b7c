use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use uuid::Uuid;

use crate::error::TransferError;
use crate::logger::Logger;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    Failed,
}

/// One line of the session journal
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransferLogEntry {
    pub timestamp: String,
    pub session_id: String,
    pub direction: String,
    pub link: String,
    pub addr: String,
    pub peer: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub status: TransferStatus,
    pub elapsed_ms: u64,
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl TransferLogEntry {
    /// Blank entry stamped with the current time and a fresh session id
    pub fn begin(direction: &str, link: &str, addr: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            session_id: Uuid::new_v4().to_string(),
            direction: direction.to_string(),
            link: link.to_string(),
            addr: addr.to_string(),
            peer: None,
            file_name: None,
            file_size: None,
            status: TransferStatus::Failed,
            elapsed_ms: 0,
            error_kind: None,
            error: None,
        }
    }
}

/// Append-only JSON-lines file, one record per txf run
pub struct TransferLog {
    path: PathBuf,
}

impl TransferLog {
    pub fn new(path: &Path) -> Self {
        TransferLog {
            path: path.to_path_buf(),
        }
    }

    pub fn add_entry(&self, entry: &TransferLogEntry) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create journal dir {}", dir.display()))?;
        }
        let mut record = serde_json::to_string(entry).context("serialize journal entry")?;
        record.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open journal {}", self.path.display()))?;
        // one write per record so concurrent runs interleave whole lines
        file.write_all(record.as_bytes())
            .with_context(|| format!("append to journal {}", self.path.display()))?;
        Ok(())
    }

    /// Every complete record, oldest first. A record cut short by a killed
    /// run at the end of the file is skipped.
    pub fn read_log(&self) -> Result<Vec<TransferLogEntry>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("open journal {}", self.path.display()))
            }
        };
        let records = serde_json::Deserializer::from_reader(BufReader::new(file))
            .into_iter::<TransferLogEntry>();
        let mut entries = Vec::new();
        for record in records {
            match record {
                Ok(entry) => entries.push(entry),
                Err(e) if e.is_eof() => break,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("parse journal {}", self.path.display()))
                }
            }
        }
        Ok(entries)
    }
}

/// Collects session facts from logger events and writes one journal entry
pub struct JournalLogger {
    log: TransferLog,
    entry: Mutex<TransferLogEntry>,
    started: Instant,
}

impl JournalLogger {
    pub fn new(path: &Path, direction: &str, link: &str, addr: &str) -> Self {
        Self {
            log: TransferLog::new(path),
            entry: Mutex::new(TransferLogEntry::begin(direction, link, addr)),
            started: Instant::now(),
        }
    }

    /// Append the entry for this session's outcome
    pub fn record(&self, outcome: std::result::Result<(), &TransferError>) -> Result<()> {
        let mut entry = self
            .entry
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock journal entry: {}", e))?
            .clone();
        entry.elapsed_ms = self.started.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => entry.status = TransferStatus::Completed,
            Err(e) => {
                entry.status = TransferStatus::Failed;
                entry.error_kind = Some(e.kind().to_string());
                entry.error = Some(e.to_string());
            }
        }
        self.log.add_entry(&entry)
    }
}

impl Logger for JournalLogger {
    fn connected(&self, peer: &SocketAddr, _inbound: bool) {
        if let Ok(mut e) = self.entry.lock() {
            e.peer = Some(peer.to_string());
        }
    }
    fn header(&self, name: &str, size: u64) {
        if let Ok(mut e) = self.entry.lock() {
            e.file_name = Some(name.to_string());
            e.file_size = Some(size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_journal_appends_and_reads_back() {
        let tmp = TempDir::new().unwrap();
        let log = TransferLog::new(&tmp.path().join("journal.jsonl"));
        assert!(log.read_log().unwrap().is_empty());

        let mut ok = TransferLogEntry::begin("send", "listen", "0.0.0.0:9000");
        ok.status = TransferStatus::Completed;
        ok.file_name = Some("report.txt".into());
        ok.file_size = Some(1500);
        log.add_entry(&ok).unwrap();

        let mut bad = TransferLogEntry::begin("receive", "dial", "127.0.0.1:9000");
        bad.error_kind = Some("protocol".into());
        log.add_entry(&bad).unwrap();

        let entries = log.read_log().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, TransferStatus::Completed);
        assert_eq!(entries[0].file_size, Some(1500));
        assert_eq!(entries[1].status, TransferStatus::Failed);
        assert_ne!(entries[0].session_id, entries[1].session_id);
    }

    #[test]
    fn test_journal_skips_torn_tail() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal.jsonl");
        let log = TransferLog::new(&path);
        log.add_entry(&TransferLogEntry::begin("send", "dial", "10.0.0.2:9000"))
            .unwrap();
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"{\"timestamp\":\"2026-").unwrap();

        let entries = log.read_log().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].addr, "10.0.0.2:9000");
    }

    #[test]
    fn test_journal_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        assert!(TransferLog::new(&path).read_log().is_err());
    }

    #[test]
    fn test_journal_logger_collects_events() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("j.jsonl");
        let j = JournalLogger::new(&path, "receive", "dial", "127.0.0.1:9000");
        j.connected(&"127.0.0.1:9000".parse().unwrap(), false);
        j.header("data.bin", 2500);
        let err = TransferError::ShortIo {
            step: "recv data",
            expected: 1024,
            actual: 3,
        };
        j.record(Err(&err)).unwrap();

        let entries = TransferLog::new(&path).read_log().unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.peer.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(e.file_name.as_deref(), Some("data.bin"));
        assert_eq!(e.file_size, Some(2500));
        assert_eq!(e.status, TransferStatus::Failed);
        assert_eq!(e.error_kind.as_deref(), Some("io"));
    }
}
