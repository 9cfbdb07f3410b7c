use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::net::Link;
use crate::transfer::TransferState;

/// Observer for one transfer session. Every hook defaults to a no-op.
pub trait Logger: Send + Sync {
    fn establishing(&self, _link: Link, _addr: &SocketAddr) {}
    fn connected(&self, _peer: &SocketAddr, _inbound: bool) {}
    fn header(&self, _name: &str, _size: u64) {}
    fn state(&self, _state: TransferState) {}
    fn block(&self, _offset: u64, _len: usize) {}
    fn error(&self, _step: &str, _msg: &str) {}
    fn done(&self, _bytes: u64, _seconds: f64) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

/// Console status lines, one per protocol step
pub struct ConsoleLogger {
    verbose: bool,
}

impl ConsoleLogger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Logger for ConsoleLogger {
    fn establishing(&self, link: Link, addr: &SocketAddr) {
        match link {
            Link::Dial => println!("* client: dialing {}", addr),
            Link::Listen => println!("* server: listening on {}", addr),
        }
    }
    fn connected(&self, peer: &SocketAddr, inbound: bool) {
        if inbound {
            println!("connected from {}", peer.ip());
        } else {
            println!("connected to {}", peer.ip());
        }
    }
    fn header(&self, name: &str, size: u64) {
        println!("{}, {} byte", name, size);
    }
    fn state(&self, state: TransferState) {
        if self.verbose {
            println!("state: {}", state);
        }
    }
    fn block(&self, offset: u64, len: usize) {
        if self.verbose {
            println!("block @{} ({} bytes)", offset, len);
        }
    }
    fn error(&self, step: &str, msg: &str) {
        eprintln!("{}: {}", step, msg);
    }
    fn done(&self, bytes: u64, seconds: f64) {
        println!("done: {} bytes in {:.3}s", bytes, seconds);
    }
}

/// Appends one timestamped line per event, tagged with this process id so
/// several txf runs can share a log file.
pub struct TextLogger {
    file: Mutex<File>,
    pid: u32,
}

impl TextLogger {
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create log dir {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
            pid: std::process::id(),
        })
    }

    fn line(&self, event: &str, fields: fmt::Arguments<'_>) {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        // single write per line; appends from other runs never split it
        let text = format!("[{}] txf[{}] {} {}\n", stamp, self.pid, event, fields);
        if let Ok(mut f) = self.file.lock() {
            let _ = f.write_all(text.as_bytes());
        }
    }
}

impl Logger for TextLogger {
    fn establishing(&self, link: Link, addr: &SocketAddr) {
        self.line("LINK", format_args!("{:?} addr={}", link, addr));
    }
    fn connected(&self, peer: &SocketAddr, inbound: bool) {
        let dir = if inbound { "from" } else { "to" };
        self.line("CONNECT", format_args!("{}={}", dir, peer));
    }
    fn header(&self, name: &str, size: u64) {
        self.line("HEADER", format_args!("name={} size={}", name, size));
    }
    fn state(&self, state: TransferState) {
        self.line("STATE", format_args!("{}", state));
    }
    fn error(&self, step: &str, msg: &str) {
        self.line("ERROR", format_args!("step={} msg={}", step, msg));
    }
    fn done(&self, bytes: u64, seconds: f64) {
        self.line("DONE", format_args!("bytes={bytes} seconds={seconds:.3}"));
    }
}

/// Forwards every event to each inner logger in order
#[derive(Default)]
pub struct FanoutLogger {
    inner: Vec<Arc<dyn Logger>>,
}

impl FanoutLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, logger: Arc<dyn Logger>) {
        self.inner.push(logger);
    }
}

impl Logger for FanoutLogger {
    fn establishing(&self, link: Link, addr: &SocketAddr) {
        self.inner.iter().for_each(|l| l.establishing(link, addr));
    }
    fn connected(&self, peer: &SocketAddr, inbound: bool) {
        self.inner.iter().for_each(|l| l.connected(peer, inbound));
    }
    fn header(&self, name: &str, size: u64) {
        self.inner.iter().for_each(|l| l.header(name, size));
    }
    fn state(&self, state: TransferState) {
        self.inner.iter().for_each(|l| l.state(state));
    }
    fn block(&self, offset: u64, len: usize) {
        self.inner.iter().for_each(|l| l.block(offset, len));
    }
    fn error(&self, step: &str, msg: &str) {
        self.inner.iter().for_each(|l| l.error(step, msg));
    }
    fn done(&self, bytes: u64, seconds: f64) {
        self.inner.iter().for_each(|l| l.done(bytes, seconds));
    }
}
