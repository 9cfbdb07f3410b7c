//! Error taxonomy for one transfer session

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::protocol::{magic_name, MAX_FILE_SIZE};

pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Error, Debug)]
pub enum TransferError {
    /// Dial, bind, listen or accept failed
    #[error("{step} {addr}: {source}")]
    Connect {
        step: &'static str,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// A block send/receive moved fewer bytes than requested
    #[error("{step}: moved {actual} of {expected} bytes")]
    ShortIo {
        step: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error(
        "{step}: invalid header (expected {}, got {})",
        magic_name(*expected),
        magic_name(*found)
    )]
    Protocol {
        step: &'static str,
        expected: u32,
        found: u32,
    },
    /// Header announced a payload outside 0..=MAX_FILE_SIZE
    #[error("{step}: announced size {size:#010x} out of range (max {:#010x})", MAX_FILE_SIZE)]
    Oversize { step: &'static str, size: u32 },
    /// Local storage object could not be opened, created, read or written
    #[error("{context}: {source}")]
    Local {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Argument(String),
}

impl TransferError {
    pub fn local(context: impl Into<String>, source: io::Error) -> Self {
        Self::Local {
            context: context.into(),
            source,
        }
    }

    /// Short label used by the journal and log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::ShortIo { .. } => "io",
            Self::Protocol { .. } | Self::Oversize { .. } => "protocol",
            Self::Local { .. } => "local",
            Self::Argument(_) => "argument",
        }
    }

    /// Every failure maps to the same generic process outcome
    pub fn exit_code(&self) -> i32 {
        1
    }
}
