//! txf library
//!
//! One-shot point-to-point file transfer: a fixed 32-byte header, the payload
//! in 1 KiB blocks, and a closing acknowledgment, over one TCP connection.

pub mod block;
pub mod cli;
pub mod config;
pub mod error;
pub mod log;
pub mod logger;
pub mod net;
pub mod progress;
pub mod protocol;
pub mod protocol_core;
pub mod session;
pub mod storage;
pub mod transfer;

pub use cli::Args;
pub use error::TransferError;
