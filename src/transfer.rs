//! Block-transfer and acknowledgment state machine
//!
//! Sender: SEND header, payload in blocks of at most BLOCK_SIZE, wait for rcvd.
//! Receiver: wait for SEND header, create the destination, store the payload,
//! answer with rcvd. Any short transfer or wrong magic ends in `Failed`.

use std::fmt;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use crate::block::{recv_all, send_all};
use crate::error::{Result, TransferError};
use crate::logger::Logger;
use crate::protocol::{BLOCK_SIZE, HEADER_LEN, MAGIC_RCVD, MAGIC_SEND};
use crate::protocol_core::Header;
use crate::storage::Destination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    AwaitHeader,
    Sending,
    Receiving,
    AwaitAck,
    SendAck,
    Done,
    Failed,
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AwaitHeader => "await-header",
            Self::Sending => "sending",
            Self::Receiving => "receiving",
            Self::AwaitAck => "await-ack",
            Self::SendAck => "send-ack",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

/// Outcome of a completed transfer
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub direction: Direction,
    pub file_name: String,
    pub file_size: u64,
    pub blocks: u32,
    pub elapsed: Duration,
}

/// Tracks the current state and reports every transition
struct Machine<'a> {
    logger: &'a dyn Logger,
    state: TransferState,
    started: Instant,
}

impl<'a> Machine<'a> {
    fn new(logger: &'a dyn Logger) -> Self {
        logger.state(TransferState::AwaitHeader);
        Self {
            logger,
            state: TransferState::AwaitHeader,
            started: Instant::now(),
        }
    }

    fn enter(&mut self, next: TransferState) {
        self.state = next;
        self.logger.state(next);
    }

    /// Terminal bookkeeping for both outcomes
    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.enter(TransferState::Done),
            Err(e) => {
                // report the state the failure happened in, not the terminal one
                self.logger.error(&self.state.to_string(), &e.to_string());
                self.enter(TransferState::Failed);
            }
        }
        result
    }
}

/// Run the sender side: `source` must yield at least `size` bytes.
pub fn send_file<C, R>(
    conn: &mut C,
    source: &mut R,
    name: &str,
    size: u64,
    logger: &dyn Logger,
) -> Result<TransferReport>
where
    C: Read + Write + ?Sized,
    R: Read + ?Sized,
{
    let mut m = Machine::new(logger);
    let result = send_steps(&mut m, conn, source, name, size);
    let blocks = m.finish(result)?;
    Ok(TransferReport {
        direction: Direction::Send,
        file_name: name.to_string(),
        file_size: size,
        blocks,
        elapsed: m.started.elapsed(),
    })
}

fn send_steps<C, R>(
    m: &mut Machine<'_>,
    conn: &mut C,
    source: &mut R,
    name: &str,
    size: u64,
) -> Result<u32>
where
    C: Read + Write + ?Sized,
    R: Read + ?Sized,
{
    let header = Header::send(size, name)?;
    send_all(conn, &header.encode(), "send header")?;
    m.logger.header(&header.file_name_lossy(), size);

    m.enter(TransferState::Sending);
    let mut buf = [0u8; BLOCK_SIZE];
    let mut offset = 0u64;
    let mut blocks = 0u32;
    while offset < size {
        let len = (size - offset).min(BLOCK_SIZE as u64) as usize;
        source.read_exact(&mut buf[..len]).map_err(|e| {
            TransferError::local(format!("read {} at offset {}", name, offset), e)
        })?;
        send_all(conn, &buf[..len], "send data")?;
        m.logger.block(offset, len);
        offset += len as u64;
        blocks += 1;
    }

    m.enter(TransferState::AwaitAck);
    let mut ack = [0u8; HEADER_LEN];
    recv_all(conn, &mut ack, "recv ack")?;
    Header::decode(&ack, MAGIC_RCVD, "recv ack")?;
    Ok(blocks)
}

/// Run the receiver side, creating the destination object once the header
/// has been accepted.
pub fn receive_file<C, D>(conn: &mut C, dest: &mut D, logger: &dyn Logger) -> Result<TransferReport>
where
    C: Read + Write + ?Sized,
    D: Destination + ?Sized,
{
    let mut m = Machine::new(logger);
    let result = receive_steps(&mut m, conn, dest);
    let (header, blocks) = m.finish(result)?;
    Ok(TransferReport {
        direction: Direction::Receive,
        file_name: header.file_name_lossy().into_owned(),
        file_size: header.file_size as u64,
        blocks,
        elapsed: m.started.elapsed(),
    })
}

fn receive_steps<C, D>(m: &mut Machine<'_>, conn: &mut C, dest: &mut D) -> Result<(Header, u32)>
where
    C: Read + Write + ?Sized,
    D: Destination + ?Sized,
{
    let mut raw = [0u8; HEADER_LEN];
    recv_all(conn, &mut raw, "recv header")?;
    let header = Header::decode(&raw, MAGIC_SEND, "recv header")?;
    let name = header.file_name_lossy().into_owned();
    let size = header.file_size as u64;
    m.logger.header(&name, size);

    let mut sink = dest.create(header.file_name())?;

    m.enter(TransferState::Receiving);
    let mut buf = [0u8; BLOCK_SIZE];
    let mut offset = 0u64;
    let mut blocks = 0u32;
    while offset < size {
        let len = (size - offset).min(BLOCK_SIZE as u64) as usize;
        recv_all(conn, &mut buf[..len], "recv data")?;
        sink.write_all(&buf[..len]).map_err(|e| {
            TransferError::local(format!("write {} at offset {}", name, offset), e)
        })?;
        m.logger.block(offset, len);
        offset += len as u64;
        blocks += 1;
    }
    sink.flush()
        .map_err(|e| TransferError::local(format!("flush {}", name), e))?;
    // close before acknowledging
    drop(sink);

    m.enter(TransferState::SendAck);
    send_all(conn, &Header::ack().encode(), "send ack")?;
    Ok((header, blocks))
}
