//! One session per process: prepare the role, open one connection, run one
//! transfer, release everything.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::logger::Logger;
use crate::net::{Connection, Link};
use crate::storage::{DirDestination, SourceFile};
use crate::transfer::{receive_file, send_file, Direction, TransferReport};

/// Transfer role, independent of the dial/listen axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Send { path: PathBuf },
    Receive { dir: PathBuf },
}

impl Role {
    pub fn direction(&self) -> Direction {
        match self {
            Role::Send { .. } => Direction::Send,
            Role::Receive { .. } => Direction::Receive,
        }
    }

    /// Acquire the local side before any connection exists
    pub fn prepare(&self) -> Result<Prepared> {
        match self {
            Role::Send { path } => SourceFile::open(path).map(Prepared::Send),
            Role::Receive { dir } => DirDestination::new(dir).map(Prepared::Receive),
        }
    }
}

/// A role with its local storage acquired; dropping it releases the storage
#[derive(Debug)]
pub enum Prepared {
    Send(SourceFile),
    Receive(DirDestination),
}

impl Prepared {
    pub fn run_transfer<C>(&mut self, conn: &mut C, logger: &dyn Logger) -> Result<TransferReport>
    where
        C: Read + Write + ?Sized,
    {
        match self {
            Prepared::Send(src) => {
                let name = src.name().to_string();
                let size = src.size();
                send_file(conn, src, &name, size, logger)
            }
            Prepared::Receive(dest) => receive_file(conn, dest, logger),
        }
    }

    /// Where the received file ended up (receiver only)
    pub fn saved_to(&self) -> Option<&Path> {
        match self {
            Prepared::Send(_) => None,
            Prepared::Receive(dest) => dest.created(),
        }
    }
}

/// Everything one invocation needs, built once from the command line
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub link: Link,
    pub addr: SocketAddr,
    pub role: Role,
    pub io_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub transfer: TransferReport,
    pub peer: SocketAddr,
    pub saved_to: Option<PathBuf>,
}

fn label(link: Link) -> &'static str {
    match link {
        Link::Dial => "client",
        Link::Listen => "server",
    }
}

/// Run exactly one transfer. Connection and storage handle are dropped on
/// every return path.
pub fn run(config: &SessionConfig, logger: &dyn Logger) -> Result<SessionReport> {
    let mut prepared = config.role.prepare().map_err(|e| {
        logger.error("prepare", &e.to_string());
        e
    })?;

    logger.establishing(config.link, &config.addr);
    let mut conn = Connection::establish(config.link, config.addr, config.io_timeout)
        .map_err(|e| {
            logger.error(label(config.link), &e.to_string());
            e
        })?;
    logger.connected(&conn.peer, conn.inbound);

    let transfer = prepared.run_transfer(&mut conn.stream, logger)?;
    logger.done(transfer.file_size, transfer.elapsed.as_secs_f64());

    Ok(SessionReport {
        transfer,
        peer: conn.peer,
        saved_to: prepared.saved_to().map(Path::to_path_buf),
    })
}
