//! Connection establishment: dial out, or listen and accept exactly one peer

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use crate::error::{Result, TransferError};

/// Which side opens the connection; independent of who sends the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Dial,
    Listen,
}

/// The one connection a session runs over
#[derive(Debug)]
pub struct Connection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    /// true when the peer dialed us
    pub inbound: bool,
}

impl Connection {
    pub fn establish(link: Link, addr: SocketAddr, io_timeout: Option<Duration>) -> Result<Self> {
        let (stream, peer, inbound) = match link {
            Link::Dial => {
                let stream = dial(addr)?;
                (stream, addr, false)
            }
            Link::Listen => {
                let listener = listen(addr)?;
                let (stream, peer) = accept_one(&listener, addr)?;
                // listener dropped here: no second peer is ever accepted
                (stream, peer, true)
            }
        };
        tune_socket(&stream, io_timeout);
        Ok(Self {
            stream,
            peer,
            inbound,
        })
    }
}

pub fn dial(addr: SocketAddr) -> Result<TcpStream> {
    TcpStream::connect(addr).map_err(connect_error("connect", addr))
}

/// Bind `addr` with a pending-connection backlog of exactly one
pub fn listen(addr: SocketAddr) -> Result<TcpListener> {
    let fail = |step| connect_error(step, addr);
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(fail("socket"))?;
    // Allow an immediate rerun on the same port
    #[cfg(unix)]
    socket.set_reuse_address(true).map_err(fail("bind"))?;
    socket.bind(&addr.into()).map_err(fail("bind"))?;
    socket.listen(1).map_err(fail("listen"))?;
    Ok(socket.into())
}

fn connect_error(step: &'static str, addr: SocketAddr) -> impl FnOnce(io::Error) -> TransferError {
    move |source| TransferError::Connect { step, addr, source }
}

pub fn accept_one(listener: &TcpListener, addr: SocketAddr) -> Result<(TcpStream, SocketAddr)> {
    listener.accept().map_err(connect_error("accept", addr))
}

// Socket tuning: disable Nagle, keep idle links probed, optional I/O deadline
fn tune_socket(stream: &TcpStream, io_timeout: Option<Duration>) {
    let _ = stream.set_nodelay(true);
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(60));
    let _ = sock.set_tcp_keepalive(&keepalive);
    // A timed-out read/write surfaces as a short block transfer
    let _ = stream.set_read_timeout(io_timeout);
    let _ = stream.set_write_timeout(io_timeout);
}
