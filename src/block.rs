//! Exact-count block I/O over a byte stream
//!
//! A single `read`/`write` may move fewer bytes than asked for; these helpers
//! keep going until the whole buffer has moved or the transport gives up.
//! They report how far they got instead of an error: anything short of
//! `buf.len()` is a failed transfer for the caller.

use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransferError};

/// Write all of `buf`, returning the number of bytes the transport accepted
pub fn send_exact<W: Write + ?Sized>(conn: &mut W, buf: &[u8]) -> usize {
    let mut pos = 0;
    while pos < buf.len() {
        match conn.write(&buf[pos..]) {
            Ok(0) => break,
            Ok(n) => pos += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    pos
}

/// Fill all of `buf`, returning the number of bytes received before EOF or error
pub fn recv_exact<R: Read + ?Sized>(conn: &mut R, buf: &mut [u8]) -> usize {
    let mut pos = 0;
    while pos < buf.len() {
        match conn.read(&mut buf[pos..]) {
            Ok(0) => break,
            Ok(n) => pos += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    pos
}

/// `send_exact` that turns a short count into `TransferError::ShortIo`
pub fn send_all<W: Write + ?Sized>(conn: &mut W, buf: &[u8], step: &'static str) -> Result<()> {
    let actual = send_exact(conn, buf);
    if actual < buf.len() {
        return Err(TransferError::ShortIo {
            step,
            expected: buf.len(),
            actual,
        });
    }
    Ok(())
}

/// `recv_exact` that turns a short count into `TransferError::ShortIo`
pub fn recv_all<R: Read + ?Sized>(conn: &mut R, buf: &mut [u8], step: &'static str) -> Result<()> {
    let actual = recv_exact(conn, buf);
    if actual < buf.len() {
        return Err(TransferError::ShortIo {
            step,
            expected: buf.len(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Moves at most `step` bytes per call and fails after `limit` bytes
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        limit: usize,
        interrupted: bool,
    }

    impl Trickle {
        fn new(data: Vec<u8>, step: usize, limit: usize) -> Self {
            Self {
                data,
                pos: 0,
                step,
                limit,
                interrupted: false,
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            if self.pos >= self.limit {
                return Err(io::Error::new(ErrorKind::ConnectionReset, "dropped"));
            }
            let n = buf
                .len()
                .min(self.step)
                .min(self.limit - self.pos)
                .min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.pos >= self.limit {
                return Err(io::Error::new(ErrorKind::BrokenPipe, "dropped"));
            }
            let n = buf.len().min(self.step).min(self.limit - self.pos);
            self.data.extend_from_slice(&buf[..n]);
            self.pos += n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_recv_exact_loops_over_partial_reads() {
        let data: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        let mut conn = Trickle::new(data.clone(), 7, usize::MAX);
        let mut buf = vec![0u8; 3000];
        assert_eq!(recv_exact(&mut conn, &mut buf), 3000);
        assert_eq!(buf, data);
    }

    #[test]
    fn test_recv_exact_stops_at_eof() {
        let mut conn = Trickle::new(vec![1u8; 100], 64, usize::MAX);
        let mut buf = [0u8; 256];
        assert_eq!(recv_exact(&mut conn, &mut buf), 100);
    }

    #[test]
    fn test_recv_exact_stops_at_error() {
        let mut conn = Trickle::new(vec![1u8; 1000], 64, 300);
        let mut buf = [0u8; 1000];
        assert_eq!(recv_exact(&mut conn, &mut buf), 300);
    }

    #[test]
    fn test_send_exact_loops_and_stops() {
        let mut conn = Trickle::new(Vec::new(), 5, usize::MAX);
        assert_eq!(send_exact(&mut conn, &[9u8; 1024]), 1024);
        assert_eq!(conn.data, vec![9u8; 1024]);

        let mut dropped = Trickle::new(Vec::new(), 100, 452);
        assert_eq!(send_exact(&mut dropped, &[9u8; 1024]), 452);
    }

    #[test]
    fn test_short_count_becomes_error() {
        let mut dropped = Trickle::new(Vec::new(), 100, 10);
        match send_all(&mut dropped, &[0u8; 32], "send header") {
            Err(TransferError::ShortIo { step, expected, actual }) => {
                assert_eq!(step, "send header");
                assert_eq!(expected, 32);
                assert_eq!(actual, 10);
            }
            other => panic!("expected short io, got {:?}", other),
        }
        let mut empty = io::empty();
        let mut buf = [0u8; 4];
        assert!(recv_all(&mut empty, &mut buf, "recv ack").is_err());
        assert!(recv_all(&mut empty, &mut [0u8; 0], "recv data").is_ok());
    }
}
