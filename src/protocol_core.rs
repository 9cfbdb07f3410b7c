//! Header codec shared by both transfer roles
//!
//! The header is serialized field by field so the wire layout never depends on
//! host byte order or struct padding. Names are sanitized when encoding only;
//! decoding hands back whatever a peer sent, up to the first NUL.

use std::borrow::Cow;
use std::path::Path;

use crate::error::{Result, TransferError};
use crate::protocol::{
    offsets, FILENAME_LEN, HEADER_LEN, MAGIC_RCVD, MAGIC_SEND, MAX_FILE_SIZE, MAX_NAME_LEN,
    PLACEHOLDER,
};

/// Fixed-layout transfer header (introduction or acknowledgment)
#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub file_size: u32,
    name: [u8; FILENAME_LEN],
}

impl Header {
    /// Introductory header announcing `file_size` payload bytes named `name`
    pub fn send(file_size: u64, name: &str) -> Result<Self> {
        if file_size > MAX_FILE_SIZE {
            return Err(TransferError::Argument(format!(
                "file too large: {} bytes (max: {})",
                file_size, MAX_FILE_SIZE
            )));
        }
        Ok(Self {
            magic: MAGIC_SEND,
            file_size: file_size as u32,
            name: sanitize_name(name),
        })
    }

    /// Acknowledgment header; everything except the magic is zero
    pub fn ack() -> Self {
        Self {
            magic: MAGIC_RCVD,
            file_size: 0,
            name: [0u8; FILENAME_LEN],
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[offsets::MAGIC..offsets::FILE_SIZE].copy_from_slice(&self.magic.to_be_bytes());
        buf[offsets::FILE_SIZE..offsets::FILE_NAME].copy_from_slice(&self.file_size.to_be_bytes());
        buf[offsets::FILE_NAME..offsets::TERMINATOR].copy_from_slice(&self.name);
        // terminator and reserved stay zero
        buf
    }

    /// Parse a wire header, requiring `expected` as its magic.
    /// `step` names the protocol step for diagnostics.
    pub fn decode(buf: &[u8; HEADER_LEN], expected: u32, step: &'static str) -> Result<Self> {
        let magic = be_u32(buf, offsets::MAGIC);
        if magic != expected {
            return Err(TransferError::Protocol {
                step,
                expected,
                found: magic,
            });
        }

        let file_size = be_u32(buf, offsets::FILE_SIZE);
        if u64::from(file_size) > MAX_FILE_SIZE {
            return Err(TransferError::Oversize {
                step,
                size: file_size,
            });
        }

        let mut name = [0u8; FILENAME_LEN];
        name.copy_from_slice(&buf[offsets::FILE_NAME..offsets::TERMINATOR]);
        // The terminator byte (offset 28) is not trusted; treating the name field as
        // ending at offset 28 is the same as forcing it to zero.
        Ok(Self {
            magic,
            file_size,
            name,
        })
    }

    /// Name bytes up to the first NUL
    pub fn file_name(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILENAME_LEN);
        &self.name[..end]
    }

    pub fn file_name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.file_name())
    }
}

impl std::fmt::Debug for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Header")
            .field("magic", &crate::protocol::magic_name(self.magic))
            .field("file_size", &self.file_size)
            .field("file_name", &self.file_name_lossy())
            .finish()
    }
}

fn be_u32(buf: &[u8; HEADER_LEN], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Copy at most MAX_NAME_LEN characters into a NUL-padded name field.
/// The delimiter and anything outside single-byte ASCII become `_`.
pub fn sanitize_name(name: &str) -> [u8; FILENAME_LEN] {
    let mut field = [0u8; FILENAME_LEN];
    for (slot, c) in field[..MAX_NAME_LEN]
        .iter_mut()
        .zip(name.chars().take_while(|&c| c != '\0'))
    {
        *slot = if c == '/' || !c.is_ascii() {
            PLACEHOLDER
        } else {
            c as u8
        };
    }
    field
}

/// Derive the wire name for a local path: the component after the last
/// delimiter, sanitized and truncated to fit the header.
pub fn wire_name(path: &Path) -> Result<String> {
    let full = path.to_string_lossy();
    let last = full
        .rsplit(|c: char| c == '/' || std::path::is_separator(c))
        .next()
        .unwrap_or("");
    let field = sanitize_name(last);
    let len = field.iter().position(|&b| b == 0).unwrap_or(FILENAME_LEN);
    if len == 0 {
        return Err(TransferError::Argument(format!(
            "invalid file name: {}",
            path.display()
        )));
    }
    // sanitize_name only emits ASCII
    Ok(field[..len].iter().map(|&b| b as char).collect())
}
