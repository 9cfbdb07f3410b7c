//! Shared protocol constants for the txf header/block transport

// Header magic tags (compared after big-endian decode)
pub const MAGIC_SEND: u32 = 0x5345_4e44; // "SEND"
pub const MAGIC_RCVD: u32 = 0x7263_7664; // "rcvd"

// Fixed wire layout: magic (4) | file_size (4) | file_name (20) | term (1) | reserved (3)
pub const HEADER_LEN: usize = 32;
pub const FILENAME_LEN: usize = 20;

/// Usable name bytes; the last byte of the field is always NUL
pub const MAX_NAME_LEN: usize = FILENAME_LEN - 1;

pub mod offsets {
    pub const MAGIC: usize = 0;
    pub const FILE_SIZE: usize = 4;
    pub const FILE_NAME: usize = 8;
    pub const TERMINATOR: usize = 28;
    pub const RESERVED: usize = 29;
}

// Local I/O pacing only; not part of the wire format
pub const BLOCK_SIZE: usize = 1024;

// Largest payload a conforming sender may advertise (top bit never set)
pub const MAX_FILE_SIZE: u64 = 0x7fff_ffff;

// Substitute for the path delimiter and anything that is not single-byte ASCII
pub const PLACEHOLDER: u8 = b'_';

/// Render a magic tag for diagnostics ("SEND", "rcvd", or hex for foreign values)
pub fn magic_name(magic: u32) -> String {
    match magic {
        MAGIC_SEND => "SEND".to_string(),
        MAGIC_RCVD => "rcvd".to_string(),
        other => format!("{:#010x}", other),
    }
}
