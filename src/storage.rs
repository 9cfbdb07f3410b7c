//! Local storage objects on either end of a transfer
//!
//! The sender reads from a `SourceFile`; the receiver writes into whatever a
//! `Destination` creates for the name announced by the peer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, TransferError};
use crate::protocol::MAX_FILE_SIZE;
use crate::protocol_core::wire_name;

/// An opened local file plus the name and size it will be announced with
#[derive(Debug)]
pub struct SourceFile {
    file: File,
    name: String,
    size: u64,
}

impl SourceFile {
    pub fn open(path: &Path) -> Result<Self> {
        let name = wire_name(path)?;
        let file = File::open(path)
            .map_err(|e| TransferError::local(format!("open {}", path.display()), e))?;
        let md = file
            .metadata()
            .map_err(|e| TransferError::local(format!("stat {}", path.display()), e))?;
        if !md.is_file() {
            return Err(TransferError::Argument(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        if md.len() > MAX_FILE_SIZE {
            return Err(TransferError::Argument(format!(
                "file too large: {} bytes (max: {})",
                md.len(),
                MAX_FILE_SIZE
            )));
        }
        Ok(Self {
            file,
            name,
            size: md.len(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Read for SourceFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

/// Factory for the receiver's output object
pub trait Destination {
    type Sink: Write;

    /// Create (or truncate) the object named by the peer
    fn create(&mut self, name: &[u8]) -> Result<Self::Sink>;
}

/// Writes received files into one directory
#[derive(Debug, Clone)]
pub struct DirDestination {
    root: PathBuf,
    created: Option<PathBuf>,
}

impl DirDestination {
    pub fn new(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(TransferError::Argument(format!(
                "destination is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
            created: None,
        })
    }

    /// Resolve a peer-supplied name to a path directly under the root.
    /// Anything but a single plain component is refused.
    pub fn target(&self, name: &[u8]) -> Result<PathBuf> {
        let name = String::from_utf8_lossy(name);
        let refuse = |why: &str| {
            TransferError::local(
                format!("refusing received name {:?}", name),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, why.to_string()),
            )
        };
        if name.is_empty() {
            return Err(refuse("empty name"));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(refuse("name contains a path delimiter"));
        }
        let rel = Path::new(name.as_ref());
        let mut components = rel.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => {
                // On Windows, reject components with ':' (ADS defense)
                #[cfg(windows)]
                if part.to_string_lossy().contains(':') {
                    return Err(refuse("name contains colon"));
                }
                Ok(self.root.join(part))
            }
            _ => Err(refuse("name is not a single plain component")),
        }
    }

    /// Path of the object created by the last `create`, if any
    pub fn created(&self) -> Option<&Path> {
        self.created.as_deref()
    }
}

impl Destination for DirDestination {
    type Sink = BufWriter<File>;

    fn create(&mut self, name: &[u8]) -> Result<Self::Sink> {
        let path = self.target(name)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| TransferError::local(format!("create {}", path.display()), e))?;
        self.created = Some(path);
        Ok(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_file_reports_name_and_size() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.txt");
        std::fs::write(&path, vec![7u8; 1500]).unwrap();

        let mut src = SourceFile::open(&path).unwrap();
        assert_eq!(src.name(), "report.txt");
        assert_eq!(src.size(), 1500);
        let mut all = Vec::new();
        src.read_to_end(&mut all).unwrap();
        assert_eq!(all.len(), 1500);
    }

    #[test]
    fn test_source_file_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            SourceFile::open(&tmp.path().join("missing.bin")),
            Err(TransferError::Local { .. })
        ));
        let dir = tmp.path().join("sub");
        std::fs::create_dir(&dir).unwrap();
        assert!(matches!(
            SourceFile::open(&dir),
            Err(TransferError::Argument(_))
        ));
    }

    #[test]
    fn test_target_accepts_plain_names() {
        let tmp = TempDir::new().unwrap();
        let dest = DirDestination::new(tmp.path()).unwrap();
        assert_eq!(dest.target(b"a.txt").unwrap(), tmp.path().join("a.txt"));
        assert_eq!(dest.target(b"my_file").unwrap(), tmp.path().join("my_file"));
    }

    #[test]
    fn test_target_refuses_traversal() {
        let tmp = TempDir::new().unwrap();
        let dest = DirDestination::new(tmp.path()).unwrap();
        let bad_names: [&[u8]; 7] = [b"", b".", b"..", b"../x", b"/etc/passwd", b"a/b", b"a/."];
        for bad in bad_names {
            assert!(dest.target(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_create_truncates_and_remembers_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("out.bin"), b"old contents").unwrap();
        let mut dest = DirDestination::new(tmp.path()).unwrap();
        let mut sink = dest.create(b"out.bin").unwrap();
        sink.write_all(b"new").unwrap();
        sink.flush().unwrap();
        drop(sink);
        assert_eq!(std::fs::read(tmp.path().join("out.bin")).unwrap(), b"new");
        assert_eq!(dest.created(), Some(tmp.path().join("out.bin").as_path()));
    }

    #[test]
    fn test_new_requires_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(DirDestination::new(&tmp.path().join("nope")).is_err());
    }
}
