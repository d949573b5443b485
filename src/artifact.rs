//! Boot artifacts and where they come from.
//!
//! An artifact is only ever read through [`ArtifactReader`], a copy-out
//! interface, so it may live in ordinary memory, in a file, or anywhere
//! else that can hand out byte ranges.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact {0} not found")]
    NotFound(String),
    #[error("timed out after {timeout:?} acquiring artifact {reference}")]
    Timeout { reference: String, timeout: Duration },
    #[error("unsupported artifact reference {0}")]
    UnsupportedScheme(String),
    #[error("read of {len} bytes at offset {offset} is outside a {size} byte artifact")]
    OutOfRange { offset: u64, len: usize, size: u64 },
    #[error("artifact I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait ArtifactReader {
    /// Total number of bytes in the artifact.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    fn read(&mut self, dst: &mut [u8], offset: u64) -> Result<(), ArtifactError>;
}

fn check_range(offset: u64, len: usize, size: u64) -> Result<(), ArtifactError> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(ArtifactError::OutOfRange { offset, len, size }),
    }
}

/// Artifact held in ordinary memory.
pub struct MemoryArtifact {
    data: Vec<u8>,
}

impl MemoryArtifact {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        MemoryArtifact { data: data.into() }
    }
}

impl ArtifactReader for MemoryArtifact {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, dst: &mut [u8], offset: u64) -> Result<(), ArtifactError> {
        check_range(offset, dst.len(), self.len())?;
        let start = offset as usize;
        dst.copy_from_slice(&self.data[start..start + dst.len()]);
        Ok(())
    }
}

/// Artifact staged through a file; bytes are copied out on demand and the
/// file is never loaded whole.
pub struct FileArtifact {
    file: File,
    len: u64,
}

impl FileArtifact {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileArtifact { file, len })
    }
}

impl ArtifactReader for FileArtifact {
    fn len(&self) -> u64 {
        self.len
    }

    fn read(&mut self, dst: &mut [u8], offset: u64) -> Result<(), ArtifactError> {
        check_range(offset, dst.len(), self.len)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(dst)?;
        Ok(())
    }
}

pub trait ArtifactSource {
    /// Resolves `reference` to a readable artifact, giving up after `timeout`.
    fn acquire(
        &self,
        reference: &str,
        timeout: Duration,
    ) -> Result<Box<dyn ArtifactReader>, ArtifactError>;
}

/// Acquires artifacts from the local filesystem. Accepts plain paths and
/// `file:` URIs.
#[derive(Debug, Default, Clone)]
pub struct LocalArtifactSource;

impl LocalArtifactSource {
    fn resolve(reference: &str) -> Result<PathBuf, ArtifactError> {
        if let Some(rest) = reference.strip_prefix("file:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            if path.is_empty() {
                return Err(ArtifactError::NotFound(reference.to_string()));
            }
            return Ok(PathBuf::from(path));
        }
        if let Some(pos) = reference.find("://") {
            let scheme = &reference[..pos];
            if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
                return Err(ArtifactError::UnsupportedScheme(reference.to_string()));
            }
        }
        if reference.is_empty() {
            return Err(ArtifactError::NotFound(reference.to_string()));
        }
        Ok(PathBuf::from(reference))
    }
}

impl ArtifactSource for LocalArtifactSource {
    fn acquire(
        &self,
        reference: &str,
        timeout: Duration,
    ) -> Result<Box<dyn ArtifactReader>, ArtifactError> {
        let path = Self::resolve(reference)?;
        log::debug!("acquiring {} from {}", reference, path.display());

        // open can block on network filesystems and FIFOs
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(FileArtifact::open(&path));
        });
        match rx.recv_timeout(timeout) {
            Ok(Ok(artifact)) => Ok(Box::new(artifact)),
            Ok(Err(ArtifactError::Io(err))) if err.kind() == io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(reference.to_string()))
            }
            Ok(Err(err)) => Err(err),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ArtifactError::Timeout {
                reference: reference.to_string(),
                timeout,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ArtifactError::Io(io::Error::new(
                io::ErrorKind::Other,
                "artifact loader exited without a result",
            ))),
        }
    }
}
