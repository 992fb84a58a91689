use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::engine::error::{Result, SessionError};

/// Reference-counted file contents. Wraps the loaded `Vec` itself so the
/// bytes are never copied after the read.
#[derive(Debug, Clone)]
pub struct SharedBytes(Arc<Vec<u8>>);

impl SharedBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::new(bytes))
    }
}

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for SharedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// The whole contents of a source file, loaded once at open time.
/// The bytes are shared with the decoder engine, which reads from them
/// lazily while decoding.
#[derive(Debug)]
pub struct SourceBuffer {
    path: PathBuf,
    bytes: SharedBytes,
}

impl SourceBuffer {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let expected = std::fs::metadata(path)?.len();
        let file = File::open(path)?;
        let bytes = read_exact_len(file, expected)?;

        debug!(path = %path.display(), bytes = bytes.len(), "Loaded source");
        Ok(Self::from_bytes(path, bytes))
    }

    pub fn from_bytes<P: Into<PathBuf>>(path: P, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes: SharedBytes::new(bytes),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// A handle to the bytes for the engine to read from.
    pub fn shared(&self) -> SharedBytes {
        self.bytes.clone()
    }

    /// File extension, used as a probe hint.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|s| s.to_str())
    }

    /// Final path segment, used as a title of last resort.
    pub fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Reads exactly `expected` bytes from `reader` into a buffer reserved up
/// front. Fewer bytes than announced is `ReadInterrupted`.
fn read_exact_len<R: Read>(reader: R, expected: u64) -> Result<Vec<u8>> {
    let capacity =
        usize::try_from(expected).map_err(|_| SessionError::Allocation { bytes: expected })?;
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(capacity)
        .map_err(|_| SessionError::Allocation { bytes: expected })?;

    reader.take(expected).read_to_end(&mut bytes)?;
    if (bytes.len() as u64) < expected {
        return Err(SessionError::ReadInterrupted {
            expected,
            read: bytes.len() as u64,
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn loads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tune.mod");
        File::create(&path).unwrap().write_all(&[7u8; 300]).unwrap();

        let source = SourceBuffer::load(&path).unwrap();
        assert_eq!(source.len(), 300);
        assert_eq!(source.base_name(), "tune.mod");
        assert_eq!(source.extension(), Some("mod"));
        assert!(source.shared().iter().all(|&b| b == 7));
    }

    #[test]
    fn short_read_is_interrupted() {
        let err = read_exact_len(&[1u8, 2, 3][..], 10).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ReadInterrupted { expected: 10, read: 3 }
        ));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn oversized_reservation_is_resource_error() {
        let err = read_exact_len(std::io::empty(), u64::MAX).unwrap_err();
        assert!(matches!(err, SessionError::Allocation { bytes: u64::MAX }));
        assert_eq!(err.kind(), ErrorKind::Resource);
    }

    #[test]
    fn reads_only_the_announced_length() {
        let bytes = read_exact_len(&[9u8; 16][..], 12).unwrap();
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn missing_file_is_io() {
        let err = SourceBuffer::load("/definitely/not/here.mpc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
