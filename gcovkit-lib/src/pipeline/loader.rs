//! Loading artifact files into memory.

use crate::Host;
use bytes::Bytes;
use core::fmt::{Display, Formatter};
use core::ops::Deref;
use std::fs;
use std::io::{self, ErrorKind, Read};

const LOG_TARGET: &str = "    loader";

/// File name standing in for standard input, and the placeholder for "no data file".
pub const STDIN_TOKEN: &str = "-";

/// Immutable contents of a loaded artifact file.
#[derive(Debug, Clone)]
pub struct ArtifactBuffer {
    bytes: Bytes,
}

impl ArtifactBuffer {
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into() }
    }
}

impl Deref for ArtifactBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Failure to load an artifact, carrying the underlying system error.
#[derive(Debug)]
pub struct LoadError {
    source: io::Error,
}

impl LoadError {
    /// Whether the artifact simply doesn't exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == ErrorKind::NotFound
    }

    /// The system's description of the error, without Rust's `(os error N)` suffix.
    #[must_use]
    pub fn system_message(&self) -> String {
        let message = self.source.to_string();
        match self.source.raw_os_error() {
            Some(code) => message
                .strip_suffix(&format!(" (os error {code})"))
                .map_or_else(|| message.clone(), str::to_string),
            None => message,
        }
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.system_message())
    }
}

impl core::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<io::Error> for LoadError {
    fn from(source: io::Error) -> Self {
        Self { source }
    }
}

/// Load a named artifact, or all of the host's input when the name is [`STDIN_TOKEN`].
///
/// The file is read in full without expecting any terminator, so a file that is being
/// appended to or truncated concurrently yields whatever bytes were present at read time.
pub fn load_artifact<H: Host>(host: &mut H, file_name: &str) -> Result<ArtifactBuffer, LoadError> {
    let bytes = if file_name == STDIN_TOKEN {
        let mut bytes = Vec::new();
        let _ = host.input().read_to_end(&mut bytes)?;
        bytes
    } else {
        fs::read(file_name)?
    };

    log::debug!(target: LOG_TARGET, "Loaded {} bytes from '{file_name}'", bytes.len());
    Ok(ArtifactBuffer::new(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::TestHost;

    #[test]
    fn test_load_existing_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("a.gcno");
        fs::write(&path, b"oncg*704").expect("Failed to write artifact");

        let mut host = TestHost::new();
        let buffer = load_artifact(&mut host, path.to_str().expect("UTF-8 path")).expect("load should succeed");
        assert_eq!(&*buffer, b"oncg*704");
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("empty.gcda");
        fs::write(&path, b"").expect("Failed to write artifact");

        let mut host = TestHost::new();
        let buffer = load_artifact(&mut host, path.to_str().expect("UTF-8 path")).expect("load should succeed");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("missing.gcda");

        let mut host = TestHost::new();
        let err = load_artifact(&mut host, path.to_str().expect("UTF-8 path")).expect_err("load should fail");
        assert!(err.is_not_found());
        assert!(!err.system_message().contains("os error"), "unexpected message: {err}");
    }

    #[test]
    fn test_directory_is_not_a_missing_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut host = TestHost::new();
        let err = load_artifact(&mut host, dir.path().to_str().expect("UTF-8 path")).expect_err("load should fail");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_stdin_token_reads_host_input() {
        let mut host = TestHost::with_input(b"adcg".to_vec());
        let buffer = load_artifact(&mut host, STDIN_TOKEN).expect("load should succeed");
        assert_eq!(&*buffer, b"adcg");
    }

    #[test]
    fn test_message_without_os_code_is_unchanged() {
        let err = LoadError::from(io::Error::other("custom failure"));
        assert_eq!(err.system_message(), "custom failure");
    }
}
