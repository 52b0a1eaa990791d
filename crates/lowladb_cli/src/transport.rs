//! A sync transport that reads batches from local files.

use lowladb::{SyncError, SyncResult, SyncTransport};
use std::io::ErrorKind;
use std::path::Path;

/// Resolves locators as file paths. A `file://` prefix is accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTransport;

impl SyncTransport for FileTransport {
    fn fetch(&self, locator: &str) -> SyncResult<String> {
        let path = Path::new(locator.strip_prefix("file://").unwrap_or(locator));
        tracing::debug!(path = %path.display(), "reading batch file");
        std::fs::read_to_string(path).map_err(|e| {
            let message = format!("{}: {e}", path.display());
            match e.kind() {
                ErrorKind::Interrupted | ErrorKind::WouldBlock => {
                    SyncError::network_retryable(message)
                }
                _ => SyncError::network_fatal(message),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_plain_and_file_url_paths() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"sequence\":1}}").unwrap();
        let path = file.path().display().to_string();

        let transport = FileTransport;
        assert_eq!(transport.fetch(&path).unwrap(), "{\"sequence\":1}");
        assert_eq!(
            transport.fetch(&format!("file://{path}")).unwrap(),
            "{\"sequence\":1}"
        );
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let err = FileTransport
            .fetch(&missing.display().to_string())
            .unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("absent.json"));
    }
}
