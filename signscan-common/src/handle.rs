//! Local object references for binary responses
//!
//! A processed video arrives as raw bytes. `MediaHandle` materializes those
//! bytes into a uuid-named file under the OS temp directory so they can be
//! played or copied out without durable storage, and removes the file when
//! the handle is dropped. Holders share the handle via `Arc`; the file
//! lives exactly as long as the last owner.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Revocable handle over binary data received from the detection service
#[derive(Debug)]
pub struct MediaHandle {
    path: PathBuf,
    byte_size: u64,
}

impl MediaHandle {
    /// Write `bytes` to a fresh temp file and return a handle owning it
    pub async fn create(bytes: &[u8], extension: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("signscan_{}.{}", Uuid::new_v4(), extension));

        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(
            path = %path.display(),
            byte_size = bytes.len(),
            "Materialized media handle"
        );

        Ok(Self {
            path,
            byte_size: bytes.len() as u64,
        })
    }

    /// Path of the backing temp file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the backing payload in bytes
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Copy the payload to `dest` (the "download" operation)
    pub async fn save_to(&self, dest: &Path) -> std::io::Result<u64> {
        tokio::fs::copy(&self.path, dest).await
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        // Release the temp file; a failure here only leaks one temp file
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove media handle file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_writes_payload_and_drop_removes_it() {
        let handle = MediaHandle::create(b"fake mp4 payload", "mp4").await.unwrap();
        let path = handle.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(handle.byte_size(), 16);
        assert_eq!(std::fs::read(&path).unwrap(), b"fake mp4 payload");

        drop(handle);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn save_to_copies_payload_out() {
        let handle = MediaHandle::create(b"processed", "mp4").await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("detected_video.mp4");

        handle.save_to(&dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"processed");
    }

    #[tokio::test]
    async fn shared_handle_survives_until_last_owner_drops() {
        let handle = std::sync::Arc::new(MediaHandle::create(b"x", "mp4").await.unwrap());
        let path = handle.path().to_path_buf();
        let clone = handle.clone();

        drop(handle);
        assert!(path.exists(), "file must survive while a clone is held");

        drop(clone);
        assert!(!path.exists());
    }
}
