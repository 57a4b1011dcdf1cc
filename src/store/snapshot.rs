//! Backing file for the key store.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use crate::store::{KeyStore, StoreError};

/// The JSON file holding the last persisted snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot into `store`, or create the file from the (empty)
    /// store when it does not exist yet.
    pub fn open_or_create(&self, store: &KeyStore) -> Result<(), StoreError> {
        if self.path.exists() {
            let file = File::open(&self.path)?;
            store.load_from(BufReader::new(file))?;
            tracing::info!(
                path = %self.path.display(),
                keys = store.len(),
                "Loaded keys from snapshot"
            );
        } else {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            self.write(&store.encode()?)?;
            tracing::info!(path = %self.path.display(), "Created empty snapshot file");
        }
        Ok(())
    }

    /// Atomically replace the file contents with `bytes`.
    ///
    /// The data goes to a sibling temp file which is synced and renamed over
    /// the snapshot, so a crash leaves either the old or the new snapshot.
    pub fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let tmp = self.temp_path();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_created_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds").join("keys.json");
        let snapshot = SnapshotFile::new(&path);

        let store = KeyStore::new();
        snapshot.open_or_create(&store).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "{}");
        assert!(store.is_empty());
    }

    #[test]
    fn test_existing_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        fs::write(&path, r#"{"api":"secret"}"#).unwrap();

        let store = KeyStore::new();
        SnapshotFile::new(&path).open_or_create(&store).unwrap();
        assert_eq!(store.get("api").as_deref(), Some("secret"));
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        fs::write(&path, "not json").unwrap();

        let store = KeyStore::new();
        let err = SnapshotFile::new(&path).open_or_create(&store).unwrap_err();
        assert!(matches!(err, StoreError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_write_replaces_longer_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let snapshot = SnapshotFile::new(&path);

        snapshot.write(br#"{"a-long-key":"a-long-value"}"#).unwrap();
        snapshot.write(b"{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(!snapshot.temp_path().exists());
    }
}
