//! Path-traversal-safe, read-only access to a directory of blob files.

use std::path::{Path, PathBuf};

use sfrodb_proto::Uid;
use tokio::sync::Mutex;

use crate::CoreError;

/// Configuration for a [`FileStore`].
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Base directory every key is resolved under.
    pub folder: PathBuf,
    /// Extension appended to every key. A leading `.` is added if absent.
    pub extension: String,
}

impl DataConfig {
    /// Normalize `extension` so it always starts with `.`.
    #[must_use]
    pub fn new(folder: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let extension = if extension.starts_with('.') { extension } else { format!(".{extension}") };
        Self { folder: folder.into(), extension }
    }
}

/// A base directory containing one file per key, read-only after
/// construction.
///
/// Reads take a single mutex for the duration of the open+read pair, not
/// for the whole store: concurrent reads of different keys do not
/// serialize beyond that brief window.
pub struct FileStore {
    config: DataConfig,
    canonical_base: PathBuf,
    access: Mutex<()>,
}

impl FileStore {
    /// Bind a [`FileStore`] to `config`.
    ///
    /// # Errors
    ///
    /// [`CoreError::Transport`] if `config.folder` does not exist or
    /// cannot be canonicalized.
    pub async fn new(config: DataConfig) -> Result<Self, CoreError> {
        let canonical_base = tokio::fs::canonicalize(&config.folder).await?;
        Ok(Self { config, canonical_base, access: Mutex::new(()) })
    }

    /// Resolve `uid` to a path under the base directory.
    ///
    /// Returns [`CoreError::InvalidPath`] if the joined path, once
    /// canonicalized against its parent, would not stay under the base
    /// directory. [`Uid::parse`] already forbids `.` (and so `..`), which
    /// makes this unreachable in practice; the check stays as defense in
    /// depth against a future relaxation of the key grammar.
    fn resolve(&self, uid: &Uid) -> Result<PathBuf, CoreError> {
        let file_name = format!("{uid}{}", self.config.extension);
        let path = self.config.folder.join(file_name);

        let parent = path.parent().unwrap_or(&self.config.folder);
        let canonical_parent = parent.canonicalize().unwrap_or_else(|_| self.canonical_base.clone());
        if !canonical_parent.starts_with(&self.canonical_base) {
            return Err(CoreError::InvalidPath);
        }

        Ok(path)
    }

    /// Whether `uid` has a backing file on disk.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidPath`] if the resolved path escapes the base
    /// directory. I/O errors other than not-found propagate as
    /// [`CoreError::Transport`].
    pub async fn exists(&self, uid: &Uid) -> Result<bool, CoreError> {
        let path = self.resolve(uid)?;
        let _guard = self.access.lock().await;
        Ok(path_exists(&path).await?)
    }

    /// Read the full contents of `uid`'s file.
    ///
    /// Returns `(false, Vec::new())` if the file does not exist, never a
    /// partial read.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidPath`] if the resolved path escapes the base
    /// directory. Other I/O failures propagate as [`CoreError::Transport`].
    pub async fn read(&self, uid: &Uid) -> Result<(bool, Vec<u8>), CoreError> {
        let path = self.resolve(uid)?;
        let _guard = self.access.lock().await;

        if !path_exists(&path).await? {
            return Ok((false, Vec::new()));
        }

        let data = tokio::fs::read(&path).await?;
        Ok((true, data))
    }
}

async fn path_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    async fn store_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, FileStore) {
        let dir = tempdir().unwrap();
        for (name, contents) in files {
            tokio::fs::write(dir.path().join(name), contents).await.unwrap();
        }
        let store = FileStore::new(DataConfig::new(dir.path(), ".dat")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn reads_existing_file() {
        let (_dir, store) = store_with(&[("alpha.dat", b"hello")]).await;
        let uid = Uid::parse("alpha").unwrap();
        let (exists, data) = store.read(&uid).await.unwrap();
        assert!(exists);
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn missing_file_is_not_an_error() {
        let (_dir, store) = store_with(&[]).await;
        let uid = Uid::parse("ghost").unwrap();
        let (exists, data) = store.read(&uid).await.unwrap();
        assert!(!exists);
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn exists_does_not_read_contents() {
        let (_dir, store) = store_with(&[("beta.dat", b"world")]).await;
        let uid = Uid::parse("beta").unwrap();
        assert!(store.exists(&uid).await.unwrap());

        let uid = Uid::parse("missing").unwrap();
        assert!(!store.exists(&uid).await.unwrap());
    }

    #[tokio::test]
    async fn extension_gains_leading_dot() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("gamma.dat"), b"x").await.unwrap();
        let store = FileStore::new(DataConfig::new(dir.path(), "dat")).await.unwrap();
        let uid = Uid::parse("gamma").unwrap();
        assert!(store.exists(&uid).await.unwrap());
    }
}
