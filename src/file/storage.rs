//! Filesystem mirror of the folder/file hierarchy.
//!
//! All paths taken by [`FileStorage`] are relative to its base directory and
//! come from [`super::path`]. The storage layer knows nothing about the
//! database; callers decide when a mirror failure rolls back.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::warn;

use super::path::org_dir;
use crate::Result;

/// Disk-backed storage rooted at a base directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `base_path`, creating the directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Absolute location of a relative storage path.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.base_path.join(relative)
    }

    /// Create the root directory of an organisation.
    pub async fn create_org_dir(&self, org_id: i64) -> Result<()> {
        self.create_dir(&org_dir(org_id)).await
    }

    /// Remove an organisation's whole tree. Returns false if it was absent.
    pub async fn remove_org_dir(&self, org_id: i64) -> Result<bool> {
        self.remove_dir(&org_dir(org_id)).await
    }

    /// Create a directory and any missing parents.
    pub async fn create_dir(&self, relative: &Path) -> Result<()> {
        fs::create_dir_all(self.absolute(relative)).await?;
        Ok(())
    }

    /// Copy a byte stream into a new file, returning the number of bytes
    /// written. A partially written file is removed on failure.
    pub async fn write_file<R>(&self, relative: &Path, reader: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let target = self.absolute(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await?;

        let copied = match tokio::io::copy(reader, &mut file).await {
            Ok(n) => file.flush().await.map(|_| n),
            Err(e) => Err(e),
        };

        match copied {
            Ok(n) => Ok(n),
            Err(e) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&target).await {
                    warn!(path = %target.display(), error = %cleanup, "failed to remove partial upload");
                }
                Err(e.into())
            }
        }
    }

    /// Remove a directory tree. Returns false if it did not exist.
    pub async fn remove_dir(&self, relative: &Path) -> Result<bool> {
        match fs::remove_dir_all(self.absolute(relative)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a file. Returns false if it did not exist.
    pub async fn remove_file(&self, relative: &Path) -> Result<bool> {
        match fs::remove_file(self.absolute(relative)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove whatever sits at `relative`, file or directory tree.
    pub async fn remove_path(&self, relative: &Path) -> Result<bool> {
        match fs::symlink_metadata(self.absolute(relative)).await {
            Ok(meta) if meta.is_dir() => self.remove_dir(relative).await,
            Ok(_) => self.remove_file(relative).await,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether anything sits at `relative`. Errors other than absence
    /// (permissions, a file where a directory should be) are reported.
    pub async fn exists(&self, relative: &Path) -> Result<bool> {
        Ok(fs::try_exists(self.absolute(relative)).await?)
    }

    /// Read a whole file.
    pub async fn read(&self, relative: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(self.absolute(relative)).await?)
    }

    /// List every entry under an organisation's directory, relative to the
    /// storage root, parents before children. Missing directory yields none.
    pub async fn scan_org(&self, org_id: i64) -> Result<Vec<PathBuf>> {
        let root = org_dir(org_id);
        let mut entries = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut read_dir = match fs::read_dir(self.absolute(&dir)).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = read_dir.next_entry().await? {
                let relative = dir.join(entry.file_name());
                if entry.file_type().await?.is_dir() {
                    pending.push(relative.clone());
                }
                entries.push(relative);
            }
        }

        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FmsError;
    use tempfile::TempDir;

    fn setup_storage() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("appdata");
        let storage = FileStorage::new(&base).unwrap();
        assert!(base.is_dir());
        assert_eq!(storage.base_path(), base.as_path());
    }

    #[tokio::test]
    async fn test_org_dir_lifecycle() {
        let (storage, dir) = setup_storage();

        storage.create_org_dir(4).await.unwrap();
        assert!(dir.path().join("org-4").is_dir());

        storage
            .create_dir(Path::new("org-4/folder-1/folder-2"))
            .await
            .unwrap();
        assert!(storage.remove_org_dir(4).await.unwrap());
        assert!(!dir.path().join("org-4").exists());
        assert!(!storage.remove_org_dir(4).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_and_read_file() {
        let (storage, _dir) = setup_storage();
        let path = Path::new("org-1/folder-2/file-3");

        let mut content: &[u8] = b"%PDF-1.7 report";
        let written = storage.write_file(path, &mut content).await.unwrap();
        assert_eq!(written, 15);
        assert!(storage.exists(path).await.unwrap());
        assert_eq!(storage.read(path).await.unwrap(), b"%PDF-1.7 report");
    }

    #[tokio::test]
    async fn test_exists_reports_io_errors() {
        let (storage, _dir) = setup_storage();
        let mut content: &[u8] = b"x";
        storage
            .write_file(Path::new("org-1/file-1"), &mut content)
            .await
            .unwrap();

        assert!(!storage.exists(Path::new("org-1/file-2")).await.unwrap());
        // A regular file in the middle of the path is not "absent".
        assert!(matches!(
            storage.exists(Path::new("org-1/file-1/file-3")).await,
            Err(FmsError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_write_refuses_to_overwrite() {
        let (storage, _dir) = setup_storage();
        let path = Path::new("org-1/file-1");

        let mut first: &[u8] = b"one";
        storage.write_file(path, &mut first).await.unwrap();

        let mut second: &[u8] = b"two";
        assert!(storage.write_file(path, &mut second).await.is_err());
        assert_eq!(storage.read(path).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_remove_file_missing() {
        let (storage, _dir) = setup_storage();
        assert!(!storage.remove_file(Path::new("org-1/file-9")).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_path_dispatches() {
        let (storage, _dir) = setup_storage();
        let mut content: &[u8] = b"x";
        storage
            .write_file(Path::new("org-1/folder-1/file-1"), &mut content)
            .await
            .unwrap();

        assert!(storage
            .remove_path(Path::new("org-1/folder-1/file-1"))
            .await
            .unwrap());
        assert!(storage.remove_path(Path::new("org-1/folder-1")).await.unwrap());
        assert!(!storage.remove_path(Path::new("org-1/folder-1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_org() {
        let (storage, _dir) = setup_storage();
        let mut content: &[u8] = b"x";
        storage
            .write_file(Path::new("org-2/folder-1/file-5"), &mut content)
            .await
            .unwrap();
        storage.create_dir(Path::new("org-2/folder-3")).await.unwrap();

        let entries = storage.scan_org(2).await.unwrap();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("org-2/folder-1"),
                PathBuf::from("org-2/folder-1/file-5"),
                PathBuf::from("org-2/folder-3"),
            ]
        );
        assert!(storage.scan_org(99).await.unwrap().is_empty());
    }
}
