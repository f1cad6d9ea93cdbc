//! Hierarchy operations that keep database rows and disk in step.
//!
//! Creation holds a transaction open across the filesystem mutation and
//! rolls back if the mirror fails, so a committed row always has its
//! directory or file. Deletion commits first and removes from disk after;
//! a disk failure there is logged and left for [`HierarchyService::audit`]
//! to report.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::{info, warn};

use super::folder::{Folder, FolderRepository, FolderSummary, NewFolder, ParentRef};
use super::metadata::{FileRecord, FileRepository, NewFile};
use super::path::{self, FolderTree};
use super::{validate_file_name, validate_folder_name, FileStorage};
use crate::auth::Capability;
use crate::notification::{self, NotificationKind, OrgEvent};
use crate::org::OrgService;
use crate::{Database, FmsError, Result};

/// An incoming file: its name, declared size and content stream.
pub struct Upload<R> {
    pub filename: String,
    pub size: u64,
    pub reader: R,
}

impl<R: AsyncRead + Unpin> Upload<R> {
    pub fn new(filename: impl Into<String>, size: u64, reader: R) -> Self {
        Self {
            filename: filename.into(),
            size,
            reader,
        }
    }
}

/// Contents of the organisation root or of one folder.
#[derive(Debug, Clone, Serialize)]
pub struct FolderListing {
    pub folders: Vec<FolderSummary>,
    pub files: Vec<FileRecord>,
}

/// A file ready to be read back.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub record: FileRecord,
    /// Location relative to the storage root.
    pub path: PathBuf,
}

/// Differences between database rows and the disk tree of an organisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub org_id: i64,
    /// Paths rows point at that do not exist on disk.
    pub missing_on_disk: Vec<PathBuf>,
    /// Disk entries no row accounts for.
    pub untracked_on_disk: Vec<PathBuf>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_on_disk.is_empty() && self.untracked_on_disk.is_empty()
    }
}

/// Folder and file operations for one organisation at a time.
pub struct HierarchyService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
}

impl<'a> HierarchyService<'a> {
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self { db, storage }
    }

    fn orgs(&self) -> OrgService<'_> {
        OrgService::new(self.db, self.storage)
    }

    fn folders(&self) -> FolderRepository<'_> {
        FolderRepository::new(self.db.pool())
    }

    fn files(&self) -> FileRepository<'_> {
        FileRepository::new(self.db.pool())
    }

    /// Find the folder a [`ParentRef`] points at, scoped to `org_id`.
    pub async fn resolve_parent(&self, org_id: i64, parent: &ParentRef) -> Result<Option<Folder>> {
        match parent {
            ParentRef::Root => Ok(None),
            ParentRef::Id(id) => self
                .folders()
                .get_by_id(*id)
                .await?
                .filter(|f| f.org_id == org_id)
                .map(Some)
                .ok_or_else(|| FmsError::NotFound(format!("folder {id}"))),
            ParentRef::Name(name) => {
                let mut matches = self.folders().find_by_name(org_id, name).await?;
                match matches.len() {
                    0 => Err(FmsError::NotFound(format!("folder '{name}'"))),
                    1 => Ok(matches.pop()),
                    _ => Err(FmsError::Conflict(format!(
                        "folder name '{name}' is ambiguous, address it by id"
                    ))),
                }
            }
        }
    }

    /// Create a folder at the root or under `parent`.
    pub async fn create_folder(
        &self,
        actor_id: &str,
        org_id: i64,
        name: &str,
        parent: &ParentRef,
    ) -> Result<Folder> {
        self.orgs()
            .require_access(actor_id, org_id, Capability::Upload)
            .await?;
        let name = validate_folder_name(name)?;
        let parent_id = self.resolve_parent(org_id, parent).await?.map(|f| f.id);

        if self.folders().name_exists(org_id, parent_id, name).await? {
            return Err(FmsError::AlreadyExists(format!("folder '{name}'")));
        }

        let mut new_folder = NewFolder::new(org_id, actor_id, name);
        if let Some(parent_id) = parent_id {
            new_folder = new_folder.with_parent(parent_id);
        }

        let mut tx = self.db.begin().await?;
        let folder_id = FolderRepository::insert(&mut tx, &new_folder).await?;
        let relative = path::resolve_folder_path(&mut tx, folder_id).await?;

        if let Err(e) = self.storage.create_dir(&relative).await {
            warn!(org_id, folder_id, path = %relative.display(), error = %e,
                "failed to create folder directory, rolling back");
            tx.rollback().await?;
            return Err(e);
        }
        if let Err(e) = tx.commit().await {
            self.discard_dir(&relative).await;
            return Err(e.into());
        }

        info!(org_id, folder_id, name, "folder created");
        notification::notify(
            self.db.pool(),
            OrgEvent::new(org_id, actor_id, NotificationKind::FolderCreate, folder_id, name),
        )
        .await;

        self.folders()
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| FmsError::NotFound(format!("folder {folder_id}")))
    }

    /// Store an uploaded file at the root or under `parent`.
    ///
    /// The recorded size is the number of bytes actually written.
    pub async fn upload_file<R>(
        &self,
        actor_id: &str,
        org_id: i64,
        parent: &ParentRef,
        mut upload: Upload<R>,
    ) -> Result<FileRecord>
    where
        R: AsyncRead + Unpin,
    {
        self.orgs()
            .require_access(actor_id, org_id, Capability::Upload)
            .await?;
        let name = validate_file_name(&upload.filename)?.to_string();
        let folder_id = self.resolve_parent(org_id, parent).await?.map(|f| f.id);

        if self.files().name_exists(org_id, folder_id, &name).await? {
            return Err(FmsError::AlreadyExists(format!("file '{name}'")));
        }

        let declared = i64::try_from(upload.size)
            .map_err(|_| FmsError::Validation("file size out of range".into()))?;
        let mut new_file = NewFile::new(org_id, actor_id, name.as_str(), declared);
        if let Some(folder_id) = folder_id {
            new_file = new_file.with_folder(folder_id);
        }

        let mut tx = self.db.begin().await?;
        let file_id = FileRepository::insert(&mut tx, &new_file).await?;
        let relative = path::resolve_file_path(&mut tx, file_id).await?;

        let written = match self.storage.write_file(&relative, &mut upload.reader).await {
            Ok(written) => written,
            Err(e) => {
                warn!(org_id, file_id, path = %relative.display(), error = %e,
                    "failed to write upload, rolling back");
                tx.rollback().await?;
                return Err(e);
            }
        };

        if written != upload.size {
            let written = i64::try_from(written)
                .map_err(|_| FmsError::Validation("file size out of range".into()))?;
            if let Err(e) = FileRepository::set_size(&mut tx, file_id, written).await {
                tx.rollback().await?;
                self.discard_file(&relative).await;
                return Err(e);
            }
        }

        if let Err(e) = tx.commit().await {
            self.discard_file(&relative).await;
            return Err(e.into());
        }

        info!(org_id, file_id, name = %name, bytes = written, "file uploaded");
        notification::notify(
            self.db.pool(),
            OrgEvent::new(org_id, actor_id, NotificationKind::FileUpload, file_id, name.as_str()),
        )
        .await;

        self.files()
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| FmsError::NotFound(format!("file {file_id}")))
    }

    /// Delete a file row, then its bytes on disk. A disk failure is logged
    /// and does not undo the delete.
    pub async fn delete_file(&self, actor_id: &str, org_id: i64, file_id: i64) -> Result<()> {
        self.orgs()
            .require_access(actor_id, org_id, Capability::Delete)
            .await?;
        let record = self
            .files()
            .get_by_id(file_id)
            .await?
            .filter(|f| f.org_id == org_id)
            .ok_or_else(|| FmsError::NotFound(format!("file {file_id}")))?;

        // Captured before the row goes; the delete itself is one statement.
        let relative = self.file_path(file_id).await?;
        let mut conn = self.db.pool().acquire().await?;
        if !FileRepository::delete(&mut conn, org_id, file_id).await? {
            return Err(FmsError::NotFound(format!("file {file_id}")));
        }
        drop(conn);

        match self.storage.remove_file(&relative).await {
            Ok(true) => {}
            Ok(false) => warn!(org_id, file_id, path = %relative.display(), "file already missing on disk"),
            Err(e) => warn!(org_id, file_id, path = %relative.display(), error = %e,
                "failed to remove file from disk"),
        }

        info!(org_id, file_id, "file deleted");
        notification::notify(
            self.db.pool(),
            OrgEvent::new(org_id, actor_id, NotificationKind::FileDelete, file_id, record.name),
        )
        .await;
        Ok(())
    }

    /// Delete a folder with everything below it. Rows go by cascade, the
    /// directory tree is removed afterwards; a disk failure is logged.
    pub async fn delete_folder(&self, actor_id: &str, org_id: i64, folder_id: i64) -> Result<()> {
        self.orgs()
            .require_access(actor_id, org_id, Capability::Delete)
            .await?;
        let folder = self
            .folders()
            .get_by_id(folder_id)
            .await?
            .filter(|f| f.org_id == org_id)
            .ok_or_else(|| FmsError::NotFound(format!("folder {folder_id}")))?;

        let relative = self.folder_path(folder_id).await?;
        let mut conn = self.db.pool().acquire().await?;
        if !FolderRepository::delete(&mut conn, org_id, folder_id).await? {
            return Err(FmsError::NotFound(format!("folder {folder_id}")));
        }
        drop(conn);

        match self.storage.remove_dir(&relative).await {
            Ok(true) => {}
            Ok(false) => warn!(org_id, folder_id, path = %relative.display(), "folder already missing on disk"),
            Err(e) => warn!(org_id, folder_id, path = %relative.display(), error = %e,
                "failed to remove folder from disk"),
        }

        info!(org_id, folder_id, "folder deleted");
        notification::notify(
            self.db.pool(),
            OrgEvent::new(org_id, actor_id, NotificationKind::FolderDelete, folder_id, folder.name),
        )
        .await;
        Ok(())
    }

    /// List the folders and files directly under the root or a folder.
    pub async fn list(&self, actor_id: &str, org_id: i64, parent: &ParentRef) -> Result<FolderListing> {
        self.orgs()
            .require_access(actor_id, org_id, Capability::View)
            .await?;

        let listing = match self.resolve_parent(org_id, parent).await? {
            None => FolderListing {
                folders: self.folders().list_root(org_id).await?,
                files: self.files().list_root(org_id).await?,
            },
            Some(folder) => FolderListing {
                folders: self.folders().list_children(folder.id).await?,
                files: self.files().list_in_folder(folder.id).await?,
            },
        };
        Ok(listing)
    }

    /// Locate a file for download. `NotFound` if the row or its bytes are gone.
    pub async fn open_file(&self, actor_id: &str, org_id: i64, file_id: i64) -> Result<StoredFile> {
        self.orgs()
            .require_access(actor_id, org_id, Capability::View)
            .await?;
        let record = self
            .files()
            .get_by_id(file_id)
            .await?
            .filter(|f| f.org_id == org_id)
            .ok_or_else(|| FmsError::NotFound(format!("file {file_id}")))?;

        let path = self.file_path(file_id).await?;
        if !self.storage.exists(&path).await? {
            warn!(org_id, file_id, path = %path.display(), "file row has no content on disk");
            return Err(FmsError::NotFound(format!("contents of file {file_id}")));
        }
        Ok(StoredFile { record, path })
    }

    /// Directory of a folder, relative to the storage root.
    pub async fn folder_path(&self, folder_id: i64) -> Result<PathBuf> {
        let mut conn = self.db.pool().acquire().await?;
        path::resolve_folder_path(&mut conn, folder_id).await
    }

    /// Location of a file, relative to the storage root.
    pub async fn file_path(&self, file_id: i64) -> Result<PathBuf> {
        let mut conn = self.db.pool().acquire().await?;
        path::resolve_file_path(&mut conn, file_id).await
    }

    /// Remove a directory whose row never committed.
    async fn discard_dir(&self, relative: &Path) {
        if let Err(e) = self.storage.remove_dir(relative).await {
            warn!(path = %relative.display(), error = %e, "failed to remove orphaned directory");
        }
    }

    /// Remove an upload whose row never committed.
    async fn discard_file(&self, relative: &Path) {
        if let Err(e) = self.storage.remove_file(relative).await {
            warn!(path = %relative.display(), error = %e, "failed to remove orphaned upload");
        }
    }

    /// Compare an organisation's rows with its disk tree.
    pub async fn audit(&self, actor_id: &str, org_id: i64) -> Result<AuditReport> {
        self.orgs()
            .require_access(actor_id, org_id, Capability::ManageMembers)
            .await?;
        self.audit_unchecked(org_id).await
    }

    async fn audit_unchecked(&self, org_id: i64) -> Result<AuditReport> {
        let folder_rows = self.folders().list_tree(org_id).await?;
        let file_rows = self.files().list_locations(org_id).await?;
        let tree = FolderTree::new(org_id, folder_rows.iter().copied());

        let mut expected = BTreeSet::new();
        for (folder_id, _) in &folder_rows {
            expected.insert(tree.folder_path(*folder_id)?);
        }
        for (file_id, folder_id) in &file_rows {
            expected.insert(tree.file_path(*file_id, *folder_id)?);
        }

        let actual: BTreeSet<PathBuf> = self.storage.scan_org(org_id).await?.into_iter().collect();

        Ok(AuditReport {
            org_id,
            missing_on_disk: expected.difference(&actual).cloned().collect(),
            untracked_on_disk: actual.difference(&expected).cloned().collect(),
        })
    }

    /// Remove disk entries no row accounts for. Returns how many top-level
    /// entries were removed.
    pub async fn prune_untracked(&self, actor_id: &str, org_id: i64) -> Result<usize> {
        let report = self.audit(actor_id, org_id).await?;

        let mut removed = 0;
        // Sorted parents-first; children of a removed directory report false.
        for path in &report.untracked_on_disk {
            if self.storage.remove_path(path).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(org_id, removed, "pruned untracked storage entries");
        }
        Ok(removed)
    }
}
