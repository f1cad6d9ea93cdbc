//! Path resolution for the on-disk organisation tree.
//!
//! Layout, relative to the storage root:
//!
//! ```text
//! org-{org_id}/
//! ├── file-{id}                    root-level file
//! └── folder-{id}/
//!     ├── file-{id}
//!     └── folder-{id}/...
//! ```
//!
//! Paths are derived from the `parent_folder_id` chain on every call; nothing
//! is cached. The walk is iterative and bounded by [`MAX_FOLDER_DEPTH`] so a
//! corrupted chain cannot loop forever.

use std::collections::HashMap;
use std::path::PathBuf;

use sqlx::SqliteConnection;

use crate::{FmsError, Result};

/// Maximum number of folder levels walked while resolving a path.
pub const MAX_FOLDER_DEPTH: usize = 64;

/// Directory of an organisation, relative to the storage root.
pub fn org_dir(org_id: i64) -> PathBuf {
    PathBuf::from(format!("org-{org_id}"))
}

fn folder_segment(folder_id: i64) -> String {
    format!("folder-{folder_id}")
}

fn file_segment(file_id: i64) -> String {
    format!("file-{file_id}")
}

fn depth_exceeded(folder_id: i64) -> FmsError {
    FmsError::Internal(format!(
        "folder {folder_id} exceeds maximum depth of {MAX_FOLDER_DEPTH}"
    ))
}

/// Build `org-{org}/folder-{root}/.../folder-{leaf}` from a leaf-first chain.
fn build_folder_path(org_id: i64, leaf_to_root: &[i64]) -> PathBuf {
    let mut path = org_dir(org_id);
    for id in leaf_to_root.iter().rev() {
        path.push(folder_segment(*id));
    }
    path
}

/// Resolve a folder's directory, relative to the storage root.
///
/// Works on any connection, including an open transaction, so a row inserted
/// in the current transaction resolves before commit.
pub async fn resolve_folder_path(conn: &mut SqliteConnection, folder_id: i64) -> Result<PathBuf> {
    let mut chain = Vec::new();
    let mut current = folder_id;

    let org_id = loop {
        if chain.len() >= MAX_FOLDER_DEPTH {
            return Err(depth_exceeded(folder_id));
        }

        let row: Option<(i64, Option<i64>)> =
            sqlx::query_as("SELECT org_id, parent_folder_id FROM folders WHERE id = ?")
                .bind(current)
                .fetch_optional(&mut *conn)
                .await?;
        let (org_id, parent) = row.ok_or_else(|| FmsError::NotFound(format!("folder {current}")))?;

        chain.push(current);
        match parent {
            Some(parent_id) => current = parent_id,
            None => break org_id,
        }
    };

    Ok(build_folder_path(org_id, &chain))
}

/// Resolve a file's path, relative to the storage root.
pub async fn resolve_file_path(conn: &mut SqliteConnection, file_id: i64) -> Result<PathBuf> {
    let row: Option<(i64, Option<i64>)> =
        sqlx::query_as("SELECT org_id, folder_id FROM files WHERE id = ?")
            .bind(file_id)
            .fetch_optional(&mut *conn)
            .await?;
    let (org_id, folder_id) = row.ok_or_else(|| FmsError::NotFound(format!("file {file_id}")))?;

    let mut path = match folder_id {
        Some(folder_id) => resolve_folder_path(conn, folder_id).await?,
        None => org_dir(org_id),
    };
    path.push(file_segment(file_id));
    Ok(path)
}

/// Resolves paths for a whole organisation from one snapshot of its folders.
///
/// Used by the audit sweep, which needs every path at once.
pub(crate) struct FolderTree {
    org_id: i64,
    parents: HashMap<i64, Option<i64>>,
}

impl FolderTree {
    pub(crate) fn new(org_id: i64, folders: impl IntoIterator<Item = (i64, Option<i64>)>) -> Self {
        Self {
            org_id,
            parents: folders.into_iter().collect(),
        }
    }

    pub(crate) fn folder_path(&self, folder_id: i64) -> Result<PathBuf> {
        let mut chain = Vec::new();
        let mut current = Some(folder_id);

        while let Some(id) = current {
            if chain.len() >= MAX_FOLDER_DEPTH {
                return Err(depth_exceeded(folder_id));
            }
            let parent = self
                .parents
                .get(&id)
                .ok_or_else(|| FmsError::NotFound(format!("folder {id}")))?;
            chain.push(id);
            current = *parent;
        }

        Ok(build_folder_path(self.org_id, &chain))
    }

    pub(crate) fn file_path(&self, file_id: i64, folder_id: Option<i64>) -> Result<PathBuf> {
        let mut path = match folder_id {
            Some(folder_id) => self.folder_path(folder_id)?,
            None => org_dir(self.org_id),
        };
        path.push(file_segment(file_id));
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO users (id, username, password) VALUES ('u1', 'alice', 'x')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO organisations (id, name, creator_id) VALUES (3, 'Acme', 'u1')")
            .execute(db.pool())
            .await
            .unwrap();
        db
    }

    async fn insert_folder(db: &Database, name: &str, parent: Option<i64>) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO folders (org_id, uploader_id, name, parent_folder_id)
             VALUES (3, 'u1', ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(parent)
        .fetch_one(db.pool())
        .await
        .unwrap()
    }

    async fn insert_file(db: &Database, name: &str, folder: Option<i64>) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO files (org_id, uploader_id, folder_id, name, file_type, size)
             VALUES (3, 'u1', ?, ?, '.pdf', 1) RETURNING id",
        )
        .bind(folder)
        .bind(name)
        .fetch_one(db.pool())
        .await
        .unwrap()
    }

    #[test]
    fn test_org_dir() {
        assert_eq!(org_dir(7), PathBuf::from("org-7"));
    }

    #[tokio::test]
    async fn test_root_folder_path() {
        let db = setup_db().await;
        let docs = insert_folder(&db, "Docs", None).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let path = resolve_folder_path(&mut conn, docs).await.unwrap();
        assert_eq!(path, PathBuf::from(format!("org-3/folder-{docs}")));
    }

    #[tokio::test]
    async fn test_nested_folder_path() {
        let db = setup_db().await;
        let a = insert_folder(&db, "A", None).await;
        let b = insert_folder(&db, "B", Some(a)).await;
        let c = insert_folder(&db, "C", Some(b)).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let path = resolve_folder_path(&mut conn, c).await.unwrap();
        assert_eq!(
            path,
            PathBuf::from(format!("org-3/folder-{a}/folder-{b}/folder-{c}"))
        );
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let db = setup_db().await;
        let a = insert_folder(&db, "A", None).await;
        let b = insert_folder(&db, "B", Some(a)).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let first = resolve_folder_path(&mut conn, b).await.unwrap();
        let second = resolve_folder_path(&mut conn, b).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_file_paths() {
        let db = setup_db().await;
        let docs = insert_folder(&db, "Docs", None).await;
        let in_root = insert_file(&db, "a.pdf", None).await;
        let in_docs = insert_file(&db, "b.pdf", Some(docs)).await;

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            resolve_file_path(&mut conn, in_root).await.unwrap(),
            PathBuf::from(format!("org-3/file-{in_root}"))
        );
        assert_eq!(
            resolve_file_path(&mut conn, in_docs).await.unwrap(),
            PathBuf::from(format!("org-3/folder-{docs}/file-{in_docs}"))
        );
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let db = setup_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(matches!(
            resolve_folder_path(&mut conn, 999).await,
            Err(FmsError::NotFound(_))
        ));
        assert!(matches!(
            resolve_file_path(&mut conn, 999).await,
            Err(FmsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cycle_hits_depth_guard() {
        let db = setup_db().await;
        let a = insert_folder(&db, "A", None).await;
        let b = insert_folder(&db, "B", Some(a)).await;
        sqlx::query("UPDATE folders SET parent_folder_id = ? WHERE id = ?")
            .bind(b)
            .bind(a)
            .execute(db.pool())
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let result = resolve_folder_path(&mut conn, b).await;
        assert!(matches!(result, Err(FmsError::Internal(_))));
    }

    #[test]
    fn test_folder_tree_matches_layout() {
        let tree = FolderTree::new(3, [(1, None), (2, Some(1)), (5, Some(2))]);
        assert_eq!(
            tree.folder_path(5).unwrap(),
            PathBuf::from("org-3/folder-1/folder-2/folder-5")
        );
        assert_eq!(
            tree.file_path(9, Some(2)).unwrap(),
            PathBuf::from("org-3/folder-1/folder-2/file-9")
        );
        assert_eq!(tree.file_path(9, None).unwrap(), PathBuf::from("org-3/file-9"));
        assert!(matches!(tree.folder_path(4), Err(FmsError::NotFound(_))));
    }

    #[test]
    fn test_folder_tree_cycle() {
        let tree = FolderTree::new(1, [(1, Some(2)), (2, Some(1))]);
        assert!(matches!(tree.folder_path(1), Err(FmsError::Internal(_))));
    }
}
