//! Folder model and repository.

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::db::{map_insert_error, DbPool};
use crate::Result;

/// Folder row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Folder {
    pub id: i64,
    pub org_id: i64,
    /// Creator; `None` once their account is deleted.
    pub uploader_id: Option<String>,
    pub name: String,
    /// `None` for root-level folders.
    pub parent_folder_id: Option<i64>,
    pub created_at: String,
}

/// Folder as shown in a listing, with its uploader's name and the total size
/// of the files directly inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FolderSummary {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub parent_folder_id: Option<i64>,
    pub uploader: Option<String>,
    pub size: i64,
    pub created_at: String,
}

/// New folder for insertion.
#[derive(Debug, Clone)]
pub struct NewFolder {
    pub org_id: i64,
    pub uploader_id: String,
    pub name: String,
    pub parent_folder_id: Option<i64>,
}

impl NewFolder {
    /// A root-level folder.
    pub fn new(org_id: i64, uploader_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org_id,
            uploader_id: uploader_id.into(),
            name: name.into(),
            parent_folder_id: None,
        }
    }

    pub fn with_parent(mut self, parent_folder_id: i64) -> Self {
        self.parent_folder_id = Some(parent_folder_id);
        self
    }
}

/// How a caller names the parent of a new folder or file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// Directly under the organisation.
    Root,
    Id(i64),
    /// A folder name, looked up within the organisation.
    Name(String),
}

impl ParentRef {
    /// Interpret a client-supplied folder name; empty or `root` means root.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("") => ParentRef::Root,
            Some(n) if n.eq_ignore_ascii_case(super::ROOT_FOLDER_NAME) => ParentRef::Root,
            Some(n) => ParentRef::Name(n.to_string()),
        }
    }
}

const SUMMARY_SELECT: &str = "SELECT f.id, f.org_id, f.name, f.parent_folder_id,
        u.username AS uploader,
        (SELECT COALESCE(SUM(size), 0) FROM files WHERE files.folder_id = f.id) AS size,
        f.created_at
     FROM folders f LEFT JOIN users u ON u.id = f.uploader_id";

/// Repository for folder queries.
pub struct FolderRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a folder on an open connection (usually a transaction).
    /// Sibling-name collisions fail with `AlreadyExists`.
    pub async fn insert(conn: &mut SqliteConnection, folder: &NewFolder) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO folders (org_id, uploader_id, name, parent_folder_id)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(folder.org_id)
        .bind(&folder.uploader_id)
        .bind(&folder.name)
        .bind(folder.parent_folder_id)
        .fetch_one(conn)
        .await
        .map_err(|e| map_insert_error(e, format!("folder '{}'", folder.name)))?;
        Ok(id)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, org_id, uploader_id, name, parent_folder_id, created_at
             FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(folder)
    }

    /// All folders of an organisation with the given name, at any depth.
    pub async fn find_by_name(&self, org_id: i64, name: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT id, org_id, uploader_id, name, parent_folder_id, created_at
             FROM folders WHERE org_id = ? AND name = ? ORDER BY id",
        )
        .bind(org_id)
        .bind(name)
        .fetch_all(self.pool)
        .await?;
        Ok(folders)
    }

    /// Whether a sibling with this exact name exists under `parent`.
    pub async fn name_exists(&self, org_id: i64, parent: Option<i64>, name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM folders
             WHERE org_id = ? AND parent_folder_id IS ? AND name = ?",
        )
        .bind(org_id)
        .bind(parent)
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Root-level folders of an organisation.
    pub async fn list_root(&self, org_id: i64) -> Result<Vec<FolderSummary>> {
        let sql = format!(
            "{SUMMARY_SELECT} WHERE f.org_id = ? AND f.parent_folder_id IS NULL ORDER BY f.name"
        );
        let folders = sqlx::query_as::<_, FolderSummary>(&sql)
            .bind(org_id)
            .fetch_all(self.pool)
            .await?;
        Ok(folders)
    }

    /// Direct children of a folder.
    pub async fn list_children(&self, parent_id: i64) -> Result<Vec<FolderSummary>> {
        let sql = format!("{SUMMARY_SELECT} WHERE f.parent_folder_id = ? ORDER BY f.name");
        let folders = sqlx::query_as::<_, FolderSummary>(&sql)
            .bind(parent_id)
            .fetch_all(self.pool)
            .await?;
        Ok(folders)
    }

    /// `(id, parent_folder_id)` of every folder in an organisation.
    pub async fn list_tree(&self, org_id: i64) -> Result<Vec<(i64, Option<i64>)>> {
        let rows: Vec<(i64, Option<i64>)> =
            sqlx::query_as("SELECT id, parent_folder_id FROM folders WHERE org_id = ?")
            .bind(org_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Delete a folder; descendants and their files go by cascade.
    pub async fn delete(conn: &mut SqliteConnection, org_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ? AND org_id = ?")
            .bind(id)
            .bind(org_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, FmsError};

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO users (id, username, password) VALUES ('u1', 'alice', 'x')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (id, username, password) VALUES ('u2', 'bob', 'x')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO organisations (id, name, creator_id) VALUES (1, 'Acme', 'u1'), (2, 'Globex', 'u2')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    async fn insert(db: &Database, folder: NewFolder) -> Result<i64> {
        let mut conn = db.pool().acquire().await.unwrap();
        FolderRepository::insert(&mut conn, &folder).await
    }

    #[test]
    fn test_parent_ref_from_name() {
        assert_eq!(ParentRef::from_name(None), ParentRef::Root);
        assert_eq!(ParentRef::from_name(Some("")), ParentRef::Root);
        assert_eq!(ParentRef::from_name(Some("root")), ParentRef::Root);
        assert_eq!(ParentRef::from_name(Some("ROOT")), ParentRef::Root);
        assert_eq!(
            ParentRef::from_name(Some("Docs")),
            ParentRef::Name("Docs".to_string())
        );
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup_db().await;
        let id = insert(&db, NewFolder::new(1, "u1", "Docs")).await.unwrap();

        let folder = FolderRepository::new(db.pool())
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(folder.name, "Docs");
        assert_eq!(folder.org_id, 1);
        assert_eq!(folder.parent_folder_id, None);
        assert_eq!(folder.uploader_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_root_siblings_collide() {
        let db = setup_db().await;
        insert(&db, NewFolder::new(1, "u1", "Docs")).await.unwrap();

        let dup = insert(&db, NewFolder::new(1, "u1", "Docs")).await;
        assert!(matches!(dup, Err(FmsError::AlreadyExists(_))));

        // Same name in another org or under another parent is fine.
        insert(&db, NewFolder::new(2, "u2", "Docs")).await.unwrap();
        let parent = insert(&db, NewFolder::new(1, "u1", "Archive")).await.unwrap();
        insert(&db, NewFolder::new(1, "u1", "Docs").with_parent(parent))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_name_exists_scoped() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let docs = insert(&db, NewFolder::new(1, "u1", "Docs")).await.unwrap();
        insert(&db, NewFolder::new(1, "u1", "Q1").with_parent(docs))
            .await
            .unwrap();

        assert!(repo.name_exists(1, None, "Docs").await.unwrap());
        assert!(!repo.name_exists(1, None, "docs").await.unwrap());
        assert!(!repo.name_exists(2, None, "Docs").await.unwrap());
        assert!(repo.name_exists(1, Some(docs), "Q1").await.unwrap());
        assert!(!repo.name_exists(1, None, "Q1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_root_and_children_with_sizes() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let docs = insert(&db, NewFolder::new(1, "u1", "Docs")).await.unwrap();
        insert(&db, NewFolder::new(1, "u1", "Empty")).await.unwrap();
        let q1 = insert(&db, NewFolder::new(1, "u1", "Q1").with_parent(docs))
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO files (org_id, uploader_id, folder_id, name, file_type, size)
             VALUES (1, 'u1', ?, 'a.pdf', '.pdf', 100), (1, 'u1', ?, 'b.pdf', '.pdf', 50)",
        )
        .bind(docs)
        .bind(docs)
        .execute(db.pool())
        .await
        .unwrap();

        let root = repo.list_root(1).await.unwrap();
        assert_eq!(root.len(), 2);
        assert_eq!(root[0].name, "Docs");
        assert_eq!(root[0].size, 150);
        assert_eq!(root[0].uploader.as_deref(), Some("alice"));
        assert_eq!(root[1].name, "Empty");
        assert_eq!(root[1].size, 0);

        let children = repo.list_children(docs).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, q1);
        assert_eq!(children[0].size, 0);
    }

    #[tokio::test]
    async fn test_find_by_name_across_depths() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let a = insert(&db, NewFolder::new(1, "u1", "Reports")).await.unwrap();
        insert(&db, NewFolder::new(1, "u1", "Reports").with_parent(a))
            .await
            .unwrap();
        insert(&db, NewFolder::new(2, "u2", "Reports")).await.unwrap();

        assert_eq!(repo.find_by_name(1, "Reports").await.unwrap().len(), 2);
        assert_eq!(repo.find_by_name(2, "Reports").await.unwrap().len(), 1);
        assert!(repo.find_by_name(1, "Nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_descendants() {
        let db = setup_db().await;
        let repo = FolderRepository::new(db.pool());
        let a = insert(&db, NewFolder::new(1, "u1", "A")).await.unwrap();
        let b = insert(&db, NewFolder::new(1, "u1", "B").with_parent(a))
            .await
            .unwrap();

        {
            let mut conn = db.pool().acquire().await.unwrap();
            assert!(!FolderRepository::delete(&mut conn, 2, a).await.unwrap());
            assert!(FolderRepository::delete(&mut conn, 1, a).await.unwrap());
        }
        assert!(repo.get_by_id(b).await.unwrap().is_none());
        assert!(repo.list_tree(1).await.unwrap().is_empty());
    }
}
