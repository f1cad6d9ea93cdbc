//! File metadata model and repository.

use std::path::Path;

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::db::{map_insert_error, DbPool};
use crate::Result;

/// File row joined with its uploader's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: i64,
    pub org_id: i64,
    /// `None` for root-level files.
    pub folder_id: Option<i64>,
    pub uploader_id: Option<String>,
    pub uploader: Option<String>,
    pub name: String,
    /// Lowercased extension including the dot, empty if none.
    pub file_type: String,
    pub size: i64,
    pub uploaded_at: String,
}

/// New file for insertion.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub org_id: i64,
    pub uploader_id: String,
    pub folder_id: Option<i64>,
    pub name: String,
    pub file_type: String,
    pub size: i64,
}

impl NewFile {
    /// A root-level file; the type is taken from the name's extension.
    pub fn new(
        org_id: i64,
        uploader_id: impl Into<String>,
        name: impl Into<String>,
        size: i64,
    ) -> Self {
        let name = name.into();
        Self {
            org_id,
            uploader_id: uploader_id.into(),
            file_type: file_type_of(&name),
            name,
            folder_id: None,
            size,
        }
    }

    pub fn with_folder(mut self, folder_id: i64) -> Self {
        self.folder_id = Some(folder_id);
        self
    }
}

/// Extension of a file name, lowercased, with the leading dot.
pub fn file_type_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

const RECORD_SELECT: &str = "SELECT f.id, f.org_id, f.folder_id, f.uploader_id,
        u.username AS uploader, f.name, f.file_type, f.size, f.uploaded_at
     FROM files f LEFT JOIN users u ON u.id = f.uploader_id";

/// Repository for file metadata.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a file row on an open connection (usually a transaction).
    pub async fn insert(conn: &mut SqliteConnection, file: &NewFile) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (org_id, uploader_id, folder_id, name, file_type, size)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(file.org_id)
        .bind(&file.uploader_id)
        .bind(file.folder_id)
        .bind(&file.name)
        .bind(&file.file_type)
        .bind(file.size)
        .fetch_one(conn)
        .await
        .map_err(|e| map_insert_error(e, format!("file '{}'", file.name)))?;
        Ok(id)
    }

    /// Record the number of bytes actually stored.
    pub async fn set_size(conn: &mut SqliteConnection, id: i64, size: i64) -> Result<()> {
        sqlx::query("UPDATE files SET size = ? WHERE id = ?")
            .bind(size)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("{RECORD_SELECT} WHERE f.id = ?");
        let file = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(file)
    }

    /// Whether a sibling file with this exact name exists under `folder`.
    pub async fn name_exists(&self, org_id: i64, folder: Option<i64>, name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM files WHERE org_id = ? AND folder_id IS ? AND name = ?",
        )
        .bind(org_id)
        .bind(folder)
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Root-level files of an organisation, newest first.
    pub async fn list_root(&self, org_id: i64) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "{RECORD_SELECT} WHERE f.org_id = ? AND f.folder_id IS NULL
             ORDER BY f.uploaded_at DESC, f.id DESC"
        );
        let files = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(org_id)
            .fetch_all(self.pool)
            .await?;
        Ok(files)
    }

    /// Files directly inside a folder, newest first.
    pub async fn list_in_folder(&self, folder_id: i64) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "{RECORD_SELECT} WHERE f.folder_id = ? ORDER BY f.uploaded_at DESC, f.id DESC"
        );
        let files = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(folder_id)
            .fetch_all(self.pool)
            .await?;
        Ok(files)
    }

    /// `(id, folder_id)` of every file in an organisation.
    pub async fn list_locations(&self, org_id: i64) -> Result<Vec<(i64, Option<i64>)>> {
        let rows: Vec<(i64, Option<i64>)> =
            sqlx::query_as("SELECT id, folder_id FROM files WHERE org_id = ?")
                .bind(org_id)
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn delete(conn: &mut SqliteConnection, org_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ? AND org_id = ?")
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
        sqlx::query("INSERT INTO organisations (id, name, creator_id) VALUES (1, 'Acme', 'u1')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO folders (id, org_id, uploader_id, name) VALUES (10, 1, 'u1', 'Docs')")
            .execute(db.pool())
            .await
            .unwrap();
        db
    }

    async fn insert(db: &Database, file: NewFile) -> Result<i64> {
        let mut conn = db.pool().acquire().await.unwrap();
        FileRepository::insert(&mut conn, &file).await
    }

    #[test]
    fn test_file_type_of() {
        assert_eq!(file_type_of("report.pdf"), ".pdf");
        assert_eq!(file_type_of("Photo.JPG"), ".jpg");
        assert_eq!(file_type_of("archive.tar.gz"), ".gz");
        assert_eq!(file_type_of("README"), "");
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup_db().await;
        let id = insert(&db, NewFile::new(1, "u1", "report.pdf", 42).with_folder(10))
            .await
            .unwrap();

        let file = FileRepository::new(db.pool())
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.name, "report.pdf");
        assert_eq!(file.file_type, ".pdf");
        assert_eq!(file.size, 42);
        assert_eq!(file.folder_id, Some(10));
        assert_eq!(file.uploader.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_sibling_collision() {
        let db = setup_db().await;
        insert(&db, NewFile::new(1, "u1", "a.pdf", 1)).await.unwrap();

        let dup = insert(&db, NewFile::new(1, "u1", "a.pdf", 1)).await;
        assert!(matches!(dup, Err(FmsError::AlreadyExists(_))));

        insert(&db, NewFile::new(1, "u1", "a.pdf", 1).with_folder(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_name_exists_and_listing() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        insert(&db, NewFile::new(1, "u1", "root.pdf", 1)).await.unwrap();
        insert(&db, NewFile::new(1, "u1", "inner.pdf", 1).with_folder(10))
            .await
            .unwrap();

        assert!(repo.name_exists(1, None, "root.pdf").await.unwrap());
        assert!(!repo.name_exists(1, Some(10), "root.pdf").await.unwrap());
        assert!(repo.name_exists(1, Some(10), "inner.pdf").await.unwrap());

        let root = repo.list_root(1).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name, "root.pdf");

        let inner = repo.list_in_folder(10).await.unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].name, "inner.pdf");

        assert_eq!(repo.list_locations(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_set_size_and_delete() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let id = insert(&db, NewFile::new(1, "u1", "a.pdf", 1)).await.unwrap();

        {
            let mut conn = db.pool().acquire().await.unwrap();
            FileRepository::set_size(&mut conn, id, 2048).await.unwrap();
        }
        assert_eq!(repo.get_by_id(id).await.unwrap().unwrap().size, 2048);

        {
            let mut conn = db.pool().acquire().await.unwrap();
            assert!(!FileRepository::delete(&mut conn, 2, id).await.unwrap());
            assert!(FileRepository::delete(&mut conn, 1, id).await.unwrap());
        }
        assert!(repo.get_by_id(id).await.unwrap().is_none());
    }
}
