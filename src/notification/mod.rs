//! Activity notifications for organisation members.
//!
//! Mutations in an organisation fan out one row per member (plus the
//! creator), skipping the actor. Fanout is best-effort: [`notify`] logs a
//! failure and never reports it to the triggering operation.

use serde::Serialize;
use tracing::{debug, warn};

use crate::db::DbPool;
use crate::Result;

/// Kind of activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    FileUpload,
    FileDelete,
    FolderCreate,
    FolderDelete,
    MemberJoin,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FileUpload => "file upload",
            NotificationKind::FileDelete => "file delete",
            NotificationKind::FolderCreate => "folder create",
            NotificationKind::FolderDelete => "folder delete",
            NotificationKind::MemberJoin => "member join",
        }
    }

    /// Message shown before the organisation name.
    pub fn message(&self) -> &'static str {
        match self {
            NotificationKind::FileUpload => "Uploaded a file to",
            NotificationKind::FileDelete => "Deleted a file from",
            NotificationKind::FolderCreate => "Created a folder in",
            NotificationKind::FolderDelete => "Deleted a folder from",
            NotificationKind::MemberJoin => "Joined",
        }
    }
}

/// Something that happened in an organisation.
#[derive(Debug, Clone)]
pub struct OrgEvent {
    pub org_id: i64,
    pub actor_id: String,
    pub kind: NotificationKind,
    pub payload_id: String,
    pub payload_name: String,
}

impl OrgEvent {
    pub fn new(
        org_id: i64,
        actor_id: impl Into<String>,
        kind: NotificationKind,
        payload_id: impl ToString,
        payload_name: impl Into<String>,
    ) -> Self {
        Self {
            org_id,
            actor_id: actor_id.into(),
            kind,
            payload_id: payload_id.to_string(),
            payload_name: payload_name.into(),
        }
    }
}

/// Notification as delivered to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub org_id: i64,
    pub org_name: Option<String>,
    pub actor_id: Option<String>,
    pub actor: Option<String>,
    pub kind: String,
    pub message: String,
    pub payload_id: String,
    pub payload_name: String,
    pub is_read: bool,
    pub created_at: String,
}

/// Repository for notification rows.
pub struct NotificationRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert one notification per member and the creator, except the actor.
    /// Returns the number of recipients.
    pub async fn fanout(&self, event: &OrgEvent) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO notifications
                 (user_id, org_id, actor_id, kind, message, payload_id, payload_name)
             SELECT r.user_id, $1, $2, $3, $4, $5, $6
             FROM (
                 SELECT user_id FROM org_members WHERE org_id = $1
                 UNION
                 SELECT creator_id AS user_id FROM organisations WHERE id = $1
             ) r
             WHERE r.user_id != $2",
        )
        .bind(event.org_id)
        .bind(&event.actor_id)
        .bind(event.kind.as_str())
        .bind(event.kind.message())
        .bind(&event.payload_id)
        .bind(&event.payload_name)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Notifications of a user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT n.id, n.user_id, n.org_id, o.name AS org_name, n.actor_id,
                    u.username AS actor, n.kind, n.message, n.payload_id, n.payload_name,
                    n.is_read, n.created_at
             FROM notifications n
             LEFT JOIN users u ON u.id = n.actor_id
             LEFT JOIN organisations o ON o.id = n.org_id
             WHERE n.user_id = ?
             ORDER BY n.created_at DESC, n.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Mark one notification read. False if it is not the user's.
    pub async fn mark_read(&self, id: i64, user_id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark every notification of a user read.
    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Fan out an event, logging instead of failing.
pub async fn notify(pool: &DbPool, event: OrgEvent) {
    match NotificationRepository::new(pool).fanout(&event).await {
        Ok(recipients) => debug!(
            org_id = event.org_id,
            kind = event.kind.as_str(),
            recipients,
            "notification fanout"
        ),
        Err(e) => warn!(
            org_id = event.org_id,
            kind = event.kind.as_str(),
            error = %e,
            "notification fanout failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, username, password) VALUES
                 ('owner', 'alice', 'x'), ('m1', 'bob', 'x'), ('m2', 'carol', 'x'), ('out', 'dave', 'x')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        sqlx::query("INSERT INTO organisations (id, name, creator_id) VALUES (1, 'Acme', 'owner')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO org_members (org_id, user_id, role) VALUES (1, 'm1', 'editor'), (1, 'm2', 'viewer')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    fn upload_event(actor: &str) -> OrgEvent {
        OrgEvent::new(1, actor, NotificationKind::FileUpload, 7, "report.pdf")
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(NotificationKind::FileUpload.as_str(), "file upload");
        assert_eq!(NotificationKind::FileUpload.message(), "Uploaded a file to");
        assert_eq!(NotificationKind::FileDelete.message(), "Deleted a file from");
    }

    #[tokio::test]
    async fn test_fanout_excludes_actor() {
        let db = setup_db().await;
        let repo = NotificationRepository::new(db.pool());

        let recipients = repo.fanout(&upload_event("m1")).await.unwrap();
        assert_eq!(recipients, 2);

        assert_eq!(repo.list_for_user("owner").await.unwrap().len(), 1);
        assert_eq!(repo.list_for_user("m2").await.unwrap().len(), 1);
        assert!(repo.list_for_user("m1").await.unwrap().is_empty());
        assert!(repo.list_for_user("out").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fanout_from_creator() {
        let db = setup_db().await;
        let repo = NotificationRepository::new(db.pool());

        assert_eq!(repo.fanout(&upload_event("owner")).await.unwrap(), 2);
        assert!(repo.list_for_user("owner").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_includes_names() {
        let db = setup_db().await;
        let repo = NotificationRepository::new(db.pool());
        repo.fanout(&upload_event("m1")).await.unwrap();

        let list = repo.list_for_user("owner").await.unwrap();
        let n = &list[0];
        assert_eq!(n.actor.as_deref(), Some("bob"));
        assert_eq!(n.org_name.as_deref(), Some("Acme"));
        assert_eq!(n.kind, "file upload");
        assert_eq!(n.payload_id, "7");
        assert_eq!(n.payload_name, "report.pdf");
        assert!(!n.is_read);
    }

    #[tokio::test]
    async fn test_mark_read() {
        let db = setup_db().await;
        let repo = NotificationRepository::new(db.pool());
        repo.fanout(&upload_event("m1")).await.unwrap();
        repo.fanout(&upload_event("m1")).await.unwrap();

        let list = repo.list_for_user("owner").await.unwrap();
        assert_eq!(repo.unread_count("owner").await.unwrap(), 2);

        assert!(!repo.mark_read(list[0].id, "m2").await.unwrap());
        assert!(repo.mark_read(list[0].id, "owner").await.unwrap());
        assert_eq!(repo.unread_count("owner").await.unwrap(), 1);

        assert_eq!(repo.mark_all_read("owner").await.unwrap(), 1);
        assert_eq!(repo.unread_count("owner").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_notify_swallows_errors() {
        let db = setup_db().await;
        // Unknown org: no recipients, no error surfaced.
        notify(db.pool(), OrgEvent::new(99, "m1", NotificationKind::FolderCreate, 1, "x")).await;
        db.close().await;
        // Closed pool: failure is logged only.
        notify(db.pool(), upload_event("m1")).await;
    }
}
