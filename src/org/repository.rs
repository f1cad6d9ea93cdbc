//! Organisation repository.

use sqlx::SqliteConnection;

use super::{JoinedOrg, OrgInvite, OrgMember, Organisation};
use crate::auth::MemberRole;
use crate::db::{is_unique_violation, map_insert_error, DbPool};
use crate::{FmsError, Result};

/// Repository for organisation, membership and invite rows.
pub struct OrgRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> OrgRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert an organisation on an open connection.
    ///
    /// A second organisation for the same creator is a `Conflict`; a name
    /// clash (case-insensitive) is `AlreadyExists`.
    pub async fn insert(conn: &mut SqliteConnection, name: &str, creator_id: &str) -> Result<i64> {
        sqlx::query_scalar("INSERT INTO organisations (name, creator_id) VALUES (?, ?) RETURNING id")
            .bind(name)
            .bind(creator_id)
            .fetch_one(conn)
            .await
            .map_err(|e| {
                let creator_clash = is_unique_violation(&e)
                    && e.as_database_error()
                        .is_some_and(|d| d.message().contains("creator_id"));
                if creator_clash {
                    FmsError::Conflict("user already owns an organisation".into())
                } else {
                    map_insert_error(e, format!("organisation name '{name}'"))
                }
            })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Organisation>> {
        let org = sqlx::query_as::<_, Organisation>(
            "SELECT id, name, creator_id, created_at FROM organisations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(org)
    }

    /// The organisation created by a user, if any.
    pub async fn get_by_creator(&self, creator_id: &str) -> Result<Option<Organisation>> {
        let org = sqlx::query_as::<_, Organisation>(
            "SELECT id, name, creator_id, created_at FROM organisations WHERE creator_id = ?",
        )
        .bind(creator_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(org)
    }

    /// Case-insensitive name check.
    pub async fn name_taken(&self, name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organisations WHERE name = ?")
            .bind(name)
            .fetch_one(self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE organisations SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_insert_error(e, format!("organisation name '{name}'")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an organisation with its members, invites, folders and files.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM organisations WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Membership role of a user, `None` if not a member.
    pub async fn member_role(&self, org_id: i64, user_id: &str) -> Result<Option<MemberRole>> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM org_members WHERE org_id = ? AND user_id = ?")
                .bind(org_id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        role.map(|r| r.parse::<MemberRole>().map_err(FmsError::Database))
            .transpose()
    }

    pub async fn members(&self, org_id: i64) -> Result<Vec<OrgMember>> {
        let members = sqlx::query_as::<_, OrgMember>(
            "SELECT m.org_id, m.user_id, u.username, m.role, m.joined_at
             FROM org_members m JOIN users u ON u.id = m.user_id
             WHERE m.org_id = ?
             ORDER BY m.joined_at, u.username",
        )
        .bind(org_id)
        .fetch_all(self.pool)
        .await?;
        Ok(members)
    }

    pub async fn member_count(&self, org_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM org_members WHERE org_id = ?")
            .bind(org_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Organisations a user has joined as a member.
    pub async fn joined(&self, user_id: &str) -> Result<Vec<JoinedOrg>> {
        let orgs = sqlx::query_as::<_, JoinedOrg>(
            "SELECT o.id, o.name, o.creator_id, o.created_at, m.role
             FROM org_members m JOIN organisations o ON o.id = m.org_id
             WHERE m.user_id = ?
             ORDER BY m.joined_at, o.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(orgs)
    }

    /// Number of organisations a user has joined.
    pub async fn membership_count(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM org_members WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Add a member on an open connection.
    pub async fn add_member(
        conn: &mut SqliteConnection,
        org_id: i64,
        user_id: &str,
        role: MemberRole,
    ) -> Result<()> {
        sqlx::query("INSERT INTO org_members (org_id, user_id, role) VALUES (?, ?, ?)")
            .bind(org_id)
            .bind(user_id)
            .bind(role.as_str())
            .execute(conn)
            .await
            .map_err(|e| map_insert_error(e, "membership"))?;
        Ok(())
    }

    pub async fn set_member_role(&self, org_id: i64, user_id: &str, role: MemberRole) -> Result<bool> {
        let result = sqlx::query("UPDATE org_members SET role = ? WHERE org_id = ? AND user_id = ?")
            .bind(role.as_str())
            .bind(org_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_member(&self, org_id: i64, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM org_members WHERE org_id = ? AND user_id = ?")
            .bind(org_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_invite(&self, org_id: i64, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO org_invites (org_id, user_id) VALUES (?, ?)")
            .bind(org_id)
            .bind(user_id)
            .execute(self.pool)
            .await
            .map_err(|e| map_insert_error(e, "invite"))?;
        Ok(())
    }

    pub async fn get_invite(&self, org_id: i64, user_id: &str) -> Result<Option<OrgInvite>> {
        let invite = sqlx::query_as::<_, OrgInvite>(
            "SELECT i.org_id, o.name AS org_name, i.user_id, i.invited_at
             FROM org_invites i JOIN organisations o ON o.id = i.org_id
             WHERE i.org_id = ? AND i.user_id = ?",
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(invite)
    }

    /// Pending invites addressed to a user, newest first.
    pub async fn invites_for_user(&self, user_id: &str) -> Result<Vec<OrgInvite>> {
        let invites = sqlx::query_as::<_, OrgInvite>(
            "SELECT i.org_id, o.name AS org_name, i.user_id, i.invited_at
             FROM org_invites i JOIN organisations o ON o.id = i.org_id
             WHERE i.user_id = ?
             ORDER BY i.invited_at DESC, i.org_id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(invites)
    }

    /// Delete an invite on an open connection.
    pub async fn delete_invite(conn: &mut SqliteConnection, org_id: i64, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM org_invites WHERE org_id = ? AND user_id = ?")
            .bind(org_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
