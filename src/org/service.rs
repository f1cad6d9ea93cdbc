//! Organisation lifecycle, membership and invites.

use tracing::{info, warn};

use super::{JoinedOrg, OrgInvite, OrgMember, OrgRepository, Organisation};
use super::{MAX_JOINED_ORGS, MAX_ORG_NAME_LENGTH};
use crate::auth::{Capability, MemberRole, OrgAccess, OrgRole};
use crate::db::UserRepository;
use crate::file::FileStorage;
use crate::notification::{self, NotificationKind, OrgEvent};
use crate::{Database, FmsError, Result};

/// Organisation operations, guarded by the caller's capabilities.
pub struct OrgService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
}

impl<'a> OrgService<'a> {
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self { db, storage }
    }

    fn repo(&self) -> OrgRepository<'_> {
        OrgRepository::new(self.db.pool())
    }

    /// Create an organisation and its root directory.
    ///
    /// The row and the directory are created together: if the directory
    /// cannot be made, the insert is rolled back.
    pub async fn create_org(&self, actor_id: &str, name: &str) -> Result<Organisation> {
        let name = validate_org_name(name)?;
        let repo = self.repo();

        if repo.name_taken(name).await? {
            return Err(FmsError::AlreadyExists(format!("organisation name '{name}'")));
        }
        if repo.get_by_creator(actor_id).await?.is_some() {
            return Err(FmsError::Conflict("user already owns an organisation".into()));
        }

        let mut tx = self.db.begin().await?;
        let org_id = OrgRepository::insert(&mut tx, name, actor_id).await?;

        if let Err(e) = self.storage.create_org_dir(org_id).await {
            warn!(org_id, error = %e, "failed to create organisation directory, rolling back");
            tx.rollback().await?;
            return Err(e);
        }
        if let Err(e) = tx.commit().await {
            if let Err(cleanup) = self.storage.remove_org_dir(org_id).await {
                warn!(org_id, error = %cleanup, "failed to remove orphaned organisation directory");
            }
            return Err(e.into());
        }

        info!(org_id, name, creator = actor_id, "organisation created");
        repo.get_by_id(org_id)
            .await?
            .ok_or_else(|| FmsError::NotFound(format!("organisation {org_id}")))
    }

    pub async fn get_org(&self, org_id: i64) -> Result<Organisation> {
        self.repo()
            .get_by_id(org_id)
            .await?
            .ok_or_else(|| FmsError::NotFound(format!("organisation {org_id}")))
    }

    /// Whether a user can view an organisation, and in which role.
    pub async fn can_view_org(&self, user_id: &str, org_id: i64) -> Result<(bool, Option<OrgRole>)> {
        let access = self.access(user_id, org_id).await?;
        Ok((access.is_some(), access.map(|a| a.role)))
    }

    /// Resolve a user's role in an organisation, `None` for outsiders and
    /// unknown organisations.
    pub async fn access(&self, user_id: &str, org_id: i64) -> Result<Option<OrgAccess>> {
        let repo = self.repo();
        let Some(org) = repo.get_by_id(org_id).await? else {
            return Ok(None);
        };

        let is_creator = org.creator_id == user_id;
        let membership = if is_creator {
            None
        } else {
            repo.member_role(org_id, user_id).await?
        };

        Ok(OrgRole::resolve(is_creator, membership).map(|role| OrgAccess::new(org_id, role)))
    }

    /// Resolve access and require a capability; outsiders are `Forbidden`.
    pub async fn require_access(
        &self,
        user_id: &str,
        org_id: i64,
        capability: Capability,
    ) -> Result<OrgAccess> {
        let access = self
            .access(user_id, org_id)
            .await?
            .ok_or_else(|| FmsError::Forbidden("not a member of this organisation".into()))?;
        access.require(capability)?;
        Ok(access)
    }

    /// The organisation a user created, if any.
    pub async fn owned_org(&self, user_id: &str) -> Result<Option<Organisation>> {
        self.repo().get_by_creator(user_id).await
    }

    pub async fn joined_orgs(&self, user_id: &str) -> Result<Vec<JoinedOrg>> {
        self.repo().joined(user_id).await
    }

    /// Members of an organisation; requires view access.
    pub async fn members(&self, actor_id: &str, org_id: i64) -> Result<Vec<OrgMember>> {
        self.require_access(actor_id, org_id, Capability::View).await?;
        self.repo().members(org_id).await
    }

    /// Whether a user has reached the membership cap.
    pub async fn has_exceeded_limit(&self, user_id: &str) -> Result<bool> {
        Ok(self.repo().membership_count(user_id).await? >= MAX_JOINED_ORGS)
    }

    /// Invite a user by username. Only the creator can invite.
    pub async fn invite_user(&self, actor_id: &str, org_id: i64, username: &str) -> Result<OrgInvite> {
        self.require_access(actor_id, org_id, Capability::Invite).await?;

        let invitee = UserRepository::new(self.db.pool())
            .get_by_username(username)
            .await?
            .ok_or_else(|| FmsError::NotFound(format!("user '{username}'")))?;
        if invitee.id == actor_id {
            return Err(FmsError::Validation("cannot invite yourself".into()));
        }

        let repo = self.repo();
        if repo.member_role(org_id, &invitee.id).await?.is_some() {
            return Err(FmsError::AlreadyExists(format!(
                "membership for '{username}'"
            )));
        }
        repo.create_invite(org_id, &invitee.id).await?;

        info!(org_id, invitee = %invitee.id, "user invited");
        repo.get_invite(org_id, &invitee.id)
            .await?
            .ok_or_else(|| FmsError::NotFound("invite".into()))
    }

    pub async fn user_invites(&self, user_id: &str) -> Result<Vec<OrgInvite>> {
        self.repo().invites_for_user(user_id).await
    }

    /// Accept an invite: the membership is added and the invite removed in
    /// one transaction. New members join as viewers.
    pub async fn accept_invite(&self, user_id: &str, org_id: i64) -> Result<OrgMember> {
        if self.has_exceeded_limit(user_id).await? {
            return Err(FmsError::Conflict(format!(
                "membership limit of {MAX_JOINED_ORGS} organisations reached"
            )));
        }

        let mut tx = self.db.begin().await?;
        if !OrgRepository::delete_invite(&mut tx, org_id, user_id).await? {
            return Err(FmsError::NotFound("invite".into()));
        }
        OrgRepository::add_member(&mut tx, org_id, user_id, MemberRole::default()).await?;
        tx.commit().await?;

        info!(org_id, user_id, "invite accepted");

        let member = self
            .repo()
            .members(org_id)
            .await?
            .into_iter()
            .find(|m| m.user_id == user_id)
            .ok_or_else(|| FmsError::NotFound("membership".into()))?;

        notification::notify(
            self.db.pool(),
            OrgEvent::new(
                org_id,
                user_id,
                NotificationKind::MemberJoin,
                user_id,
                member.username.clone(),
            ),
        )
        .await;

        Ok(member)
    }

    pub async fn decline_invite(&self, user_id: &str, org_id: i64) -> Result<()> {
        let mut conn = self.db.pool().acquire().await?;
        if !OrgRepository::delete_invite(&mut conn, org_id, user_id).await? {
            return Err(FmsError::NotFound("invite".into()));
        }
        info!(org_id, user_id, "invite declined");
        Ok(())
    }

    pub async fn change_org_name(&self, actor_id: &str, org_id: i64, new_name: &str) -> Result<Organisation> {
        self.require_access(actor_id, org_id, Capability::ManageMembers)
            .await?;
        let new_name = validate_org_name(new_name)?;

        let repo = self.repo();
        let current = self.get_org(org_id).await?;
        if !current.name.eq_ignore_ascii_case(new_name) && repo.name_taken(new_name).await? {
            return Err(FmsError::AlreadyExists(format!(
                "organisation name '{new_name}'"
            )));
        }
        repo.rename(org_id, new_name).await?;

        info!(org_id, name = new_name, "organisation renamed");
        self.get_org(org_id).await
    }

    pub async fn change_member_role(
        &self,
        actor_id: &str,
        org_id: i64,
        username: &str,
        role: MemberRole,
    ) -> Result<()> {
        self.require_access(actor_id, org_id, Capability::ManageMembers)
            .await?;
        let member_id = self.member_id_by_username(username).await?;

        if !self.repo().set_member_role(org_id, &member_id, role).await? {
            return Err(FmsError::NotFound(format!("member '{username}'")));
        }
        info!(org_id, member = %member_id, role = %role, "member role changed");
        Ok(())
    }

    pub async fn remove_member(&self, actor_id: &str, org_id: i64, username: &str) -> Result<()> {
        self.require_access(actor_id, org_id, Capability::ManageMembers)
            .await?;
        let member_id = self.member_id_by_username(username).await?;

        if !self.repo().remove_member(org_id, &member_id).await? {
            return Err(FmsError::NotFound(format!("member '{username}'")));
        }
        info!(org_id, member = %member_id, "member removed");
        Ok(())
    }

    /// Delete an organisation. Rows go by cascade; the directory tree is
    /// removed afterwards and a failure there is only logged.
    pub async fn delete_org(&self, actor_id: &str, org_id: i64) -> Result<()> {
        self.require_access(actor_id, org_id, Capability::ManageMembers)
            .await?;

        if !self.repo().delete(org_id).await? {
            return Err(FmsError::NotFound(format!("organisation {org_id}")));
        }

        if let Err(e) = self.storage.remove_org_dir(org_id).await {
            warn!(org_id, error = %e, "failed to remove organisation directory");
        }

        info!(org_id, "organisation deleted");
        Ok(())
    }

    async fn member_id_by_username(&self, username: &str) -> Result<String> {
        UserRepository::new(self.db.pool())
            .get_by_username(username)
            .await?
            .map(|u| u.id)
            .ok_or_else(|| FmsError::NotFound(format!("member '{username}'")))
    }
}

fn validate_org_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FmsError::Validation(
            "organisation name cannot be empty".into(),
        ));
    }
    if name.chars().count() > MAX_ORG_NAME_LENGTH {
        return Err(FmsError::Validation(format!(
            "organisation name must be at most {MAX_ORG_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}
