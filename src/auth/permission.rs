//! Organisation roles and the capabilities they grant.
//!
//! A caller's role is derived once per request from two facts: whether they
//! are the organisation's creator, and their membership row if any. Handlers
//! and services then check [`Capability`] values rather than role names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{FmsError, Result};

/// Stored membership role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Editor,
    #[default]
    Viewer,
}

impl MemberRole {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Editor => "editor",
            MemberRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "editor" => Ok(MemberRole::Editor),
            "viewer" => Ok(MemberRole::Viewer),
            _ => Err(format!("invalid member role: {s}")),
        }
    }
}

impl TryFrom<String> for MemberRole {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Effective role of a user within an organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    /// The organisation's creator.
    Owner,
    Editor,
    Viewer,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Owner => "owner",
            OrgRole::Editor => "editor",
            OrgRole::Viewer => "viewer",
        }
    }

    /// Derive the role from creator match and membership.
    pub fn resolve(is_creator: bool, membership: Option<MemberRole>) -> Option<Self> {
        if is_creator {
            return Some(OrgRole::Owner);
        }
        membership.map(|role| match role {
            MemberRole::Editor => OrgRole::Editor,
            MemberRole::Viewer => OrgRole::Viewer,
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            OrgRole::Owner => Capabilities {
                can_view: true,
                can_upload: true,
                can_delete: true,
                can_invite: true,
                can_manage_members: true,
            },
            OrgRole::Editor => Capabilities {
                can_view: true,
                can_upload: true,
                can_delete: true,
                can_invite: false,
                can_manage_members: false,
            },
            OrgRole::Viewer => Capabilities {
                can_view: true,
                ..Capabilities::default()
            },
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single permission checked by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    Upload,
    Delete,
    Invite,
    ManageMembers,
}

impl Capability {
    fn describe(&self) -> &'static str {
        match self {
            Capability::View => "view this organisation",
            Capability::Upload => "upload to this organisation",
            Capability::Delete => "delete from this organisation",
            Capability::Invite => "invite users to this organisation",
            Capability::ManageMembers => "manage this organisation",
        }
    }
}

/// Capability set granted by a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    pub can_view: bool,
    pub can_upload: bool,
    pub can_delete: bool,
    pub can_invite: bool,
    pub can_manage_members: bool,
}

impl Capabilities {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.can_view,
            Capability::Upload => self.can_upload,
            Capability::Delete => self.can_delete,
            Capability::Invite => self.can_invite,
            Capability::ManageMembers => self.can_manage_members,
        }
    }
}

/// A user's resolved access to one organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrgAccess {
    pub org_id: i64,
    pub role: OrgRole,
    pub capabilities: Capabilities,
}

impl OrgAccess {
    pub fn new(org_id: i64, role: OrgRole) -> Self {
        Self {
            org_id,
            role,
            capabilities: role.capabilities(),
        }
    }

    /// Fail with `Forbidden` unless the capability is granted.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.capabilities.allows(capability) {
            Ok(())
        } else {
            Err(FmsError::Forbidden(format!(
                "{} role cannot {}",
                self.role,
                capability.describe()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_role_parse() {
        assert_eq!("Editor".parse::<MemberRole>().unwrap(), MemberRole::Editor);
        assert_eq!("viewer".parse::<MemberRole>().unwrap(), MemberRole::Viewer);
        assert!("owner".parse::<MemberRole>().is_err());
        assert_eq!(MemberRole::default(), MemberRole::Viewer);
    }

    #[test]
    fn test_resolve_role() {
        assert_eq!(OrgRole::resolve(true, None), Some(OrgRole::Owner));
        assert_eq!(
            OrgRole::resolve(true, Some(MemberRole::Viewer)),
            Some(OrgRole::Owner)
        );
        assert_eq!(
            OrgRole::resolve(false, Some(MemberRole::Editor)),
            Some(OrgRole::Editor)
        );
        assert_eq!(OrgRole::resolve(false, None), None);
    }

    #[test]
    fn test_owner_capabilities() {
        let caps = OrgRole::Owner.capabilities();
        assert!(caps.can_view && caps.can_upload && caps.can_delete);
        assert!(caps.can_invite && caps.can_manage_members);
    }

    #[test]
    fn test_editor_capabilities() {
        let caps = OrgRole::Editor.capabilities();
        assert!(caps.allows(Capability::Upload));
        assert!(caps.allows(Capability::Delete));
        assert!(!caps.allows(Capability::Invite));
        assert!(!caps.allows(Capability::ManageMembers));
    }

    #[test]
    fn test_viewer_capabilities() {
        let caps = OrgRole::Viewer.capabilities();
        assert!(caps.allows(Capability::View));
        assert!(!caps.allows(Capability::Upload));
        assert!(!caps.allows(Capability::Delete));
    }

    #[test]
    fn test_require() {
        let access = OrgAccess::new(1, OrgRole::Viewer);
        assert!(access.require(Capability::View).is_ok());
        let err = access.require(Capability::Upload).unwrap_err();
        assert!(matches!(err, FmsError::Forbidden(_)));
        assert_eq!(
            err.to_string(),
            "permission denied: viewer role cannot upload to this organisation"
        );
    }
}
