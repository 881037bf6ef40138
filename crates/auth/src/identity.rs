use serde::{Deserialize, Serialize};

use panel_core::UserId;

use crate::RoleFlags;

/// Profile of the authenticated user, as confirmed by the server.
///
/// Flags the server omits deserialize as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub roles: RoleFlags,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_blocked: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.roles.is_admin
    }

    pub fn is_moderator(&self) -> bool {
        self.roles.is_moderator
    }
}
