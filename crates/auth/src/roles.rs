use serde::{Deserialize, Serialize};

/// Role flags carried by an identity.
///
/// The server stores both flags independently; nothing here assumes they are
/// mutually exclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoleFlags {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_moderator: bool,
}

impl RoleFlags {
    pub const fn user() -> Self {
        Self {
            is_admin: false,
            is_moderator: false,
        }
    }

    pub const fn moderator() -> Self {
        Self {
            is_admin: false,
            is_moderator: true,
        }
    }

    pub const fn admin() -> Self {
        Self {
            is_admin: true,
            is_moderator: false,
        }
    }
}

/// Single-select role used by the user management view.
///
/// Derived from [`RoleFlags`] with admin taking precedence. Setting a role
/// writes both flags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn from_flags(flags: RoleFlags) -> Self {
        if flags.is_admin {
            Role::Admin
        } else if flags.is_moderator {
            Role::Moderator
        } else {
            Role::User
        }
    }

    /// The full flag update that assigning this role implies.
    pub fn flags(self) -> RoleFlags {
        match self {
            Role::User => RoleFlags::user(),
            Role::Moderator => RoleFlags::moderator(),
            Role::Admin => RoleFlags::admin(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Minimum role needed to reach a view or perform an action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredRole {
    /// Any authenticated identity.
    None,
    ModeratorOrAdmin,
    AdminOnly,
}

impl RequiredRole {
    pub fn is_satisfied_by(&self, roles: &RoleFlags) -> bool {
        match self {
            RequiredRole::None => true,
            RequiredRole::ModeratorOrAdmin => roles.is_admin || roles.is_moderator,
            RequiredRole::AdminOnly => roles.is_admin,
        }
    }
}

impl core::fmt::Display for RequiredRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RequiredRole::None => f.write_str("none"),
            RequiredRole::ModeratorOrAdmin => f.write_str("moderator-or-admin"),
            RequiredRole::AdminOnly => f.write_str("admin-only"),
        }
    }
}
