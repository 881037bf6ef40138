use serde::{Deserialize, Serialize};

use panel_core::View;

/// Something an identity can do inside a view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Open the view and load its data.
    Open,
    CreateEmoji,
    DeleteEmoji,
    ChangeRole,
    SetVerified,
    SetBlocked,
    DeleteUser,
    BlockDomain,
    UnblockDomain,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Open => "open",
            Action::CreateEmoji => "create_emoji",
            Action::DeleteEmoji => "delete_emoji",
            Action::ChangeRole => "change_role",
            Action::SetVerified => "set_verified",
            Action::SetBlocked => "set_blocked",
            Action::DeleteUser => "delete_user",
            Action::BlockDomain => "block_domain",
            Action::UnblockDomain => "unblock_domain",
        }
    }
}

/// A (view, action) pair, the key of the capability table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub view: View,
    pub action: Action,
}

impl Capability {
    pub const fn new(view: View, action: Action) -> Self {
        Self { view, action }
    }

    pub const fn open(view: View) -> Self {
        Self::new(view, Action::Open)
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.view, self.action.as_str())
    }
}
