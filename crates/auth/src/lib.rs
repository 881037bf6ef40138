//! `panel-auth`: pure authorization boundary for the panel client.
//!
//! This crate is intentionally decoupled from HTTP and storage: it models the
//! authenticated identity and decides which views and actions it may reach.

pub mod authorize;
pub mod identity;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, authorize, can_delete_emoji, requirement, view_requirement};
pub use identity::Identity;
pub use permissions::{Action, Capability};
pub use roles::{RequiredRole, Role, RoleFlags};
