use thiserror::Error;

use panel_core::{PanelError, UserId, View};

use crate::{Action, Capability, Identity, RequiredRole};

/// Capability table: minimum role per (view, action).
///
/// Fixed at build time. Pairs that are not listed are denied.
pub const CAPABILITIES: &[(Capability, RequiredRole)] = &[
    (Capability::open(View::Emojis), RequiredRole::None),
    (Capability::new(View::Emojis, Action::CreateEmoji), RequiredRole::None),
    (Capability::new(View::Emojis, Action::DeleteEmoji), RequiredRole::None),
    (Capability::open(View::Users), RequiredRole::AdminOnly),
    (Capability::new(View::Users, Action::ChangeRole), RequiredRole::AdminOnly),
    (Capability::new(View::Users, Action::SetVerified), RequiredRole::AdminOnly),
    (Capability::new(View::Users, Action::SetBlocked), RequiredRole::AdminOnly),
    (Capability::new(View::Users, Action::DeleteUser), RequiredRole::AdminOnly),
    (Capability::open(View::Administration), RequiredRole::AdminOnly),
    (Capability::new(View::Administration, Action::BlockDomain), RequiredRole::AdminOnly),
    (Capability::new(View::Administration, Action::UnblockDomain), RequiredRole::AdminOnly),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: '{capability}' requires {required}")]
    Forbidden {
        capability: Capability,
        required: RequiredRole,
    },

    #[error("forbidden: '{0}' is not a known capability")]
    Unknown(Capability),

    #[error("forbidden: {0}")]
    NotOwner(String),
}

impl From<AuthzError> for PanelError {
    fn from(value: AuthzError) -> Self {
        PanelError::Forbidden(value.to_string())
    }
}

/// Look up the minimum role for a capability.
pub fn requirement(capability: &Capability) -> Option<RequiredRole> {
    CAPABILITIES
        .iter()
        .find(|(c, _)| c == capability)
        .map(|(_, r)| *r)
}

/// Minimum role needed to open a view (the RoleView mapping).
pub fn view_requirement(view: View) -> RequiredRole {
    requirement(&Capability::open(view)).unwrap_or(RequiredRole::AdminOnly)
}

/// Authorize an identity for a capability.
///
/// - No IO
/// - No panics
/// - Absent identity is always denied
pub fn authorize(identity: Option<&Identity>, capability: &Capability) -> Result<(), AuthzError> {
    let identity = identity.ok_or(AuthzError::Unauthenticated)?;
    let required = requirement(capability).ok_or(AuthzError::Unknown(*capability))?;

    if required.is_satisfied_by(&identity.roles) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %identity.id,
            capability = %capability,
            required = %required,
            "capability denied"
        );
        Err(AuthzError::Forbidden {
            capability: *capability,
            required,
        })
    }
}

/// Emojis may be removed by admins and by whoever created them.
pub fn can_delete_emoji(identity: Option<&Identity>, created_by: Option<UserId>) -> Result<(), AuthzError> {
    let capability = Capability::new(View::Emojis, Action::DeleteEmoji);
    authorize(identity, &capability)?;

    let identity = identity.ok_or(AuthzError::Unauthenticated)?;
    if identity.is_admin() || created_by == Some(identity.id) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner(
            "only admins or the creator can delete this emoji".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoleFlags;
    use proptest::prelude::*;

    fn identity(id: i64, roles: RoleFlags) -> Identity {
        Identity {
            id: UserId::new(id),
            username: format!("user{id}"),
            email: None,
            roles,
            is_verified: true,
            is_blocked: false,
        }
    }

    #[test]
    fn role_view_mapping() {
        assert_eq!(view_requirement(View::Emojis), RequiredRole::None);
        assert_eq!(view_requirement(View::Users), RequiredRole::AdminOnly);
        assert_eq!(view_requirement(View::Administration), RequiredRole::AdminOnly);
    }

    #[test]
    fn anonymous_is_never_authorized() {
        let err = authorize(None, &Capability::open(View::Emojis)).unwrap_err();
        assert_eq!(err, AuthzError::Unauthenticated);
    }

    #[test]
    fn moderators_cannot_manage_users() {
        let moderator = identity(2, RoleFlags::moderator());
        let err = authorize(
            Some(&moderator),
            &Capability::new(View::Users, Action::DeleteUser),
        )
        .unwrap_err();

        assert!(matches!(err, AuthzError::Forbidden { required: RequiredRole::AdminOnly, .. }));
        let panel: PanelError = err.into();
        assert!(matches!(panel, PanelError::Forbidden(_)));
    }

    #[test]
    fn unlisted_pairs_are_denied() {
        let admin = identity(1, RoleFlags::admin());
        let cap = Capability::new(View::Emojis, Action::BlockDomain);
        assert_eq!(authorize(Some(&admin), &cap), Err(AuthzError::Unknown(cap)));
    }

    #[test]
    fn emoji_deletion_requires_admin_or_creator() {
        let admin = identity(1, RoleFlags::admin());
        let alice = identity(5, RoleFlags::user());

        assert!(can_delete_emoji(Some(&admin), Some(UserId::new(9))).is_ok());
        assert!(can_delete_emoji(Some(&alice), Some(UserId::new(5))).is_ok());
        assert!(matches!(
            can_delete_emoji(Some(&alice), Some(UserId::new(9))),
            Err(AuthzError::NotOwner(_))
        ));
        assert!(can_delete_emoji(Some(&alice), None).is_err());
    }

    proptest! {
        /// Property: without the admin flag, no admin-only view can be opened,
        /// whatever the moderator flag says.
        #[test]
        fn admin_only_views_need_admin(is_moderator in any::<bool>(), id in 1i64..10_000) {
            let who = identity(id, RoleFlags { is_admin: false, is_moderator });
            for view in [View::Users, View::Administration] {
                prop_assert!(authorize(Some(&who), &Capability::open(view)).is_err());
            }
            prop_assert!(authorize(Some(&who), &Capability::open(View::Emojis)).is_ok());
        }
    }
}
