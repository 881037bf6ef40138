//! Request and response shapes exchanged with the panel API.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use panel_auth::{Identity, RoleFlags};
use panel_core::{EmojiId, EmojiRequestId, PanelError, PanelResult, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: Identity,
}

/// Timestamps arrive as RFC 3339 or as bare `YYYY-MM-DD HH:MM:SS` (taken
/// as UTC). Anything else decodes to `None` instead of failing the row.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::String(raw)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    let naive = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok());
    if naive.is_none() {
        tracing::debug!("ignoring unparseable timestamp {raw:?}");
    }
    Ok(naive.map(|at| at.and_utc()))
}

/// Acknowledgement of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReceipt {
    pub message: String,
}

/// A row of the user management view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
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
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial update of a user. Unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_moderator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_blocked: Option<bool>,
}

impl UserPatch {
    pub fn roles(flags: RoleFlags) -> Self {
        Self {
            is_admin: Some(flags.is_admin),
            is_moderator: Some(flags.is_moderator),
            ..Self::default()
        }
    }

    pub fn verified(value: bool) -> Self {
        Self {
            is_verified: Some(value),
            ..Self::default()
        }
    }

    pub fn blocked(value: bool) -> Self {
        Self {
            is_blocked: Some(value),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    pub id: EmojiId,
    pub name: String,
    pub web_address: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vm_node_ids: Vec<String>,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub created_by_username: Option<String>,
}

/// Form payload for a new emoji.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewEmoji {
    pub name: String,
    pub web_address: String,
    pub description: String,
    pub vm_node_ids: Vec<String>,
}

impl NewEmoji {
    pub const INCOMPLETE: &'static str = "Please fill in all fields and select at least one VM.";

    /// Every field is required and at least one VM must be selected.
    pub fn validate(&self) -> PanelResult<()> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&self.name)
            || blank(&self.web_address)
            || blank(&self.description)
            || self.vm_node_ids.is_empty()
        {
            return Err(PanelError::validation(Self::INCOMPLETE));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiRequest {
    pub id: EmojiRequestId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub emoji_name: Option<String>,
    pub vm_node_id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmojisEnvelope {
    pub emojis: Vec<Emoji>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmojiRequestsEnvelope {
    pub requests: Vec<EmojiRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockedDomainsEnvelope {
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VmsEnvelope {
    pub vms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_patch_writes_both_flags() {
        let patch = UserPatch::roles(RoleFlags::moderator());
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"is_admin": false, "is_moderator": true})
        );
        assert_eq!(
            serde_json::to_value(UserPatch::blocked(true)).unwrap(),
            json!({"is_blocked": true})
        );
    }

    #[test]
    fn new_emoji_requires_every_field() {
        let mut emoji = NewEmoji {
            name: "party".to_string(),
            web_address: "https://cdn.example.com/party.png".to_string(),
            description: "party parrot".to_string(),
            vm_node_ids: vec![],
        };
        assert_eq!(
            emoji.validate().unwrap_err().inline_message(),
            NewEmoji::INCOMPLETE
        );

        emoji.vm_node_ids.push("vm-1".to_string());
        assert!(emoji.validate().is_ok());

        emoji.description = "  ".to_string();
        assert!(emoji.validate().is_err());
    }

    #[test]
    fn decodes_list_rows() {
        let users: UsersEnvelope = serde_json::from_value(json!({
            "users": [{
                "id": 2, "username": "bob", "email": "bob@example.com",
                "is_admin": false, "is_moderator": true, "is_verified": true,
                "is_blocked": false, "created_at": "2024-03-01T10:00:00Z"
            }]
        }))
        .unwrap();
        assert!(users.users[0].roles.is_moderator);
        assert!(users.users[0].created_at.is_some());

        let emojis: EmojisEnvelope = serde_json::from_value(json!({
            "emojis": [{"id": 4, "name": "wave", "web_address": "https://x/wave.png",
                        "description": "hi", "vm_node_ids": ["vm-1"], "created_by": 2}]
        }))
        .unwrap();
        assert_eq!(emojis.emojis[0].created_by, Some(UserId::new(2)));
        assert_eq!(emojis.emojis[0].created_by_username, None);
    }

    #[test]
    fn odd_timestamps_do_not_sink_the_list() {
        let users: UsersEnvelope = serde_json::from_value(json!({
            "users": [
                {"id": 1, "username": "alice", "created_at": "2024-03-01 10:00:00"},
                {"id": 2, "username": "bob", "created_at": "last tuesday"},
                {"id": 3, "username": "carol", "created_at": null}
            ]
        }))
        .unwrap();

        let expected = "2024-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(users.users[0].created_at, Some(expected));
        assert_eq!(users.users[1].created_at, None);
        assert_eq!(users.users[2].created_at, None);

        let requests: EmojiRequestsEnvelope = serde_json::from_value(json!({
            "requests": [{"id": 5, "vm_node_id": "vm-1", "created_at": "2024-03-01 10:00:00.250"}]
        }))
        .unwrap();
        assert!(requests.requests[0].created_at.is_some());
    }

    #[test]
    fn null_email_decodes_as_absent() {
        let users: UsersEnvelope = serde_json::from_value(json!({
            "users": [
                {"id": 1, "username": "alice", "email": null},
                {"id": 2, "username": "bob", "email": "bob@example.com"}
            ]
        }))
        .unwrap();

        assert_eq!(users.users[0].email, None);
        assert_eq!(users.users[1].email.as_deref(), Some("bob@example.com"));
    }
}
