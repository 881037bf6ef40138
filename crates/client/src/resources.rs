//! Authenticated calls against the dashboard's REST resources.
//!
//! Every call goes through [`ApiGateway`]; non-2xx responses become
//! [`PanelError::Server`] carrying the server's message or a per-action
//! fallback.

use std::sync::Arc;

use serde_json::json;

use panel_auth::Role;
use panel_core::{EmojiId, PanelError, PanelResult, UserId};

use crate::gateway::{ApiGateway, ApiPath};
use crate::types::{
    BlockedDomainsEnvelope, Emoji, EmojiRequest, EmojiRequestsEnvelope, EmojisEnvelope, NewEmoji,
    UserPatch, UserRecord, UsersEnvelope, VmsEnvelope,
};

/// Page size for the moderation request list.
pub const EMOJI_REQUEST_LIMIT: u32 = 100;

const EMPTY_DOMAIN: &str = "Please enter a domain name.";

#[derive(Clone)]
pub struct ResourceClient {
    gateway: Arc<ApiGateway>,
}

impl ResourceClient {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list_vms(&self) -> PanelResult<Vec<String>> {
        let envelope: VmsEnvelope = self
            .gateway
            .get(&ApiPath::new("vms"))
            .await?
            .decode("Failed to load VMs")?;
        Ok(envelope.vms)
    }

    // ---- users ----

    pub async fn list_users(&self) -> PanelResult<Vec<UserRecord>> {
        let envelope: UsersEnvelope = self
            .gateway
            .get(&ApiPath::new("users"))
            .await?
            .decode("Failed to load users")?;
        Ok(envelope.users)
    }

    async fn patch_user(&self, id: UserId, patch: &UserPatch, fallback: &str) -> PanelResult<()> {
        let body = serde_json::to_value(patch).map_err(|e| PanelError::validation(e.to_string()))?;
        self.gateway
            .patch(&ApiPath::new("users").segment(id), &body)
            .await?
            .into_result(fallback)?;
        Ok(())
    }

    /// Set both role flags from a single-select role.
    pub async fn set_user_role(&self, id: UserId, role: Role) -> PanelResult<()> {
        self.patch_user(id, &UserPatch::roles(role.flags()), "Failed to update user role")
            .await
    }

    pub async fn set_user_verified(&self, id: UserId, verified: bool) -> PanelResult<()> {
        self.patch_user(id, &UserPatch::verified(verified), "Failed to update user")
            .await
    }

    pub async fn set_user_blocked(&self, id: UserId, blocked: bool) -> PanelResult<()> {
        self.patch_user(id, &UserPatch::blocked(blocked), "Failed to update user")
            .await
    }

    pub async fn delete_user(&self, id: UserId) -> PanelResult<()> {
        self.gateway
            .delete(&ApiPath::new("users").segment(id))
            .await?
            .into_result("Failed to delete user")?;
        Ok(())
    }

    // ---- emojis ----

    pub async fn list_emojis(&self) -> PanelResult<Vec<Emoji>> {
        let envelope: EmojisEnvelope = self
            .gateway
            .get(&ApiPath::new("emojis"))
            .await?
            .decode("Failed to load emojis")?;
        Ok(envelope.emojis)
    }

    /// Validates locally before any request is made.
    pub async fn create_emoji(&self, emoji: &NewEmoji) -> PanelResult<()> {
        emoji.validate()?;
        let body = serde_json::to_value(emoji).map_err(|e| PanelError::validation(e.to_string()))?;
        self.gateway
            .post(&ApiPath::new("emojis"), &body)
            .await?
            .into_result("Failed to create emoji")?;
        Ok(())
    }

    pub async fn delete_emoji(&self, id: EmojiId) -> PanelResult<()> {
        self.gateway
            .delete(&ApiPath::new("emojis").segment(id))
            .await?
            .into_result("Failed to delete emoji")?;
        Ok(())
    }

    // ---- moderation ----

    pub async fn list_emoji_requests(&self) -> PanelResult<Vec<EmojiRequest>> {
        let envelope: EmojiRequestsEnvelope = self
            .gateway
            .get(&ApiPath::new("emoji-requests").query("limit", EMOJI_REQUEST_LIMIT))
            .await?
            .decode("Failed to load emoji requests")?;
        Ok(envelope.requests)
    }

    pub async fn list_blocked_domains(&self) -> PanelResult<Vec<String>> {
        let envelope: BlockedDomainsEnvelope = self
            .gateway
            .get(&ApiPath::new("blocked-domains"))
            .await?
            .decode("Failed to load blocked domains")?;
        Ok(envelope.domains)
    }

    /// Returns the trimmed domain that was submitted.
    pub async fn add_blocked_domain(&self, domain: &str) -> PanelResult<String> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(PanelError::validation(EMPTY_DOMAIN));
        }
        self.gateway
            .post(&ApiPath::new("blocked-domains"), &json!({ "domain": domain }))
            .await?
            .into_result("Failed to add blocked domain")?;
        Ok(domain.to_string())
    }

    pub async fn remove_blocked_domain(&self, domain: &str) -> PanelResult<()> {
        self.gateway
            .delete(&ApiPath::new("blocked-domains").segment(domain))
            .await?
            .into_result("Failed to remove blocked domain")?;
        Ok(())
    }
}

impl core::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("base_url", &self.gateway.base_url().as_str())
            .finish()
    }
}
