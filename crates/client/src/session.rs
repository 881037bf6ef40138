//! Authenticated-identity lifecycle.
//!
//! ```text
//! ANONYMOUS ──login/check──▶ AUTHENTICATING ──ok──▶ AUTHENTICATED
//!     ▲                            │                     │
//!     └──────── rejected ──────────┘◀── logout/rejected ─┘
//! ```
//!
//! [`SessionController`] is the only writer of the session context. Other
//! components read it through a [`SessionHandle`].

use std::sync::{Arc, RwLock};

use reqwest::Method;

use panel_auth::Identity;
use panel_core::{PanelError, PanelResult};

use crate::gateway::{ApiGateway, ApiPath, Auth};
use crate::token_store::{Credential, TokenStore};
use crate::types::{LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegistrationReceipt};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const REGISTRATION_OK: &str = "Registration successful! Please log in.";
const SESSION_REJECTED: &str = "Session expired. Please log in again.";
const DELETE_ACCOUNT_FAILED: &str = "Failed to delete account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Process-wide session state: lifecycle plus the confirmed identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub state: SessionState,
    pub identity: Option<Identity>,
}

impl SessionContext {
    fn authenticated(identity: Identity) -> Self {
        Self {
            state: SessionState::Authenticated,
            identity: Some(identity),
        }
    }
}

/// Read-only view of the session. Readers must tolerate a missing identity.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    context: Arc<RwLock<SessionContext>>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> SessionContext {
        self.context.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.snapshot().identity
    }

    pub fn state(&self) -> SessionState {
        self.snapshot().state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }
}

pub struct SessionController {
    gateway: Arc<ApiGateway>,
    tokens: TokenStore,
    context: Arc<RwLock<SessionContext>>,
}

impl SessionController {
    pub fn new(gateway: Arc<ApiGateway>, tokens: TokenStore) -> Self {
        Self {
            gateway,
            tokens,
            context: Arc::new(RwLock::new(SessionContext::default())),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            context: self.context.clone(),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn snapshot(&self) -> SessionContext {
        self.context.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn replace(&self, next: SessionContext) {
        let mut context = self.context.write().unwrap_or_else(|e| e.into_inner());
        if context.state != next.state {
            tracing::info!(from = ?context.state, to = ?next.state, "session transition");
        }
        *context = next;
    }

    fn set_state(&self, state: SessionState) {
        let mut next = self.snapshot();
        next.state = state;
        self.replace(next);
    }

    /// Drop the credential. A storage failure is logged; the in-memory slot
    /// is cleared regardless.
    fn clear_credential(&self) {
        if let Err(err) = self.tokens.clear() {
            tracing::error!("failed to persist credential removal: {err}");
        }
    }

    /// Authenticate with username and password.
    ///
    /// On rejection the previous session context is kept and the server's
    /// message (or "Login failed") is returned.
    pub async fn login(&self, username: &str, password: &str) -> PanelResult<Identity> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(PanelError::validation("Please enter your username and password."));
        }

        let body = serde_json::to_value(LoginRequest { username, password })
            .map_err(|e| PanelError::validation(e.to_string()))?;

        let previous = self.snapshot();
        self.set_state(SessionState::Authenticating);
        let response = match self
            .gateway
            .request(Method::POST, &ApiPath::new("login"), Some(&body), Auth::Skip)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.replace(previous);
                return Err(err);
            }
        };

        if !response.is_success() {
            let message = response
                .error_message()
                .unwrap_or_else(|| LOGIN_FAILED.to_string());
            tracing::warn!(username, status = response.status, "login rejected");
            self.replace(previous);
            return Err(PanelError::auth_rejected(message));
        }

        let login: LoginResponse = match serde_json::from_value(response.body) {
            Ok(login) => login,
            Err(err) => {
                self.replace(previous);
                return Err(PanelError::server(format!("unexpected login response: {err}")));
            }
        };

        if let Err(err) = self.tokens.set(&Credential::new(login.token)) {
            tracing::error!("credential will not survive a restart: {err}");
        }
        tracing::info!(user_id = %login.user.id, "logged in");
        self.replace(SessionContext::authenticated(login.user.clone()));
        Ok(login.user)
    }

    /// Create an account. Does not authenticate it.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> PanelResult<RegistrationReceipt> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(PanelError::validation("Please fill in all fields."));
        }

        let body = serde_json::to_value(RegisterRequest {
            username,
            email,
            password,
        })
        .map_err(|e| PanelError::validation(e.to_string()))?;

        let response = self
            .gateway
            .request(Method::POST, &ApiPath::new("register"), Some(&body), Auth::Skip)
            .await?;

        if !response.is_success() {
            tracing::warn!(username, status = response.status, "registration rejected");
            return Err(PanelError::server(
                response
                    .error_message()
                    .unwrap_or_else(|| REGISTRATION_FAILED.to_string()),
            ));
        }

        let message = response
            .body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or(REGISTRATION_OK)
            .to_string();
        tracing::info!(username, "registered");
        Ok(RegistrationReceipt { message })
    }

    /// Confirm the stored credential with the server.
    ///
    /// A rejection clears the credential and the identity together. A missing
    /// response leaves the session anonymous but keeps the credential, since
    /// it was never rejected.
    pub async fn check_identity(&self) -> PanelResult<Identity> {
        self.set_state(SessionState::Authenticating);

        let response = match self.gateway.get(&ApiPath::new("me")).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("identity check failed: {err}");
                self.replace(SessionContext::default());
                return Err(err);
            }
        };

        if !response.is_success() {
            let message = response
                .error_message()
                .unwrap_or_else(|| SESSION_REJECTED.to_string());
            tracing::warn!(status = response.status, "stored credential rejected");
            self.clear_credential();
            self.replace(SessionContext::default());
            return Err(PanelError::auth_rejected(message));
        }

        match serde_json::from_value::<MeResponse>(response.body) {
            Ok(me) => {
                self.replace(SessionContext::authenticated(me.user.clone()));
                Ok(me.user)
            }
            Err(err) => {
                self.replace(SessionContext::default());
                Err(PanelError::server(format!("unexpected identity response: {err}")))
            }
        }
    }

    /// Forget the session locally. No server call. Idempotent.
    pub fn logout(&self) {
        self.clear_credential();
        self.replace(SessionContext::default());
        tracing::info!("logged out");
    }

    /// Delete the authenticated account, then log out.
    ///
    /// Asking the user for confirmation is the caller's job.
    pub async fn delete_own_account(&self) -> PanelResult<()> {
        let identity = self
            .snapshot()
            .identity
            .ok_or_else(|| PanelError::auth_rejected("Not logged in"))?;

        let response = self
            .gateway
            .delete(&ApiPath::new("users").segment(identity.id))
            .await?;
        response.into_result(DELETE_ACCOUNT_FAILED)?;

        tracing::info!(user_id = %identity.id, "account deleted");
        self.logout();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::token_store::TOKEN_SLOT;
    use crate::transport::ScriptedTransport;
    use panel_core::UserId;
    use proptest::prelude::*;
    use serde_json::json;

    fn controller(storage: MemoryStorage) -> (SessionController, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let tokens = TokenStore::new(Arc::new(storage));
        let gateway = ApiGateway::new(transport.clone(), "http://panel.test/api", "s", tokens.clone())
            .unwrap();
        (SessionController::new(Arc::new(gateway), tokens), transport)
    }

    fn alice() -> serde_json::Value {
        json!({"id": 1, "username": "alice", "is_admin": false})
    }

    #[tokio::test]
    async fn login_stores_credential_and_identity() {
        let (session, transport) = controller(MemoryStorage::new());
        transport.on(Method::POST, "/api/login", 200, json!({"token": "T1", "user": alice()}));

        let identity = session.login("alice", "p1").await.unwrap();

        assert_eq!(identity.id, UserId::new(1));
        assert_eq!(session.tokens().get(), Some(Credential::new("T1")));
        assert_eq!(session.handle().state(), SessionState::Authenticated);

        let sent = transport.sent_to(&Method::POST, "/api/login");
        assert_eq!(sent[0].json_body(), Some(json!({"username": "alice", "password": "p1"})));
        assert_eq!(sent[0].header("authorization"), None);
    }

    #[tokio::test]
    async fn rejected_login_surfaces_server_message() {
        let (session, transport) = controller(MemoryStorage::new());
        transport.on(Method::POST, "/api/login", 401, json!({"error": "Invalid credentials"}));

        let err = session.login("alice", "wrong").await.unwrap_err();

        assert_eq!(err, PanelError::auth_rejected("Invalid credentials"));
        assert_eq!(err.inline_message(), "Invalid credentials");
        assert!(session.tokens().get().is_none());
        assert_eq!(session.handle().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn rejected_login_without_message_uses_default() {
        let (session, transport) = controller(MemoryStorage::new());
        transport.on(Method::POST, "/api/login", 500, json!({}));

        let err = session.login("alice", "p1").await.unwrap_err();
        assert_eq!(err.inline_message(), LOGIN_FAILED);
    }

    #[tokio::test]
    async fn login_network_failure_is_generic() {
        let (session, transport) = controller(MemoryStorage::new());
        transport.fail(Method::POST, "/api/login", "connection refused");

        let err = session.login("alice", "p1").await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.inline_message(), "Network error. Please try again.");
        assert_eq!(session.handle().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn blank_login_fields_never_reach_the_server() {
        let (session, transport) = controller(MemoryStorage::new());
        let err = session.login("  ", "p1").await.unwrap_err();
        assert!(matches!(err, PanelError::Validation(_)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn stale_credential_is_cleared_with_identity() {
        let (session, transport) = controller(MemoryStorage::new().with_slot(TOKEN_SLOT, "stale"));
        transport.on(Method::GET, "/api/me", 401, json!({"error": "Invalid token"}));

        let err = session.check_identity().await.unwrap_err();

        assert_eq!(err, PanelError::auth_rejected("Invalid token"));
        assert!(session.tokens().get().is_none());
        assert!(session.handle().identity().is_none());
        assert_eq!(
            transport.sent()[0].header("authorization"),
            Some("Bearer stale")
        );
    }

    #[tokio::test]
    async fn identity_check_network_failure_keeps_credential() {
        let (session, transport) = controller(MemoryStorage::new().with_slot(TOKEN_SLOT, "T1"));
        transport.fail(Method::GET, "/api/me", "offline");

        assert!(session.check_identity().await.unwrap_err().is_network());
        assert!(session.handle().identity().is_none());
        assert_eq!(session.handle().state(), SessionState::Anonymous);
        assert_eq!(session.tokens().get(), Some(Credential::new("T1")));
    }

    #[tokio::test]
    async fn identity_check_populates_identity() {
        let (session, transport) = controller(MemoryStorage::new().with_slot(TOKEN_SLOT, "T1"));
        transport.on(Method::GET, "/api/me", 200, json!({"user": alice()}));

        let identity = session.check_identity().await.unwrap();
        assert_eq!(identity.username, "alice");
        assert!(session.handle().is_authenticated());
    }

    #[tokio::test]
    async fn registration_does_not_authenticate() {
        let (session, transport) = controller(MemoryStorage::new());
        transport.on(Method::POST, "/api/register", 201, json!({"message": "Check your inbox"}));

        let receipt = session.register("dave", "dave@example.com", "pw").await.unwrap();

        assert_eq!(receipt.message, "Check your inbox");
        assert!(session.tokens().get().is_none());
        assert_eq!(session.handle().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn registration_rejection_falls_back() {
        let (session, transport) = controller(MemoryStorage::new());
        transport.on(Method::POST, "/api/register", 400, json!(null));

        let err = session.register("dave", "dave@example.com", "pw").await.unwrap_err();
        assert_eq!(err, PanelError::server(REGISTRATION_FAILED));
    }

    #[tokio::test]
    async fn delete_account_logs_out_on_success() {
        let (session, transport) = controller(MemoryStorage::new());
        transport
            .on(Method::POST, "/api/login", 200, json!({"token": "T1", "user": alice()}))
            .on(Method::DELETE, "/api/users/1", 200, json!({"ok": true}));

        session.login("alice", "p1").await.unwrap();
        session.delete_own_account().await.unwrap();

        assert!(session.tokens().get().is_none());
        assert!(session.handle().identity().is_none());
    }

    #[tokio::test]
    async fn delete_account_failure_keeps_session() {
        let (session, transport) = controller(MemoryStorage::new());
        transport
            .on(Method::POST, "/api/login", 200, json!({"token": "T1", "user": alice()}))
            .on(Method::DELETE, "/api/users/1", 403, json!({"error": "Admins cannot be deleted"}));

        session.login("alice", "p1").await.unwrap();
        let err = session.delete_own_account().await.unwrap_err();

        assert_eq!(err.inline_message(), "Admins cannot be deleted");
        assert!(session.handle().is_authenticated());
        assert_eq!(session.tokens().get(), Some(Credential::new("T1")));
    }

    proptest! {
        /// Property: any interleaving of logins and logouts that ends with a
        /// logout leaves neither credential nor identity behind.
        #[test]
        fn logout_is_total(steps in prop::collection::vec(any::<bool>(), 0..12)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (session, transport) = controller(MemoryStorage::new());
                transport.on(Method::POST, "/api/login", 200, json!({"token": "T1", "user": alice()}));

                for login in steps {
                    if login {
                        session.login("alice", "p1").await.unwrap();
                    } else {
                        session.logout();
                    }
                }
                session.logout();
                session.logout();

                assert!(session.tokens().get().is_none());
                assert!(session.handle().identity().is_none());
                assert_eq!(session.handle().state(), SessionState::Anonymous);
            });
        }
    }
}
