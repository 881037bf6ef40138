//! Wiring of session, consent, routing and resources into one runtime.
//!
//! The [`Dashboard`] is what a front end drives: it turns user intents
//! (log in, open a page, delete a user) into the gated sequence of calls
//! and keeps the inline messages a screen would show.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;

use panel_auth::{Action, Capability, Identity, Role, authorize, can_delete_emoji};
use panel_core::{EmojiId, PanelError, PanelResult, UserId, View};

use crate::config::PanelConfig;
use crate::consent::{ConsentGate, GateDecision};
use crate::gateway::ApiGateway;
use crate::layout::Layout;
use crate::refresh::{ApiRefresher, ViewData, ViewStore};
use crate::resources::ResourceClient;
use crate::router::{RefreshBatch, RouteOutcome, Router};
use crate::session::{SessionController, SessionHandle, SessionState};
use crate::storage::{FileStorage, LocalStorage};
use crate::token_store::TokenStore;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{NewEmoji, RegistrationReceipt};

/// Pause between a successful registration and the switch to the login screen.
pub const REGISTER_REDIRECT_DELAY: Duration = Duration::from_millis(2000);

const CONFIRM_DELETE_ACCOUNT: &str =
    "Are you sure you want to delete your account? This cannot be undone.";
const CONFIRM_DELETE_USER: &str = "Are you sure you want to delete this user? This cannot be undone.";
const CONFIRM_DELETE_EMOJI: &str = "Are you sure you want to delete this emoji?";

/// Explicit affirmative step before a destructive request.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Inline messages next to the login and registration forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notices {
    pub login_error: Option<String>,
    pub register_error: Option<String>,
    pub register_success: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Everything a renderer needs, captured at one instant.
#[derive(Debug, Clone)]
pub struct Screen {
    pub state: SessionState,
    pub identity: Option<Identity>,
    pub location: String,
    pub layout: Layout,
    pub rules_prompt_open: bool,
    pub notices: Notices,
    pub data: ViewData,
    pub vms: Vec<String>,
}

pub struct Dashboard {
    session: SessionController,
    consent: ConsentGate,
    router: Router,
    resources: ResourceClient,
    store: Arc<ViewStore>,
    location: RwLock<String>,
    vms: Arc<RwLock<Vec<String>>>,
    vms_task: Mutex<Option<JoinHandle<()>>>,
    notices: RwLock<Notices>,
    register_redirect_delay: Duration,
}

impl Dashboard {
    /// Fails with a configuration error when no API URL is set.
    pub fn new(
        config: &PanelConfig,
        storage: Arc<dyn LocalStorage>,
        transport: Arc<dyn HttpTransport>,
    ) -> PanelResult<Self> {
        let api_base = config.api_base()?;
        let tokens = TokenStore::new(storage.clone());
        let gateway = Arc::new(ApiGateway::new(
            transport,
            &api_base,
            config.api_secret.clone(),
            tokens.clone(),
        )?);
        tracing::info!(api_base = %gateway.base_url(), "dashboard configured");

        let session = SessionController::new(gateway.clone(), tokens);
        let store = Arc::new(ViewStore::new());
        let resources = ResourceClient::new(gateway);
        let router = Router::new(session.handle(), ApiRefresher::all(&resources, &store));

        Ok(Self {
            session,
            consent: ConsentGate::new(storage),
            router,
            resources,
            store,
            location: RwLock::new(String::new()),
            vms: Arc::new(RwLock::new(Vec::new())),
            vms_task: Mutex::new(None),
            notices: RwLock::new(Notices::default()),
            register_redirect_delay: REGISTER_REDIRECT_DELAY,
        })
    }

    /// File-backed storage and the reqwest transport.
    pub fn from_config(config: &PanelConfig) -> PanelResult<Self> {
        let storage = FileStorage::open(config.storage_path_or_default()?);
        Self::new(config, Arc::new(storage), Arc::new(ReqwestTransport::new()))
    }

    pub fn with_register_redirect_delay(mut self, delay: Duration) -> Self {
        self.register_redirect_delay = delay;
        self
    }

    pub fn session(&self) -> SessionHandle {
        self.session.handle()
    }

    pub fn resources(&self) -> &ResourceClient {
        &self.resources
    }

    fn set_location(&self, location: &str) {
        *self.location.write().unwrap_or_else(|e| e.into_inner()) = location.to_string();
    }

    fn location(&self) -> String {
        self.location.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update_notices(&self, f: impl FnOnce(&mut Notices)) {
        let mut notices = self.notices.write().unwrap_or_else(|e| e.into_inner());
        f(&mut *notices);
    }

    pub fn screen(&self) -> Screen {
        let session = self.session.handle().snapshot();
        Screen {
            state: session.state,
            identity: session.identity,
            location: self.location(),
            layout: self.router.layout(),
            rules_prompt_open: self.consent.is_prompt_open(),
            notices: self.notices.read().unwrap_or_else(|e| e.into_inner()).clone(),
            data: self.store.snapshot(),
            vms: self.vms.read().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }

    // ---- session ----

    /// Initial load: confirm a stored credential, or show the login screen.
    pub async fn startup(&self, location: &str) -> RouteOutcome {
        self.set_location(location);
        if !self.session.tokens().is_present() {
            self.router.show_login();
            return RouteOutcome::Login;
        }

        match self.session.check_identity().await {
            Ok(identity) => self.on_authenticated(identity).await,
            Err(err) => {
                tracing::info!("stored session not restored: {err}");
                self.router.show_login();
                RouteOutcome::Login
            }
        }
    }

    /// Runs on every transition into the authenticated state.
    ///
    /// Routing never waits on the VM list; it loads in the background.
    async fn on_authenticated(&self, identity: Identity) -> RouteOutcome {
        self.router.show_dashboard(&identity);

        let outcome = match self.consent.on_authenticated() {
            GateDecision::Prompt => RouteOutcome::Suspended,
            GateDecision::Proceed => self.router.navigate(&self.location()),
        };
        self.spawn_vms_load();
        outcome
    }

    fn spawn_vms_load(&self) {
        let resources = self.resources.clone();
        let vms = self.vms.clone();
        let session = self.session.handle();
        let task = tokio::spawn(async move {
            match resources.list_vms().await {
                // A logout while the request was in flight wins.
                Ok(list) if session.is_authenticated() => {
                    *vms.write().unwrap_or_else(|e| e.into_inner()) = list;
                }
                Ok(_) => tracing::debug!("discarding VM list loaded after logout"),
                Err(err) => tracing::warn!("failed to load VMs: {err}"),
            }
        });

        let previous = self
            .vms_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Wait for the background VM list load started by the last login, if any.
    pub async fn vms_loaded(&self) {
        let task = self
            .vms_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::debug!("VM list load did not finish: {err}");
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> PanelResult<RouteOutcome> {
        self.update_notices(|n| n.login_error = None);
        match self.session.login(username, password).await {
            Ok(identity) => Ok(self.on_authenticated(identity).await),
            Err(err) => {
                self.update_notices(|n| n.login_error = Some(err.inline_message()));
                Err(err)
            }
        }
    }

    /// Submit the registration form. On success the form is cleared and the
    /// login screen follows after the redirect delay, unless someone has
    /// logged in by then.
    pub async fn register(&self, form: &mut RegisterForm) -> PanelResult<RegistrationReceipt> {
        self.update_notices(|n| {
            n.register_error = None;
            n.register_success = None;
        });

        let receipt = match self
            .session
            .register(&form.username, &form.email, &form.password)
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                self.update_notices(|n| n.register_error = Some(err.inline_message()));
                return Err(err);
            }
        };

        self.update_notices(|n| n.register_success = Some(receipt.message.clone()));
        form.clear();

        let router = self.router.clone();
        let session = self.session.handle();
        let delay = self.register_redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if session.state() == SessionState::Anonymous {
                router.show_login();
            }
        });

        Ok(receipt)
    }

    pub fn show_register(&self) {
        self.update_notices(|n| *n = Notices::default());
        self.router.show_register();
    }

    pub fn show_login(&self) {
        self.update_notices(|n| *n = Notices::default());
        self.router.show_login();
    }

    /// Local logout. Always succeeds.
    pub fn logout(&self) {
        self.session.logout();
        self.reset_to_login();
    }

    fn reset_to_login(&self) {
        self.consent.close_prompt();
        self.store.clear();
        if let Some(task) = self.vms_task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
        self.vms.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.router.show_login();
    }

    pub async fn delete_account(&self, confirm: &dyn Confirm) -> PanelResult<()> {
        if !confirm.confirm(CONFIRM_DELETE_ACCOUNT) {
            return Err(PanelError::Cancelled);
        }
        self.session.delete_own_account().await?;
        self.reset_to_login();
        Ok(())
    }

    // ---- navigation ----

    /// Navigation requested while the rules prompt is open is recorded and
    /// replayed on acceptance.
    pub fn navigate(&self, location: &str) -> RouteOutcome {
        self.set_location(location);
        if self.consent.is_prompt_open() {
            return RouteOutcome::Suspended;
        }
        self.router.navigate(location)
    }

    pub fn accept_consent(&self) -> PanelResult<RouteOutcome> {
        self.consent.accept()?;
        Ok(self.router.navigate(&self.location()))
    }

    pub fn try_dismiss_consent(&self) -> bool {
        self.consent.try_dismiss()
    }

    // ---- gated actions ----

    fn require(&self, view: View, action: Action) -> PanelResult<Identity> {
        let identity = self.session.handle().identity();
        authorize(identity.as_ref(), &Capability::new(view, action))?;
        identity.ok_or_else(|| PanelError::auth_rejected("Not logged in"))
    }

    pub async fn set_user_role(&self, id: UserId, role: Role) -> PanelResult<RefreshBatch> {
        let me = self.require(View::Users, Action::ChangeRole)?;
        if me.id == id {
            return Err(PanelError::Forbidden("You cannot change your own role".to_string()));
        }
        self.resources.set_user_role(id, role).await?;
        Ok(self.router.refresh_view(View::Users))
    }

    pub async fn set_user_verified(&self, id: UserId, verified: bool) -> PanelResult<()> {
        self.require(View::Users, Action::SetVerified)?;
        self.resources.set_user_verified(id, verified).await
    }

    pub async fn set_user_blocked(&self, id: UserId, blocked: bool) -> PanelResult<()> {
        self.require(View::Users, Action::SetBlocked)?;
        self.resources.set_user_blocked(id, blocked).await
    }

    pub async fn delete_user(&self, id: UserId, confirm: &dyn Confirm) -> PanelResult<RefreshBatch> {
        let me = self.require(View::Users, Action::DeleteUser)?;
        if me.id == id {
            return Err(PanelError::Forbidden(
                "Use account deletion to remove your own account".to_string(),
            ));
        }
        if !confirm.confirm(CONFIRM_DELETE_USER) {
            return Err(PanelError::Cancelled);
        }
        self.resources.delete_user(id).await?;
        Ok(self.router.refresh_view(View::Users))
    }

    pub async fn create_emoji(&self, emoji: &NewEmoji) -> PanelResult<RefreshBatch> {
        self.require(View::Emojis, Action::CreateEmoji)?;
        self.resources.create_emoji(emoji).await?;
        Ok(self.router.refresh_view(View::Emojis))
    }

    /// Admins may delete any emoji; others only the ones they created.
    pub async fn delete_emoji(&self, id: EmojiId, confirm: &dyn Confirm) -> PanelResult<RefreshBatch> {
        let me = self.require(View::Emojis, Action::DeleteEmoji)?;
        let created_by = self.store.emoji(id).and_then(|emoji| emoji.created_by);
        can_delete_emoji(Some(&me), created_by)?;
        if !confirm.confirm(CONFIRM_DELETE_EMOJI) {
            return Err(PanelError::Cancelled);
        }
        self.resources.delete_emoji(id).await?;
        Ok(self.router.refresh_view(View::Emojis))
    }

    pub async fn add_blocked_domain(&self, domain: &str) -> PanelResult<RefreshBatch> {
        self.require(View::Administration, Action::BlockDomain)?;
        self.resources.add_blocked_domain(domain).await?;
        Ok(self.router.refresh_view(View::Administration))
    }

    pub async fn remove_blocked_domain(
        &self,
        domain: &str,
        confirm: &dyn Confirm,
    ) -> PanelResult<RefreshBatch> {
        self.require(View::Administration, Action::UnblockDomain)?;
        if !confirm.confirm(&format!(
            "Are you sure you want to remove {domain} from the blocked list?"
        )) {
            return Err(PanelError::Cancelled);
        }
        self.resources.remove_blocked_domain(domain).await?;
        Ok(self.router.refresh_view(View::Administration))
    }
}

impl core::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dashboard")
            .field("session", &self.session.handle().state())
            .field("router", &self.router)
            .field("consent", &self.consent)
            .finish()
    }
}
