//! `panel-client`
//!
//! **Responsibility:** client-side runtime of the emoji panel dashboard.
//!
//! This crate provides:
//! - Durable local slots for the session credential and rules consent
//! - A single API gateway that attaches the service secret and bearer token
//! - The session state machine (login, registration, identity check, logout)
//! - Role-gated routing with stale-refresh protection
//!
//! The server remains the authority; this client only sequences and gates
//! calls against it.

pub mod config;
pub mod consent;
pub mod dashboard;
pub mod gateway;
pub mod layout;
pub mod refresh;
pub mod resources;
pub mod router;
pub mod session;
pub mod storage;
pub mod token_store;
pub mod transport;
pub mod types;

pub use config::PanelConfig;
pub use consent::{ConsentGate, GateDecision};
pub use dashboard::{Confirm, Dashboard, Notices, REGISTER_REDIRECT_DELAY, RegisterForm, Screen};
pub use gateway::{ApiGateway, ApiPath, ApiResponse, Auth};
pub use layout::{Layout, NavVisibility, Section};
pub use refresh::{
    ApiRefresher, RefreshPayload, RefreshStatus, RefreshTarget, RefreshTicket, ViewData, ViewRefresher,
    ViewStore,
};
pub use resources::ResourceClient;
pub use router::{RefreshBatch, RouteOutcome, Router};
pub use session::{SessionController, SessionHandle, SessionState};
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
pub use token_store::{Credential, TokenStore};
pub use transport::{HttpTransport, ReqwestTransport, ScriptedTransport};
