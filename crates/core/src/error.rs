//! Client error model.

use thiserror::Error;

/// Result type used across the panel client.
pub type PanelResult<T> = Result<T, PanelError>;

/// Message shown whenever a request could not complete at all.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Panel-level error.
///
/// Every variant is local to the action that produced it; none of them is
/// retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PanelError {
    /// Startup configuration is missing or malformed. Fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server rejected the presented credentials.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// Client-side validation failed; no request was issued.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Non-2xx response carrying (or defaulting) a message.
    #[error("server error: {0}")]
    Server(String),

    /// The request could not complete (no response).
    #[error("network error: {0}")]
    Network(String),

    /// The current identity lacks the role for this action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A durable storage slot could not be written.
    #[error("storage error: {0}")]
    Storage(String),

    /// A destructive action was not confirmed.
    #[error("cancelled")]
    Cancelled,
}

impl PanelError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn auth_rejected(msg: impl Into<String>) -> Self {
        Self::AuthRejected(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// The text an inline error slot should display for this error.
    ///
    /// Server-provided messages are passed through verbatim; transport
    /// failures collapse to one generic message.
    pub fn inline_message(&self) -> String {
        match self {
            Self::AuthRejected(msg)
            | Self::Validation(msg)
            | Self::Server(msg)
            | Self::Forbidden(msg)
            | Self::Configuration(msg) => msg.clone(),
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Storage(_) => "Could not save local data.".to_string(),
            Self::Cancelled => String::new(),
        }
    }

    /// True for failures where the server never answered.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
