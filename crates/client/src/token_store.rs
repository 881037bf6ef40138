//! Durable holder of the session credential.

use std::sync::Arc;

use panel_core::PanelResult;

use crate::storage::LocalStorage;

/// Slot name of the bearer token in local storage.
pub const TOKEN_SLOT: &str = "authToken";

/// Opaque bearer token proving an authenticated session.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of an `Authorization` header carrying this credential.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Pure key/value cell for the credential. No network, no validation.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn LocalStorage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    pub fn get(&self) -> Option<Credential> {
        self.storage
            .get(TOKEN_SLOT)
            .filter(|token| !token.is_empty())
            .map(Credential)
    }

    pub fn set(&self, credential: &Credential) -> PanelResult<()> {
        self.storage.set(TOKEN_SLOT, credential.as_str())
    }

    pub fn clear(&self) -> PanelResult<()> {
        self.storage.remove(TOKEN_SLOT)
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

impl core::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenStore")
            .field("present", &self.is_present())
            .finish()
    }
}
