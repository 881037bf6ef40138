//! One-time acceptance of the usage rules.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use panel_core::PanelResult;

use crate::storage::LocalStorage;

pub const CONSENT_SLOT: &str = "rulesAccepted";
const ACCEPTED: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Prompt,
}

/// Blocks the dashboard behind the rules prompt until the flag is persisted.
///
/// Once accepted on a device the prompt is never shown again there.
pub struct ConsentGate {
    storage: Arc<dyn LocalStorage>,
    prompt_open: AtomicBool,
}

impl ConsentGate {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            prompt_open: AtomicBool::new(false),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.storage.get(CONSENT_SLOT).as_deref() == Some(ACCEPTED)
    }

    pub fn is_prompt_open(&self) -> bool {
        self.prompt_open.load(Ordering::SeqCst)
    }

    /// Decide what happens on entering the authenticated state.
    pub fn on_authenticated(&self) -> GateDecision {
        if self.is_accepted() {
            self.prompt_open.store(false, Ordering::SeqCst);
            GateDecision::Proceed
        } else {
            tracing::info!("usage rules not yet accepted");
            self.prompt_open.store(true, Ordering::SeqCst);
            GateDecision::Prompt
        }
    }

    /// Persist acceptance and close the prompt.
    pub fn accept(&self) -> PanelResult<()> {
        self.storage.set(CONSENT_SLOT, ACCEPTED)?;
        self.prompt_open.store(false, Ordering::SeqCst);
        tracing::info!("usage rules accepted");
        Ok(())
    }

    /// Attempt to close the prompt without accepting. Returns whether it closed.
    pub fn try_dismiss(&self) -> bool {
        if self.is_prompt_open() && !self.is_accepted() {
            tracing::debug!("rules prompt cannot be dismissed before acceptance");
            return false;
        }
        self.prompt_open.store(false, Ordering::SeqCst);
        true
    }

    /// Hide the prompt without touching the flag, e.g. on logout.
    pub fn close_prompt(&self) {
        self.prompt_open.store(false, Ordering::SeqCst);
    }
}

impl core::fmt::Debug for ConsentGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConsentGate")
            .field("accepted", &self.is_accepted())
            .field("prompt_open", &self.is_prompt_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use proptest::prelude::*;

    #[test]
    fn fresh_device_prompts() {
        let gate = ConsentGate::new(Arc::new(MemoryStorage::new()));
        assert_eq!(gate.on_authenticated(), GateDecision::Prompt);
        assert!(gate.is_prompt_open());
    }

    #[test]
    fn prompt_cannot_be_dismissed_without_accepting() {
        let gate = ConsentGate::new(Arc::new(MemoryStorage::new()));
        gate.on_authenticated();

        assert!(!gate.try_dismiss());
        assert!(gate.is_prompt_open());

        gate.accept().unwrap();
        assert!(!gate.is_prompt_open());
        assert!(gate.try_dismiss());
    }

    #[test]
    fn acceptance_is_persisted_for_later_sessions() {
        let storage = Arc::new(MemoryStorage::new());
        ConsentGate::new(storage.clone()).accept().unwrap();

        assert_eq!(storage.get(CONSENT_SLOT).as_deref(), Some("true"));
        let gate = ConsentGate::new(storage);
        assert_eq!(gate.on_authenticated(), GateDecision::Proceed);
    }

    #[test]
    fn only_the_literal_true_counts() {
        let gate = ConsentGate::new(Arc::new(MemoryStorage::new().with_slot(CONSENT_SLOT, "yes")));
        assert_eq!(gate.on_authenticated(), GateDecision::Prompt);
    }

    proptest! {
        /// Property: after one acceptance no sequence of sessions prompts again.
        #[test]
        fn accepted_never_prompts(sessions in 1usize..20, dismiss in any::<bool>()) {
            let gate = ConsentGate::new(Arc::new(MemoryStorage::new()));
            gate.on_authenticated();
            gate.accept().unwrap();
            for _ in 0..sessions {
                if dismiss {
                    prop_assert!(gate.try_dismiss());
                }
                gate.close_prompt();
                prop_assert_eq!(gate.on_authenticated(), GateDecision::Proceed);
            }
        }
    }
}
