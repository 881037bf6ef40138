//! Location → view resolution, gating, and refresh dispatch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::task::JoinHandle;

use panel_auth::{Capability, Identity, authorize};
use panel_core::{PanelError, PanelResult, View};

use crate::layout::Layout;
use crate::refresh::{Generation, RefreshStatus, RefreshTarget, RefreshTicket, ViewRefresher, refresh_plan};
use crate::session::SessionHandle;

/// Refreshes started by one navigation, in issue order.
#[derive(Debug)]
pub struct RefreshBatch {
    pub ticket: RefreshTicket,
    handles: Vec<(RefreshTarget, JoinHandle<PanelResult<RefreshStatus>>)>,
}

impl RefreshBatch {
    pub fn targets(&self) -> Vec<RefreshTarget> {
        self.handles.iter().map(|(target, _)| *target).collect()
    }

    /// Wait for every refresh in the batch. Completion order is not observed.
    pub async fn wait(self) -> Vec<(RefreshTarget, PanelResult<RefreshStatus>)> {
        let mut results = Vec::with_capacity(self.handles.len());
        for (target, handle) in self.handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(target_list = %target, "refresh task did not finish: {err}");
                    Err(PanelError::Cancelled)
                }
            };
            results.push((target, result));
        }
        results
    }
}

#[derive(Debug)]
pub enum RouteOutcome {
    /// No identity; the login screen is shown.
    Login,
    /// Navigation is held back behind the rules prompt.
    Suspended,
    Rendered {
        requested: View,
        view: View,
        batch: RefreshBatch,
    },
}

impl RouteOutcome {
    pub fn view(&self) -> Option<View> {
        match self {
            RouteOutcome::Rendered { view, .. } => Some(*view),
            _ => None,
        }
    }

    /// Wait for the navigation's refreshes, if any were started.
    pub async fn settle(self) -> Vec<(RefreshTarget, PanelResult<RefreshStatus>)> {
        match self {
            RouteOutcome::Rendered { batch, .. } => batch.wait().await,
            _ => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct Router {
    session: SessionHandle,
    layout: Arc<RwLock<Layout>>,
    generation: Generation,
    refreshers: Arc<HashMap<RefreshTarget, Arc<dyn ViewRefresher>>>,
}

impl Router {
    pub fn new(session: SessionHandle, refreshers: Vec<Arc<dyn ViewRefresher>>) -> Self {
        let refreshers = refreshers
            .into_iter()
            .map(|refresher| (refresher.target(), refresher))
            .collect();
        Self {
            session,
            layout: Arc::new(RwLock::new(Layout::default())),
            generation: Generation::default(),
            refreshers: Arc::new(refreshers),
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn with_layout<R>(&self, f: impl FnOnce(&mut Layout) -> R) -> R {
        let mut layout = self.layout.write().unwrap_or_else(|e| e.into_inner());
        f(&mut layout)
    }

    /// Show the login screen and supersede any in-flight refresh.
    pub fn show_login(&self) {
        self.generation.advance(View::default());
        self.with_layout(Layout::show_login);
    }

    pub fn show_register(&self) {
        self.generation.advance(View::default());
        self.with_layout(Layout::show_register);
    }

    pub fn show_dashboard(&self, identity: &Identity) {
        self.with_layout(|layout| layout.show_dashboard(identity));
    }

    /// Resolve `location`, gate it by role, activate it, and start its refreshers.
    ///
    /// A view the identity may not open falls back to the default view.
    pub fn navigate(&self, location: &str) -> RouteOutcome {
        let Some(identity) = self.session.identity() else {
            self.show_login();
            return RouteOutcome::Login;
        };

        let requested = View::from_location(location);
        let view = match authorize(Some(&identity), &Capability::open(requested)) {
            Ok(()) => requested,
            Err(err) => {
                tracing::warn!(user_id = %identity.id, %requested, "not rendering view: {err}");
                View::default()
            }
        };

        self.with_layout(|layout| layout.activate(view));
        let ticket = self.generation.advance(view);
        tracing::debug!(%view, generation = ticket.generation(), "navigated");

        RouteOutcome::Rendered {
            requested,
            view,
            batch: self.spawn(ticket),
        }
    }

    /// Re-run a view's refreshers under the current navigation.
    pub fn refresh_view(&self, view: View) -> RefreshBatch {
        self.spawn(self.generation.ticket(view))
    }

    fn spawn(&self, ticket: RefreshTicket) -> RefreshBatch {
        let handles = refresh_plan(ticket.view())
            .iter()
            .filter_map(|target| {
                let Some(refresher) = self.refreshers.get(target).cloned() else {
                    tracing::warn!(target_list = %target, "no refresher registered");
                    return None;
                };
                let ticket = ticket.clone();
                Some((
                    *target,
                    tokio::spawn(async move { refresher.refresh(ticket).await }),
                ))
            })
            .collect();

        RefreshBatch { ticket, handles }
    }
}

impl core::fmt::Debug for Router {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Router")
            .field("layout", &self.layout())
            .field("generation", &self.generation.current())
            .finish()
    }
}
