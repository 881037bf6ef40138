//! Per-view data loaders and the store their results land in.
//!
//! Every navigation advances a shared [`Generation`]. A refresher carries the
//! [`RefreshTicket`] it was started with; when it completes, its result is
//! applied only if no newer navigation has happened in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use panel_core::{EmojiId, PanelResult, View};

use crate::resources::ResourceClient;
use crate::types::{Emoji, EmojiRequest, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshTarget {
    Emojis,
    Users,
    BlockedDomains,
    EmojiRequests,
}

impl RefreshTarget {
    pub const ALL: [RefreshTarget; 4] = [
        RefreshTarget::Emojis,
        RefreshTarget::Users,
        RefreshTarget::BlockedDomains,
        RefreshTarget::EmojiRequests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshTarget::Emojis => "emojis",
            RefreshTarget::Users => "users",
            RefreshTarget::BlockedDomains => "blocked-domains",
            RefreshTarget::EmojiRequests => "emoji-requests",
        }
    }
}

impl core::fmt::Display for RefreshTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refreshers for a view, in the order they are issued.
pub fn refresh_plan(view: View) -> &'static [RefreshTarget] {
    match view {
        View::Emojis => &[RefreshTarget::Emojis],
        View::Users => &[RefreshTarget::Users],
        View::Administration => &[RefreshTarget::BlockedDomains, RefreshTarget::EmojiRequests],
    }
}

/// Shared navigation counter.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Start a new navigation; every earlier ticket becomes stale.
    pub fn advance(&self, view: View) -> RefreshTicket {
        let generation = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        RefreshTicket {
            generation,
            view,
            counter: self.clone(),
        }
    }

    /// Ticket for the current navigation, without superseding it.
    pub fn ticket(&self, view: View) -> RefreshTicket {
        RefreshTicket {
            generation: self.current(),
            view,
            counter: self.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshTicket {
    generation: u64,
    view: View,
    counter: Generation,
}

impl RefreshTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_current(&self) -> bool {
        self.counter.current() == self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Applied,
    /// A newer navigation superseded this refresh before it completed.
    Discarded,
}

/// A fetched list, tagged with where it belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshPayload {
    Emojis(Vec<Emoji>),
    Users(Vec<UserRecord>),
    BlockedDomains(Vec<String>),
    EmojiRequests(Vec<EmojiRequest>),
}

impl RefreshPayload {
    pub fn target(&self) -> RefreshTarget {
        match self {
            RefreshPayload::Emojis(_) => RefreshTarget::Emojis,
            RefreshPayload::Users(_) => RefreshTarget::Users,
            RefreshPayload::BlockedDomains(_) => RefreshTarget::BlockedDomains,
            RefreshPayload::EmojiRequests(_) => RefreshTarget::EmojiRequests,
        }
    }
}

/// Last applied data per list. `None` means never loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewData {
    pub emojis: Option<Vec<Emoji>>,
    pub users: Option<Vec<UserRecord>>,
    pub blocked_domains: Option<Vec<String>>,
    pub emoji_requests: Option<Vec<EmojiRequest>>,
}

#[derive(Debug, Default)]
pub struct ViewStore {
    data: RwLock<ViewData>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a completed refresh if its ticket is still current.
    ///
    /// The freshness check and the write happen under the same lock.
    pub fn apply(&self, ticket: &RefreshTicket, payload: RefreshPayload) -> RefreshStatus {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        if !ticket.is_current() {
            tracing::debug!(
                target_list = %payload.target(),
                generation = ticket.generation,
                current = ticket.counter.current(),
                "discarding stale refresh"
            );
            return RefreshStatus::Discarded;
        }

        match payload {
            RefreshPayload::Emojis(list) => data.emojis = Some(list),
            RefreshPayload::Users(list) => data.users = Some(list),
            RefreshPayload::BlockedDomains(list) => data.blocked_domains = Some(list),
            RefreshPayload::EmojiRequests(list) => data.emoji_requests = Some(list),
        }
        RefreshStatus::Applied
    }

    pub fn snapshot(&self) -> ViewData {
        self.data.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn emoji(&self, id: EmojiId) -> Option<Emoji> {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .emojis
            .as_ref()
            .and_then(|list| list.iter().find(|e| e.id == id).cloned())
    }

    /// Forget everything, e.g. on logout.
    pub fn clear(&self) {
        *self.data.write().unwrap_or_else(|e| e.into_inner()) = ViewData::default();
    }
}

/// Loads one list for a view.
#[async_trait]
pub trait ViewRefresher: Send + Sync {
    fn target(&self) -> RefreshTarget;

    async fn refresh(&self, ticket: RefreshTicket) -> PanelResult<RefreshStatus>;
}

/// Refresher backed by the REST resources.
pub struct ApiRefresher {
    target: RefreshTarget,
    resources: ResourceClient,
    store: Arc<ViewStore>,
}

impl ApiRefresher {
    pub fn new(target: RefreshTarget, resources: ResourceClient, store: Arc<ViewStore>) -> Self {
        Self {
            target,
            resources,
            store,
        }
    }

    /// One refresher per target, all writing into `store`.
    pub fn all(resources: &ResourceClient, store: &Arc<ViewStore>) -> Vec<Arc<dyn ViewRefresher>> {
        RefreshTarget::ALL
            .iter()
            .map(|target| {
                Arc::new(ApiRefresher::new(*target, resources.clone(), store.clone()))
                    as Arc<dyn ViewRefresher>
            })
            .collect()
    }

    async fn fetch(&self) -> PanelResult<RefreshPayload> {
        Ok(match self.target {
            RefreshTarget::Emojis => RefreshPayload::Emojis(self.resources.list_emojis().await?),
            RefreshTarget::Users => RefreshPayload::Users(self.resources.list_users().await?),
            RefreshTarget::BlockedDomains => {
                RefreshPayload::BlockedDomains(self.resources.list_blocked_domains().await?)
            }
            RefreshTarget::EmojiRequests => {
                RefreshPayload::EmojiRequests(self.resources.list_emoji_requests().await?)
            }
        })
    }
}

#[async_trait]
impl ViewRefresher for ApiRefresher {
    fn target(&self) -> RefreshTarget {
        self.target
    }

    async fn refresh(&self, ticket: RefreshTicket) -> PanelResult<RefreshStatus> {
        match self.fetch().await {
            Ok(payload) => Ok(self.store.apply(&ticket, payload)),
            Err(err) => {
                // Load failures leave the previous data in place.
                tracing::warn!(target_list = %self.target, view = %ticket.view, "refresh failed: {err}");
                Err(err)
            }
        }
    }
}
