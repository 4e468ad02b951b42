// ==========================================
// Billing Import Engine - Session Store
// ==========================================
// One live session per user. Handles are Arc<tokio::Mutex<..>> so a
// long confirm() holds the session lock across await points; the
// sweeper uses try_lock and therefore never evicts a session that is
// mid-emission.
// ==========================================

use crate::config::SessionConfig;
use crate::domain::types::UserId;
use crate::session::import_session::ImportSession;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub type SessionHandle = Arc<tokio::sync::Mutex<ImportSession>>;

// ==========================================
// SessionStore trait
// ==========================================
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current session for a user, if any.
    async fn get(&self, user: UserId) -> Option<SessionHandle>;

    /// Install a session, replacing any prior one for the same user.
    async fn put(&self, session: ImportSession) -> SessionHandle;

    /// Drop a user's session.
    async fn remove(&self, user: UserId);

    /// Evict sessions idle past the TTL. Returns the evicted users.
    async fn sweep_expired(&self) -> Vec<UserId>;
}

// ==========================================
// InMemorySessionStore
// ==========================================
pub struct InMemorySessionStore {
    config: SessionConfig,
    sessions: Mutex<HashMap<UserId, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, SessionHandle>> {
        // The map mutex is only held for map operations, never across
        // an await, so poisoning can only come from a panic in those
        // few lines.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user: UserId) -> Option<SessionHandle> {
        self.lock_map().get(&user).cloned()
    }

    async fn put(&self, session: ImportSession) -> SessionHandle {
        let user = session.user;
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(session));
        let replaced = self.lock_map().insert(user, handle.clone());
        if replaced.is_some() {
            debug!(user = %user, "replaced existing session");
        }
        handle
    }

    async fn remove(&self, user: UserId) {
        self.lock_map().remove(&user);
    }

    async fn sweep_expired(&self) -> Vec<UserId> {
        let now = Utc::now();
        let ttl = self.config.idle_ttl;
        let candidates: Vec<(UserId, SessionHandle)> = self
            .lock_map()
            .iter()
            .map(|(u, h)| (*u, h.clone()))
            .collect();

        let mut evicted = Vec::new();
        for (user, handle) in candidates {
            // Lock check and removal happen under the map mutex, with
            // the session guard held across the removal: a task that
            // fetched the handle and locked it after the expiry check
            // would otherwise lose its session mid-emission. A locked
            // session is in active use; skip it this round.
            let mut map = self.lock_map();
            let expired = match handle.try_lock() {
                Ok(session) => {
                    if session.is_expired(now, ttl) {
                        map.remove(&user);
                        true
                    } else {
                        false
                    }
                }
                Err(_) => false,
            };
            drop(map);
            if expired {
                evicted.push(user);
            }
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "evicted idle sessions");
        }
        evicted
    }
}

/// Background eviction loop. Runs until the store is dropped by every
/// other holder.
pub fn spawn_sweeper(store: Arc<InMemorySessionStore>) -> tokio::task::JoinHandle<()> {
    let interval = store.config.sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            store.sweep_expired().await;
        }
    })
}
