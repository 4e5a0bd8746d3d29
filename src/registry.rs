//! Process-wide session registry
//!
//! An explicit table of live [`ServerSession`]s keyed by an opaque
//! account key (e.g. `user@host`). One registry is created at process
//! start and passed to whatever layer maps users to accounts; entries
//! are added on first use and removed on explicit logout, which also
//! closes the removed session's transport.

use crate::config::AccountConfig;
use crate::session::ServerSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of one [`ServerSession`] per account key.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<ServerSession>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<ServerSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The session for `key`, creating one from `config` when absent.
    ///
    /// An existing entry wins; `config` is ignored in that case.
    pub fn get_or_create(&self, key: impl Into<String>, config: AccountConfig) -> Arc<ServerSession> {
        self.table()
            .entry(key.into())
            .or_insert_with(|| Arc::new(ServerSession::new(config)))
            .clone()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<ServerSession>> {
        self.table().get(key).cloned()
    }

    /// Remove the session for `key` and close its transport.
    ///
    /// Returns whether an entry existed. Holders of the removed
    /// `Arc<ServerSession>` may keep using it; it simply reconnects on
    /// next use and is no longer reachable through the registry.
    pub async fn remove(&self, key: &str) -> bool {
        let removed = self.table().remove(key);
        match removed {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }

    /// Keys of all registered sessions.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.table().keys().cloned().collect()
    }
}
