//! Connection manager for one IMAP account
//!
//! A [`ServerSession`] owns one credential set and at most one live
//! transport at a time. The transport is created lazily on first use,
//! reused while traffic keeps flowing, and torn down either by an
//! explicit [`close`](ServerSession::close) or by the idle-disconnect
//! timer. The session object itself survives any number of
//! connect/disconnect cycles.

use crate::config::AccountConfig;
use crate::connection::{self, ImapSession};
use crate::error::{ConnectionError, SyncError};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Transport teardown after this long with no `connect()` call.
const IDLE_DISCONNECT: Duration = Duration::from_secs(20 * 60);

/// Upper bound on a graceful LOGOUT during teardown.
const LOGOUT_WAIT: Duration = Duration::from_secs(10);

struct SessionState {
    session: Option<ImapSession>,
    /// Bumped on every connect, close, and teardown. An idle timer
    /// captures the epoch at arming time and fires only if it is still
    /// current, so stale timers can never race a fresh reconnect or
    /// double-close alongside an explicit `close()`.
    epoch: u64,
}

/// One remote IMAP account with a lazily-managed transport.
pub struct ServerSession {
    config: AccountConfig,
    idle_disconnect: Duration,
    state: Arc<Mutex<SessionState>>,
}

/// Exclusive access to the live transport, returned by
/// [`ServerSession::connect`]. All protocol traffic on the session is
/// serialized through this guard; drop it to let other callers in.
pub struct SessionLease {
    guard: OwnedMutexGuard<SessionState>,
}

impl SessionLease {
    /// The authenticated protocol session.
    pub fn session(&mut self) -> &mut ImapSession {
        // A lease is only ever constructed after the state holds a
        // live session, and holding the lease blocks teardown.
        self.guard
            .session
            .as_mut()
            .expect("lease issued without a live session")
    }
}

impl ServerSession {
    #[must_use]
    pub fn new(config: AccountConfig) -> Self {
        Self {
            config,
            idle_disconnect: IDLE_DISCONNECT,
            state: Arc::new(Mutex::new(SessionState {
                session: None,
                epoch: 0,
            })),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Test hook: shorten the idle-disconnect window. Not part of the
    /// public configuration surface.
    #[doc(hidden)]
    #[must_use]
    pub fn with_idle_disconnect(mut self, idle: Duration) -> Self {
        self.idle_disconnect = idle;
        self
    }

    /// Return a usable transport handle, dialing and authenticating
    /// only when no live one exists.
    ///
    /// Reuse involves no network I/O; either way the idle timer is
    /// re-armed.
    ///
    /// # Errors
    ///
    /// [`ConnectionError`] when dialing, the TLS handshake, or
    /// authentication fails. The session stays reusable: a later call
    /// starts a fresh attempt.
    pub async fn connect(&self) -> Result<SessionLease, ConnectionError> {
        let mut guard = self.state.clone().lock_owned().await;

        if guard.session.is_some() {
            debug!("reusing live session to {}", self.config.host);
        } else {
            let session = connection::connect(&self.config).await?;
            guard.session = Some(session);
        }

        self.arm_idle_timer(&mut guard);
        Ok(SessionLease { guard })
    }

    /// Tear the transport down now. Idempotent: with no live handle
    /// this is a no-op, never an error.
    ///
    /// A graceful LOGOUT is attempted, bounded by a fixed wait; the
    /// connection is dropped regardless of the outcome.
    pub async fn close(&self) {
        let mut guard = self.state.lock().await;
        guard.epoch += 1;
        teardown(&mut guard).await;
    }

    /// List mailbox names on the server (`LIST "" *`).
    ///
    /// # Errors
    ///
    /// [`SyncError`] when the connection cannot be obtained or the
    /// LIST command fails.
    pub async fn list_mailboxes(&self) -> Result<Vec<String>, SyncError> {
        let mut lease = self.connect().await?;

        let mut mailbox_stream = lease
            .session()
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| SyncError::Protocol(format!("LIST failed: {e}")))?;

        let mut names = Vec::new();
        while let Some(item) = mailbox_stream.next().await {
            if let Ok(name) = item {
                names.push(name.name().to_string());
            }
        }

        Ok(names)
    }

    /// Re-arm the idle timer under the state lock.
    fn arm_idle_timer(&self, state: &mut SessionState) {
        state.epoch += 1;
        let armed_epoch = state.epoch;
        let shared = self.state.clone();
        let idle = self.idle_disconnect;
        let host = self.config.host.clone();

        tokio::spawn(async move {
            sleep(idle).await;
            let mut guard = shared.lock().await;
            if guard.epoch == armed_epoch {
                debug!("idle timeout, disconnecting from {}", host);
                teardown(&mut guard).await;
            }
        });
    }
}

/// Shared teardown path for explicit close and the idle timer.
async fn teardown(state: &mut SessionState) {
    state.epoch += 1;
    if let Some(mut session) = state.session.take() {
        match timeout(LOGOUT_WAIT, session.logout()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("logout error ignored during teardown: {e}"),
            Err(_) => warn!("graceful logout timed out, dropping connection"),
        }
    }
}
