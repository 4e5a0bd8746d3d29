//! Mailbox synchronization
//!
//! A [`Mailbox`] is an append-only local index over one server-side
//! mailbox, keyed by UID and advanced by an incremental sync cursor.
//! [`update`](Mailbox::update) fetches only headers of messages at or
//! beyond the cursor and merges new ones in; bodies are loaded later,
//! per message, on demand.

use crate::error::SyncError;
use crate::headers::Headers;
use crate::message::Message;
use crate::session::ServerSession;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A named message collection scoped to one [`ServerSession`].
///
/// The sync cursor (`cursor()`) is monotonically non-decreasing and
/// UIDs are never reused once observed. Only [`update`](Self::update)
/// mutates the index.
pub struct Mailbox {
    name: String,
    last_uid: u32,
    messages: HashMap<u32, Arc<Message>>,
}

impl Mailbox {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_uid: 0,
            messages: HashMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The highest UID observed so far; 0 before the first sync.
    #[must_use]
    pub fn cursor(&self) -> u32 {
        self.last_uid
    }

    #[must_use]
    pub fn get(&self, uid: u32) -> Option<&Arc<Message>> {
        self.messages.get(&uid)
    }

    /// All indexed messages, in no particular order.
    pub fn messages(&self) -> impl Iterator<Item = &Arc<Message>> {
        self.messages.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Fetch headers of messages newer than the cursor and merge them
    /// into the index.
    ///
    /// Returns the newly observed messages in server arrival order
    /// (not necessarily ascending UID). The fetch range is inclusive
    /// of the cursor itself, so the most recently merged message is
    /// re-sent by the server; it is deduplicated against the index and
    /// never delivered twice.
    ///
    /// One malformed item never fails the batch: responses without a
    /// UID and header blocks that do not parse are logged and skipped.
    ///
    /// # Errors
    ///
    /// [`SyncError`] when the connection cannot be obtained, the
    /// mailbox cannot be selected, or the fetch cannot be issued. The
    /// cursor is unchanged in that case, so retrying is safe.
    pub async fn update(
        &mut self,
        session: &ServerSession,
    ) -> Result<Vec<Arc<Message>>, SyncError> {
        let mut lease = session.connect().await?;

        lease
            .session()
            .select(&self.name)
            .await
            .map_err(|e| SyncError::Protocol(format!("SELECT {} failed: {e}", self.name)))?;

        // Re-requests the cursor UID itself; dedup below takes care of
        // the overlap.
        let range = format!("{}:*", self.last_uid.max(1));
        let mut fetch_stream = lease
            .session()
            .uid_fetch(&range, "(UID RFC822.HEADER)")
            .await
            .map_err(|e| SyncError::Protocol(format!("UID FETCH {range} failed: {e}")))?;

        let mut new_mail = Vec::new();
        while let Some(item) = fetch_stream.next().await {
            let fetched = match item {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!("skipping unreadable fetch response in {}: {e}", self.name);
                    continue;
                }
            };

            let Some(uid) = fetched.uid else {
                warn!("fetch response without UID in {}, skipped", self.name);
                continue;
            };

            if self.messages.contains_key(&uid) {
                // The cursor message comes back on every sync; it was
                // merged before, so the cursor already covers it.
                continue;
            }

            let headers = match Headers::parse_bytes(fetched.header().unwrap_or_default()) {
                Ok(headers) => headers,
                Err(e) => {
                    warn!("unparseable headers for UID {uid} in {}: {e}", self.name);
                    continue;
                }
            };

            self.last_uid = self.last_uid.max(uid);
            let message = Arc::new(Message::new(uid, self.name.clone(), headers));
            self.messages.insert(uid, message.clone());
            new_mail.push(message);
        }
        drop(fetch_stream);

        info!(
            "synced {}: {} new message(s), cursor at {}",
            self.name,
            new_mail.len(),
            self.last_uid
        );
        Ok(new_mail)
    }
}
