//! A single message and its on-demand body loader
//!
//! Messages are created by the synchronizer with header data only. The
//! body is fetched lazily by [`Message::load`] and cached forever on
//! first materialization; after that the message is fully immutable
//! and safe to share read-only.

use crate::error::FetchError;
use crate::headers::Headers;
use crate::parts::{self, ParseOutcome};
use crate::session::ServerSession;
use futures::StreamExt;
use std::sync::OnceLock;
use tracing::debug;

/// One message in a mailbox: identifier, headers, lazily-loaded body.
///
/// Holds no owning reference to its mailbox or session (only the
/// mailbox name, for diagnostics); the [`ServerSession`] is passed in
/// explicitly where network access is needed.
#[derive(Debug)]
pub struct Message {
    uid: u32,
    mailbox: String,
    headers: Headers,
    body: OnceLock<Vec<u8>>,
}

impl Message {
    pub(crate) fn new(uid: u32, mailbox: impl Into<String>, headers: Headers) -> Self {
        Self {
            uid,
            mailbox: mailbox.into(),
            headers,
            body: OnceLock::new(),
        }
    }

    /// Server-assigned identifier, unique and stable within the
    /// mailbox.
    #[must_use]
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Name of the mailbox this message was observed in.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The body bytes, if already materialized. Never triggers I/O.
    #[must_use]
    pub fn cached_body(&self) -> Option<&[u8]> {
        self.body.get().map(Vec::as_slice)
    }

    /// Fetch the message body, or return the cache.
    ///
    /// On a cache hit this involves no network I/O and `mark_seen` has
    /// no effect. Otherwise the body is fetched with `BODY.PEEK[TEXT]`
    /// (leaving the server-side read flag alone) when `mark_seen` is
    /// false, or `BODY[TEXT]` when true, then stored permanently.
    ///
    /// # Errors
    ///
    /// [`FetchError`] when the connection cannot be obtained or the
    /// server returns no matching body data. The cache stays empty, so
    /// retrying is possible.
    pub async fn load(
        &self,
        session: &ServerSession,
        mark_seen: bool,
    ) -> Result<&[u8], FetchError> {
        if let Some(body) = self.body.get() {
            return Ok(body.as_slice());
        }

        let query = if mark_seen {
            "BODY[TEXT]"
        } else {
            "BODY.PEEK[TEXT]"
        };
        debug!("fetching body for UID {} in {}", self.uid, self.mailbox);

        let mut lease = session.connect().await?;
        let uid_set = self.uid.to_string();
        let mut fetch_stream = lease
            .session()
            .uid_fetch(&uid_set, query)
            .await
            .map_err(|e| FetchError::Protocol(format!("FETCH failed: {e}")))?;

        let mut data: Option<Vec<u8>> = None;
        while let Some(item) = fetch_stream.next().await {
            let fetched =
                item.map_err(|e| FetchError::Protocol(format!("FETCH response error: {e}")))?;
            if data.is_none() {
                if let Some(text) = fetched.text() {
                    data = Some(text.to_vec());
                }
            }
        }
        drop(fetch_stream);

        let Some(data) = data else {
            return Err(FetchError::NoData(self.uid));
        };

        Ok(self.body.get_or_init(|| data).as_slice())
    }

    /// Decompose the cached body into a part tree.
    ///
    /// Returns `None` until [`load`](Self::load) has materialized the
    /// body. The tree is built fresh on each call from the immutable
    /// cached bytes.
    #[must_use]
    pub fn parse_body(&self) -> Option<ParseOutcome> {
        self.cached_body()
            .map(|body| parts::parse_bytes(self.headers.clone(), body.to_vec()))
    }
}
