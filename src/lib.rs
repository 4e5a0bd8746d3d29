//! Incremental IMAP mailbox synchronization and MIME tree parsing
//!
//! This crate fetches mail from a remote IMAP server over a cached,
//! lazily-reconnecting session and decomposes each message's raw bytes
//! into a navigable tree of typed parts.
//!
//! The pipeline: a [`ServerSession`] manages one account's transport
//! (lazy connect, idle-timeout teardown); a [`Mailbox`] syncs new
//! message headers incrementally by UID; [`Message::load`] fetches and
//! caches one body on demand; [`parse`] turns headers + body into a
//! [`MessageNode`] tree, degrading gracefully on malformed input.
//!
//! Security note: the default [`Security::Opportunistic`] mode falls
//! back to plaintext (with a logged warning) when the server refuses
//! STARTTLS. Use [`Security::Implicit`] when encryption must be
//! guaranteed.

mod buffer;
mod config;
mod connection;
mod content_type;
mod error;
mod headers;
mod mailbox;
mod message;
mod parts;
mod registry;
mod session;

pub use buffer::ForkedReader;
pub use config::{AccountConfig, Security};
pub use connection::{ImapSession, ImapStream};
pub use content_type::{ContentType, ContentTypeError};
pub use error::{ConfigError, ConnectionError, FetchError, HeaderError, SyncError};
pub use headers::Headers;
pub use mailbox::Mailbox;
pub use message::Message;
pub use parts::{
    AggregateError, LeafBody, MessageNode, NodeContent, ParseError, ParseOutcome, parse,
    parse_bytes, parse_message,
};
pub use registry::SessionRegistry;
pub use session::{ServerSession, SessionLease};
