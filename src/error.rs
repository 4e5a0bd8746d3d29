//! Error types for mailsync
//!
//! Each phase of the pipeline has its own error enum so callers can
//! tell a dead connection apart from a single bad message. Structural
//! parse problems are *not* here: they are carried alongside a usable
//! node as an [`AggregateError`](crate::AggregateError) and
//! never abort the caller.

use thiserror::Error;

/// Failure to establish or re-establish the transport session.
///
/// Fatal to the current call only; the owning
/// [`ServerSession`](crate::ServerSession) stays reusable and the next
/// `connect()` starts from scratch.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("dial failed: {0}")]
    Dial(#[from] std::io::Error),

    #[error("TLS failure: {0}")]
    Tls(String),

    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Failure of one whole `update()` pass over a mailbox.
///
/// The sync cursor is left untouched, so retrying is safe and
/// idempotent. Individual malformed messages inside a batch never
/// produce this error; they are logged and skipped.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Failure to retrieve one message body.
///
/// The body cache stays empty on failure, so a later `load()` retries
/// the fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server returned no body data for UID {0}")]
    NoData(u32),
}

/// Bad or missing account configuration.
#[derive(Error, Debug)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

/// A raw header block that could not be read as header text.
#[derive(Error, Debug)]
#[error("malformed header line: {0:?}")]
pub struct HeaderError(pub String);
