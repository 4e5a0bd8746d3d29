//! Forked-reader buffer
//!
//! The structural parser consumes its input destructively (boundary
//! scanning eats the stream), but the original bytes must stay
//! recoverable for re-inspection and for leaf bodies. [`ForkedReader`]
//! solves this by draining the underlying source exactly once into an
//! owned buffer and handing out any number of independently-positioned
//! read cursors over it afterwards.

use std::io::{self, Cursor, Read};
use std::sync::Arc;

/// A byte source that can be consumed once and replayed forever.
///
/// The source is read to exhaustion on the first call to
/// [`materialize`](Self::materialize) (or implicitly by
/// [`fork`](Self::fork) / [`bytes`](Self::bytes)); after that the
/// source is never touched again and every fork observes the same
/// immutable bytes.
pub struct ForkedReader {
    source: Option<Box<dyn Read + Send>>,
    data: Option<Arc<[u8]>>,
}

impl ForkedReader {
    pub fn new(source: impl Read + Send + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            data: None,
        }
    }

    /// Wrap bytes that are already in memory. No I/O will ever occur.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: None,
            data: Some(Arc::from(bytes.into())),
        }
    }

    /// Drain the source into the internal buffer.
    ///
    /// Idempotent: the source is read at most once, and repeated calls
    /// return the same buffer.
    ///
    /// # Errors
    ///
    /// Propagates the underlying read error. The source is dropped in
    /// that case; a later call yields an empty buffer rather than
    /// re-reading a stream in an unknown state.
    pub fn materialize(&mut self) -> io::Result<&[u8]> {
        if self.data.is_none() {
            let mut buf = Vec::new();
            if let Some(mut source) = self.source.take() {
                source.read_to_end(&mut buf)?;
            }
            self.data = Some(Arc::from(buf));
        }
        // Just assigned above when it was absent.
        Ok(self.data.as_deref().unwrap_or(&[]))
    }

    /// The materialized bytes, shared.
    ///
    /// # Errors
    ///
    /// Same conditions as [`materialize`](Self::materialize).
    pub fn bytes(&mut self) -> io::Result<Arc<[u8]>> {
        self.materialize()?;
        Ok(self.data.clone().unwrap_or_else(|| Arc::from(Vec::new())))
    }

    /// A fresh read cursor positioned at the start of the buffer.
    ///
    /// Forks are independent: consuming one does not move any other,
    /// and they may be read in any order or interleaving.
    ///
    /// # Errors
    ///
    /// Same conditions as [`materialize`](Self::materialize).
    pub fn fork(&mut self) -> io::Result<Cursor<Arc<[u8]>>> {
        Ok(Cursor::new(self.bytes()?))
    }
}

impl std::fmt::Debug for ForkedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkedReader")
            .field("materialized", &self.data.is_some())
            .field("len", &self.data.as_ref().map(|d| d.len()))
            .finish()
    }
}
