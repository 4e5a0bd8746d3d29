//! Opaque message header map
//!
//! Headers are treated as raw key/value text: no RFC 2047 decoding, no
//! structured address parsing. Lookup is case-insensitive and folded
//! continuation lines are joined. The only header the rest of the crate
//! interprets further is `Content-Type` (see
//! [`content_type`](crate::content_type)).

use crate::error::HeaderError;
use std::collections::HashMap;

/// A parsed header block: lowercase name -> values in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for a header.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// First value for a header, case-insensitive.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// All values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over every (name, value) pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Parse a raw header block.
    ///
    /// Continuation lines (leading space or tab) are folded into the
    /// preceding header with a single space. Parsing stops at the first
    /// empty line.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError`] when a non-continuation line has no `:`
    /// separator. One garbled line fails the whole block -- callers in
    /// the sync path treat that as "skip this message".
    pub fn parse(text: &str) -> Result<Self, HeaderError> {
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_none() {
                    return Err(HeaderError(line.to_string()));
                }
                current_value.push(' ');
                current_value.push_str(line.trim());
                continue;
            }

            if let Some(name) = current_name.take() {
                headers.add(name, std::mem::take(&mut current_value));
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(HeaderError(line.to_string()));
            };
            current_name = Some(name.trim().to_string());
            current_value = value.trim().to_string();
        }

        if let Some(name) = current_name {
            headers.add(name, current_value);
        }

        Ok(headers)
    }

    /// Parse a raw header block from bytes (lossy UTF-8).
    ///
    /// # Errors
    ///
    /// Same conditions as [`parse`](Self::parse).
    pub fn parse_bytes(raw: &[u8]) -> Result<Self, HeaderError> {
        Self::parse(&String::from_utf8_lossy(raw))
    }
}
