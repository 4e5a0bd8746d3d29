//! `Content-Type` parsing
//!
//! The single header this crate decodes beyond raw text. Yields the
//! media type plus its parameter map; the structural parser needs
//! `multipart` detection and the `boundary` parameter, leaf
//! classification needs `charset`.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid content type: {0}")]
pub struct ContentTypeError(pub String);

/// A parsed media type with parameters, e.g.
/// `multipart/mixed; boundary="frontier"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type, lowercased (e.g. "text", "multipart").
    pub main_type: String,
    /// Subtype, lowercased (e.g. "plain", "mixed").
    pub sub_type: String,
    /// Parameters with lowercased keys and unquoted values.
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// The default for a part with an absent or unparseable
    /// `Content-Type` header.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new("application", "octet-stream")
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Parse `type/subtype; key=value; ...`.
    ///
    /// Parameter values may be double-quoted; quotes are stripped.
    /// Parameters without `=` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ContentTypeError`] when the `type/subtype` part is
    /// missing or empty.
    pub fn parse(s: &str) -> Result<Self, ContentTypeError> {
        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or("").trim();
        let Some((main_type, sub_type)) = type_str.split_once('/') else {
            return Err(ContentTypeError(s.to_string()));
        };
        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(ContentTypeError(s.to_string()));
        }

        let mut content_type = Self::new(main_type, sub_type);
        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().trim_matches('"').to_string();
                content_type.parameters.insert(key, value);
            }
        }

        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)
    }
}
