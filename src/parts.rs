//! Structural decomposition of messages into part trees
//!
//! A message body is recursively split into a [`MessageNode`] tree:
//! multipart content becomes an ordered list of child nodes, everything
//! else becomes a leaf carrying its raw bytes. Parsing is best-effort
//! by contract: every invocation yields a usable node, and problems in
//! individual subtrees are collected into an [`AggregateError`] instead
//! of aborting the walk.
//!
//! The splitter works over a materialized [`ForkedReader`] buffer, so
//! the pristine bytes survive no matter how the decomposition goes.

use crate::buffer::ForkedReader;
use crate::content_type::ContentType;
use crate::error::HeaderError;
use crate::headers::Headers;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Content types treated as text despite a non-`text/*` media type.
const TEXT_TYPE_ALLOWLIST: &[&str] = &[
    "application/json",
    "application/xml",
    "application/pgp-signature",
];

/// The raw content of a leaf part, tagged with a text/binary
/// classification so a downstream serializer can pick a string or
/// byte-array representation without re-parsing.
#[derive(Debug, Clone)]
pub struct LeafBody {
    bytes: Arc<[u8]>,
    text: bool,
}

impl LeafBody {
    fn new(bytes: Arc<[u8]>, content_type: &ContentType) -> Self {
        Self {
            text: is_text_like(content_type),
            bytes,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap shared handle to the body bytes.
    #[must_use]
    pub fn shared(&self) -> Arc<[u8]> {
        self.bytes.clone()
    }

    /// Whether the content is text-like: a `charset` parameter, a
    /// `text/*` media type, or membership in a small allow-list of
    /// structured text types (JSON, XML, PGP signatures).
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.text
    }
}

/// Either sub-parts or a body -- never both, never neither.
#[derive(Debug, Clone)]
pub enum NodeContent {
    /// This part split into sub-parts, in original stream order.
    Parts(Vec<MessageNode>),
    /// This part is a leaf.
    Leaf(LeafBody),
}

/// One node of the decomposed message: a MIME part.
#[derive(Debug, Clone)]
pub struct MessageNode {
    /// Parsed media type; [`ContentType::unknown`] when the header was
    /// absent or unreadable.
    pub content_type: ContentType,
    /// The part's own header block, opaque key/value.
    pub headers: Headers,
    content: NodeContent,
}

impl MessageNode {
    #[must_use]
    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    /// Child nodes, if this part was split.
    #[must_use]
    pub fn children(&self) -> Option<&[MessageNode]> {
        match &self.content {
            NodeContent::Parts(parts) => Some(parts),
            NodeContent::Leaf(_) => None,
        }
    }

    /// The leaf body, if this part was not split.
    #[must_use]
    pub fn body(&self) -> Option<&LeafBody> {
        match &self.content {
            NodeContent::Parts(_) => None,
            NodeContent::Leaf(body) => Some(body),
        }
    }

    fn leaf(content_type: ContentType, headers: Headers, bytes: Arc<[u8]>) -> Self {
        let body = LeafBody::new(bytes, &content_type);
        Self {
            content_type,
            headers,
            content: NodeContent::Leaf(body),
        }
    }
}

/// A problem in one subtree of the decomposition.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no boundary parameter given for {0}")]
    MissingBoundary(String),

    #[error("multipart split aborted: {0}")]
    SplitAborted(String),

    #[error("could not read part headers: {0}")]
    BadHeaders(#[from] HeaderError),

    #[error("could not read body: {0}")]
    Read(String),

    #[error("{0}")]
    Children(AggregateError),
}

/// Per-subtree errors collected during one parse, keyed by a label
/// describing the failing child. Diagnostic only -- the tree that came
/// with it is still usable.
#[derive(Debug, Default)]
pub struct AggregateError {
    entries: Vec<(String, ParseError)>,
}

const CHILD_ERROR_INDENT: &str = "  |  ";

impl AggregateError {
    fn push(&mut self, label: impl Into<String>, error: ParseError) {
        self.entries.push((label.into(), error));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The collected `(label, error)` pairs in discovery order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ParseError)> {
        self.entries.iter().map(|(l, e)| (l.as_str(), e))
    }
}

impl fmt::Display for AggregateError {
    /// Renders an indented tree of nested error messages, one level of
    /// indentation per nesting depth:
    ///
    /// ```text
    /// 2 error(s) encountered while decomposing parts:
    ///   |  part 1 (multipart/alternative): 1 error(s) encountered while decomposing parts:
    ///   |    |  part 2 (application/x-thing): multipart split aborted: ...
    ///   |  part 3 (multipart/mixed): no boundary parameter given for multipart/mixed
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s) encountered while decomposing parts:",
            self.entries.len()
        )?;
        for (label, error) in &self.entries {
            let rendered = format!("{label}: {error}");
            for line in rendered.lines() {
                write!(f, "\n{CHILD_ERROR_INDENT}{line}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Result of one parse invocation. There is always a usable node; the
/// `Partial` variant additionally reports which subtrees are degraded.
#[derive(Debug)]
pub enum ParseOutcome {
    Complete(MessageNode),
    Partial(MessageNode, AggregateError),
}

impl ParseOutcome {
    #[must_use]
    pub fn node(&self) -> &MessageNode {
        match self {
            Self::Complete(node) | Self::Partial(node, _) => node,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&AggregateError> {
        match self {
            Self::Complete(_) => None,
            Self::Partial(_, error) => Some(error),
        }
    }

    #[must_use]
    pub fn into_node(self) -> MessageNode {
        match self {
            Self::Complete(node) | Self::Partial(node, _) => node,
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (MessageNode, Option<AggregateError>) {
        match self {
            Self::Complete(node) => (node, None),
            Self::Partial(node, error) => (node, Some(error)),
        }
    }
}

/// Decompose a body (with its already-parsed headers) into a part tree.
///
/// Always returns a usable node. Degraded subtrees are reported through
/// [`ParseOutcome::Partial`]; see the module docs for the policy.
pub fn parse(headers: Headers, mut body: ForkedReader) -> ParseOutcome {
    let (node, error) = build_node(headers, &mut body);
    match error {
        None => ParseOutcome::Complete(node),
        Some(error) => {
            let aggregate = match error {
                ParseError::Children(aggregate) => aggregate,
                other => {
                    let mut aggregate = AggregateError::default();
                    aggregate.push(format!("message ({})", node.content_type.essence()), other);
                    aggregate
                }
            };
            warn!(errors = aggregate.len(), "message decomposed with degraded subtrees");
            ParseOutcome::Partial(node, aggregate)
        }
    }
}

/// [`parse`] over bytes already in memory.
pub fn parse_bytes(headers: Headers, body: impl Into<Vec<u8>>) -> ParseOutcome {
    parse(headers, ForkedReader::from_bytes(body.into()))
}

/// Decompose a complete raw message (header block + body).
///
/// # Errors
///
/// Returns [`HeaderError`] when the top-level header block itself is
/// unreadable; with no headers there is nothing to hang a node on.
pub fn parse_message(raw: &[u8]) -> Result<ParseOutcome, HeaderError> {
    let (header_block, body) = split_header_block(raw);
    let headers = Headers::parse_bytes(header_block)?;
    Ok(parse_bytes(headers, body.to_vec()))
}

/// One level of the recursive descent. Returns the node plus this
/// subtree's error, if any.
fn build_node(headers: Headers, body: &mut ForkedReader) -> (MessageNode, Option<ParseError>) {
    let content_type = headers
        .get("Content-Type")
        .and_then(|value| ContentType::parse(value).ok())
        .unwrap_or_else(ContentType::unknown);

    // Fork up front: whatever the splitter does below, the pristine
    // bytes stay available for the leaf fallback.
    let bytes = match body.bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            let node = MessageNode::leaf(content_type, headers, Arc::from(Vec::new()));
            return (node, Some(ParseError::Read(e.to_string())));
        }
    };

    if !content_type.is_multipart() {
        return (MessageNode::leaf(content_type, headers, bytes), None);
    }

    // A multipart type without a boundary cannot be split; keep the
    // body intact and report the defect.
    let Some(boundary) = content_type.boundary().map(str::to_owned) else {
        let essence = content_type.essence();
        let node = MessageNode::leaf(content_type, headers, bytes);
        return (node, Some(ParseError::MissingBoundary(essence)));
    };

    let (raw_parts, split_error) = split_multipart(&bytes, &boundary);

    if raw_parts.is_empty() {
        // Nothing was salvaged; the node stays a leaf over the
        // original bytes.
        let description = split_error
            .unwrap_or_else(|| "multipart body contains no parts".to_string());
        let node = MessageNode::leaf(content_type, headers, bytes);
        return (node, Some(ParseError::SplitAborted(description)));
    }

    let mut children = Vec::with_capacity(raw_parts.len());
    let mut aggregate = AggregateError::default();

    for (index, raw_part) in raw_parts.iter().enumerate() {
        let (child, child_error) = build_child(raw_part);
        if let Some(error) = child_error {
            aggregate.push(
                format!("part {} ({})", index + 1, child.content_type.essence()),
                error,
            );
        }
        children.push(child);
    }

    if let Some(description) = split_error {
        aggregate.push(
            format!("message ({})", content_type.essence()),
            ParseError::SplitAborted(description),
        );
    }

    // Children determined: the node's own body is dropped.
    let node = MessageNode {
        content_type,
        headers,
        content: NodeContent::Parts(children),
    };

    if aggregate.is_empty() {
        (node, None)
    } else {
        (node, Some(ParseError::Children(aggregate)))
    }
}

/// Build one child node from a raw sub-part (header block + body).
///
/// A child whose header block is unreadable still yields a node: a
/// headerless leaf over the sub-part's full bytes, with the failure
/// recorded for the aggregate.
fn build_child(raw_part: &[u8]) -> (MessageNode, Option<ParseError>) {
    let (header_block, body) = split_header_block(raw_part);
    match Headers::parse_bytes(header_block) {
        Ok(headers) => {
            let mut buffer = ForkedReader::from_bytes(body.to_vec());
            build_node(headers, &mut buffer)
        }
        Err(e) => {
            let node = MessageNode::leaf(
                ContentType::unknown(),
                Headers::new(),
                Arc::from(raw_part.to_vec()),
            );
            (node, Some(ParseError::BadHeaders(e)))
        }
    }
}

fn is_text_like(content_type: &ContentType) -> bool {
    content_type.charset().is_some()
        || content_type.main_type == "text"
        || TEXT_TYPE_ALLOWLIST.contains(&content_type.essence().as_str())
}

/// Split a raw part into its header block and remaining body bytes at
/// the first empty line. Without an empty line the whole input is
/// treated as headers.
fn split_header_block(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut line_start = 0;
    while line_start < raw.len() {
        let line_end = raw[line_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(raw.len(), |i| line_start + i + 1);
        let line = &raw[line_start..line_end];
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            return (&raw[..line_start], &raw[line_end..]);
        }
        line_start = line_end;
    }
    (raw, &[])
}

/// Split a multipart body at its boundary delimiters.
///
/// Returns the raw sub-parts completed before any abort point, plus a
/// description of the abort when the closing delimiter never arrived.
/// Content after the last delimiter but before EOF is considered
/// truncated and dropped.
fn split_multipart<'a>(data: &'a [u8], boundary: &str) -> (Vec<&'a [u8]>, Option<String>) {
    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--");

    let mut parts: Vec<&[u8]> = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut line_start = 0;

    while line_start < data.len() {
        let line_end = data[line_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |i| line_start + i + 1);
        let line = trim_line_end(&data[line_start..line_end]);

        if line == closing.as_bytes() {
            if let Some(start) = current_start {
                parts.push(strip_trailing_newline(&data[start..line_start]));
            }
            return (parts, None);
        }

        if line == delimiter.as_bytes() {
            if let Some(start) = current_start {
                parts.push(strip_trailing_newline(&data[start..line_start]));
            }
            current_start = Some(line_end);
        }

        line_start = line_end;
    }

    // EOF before the closing delimiter. Anything accumulated since the
    // last delimiter is an incomplete part and is not returned.
    let description = if current_start.is_none() && parts.is_empty() {
        format!("boundary {delimiter:?} not found in body")
    } else {
        format!("input ended before closing delimiter {closing:?}")
    };
    (parts, Some(description))
}

/// Strip the line terminator plus transport padding (trailing spaces
/// and tabs are allowed after a boundary delimiter, RFC 2046 §5.1.1).
fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut line = line;
    while let Some((&last, rest)) = line.split_last() {
        if last == b'\n' || last == b'\r' || last == b' ' || last == b'\t' {
            line = rest;
        } else {
            break;
        }
    }
    line
}

/// The CRLF preceding a boundary delimiter belongs to the delimiter,
/// not the part content.
fn strip_trailing_newline(part: &[u8]) -> &[u8] {
    let part = part.strip_suffix(b"\n").unwrap_or(part);
    part.strip_suffix(b"\r").unwrap_or(part)
}
