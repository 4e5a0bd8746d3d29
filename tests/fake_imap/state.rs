//! Test data model for the fake IMAP server
//!
//! Builder-style construction of server-side state:
//!
//! ```ignore
//! let state = StateBuilder::new()
//!     .folder("INBOX")
//!         .email(1, false, raw_rfc2822_bytes)
//!         .email(2, true, raw_rfc2822_bytes)
//!     .folder("Archive")
//!         .email(10, true, raw_rfc2822_bytes)
//!     .build();
//! ```
//!
//! The state is shared with the server task via `Arc<Mutex<..>>`, so
//! tests can observe flag changes and fetch counts after the client
//! has run, and inject new emails between sync passes.
//!
//! Besides well-formed emails, the builder can produce two kinds of
//! deliberately broken entries: an email the server announces without
//! a UID data item, and one whose stored header block is garbage. Both
//! exercise the client's skip-and-continue path during sync.

/// Everything the fake server knows, plus counters the tests assert on.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub folders: Vec<Folder>,
    /// Number of FETCH data items that carried body content. Lets
    /// tests prove a body was served over the wire exactly once.
    pub body_fetches: usize,
}

impl ServerState {
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }
}

/// A single IMAP folder (e.g. "INBOX", "Archive").
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub emails: Vec<TestEmail>,
}

impl Folder {
    pub fn email_by_uid(&self, uid: u32) -> Option<&TestEmail> {
        self.emails.iter().find(|e| e.uid == Some(uid))
    }
}

/// One stored message.
///
/// - `uid`: `None` models a faulty server that omits the UID data item
///   from its FETCH response for this message.
/// - `seen`: the `\Seen` flag; flipped when a body is fetched without
///   PEEK.
/// - `raw`: complete RFC 2822 bytes, headers then a blank line then
///   the body text.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub uid: Option<u32>,
    pub seen: bool,
    pub raw: Vec<u8>,
}

impl TestEmail {
    /// The header block including the terminating blank line, as
    /// served for RFC822.HEADER.
    pub fn header_bytes(&self) -> &[u8] {
        match find_blank_line(&self.raw) {
            Some(pos) => &self.raw[..pos],
            None => &self.raw,
        }
    }

    /// The body text after the blank line, as served for BODY[TEXT].
    pub fn text_bytes(&self) -> &[u8] {
        match find_blank_line(&self.raw) {
            Some(pos) => &self.raw[pos..],
            None => &[],
        }
    }
}

/// Index just past the first `\r\n\r\n`, or `None` if there is no
/// header/body separator.
fn find_blank_line(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Builder for [`ServerState`]. `.folder(name)` starts a folder;
/// subsequent `.email*()` calls add to it.
pub struct StateBuilder {
    folders: Vec<Folder>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
        }
    }

    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            emails: Vec::new(),
        });
        self
    }

    /// Add a well-formed email to the most recently added folder.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn email(self, uid: u32, seen: bool, raw: &[u8]) -> Self {
        self.push(TestEmail {
            uid: Some(uid),
            seen,
            raw: raw.to_vec(),
        })
    }

    /// Add an email the server will announce without a UID data item.
    pub fn email_without_uid(self, raw: &[u8]) -> Self {
        self.push(TestEmail {
            uid: None,
            seen: false,
            raw: raw.to_vec(),
        })
    }

    fn push(mut self, email: TestEmail) -> Self {
        self.folders
            .last_mut()
            .expect("call .folder() before .email()")
            .emails
            .push(email);
        self
    }

    pub fn build(self) -> ServerState {
        ServerState {
            folders: self.folders,
            body_fetches: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &[u8] = b"Subject: hi\r\n\r\nbody text";

    #[test]
    fn header_bytes_include_separator() {
        let state = StateBuilder::new().folder("INBOX").email(1, false, RAW).build();
        let email = state.get_folder("INBOX").unwrap().email_by_uid(1).unwrap();
        assert_eq!(email.header_bytes(), b"Subject: hi\r\n\r\n");
        assert_eq!(email.text_bytes(), b"body text");
    }

    #[test]
    fn raw_without_separator_has_no_text() {
        let state = StateBuilder::new()
            .folder("INBOX")
            .email(1, false, b"not really an email")
            .build();
        let email = state.get_folder("INBOX").unwrap().email_by_uid(1).unwrap();
        assert_eq!(email.header_bytes(), b"not really an email");
        assert!(email.text_bytes().is_empty());
    }

    #[test]
    fn email_without_uid_has_none() {
        let state = StateBuilder::new()
            .folder("INBOX")
            .email_without_uid(RAW)
            .build();
        let folder = state.get_folder("INBOX").unwrap();
        assert_eq!(folder.emails.len(), 1);
        assert!(folder.emails[0].uid.is_none());
        assert!(folder.email_by_uid(1).is_none());
    }
}
