//! LIST command handler.
//!
//! One `* LIST` line per folder, then the tagged OK, per RFC 3501
//! Section 7.2.2:
//!
//! ```text
//! * LIST (\HasNoChildren) "/" "INBOX"
//! * LIST (\HasNoChildren) "/" "Archive"
//! A0002 OK LIST completed
//! ```

use crate::fake_imap::io::write_line;
use crate::fake_imap::state::ServerState;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the LIST command. Emits one `* LIST` line per folder.
pub async fn handle_list<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    state: &ServerState,
    stream: &mut BufReader<S>,
) {
    for folder in &state.folders {
        let line = format!("* LIST (\\HasNoChildren) \"/\" \"{}\"\r\n", folder.name);
        if write_line(stream, &line).await.is_err() {
            return;
        }
    }
    let resp = format!("{tag} OK LIST completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::state::StateBuilder;
    use tokio::io::BufReader;

    async fn run(tag: &str, state: &ServerState) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_list(tag, state, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn lists_all_folders() {
        let state = StateBuilder::new()
            .folder("INBOX")
            .folder("Archive")
            .folder("Trash")
            .build();

        let output = run("A1", &state).await;

        assert!(output.contains("\"INBOX\""));
        assert!(output.contains("\"Archive\""));
        assert!(output.contains("\"Trash\""));
        assert!(output.ends_with("A1 OK LIST completed\r\n"));
    }

    #[tokio::test]
    async fn empty_state_returns_only_ok() {
        let state = StateBuilder::new().build();
        let output = run("T2", &state).await;

        assert_eq!(output, "T2 OK LIST completed\r\n");
    }
}
