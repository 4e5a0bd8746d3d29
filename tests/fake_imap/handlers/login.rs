//! LOGIN command handler.
//!
//! Accepts any credentials except the password `wrongpass`, which is
//! rejected with a tagged NO so tests can drive the authentication
//! failure path.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the LOGIN command. Returns `false` when the stream died.
pub async fn handle_login<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    password: &[u8],
    stream: &mut BufReader<S>,
) -> bool {
    let resp = if password == b"wrongpass" {
        format!("{tag} NO LOGIN failed\r\n")
    } else {
        format!("{tag} OK LOGIN completed\r\n")
    };
    write_line(stream, &resp).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn run(tag: &str, password: &[u8]) -> (String, bool) {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        let ok = handle_login(tag, password, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), ok)
    }

    #[tokio::test]
    async fn accepts_normal_credentials() {
        let (output, ok) = run("A0001", b"hunter2").await;
        assert!(ok);
        assert_eq!(output, "A0001 OK LOGIN completed\r\n");
    }

    #[tokio::test]
    async fn rejects_the_magic_bad_password() {
        let (output, ok) = run("A0001", b"wrongpass").await;
        assert!(ok);
        assert_eq!(output, "A0001 NO LOGIN failed\r\n");
    }

    #[tokio::test]
    async fn echoes_client_tag() {
        let (output, _) = run("TAG42", b"pw").await;
        assert!(output.starts_with("TAG42 "));
    }
}
