//! Shared I/O helpers for the fake IMAP server.
//!
//! Thin wrappers around `AsyncWriteExt` that flush after every write,
//! keeping the server's output deterministic for tests.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Write a string to the stream and flush.
pub async fn write_line<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    line: &str,
) -> std::io::Result<()> {
    stream.get_mut().write_all(line.as_bytes()).await?;
    stream.get_mut().flush().await
}

/// Write one FETCH data item carrying an IMAP literal:
/// `{len}\r\n` followed by exactly `len` raw bytes.
///
/// The caller provides everything up to the literal marker, e.g.
/// `* 1 FETCH (UID 7 RFC822.HEADER `.
pub async fn write_literal<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    prefix: &str,
    data: &[u8],
) -> std::io::Result<()> {
    let header = format!("{prefix}{{{}}}\r\n", data.len());
    stream.get_mut().write_all(header.as_bytes()).await?;
    stream.get_mut().write_all(data).await?;
    stream.get_mut().write_all(b")\r\n").await?;
    stream.get_mut().flush().await
}
