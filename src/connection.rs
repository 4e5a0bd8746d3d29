//! Low-level IMAP transport
//!
//! Dials the server, negotiates encryption according to the account's
//! [`Security`] mode, and authenticates. Produces the
//! [`ImapSession`] handle that [`ServerSession`](crate::ServerSession)
//! caches and reuses.
//!
//! Opportunistic mode attempts a STARTTLS upgrade in place; when the
//! server refuses, the session deliberately continues in plaintext
//! with a logged warning rather than failing (see the crate docs for
//! why this weak default exists).

use crate::config::{AccountConfig, Security};
use crate::error::ConnectionError;
use async_imap::Session;
use rustls::pki_types::ServerName;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

/// An authenticated IMAP session over either transport.
pub type ImapSession = Session<ImapStream>;

/// The connection stream, before or after TLS upgrade.
#[derive(Debug)]
pub enum ImapStream {
    Plain(Compat<TcpStream>),
    Tls(Compat<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl futures::io::AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl futures::io::AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_close(cx),
            Self::Tls(s) => Pin::new(s).poll_close(cx),
        }
    }
}

/// Build a TLS connector that accepts any server certificate.
///
/// Self-hosted and bridge-style IMAP servers commonly present
/// self-signed certificates, so verification is skipped.
fn tls_connector() -> TlsConnector {
    let config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

async fn tls_handshake(
    config: &AccountConfig,
    tcp: TcpStream,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, ConnectionError> {
    let connector = tls_connector();
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| ConnectionError::Tls(format!("invalid server name: {e}")))?;
    connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| ConnectionError::Tls(e.to_string()))
}

/// Dial, negotiate encryption, and authenticate.
///
/// Authentication failure tears the transport down; the caller may
/// retry from scratch.
///
/// # Errors
///
/// [`ConnectionError::Dial`] when the TCP connection fails,
/// [`ConnectionError::Tls`] when a required handshake fails, and
/// [`ConnectionError::Auth`] when the server rejects the credentials.
pub async fn connect(config: &AccountConfig) -> Result<ImapSession, ConnectionError> {
    let addr = format!("{}:{}", config.host, config.port);
    debug!("dialing IMAP server at {}", addr);

    let tcp = TcpStream::connect(&addr).await?;

    let client = match config.security {
        Security::Implicit => {
            let tls = tls_handshake(config, tcp).await?;
            async_imap::Client::new(ImapStream::Tls(tls.compat()))
        }
        Security::Opportunistic => {
            let mut client = async_imap::Client::new(ImapStream::Plain(tcp.compat()));
            match client.run_command_and_check_ok("STARTTLS", None).await {
                Ok(()) => {
                    let ImapStream::Plain(compat) = client.into_inner() else {
                        return Err(ConnectionError::Tls(
                            "unexpected stream state after STARTTLS".into(),
                        ));
                    };
                    let tls = tls_handshake(config, compat.into_inner()).await?;
                    async_imap::Client::new(ImapStream::Tls(tls.compat()))
                }
                Err(e) => {
                    // Deliberate weak default: opportunistic mode keeps
                    // going unencrypted when the server refuses the
                    // upgrade. Use Security::Implicit to forbid this.
                    warn!("server refused STARTTLS, continuing in plaintext: {e}");
                    client
                }
            }
        }
    };

    let session = client
        .login(&config.username, &config.password)
        .await
        .map_err(|(e, _client)| ConnectionError::Auth(e.to_string()))?;

    info!("authenticated to {}", config.host);
    Ok(session)
}

/// Certificate verifier that accepts all certificates
/// (for self-signed IMAP servers).
#[derive(Debug)]
struct AcceptAnyServerCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
