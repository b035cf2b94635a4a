//! Socket and TLS setup.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::config::{ConnectionProfile, Security};
use crate::{Error, Result};

/// A stream that can be either plaintext or TLS.
pub enum ImapStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Upgrades a plaintext stream to TLS after `STARTTLS` was accepted.
    pub async fn upgrade_to_tls(self, host: &str) -> Result<Self> {
        match self {
            Self::Plain(tcp) => {
                let tls = tls_handshake(tcp, host).await?;
                Ok(Self::Tls(Box::new(tls)))
            }
            Self::Tls(_) => Err(Error::InvalidState("Stream is already TLS".to_string())),
        }
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Creates a TLS connector trusting the webpki root certificates.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

async fn tls_handshake(tcp: TcpStream, host: &str) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())?;
    create_tls_connector()
        .connect(server_name, tcp)
        .await
        .map_err(|e| handshake_error(host, &e))
}

fn handshake_error(host: &str, err: &io::Error) -> Error {
    let rustls_error = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>());
    match rustls_error {
        Some(rustls::Error::InvalidCertificate(reason)) => Error::Certificate {
            host: host.to_string(),
            message: format!("{reason:?}"),
        },
        _ => Error::Connect {
            address: host.to_string(),
            message: format!("TLS handshake failed: {err}"),
        },
    }
}

/// Opens streams for a session.
///
/// The session only needs bytes in and out; tests substitute scripted
/// streams through this seam.
pub trait Connector {
    /// Stream type produced.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a connection. With [`Security::Implicit`] the TLS handshake
    /// happens here, before any protocol bytes.
    fn connect(&mut self, profile: &ConnectionProfile) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Wraps an established stream in TLS after `STARTTLS`.
    fn upgrade(&mut self, stream: Self::Stream, host: &str) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Connector for real TCP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = ImapStream;

    async fn connect(&mut self, profile: &ConnectionProfile) -> Result<ImapStream> {
        let address = profile.address();
        let tcp = TcpStream::connect(&address)
            .await
            .map_err(|e| Error::Connect {
                address: address.clone(),
                message: e.to_string(),
            })?;
        tracing::debug!(%address, security = ?profile.security, "Socket connected");

        match profile.security {
            Security::Implicit => {
                let tls = tls_handshake(tcp, &profile.host).await?;
                Ok(ImapStream::Tls(Box::new(tls)))
            }
            Security::StartTls | Security::None => Ok(ImapStream::Plain(tcp)),
        }
    }

    async fn upgrade(&mut self, stream: ImapStream, host: &str) -> Result<ImapStream> {
        stream.upgrade_to_tls(host).await
    }
}
