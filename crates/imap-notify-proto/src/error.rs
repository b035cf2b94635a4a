//! Error types for the NOTIFY watcher.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while connecting to or watching an IMAP server.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket could not be opened or the greeting was refused.
    #[error("Connection to {address} failed: {message}")]
    Connect {
        /// `host:port` that was dialed.
        address: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The server certificate did not validate.
    #[error("Certificate for {host} rejected: {message}")]
    Certificate {
        /// Host name the certificate was checked against.
        host: String,
        /// Validation failure.
        message: String,
    },

    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Structurally broken server data.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server refused a command the session depends on.
    #[error("{command} rejected by server: {text}")]
    Rejected {
        /// Command name.
        command: &'static str,
        /// Server explanation.
        text: String,
    },

    /// The server lacks a capability the watcher cannot do without.
    #[error("Server does not support {0}")]
    Unsupported(&'static str),

    /// None of the configured mailboxes could be selected.
    #[error("None of the configured mailboxes could be selected")]
    NoMailboxes,

    /// Server sent BYE.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The connection was closed, either by the peer or locally.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Coarse classification of an [`Error`], used to decide on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket, TLS or greeting failure.
    Connect,
    /// Credentials rejected.
    Auth,
    /// Malformed data, mismatched tag, refused command, unexpected state.
    Protocol,
    /// Nothing arrived before the read deadline.
    Timeout,
    /// Remote or local close.
    ConnectionClosed,
}

impl Error {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. }
            | Self::Certificate { .. }
            | Self::InvalidDnsName(_) => ErrorKind::Connect,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Parse { .. }
            | Self::Protocol(_)
            | Self::Rejected { .. }
            | Self::Unsupported(_)
            | Self::NoMailboxes
            | Self::InvalidState(_) => ErrorKind::Protocol,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io(_) | Self::Bye(_) | Self::ConnectionClosed => ErrorKind::ConnectionClosed,
        }
    }

    /// Returns true if a fresh connection attempt may succeed.
    ///
    /// Rejected credentials, untrusted certificates and missing server
    /// features will not get better by retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Auth)
            && !matches!(self, Self::Certificate { .. } | Self::Unsupported(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let connect = Error::Connect {
            address: "imap.example.com:993".into(),
            message: "refused".into(),
        };
        assert_eq!(connect.kind(), ErrorKind::Connect);
        assert_eq!(Error::Auth("bad".into()).kind(), ErrorKind::Auth);
        assert_eq!(Error::NoMailboxes.kind(), ErrorKind::Protocol);
        assert_eq!(
            Error::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(Error::Bye("bye".into()).kind(), ErrorKind::ConnectionClosed);
    }

    #[test]
    fn test_auth_is_not_retryable() {
        assert!(!Error::Auth("nope".into()).is_retryable());
        assert!(Error::ConnectionClosed.is_retryable());
        assert!(Error::Protocol("unexpected tag".into()).is_retryable());
        let cert = Error::Certificate {
            host: "imap.example.com".into(),
            message: "expired".into(),
        };
        assert_eq!(cert.kind(), ErrorKind::Connect);
        assert!(!cert.is_retryable());
        assert!(!Error::Unsupported("NOTIFY").is_retryable());
    }
}
