//! Connection management.
//!
//! - Profile and policy types
//! - TLS/plaintext streams and the [`Connector`] seam
//! - Cancel-safe framed transport
//! - The session state machine and its watch loop

mod config;
mod session;
mod state;
mod stream;
mod transport;

pub use config::{AuthMechanism, ConnectionProfile, ProfileBuilder, Security, SessionPolicy};
pub use session::{Session, WatchStep};
pub use state::SessionState;
pub use stream::{Connector, ImapStream, TcpConnector, create_tls_connector};
pub use transport::{MAX_LINE_LENGTH, MAX_LITERAL_SIZE, Transport};
