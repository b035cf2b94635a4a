//! # imap-notify-proto
//!
//! Watches an IMAP account for changes over a single connection using the
//! `NOTIFY` extension (RFC 5465) and turns bursts of change events into
//! one callback each.
//!
//! ## Layers
//!
//! - [`connection::Transport`]: TCP, optional TLS (implicit or STARTTLS),
//!   cancel-safe response framing with read deadlines
//! - [`Codec`]: tagged command encoding, response decoding into
//!   [`ServerEvent`]s with pending-tag and selected-mailbox context
//! - [`Session`]: connect → login → select → NOTIFY → watch
//! - [`Dispatcher`]: debounces change events into bursts
//! - [`supervisor::run`]: reconnects with capped exponential backoff
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use imap_notify_proto::{
//!     ConnectionProfile, Dispatcher, MailboxSelection, ReconnectPolicy, Secret, Security,
//!     SessionPolicy, TcpConnector,
//! };
//!
//! let profile = ConnectionProfile::builder("imap.example.com", "alice", Secret::new("pw"))
//!     .security(Security::Implicit)
//!     .mailboxes(MailboxSelection::named(["INBOX", "Sent"]))
//!     .build();
//! let policy = SessionPolicy::default();
//! let mut dispatcher = Dispatcher::new(policy.debounce, || println!("changed"));
//! let (_tx, rx) = tokio::sync::watch::channel(false);
//!
//! imap_notify_proto::supervisor::run(
//!     &mut TcpConnector,
//!     &profile,
//!     &policy,
//!     &ReconnectPolicy::default(),
//!     &mut dispatcher,
//!     rx,
//! )
//! .await?;
//! ```
//!
//! ## Session states
//!
//! ```text
//! Disconnected → Connecting → Authenticating → Selecting → Watching
//!                     └──────────────┴───────────────┴──────────┴──→ Failed
//! ```

#![forbid(unsafe_code)]

pub mod backoff;
mod codec;
pub mod command;
pub mod connection;
pub mod dispatch;
mod error;
mod event;
pub mod parser;
pub mod supervisor;
pub mod types;

pub use backoff::{Backoff, ReconnectPolicy};
pub use codec::{Codec, EncodedCommand};
pub use command::{Command, CommandKind, EventSet, EventSetError, MailboxFilter, NotifyEvent, NotifyRequest};
pub use connection::{
    AuthMechanism, ConnectionProfile, Connector, ImapStream, Security, Session, SessionPolicy, SessionState,
    TcpConnector, Transport,
};
pub use dispatch::Dispatcher;
pub use error::{Error, ErrorKind, Result};
pub use event::ServerEvent;
pub use types::{Capability, Flag, Flags, Mailbox, MailboxCounts, MailboxSelection, ResponseCode, Secret, SeqNum, Status, Tag, Uid};
