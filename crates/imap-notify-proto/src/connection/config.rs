//! Connection profile and session policy.

use std::time::Duration;

use crate::command::EventSet;
use crate::types::{MailboxSelection, Secret};

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143). Only sensible on localhost.
    None,
    /// Start with plaintext, upgrade with STARTTLS (port 143).
    #[default]
    StartTls,
    /// TLS from the start (port 993).
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// How the session authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMechanism {
    /// Plain `LOGIN username password`.
    #[default]
    Login,
}

/// Everything needed to reach and log in to one account.
#[derive(Debug, Clone)]
pub struct ConnectionProfile {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Login name.
    pub username: String,
    /// Password.
    pub secret: Secret,
    /// Authentication mechanism.
    pub auth: AuthMechanism,
    /// Mailboxes to watch.
    pub mailboxes: MailboxSelection,
}

impl ConnectionProfile {
    /// Creates a profile builder.
    #[must_use]
    pub fn builder(host: impl Into<String>, username: impl Into<String>, secret: Secret) -> ProfileBuilder {
        ProfileBuilder::new(host, username, secret)
    }

    /// `host:port`, as dialed.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [`ConnectionProfile`].
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    username: String,
    secret: Secret,
    mailboxes: MailboxSelection,
}

impl ProfileBuilder {
    /// Creates a builder with STARTTLS and the subscribed mailboxes.
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>, secret: Secret) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            username: username.into(),
            secret,
            mailboxes: MailboxSelection::default(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the mailboxes to watch.
    #[must_use]
    pub fn mailboxes(mut self, mailboxes: MailboxSelection) -> Self {
        self.mailboxes = mailboxes;
        self
    }

    /// Builds the profile. Without an explicit port the security mode's
    /// default is used.
    #[must_use]
    pub fn build(self) -> ConnectionProfile {
        ConnectionProfile {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            username: self.username,
            secret: self.secret,
            auth: AuthMechanism::Login,
            mailboxes: self.mailboxes,
        }
    }
}

/// Timing and behavior knobs of a watch session.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Quiet period that closes a burst.
    pub debounce: Duration,
    /// Upper bound for a single read while watching.
    pub read_timeout: Duration,
    /// Silence after which a NOOP is sent.
    pub keepalive: Duration,
    /// Deadline for each handshake step (connect, greeting, each command).
    pub command_timeout: Duration,
    /// Use EXAMINE instead of SELECT.
    pub read_only: bool,
    /// Events requested with NOTIFY.
    pub events: EventSet,
    /// Fire one burst right after every successful (re)connect.
    pub refresh_on_connect: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            read_timeout: Duration::from_secs(30),
            keepalive: Duration::from_secs(15 * 60),
            command_timeout: Duration::from_secs(60),
            read_only: true,
            events: EventSet::default(),
            refresh_on_connect: true,
        }
    }
}
