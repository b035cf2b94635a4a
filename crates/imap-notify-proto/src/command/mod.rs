//! Client commands.
//!
//! Only the handful of commands the watcher needs: session setup,
//! mailbox selection, `NOTIFY`, keepalive and logout.

mod notify;
mod serialize;
mod tag_generator;

use std::fmt;

use crate::types::{Mailbox, Secret};

pub use notify::{EventSet, EventSetError, MailboxFilter, NotifyEvent, NotifyRequest};
pub use serialize::CommandWriter;
pub use tag_generator::TagGenerator;

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: Secret,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// NOTIFY SET command (RFC 5465).
    Notify(NotifyRequest),
}

/// What a pending tag is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// CAPABILITY
    Capability,
    /// NOOP
    Noop,
    /// LOGOUT
    Logout,
    /// STARTTLS
    StartTls,
    /// LOGIN
    Login,
    /// SELECT
    Select,
    /// EXAMINE
    Examine,
    /// NOTIFY
    Notify,
}

impl CommandKind {
    /// Command name as sent on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login => "LOGIN",
            Self::Select => "SELECT",
            Self::Examine => "EXAMINE",
            Self::Notify => "NOTIFY",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Command {
    /// Returns the kind of this command.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Capability => CommandKind::Capability,
            Self::Noop => CommandKind::Noop,
            Self::Logout => CommandKind::Logout,
            Self::StartTls => CommandKind::StartTls,
            Self::Login { .. } => CommandKind::Login,
            Self::Select { .. } => CommandKind::Select,
            Self::Examine { .. } => CommandKind::Examine,
            Self::Notify(_) => CommandKind::Notify,
        }
    }

    /// The mailbox a SELECT/EXAMINE targets.
    #[must_use]
    pub const fn target_mailbox(&self) -> Option<&Mailbox> {
        match self {
            Self::Select { mailbox } | Self::Examine { mailbox } => Some(mailbox),
            _ => None,
        }
    }

    /// Serializes the command with the given tag.
    ///
    /// Returns more than one part only when a synchronizing literal is
    /// needed; each part but the last ends in `{n}\r\n`.
    #[must_use]
    pub fn serialize(&self, tag: &str, literal_plus: bool) -> Vec<Vec<u8>> {
        let mut w = CommandWriter::new(literal_plus);
        w.raw(tag.as_bytes());
        w.raw(b" ");
        w.raw(self.kind().name().as_bytes());

        match self {
            Self::Capability | Self::Noop | Self::Logout | Self::StartTls => {}
            Self::Login { username, password } => {
                w.raw(b" ");
                w.astring(username);
                w.raw(b" ");
                w.astring(password.expose());
            }
            Self::Select { mailbox } | Self::Examine { mailbox } => {
                w.raw(b" ");
                w.mailbox(mailbox);
            }
            Self::Notify(request) => {
                w.raw(b" ");
                serialize::write_notify(&mut w, request);
            }
        }

        w.finish()
    }

    /// A one-line rendering for logs, with credentials removed.
    #[must_use]
    pub fn redacted(&self, tag: &str) -> String {
        match self {
            Self::Login { username, .. } => format!("{tag} LOGIN {username} <redacted>"),
            _ => {
                let bytes = self.serialize(tag, true).concat();
                String::from_utf8_lossy(&bytes).trim_end().to_string()
            }
        }
    }
}
