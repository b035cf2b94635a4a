//! Mailbox types.

/// Mailbox name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox (case-insensitive per RFC).
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is INBOX, which compares case-insensitively.
    #[must_use]
    pub fn is_inbox(&self) -> bool {
        self.0.eq_ignore_ascii_case("INBOX")
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counters reported by a STATUS response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxCounts {
    /// Number of messages in the mailbox.
    pub messages: Option<u32>,
    /// Number of unseen messages.
    pub unseen: Option<u32>,
    /// Next UID to be assigned.
    pub uid_next: Option<u32>,
}

/// Which mailboxes the NOTIFY command should cover.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MailboxSelection {
    /// Every mailbox in the personal namespace.
    All,
    /// Every subscribed mailbox.
    #[default]
    Subscribed,
    /// An explicit, ordered list of mailboxes.
    Named(Vec<Mailbox>),
}

impl MailboxSelection {
    /// Builds an explicit selection from names.
    #[must_use]
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Named(names.into_iter().map(Mailbox::new).collect())
    }
}
