//! Schema of the configuration file.

use serde::Deserialize;

/// The whole configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server and account.
    pub imap: ImapSection,
    /// What happens on a change, and watch timing.
    #[serde(default)]
    pub notify: NotifySection,
    /// Reconnect timing.
    #[serde(default)]
    pub reconnect: ReconnectSection,
}

/// `[imap]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImapSection {
    /// Server hostname.
    pub host: String,
    /// Server port; defaults by encryption. Kept wide so that out-of-range
    /// values are reported instead of failing deserialization.
    pub port: Option<i64>,
    /// Encryption mode.
    pub encryption: Option<Encryption>,
    /// Legacy switch for implicit TLS.
    pub imaps: Option<bool>,
    /// Legacy switch for STARTTLS.
    pub starttls: Option<bool>,
    /// Login name.
    pub username: String,
    /// Inline password.
    pub password: Option<String>,
    /// Shell command printing the password.
    pub password_command: Option<String>,
    /// Read the password from the system keyring.
    #[serde(default)]
    pub keyring: bool,
    /// Mailboxes to watch.
    #[serde(default)]
    pub mailboxes: MailboxesSetting,
    /// Use EXAMINE instead of SELECT.
    #[serde(default = "default_true")]
    pub read_only: bool,
    /// NOTIFY event names.
    pub events: Option<Vec<String>>,
    /// Verbose logging including protocol traffic.
    #[serde(default)]
    pub debug: bool,
}

/// `encryption = "..."`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    /// TLS from the first byte.
    Imaps,
    /// Plaintext upgraded with STARTTLS.
    Starttls,
    /// No encryption.
    None,
}

/// `mailboxes = "all" | "subscribed" | ["INBOX", ...]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MailboxesSetting {
    /// `"all"` or `"subscribed"`.
    Keyword(String),
    /// Explicit list.
    Names(Vec<String>),
}

impl Default for MailboxesSetting {
    fn default() -> Self {
        Self::Keyword("subscribed".to_string())
    }
}

/// `[notify]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifySection {
    /// Shell command run once per burst.
    pub command: Option<String>,
    /// Quiet period closing a burst.
    pub debounce_secs: u64,
    /// Silence before a NOOP.
    pub keepalive_secs: u64,
    /// Longest single read while watching.
    pub read_timeout_secs: u64,
    /// Run the command after every (re)connect.
    pub refresh_on_connect: bool,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            command: None,
            debounce_secs: 2,
            keepalive_secs: 900,
            read_timeout_secs: 30,
            refresh_on_connect: true,
        }
    }
}

/// `[reconnect]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectSection {
    /// First retry delay.
    pub initial_delay_secs: u64,
    /// Delay cap.
    pub max_delay_secs: u64,
    /// Give up after this many consecutive failures.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            initial_delay_secs: 2,
            max_delay_secs: 120,
            max_attempts: None,
        }
    }
}

const fn default_true() -> bool {
    true
}
