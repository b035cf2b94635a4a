//! Configuration file loading.
//!
//! The file is TOML with `[imap]`, `[notify]` and `[reconnect]` sections.
//! Loading parses and validates; [`Config::resolve`] then obtains the
//! password and produces the runtime [`Settings`].

mod model;
mod validation;

use std::path::{Path, PathBuf};
use std::time::Duration;

use imap_notify_proto::{
    ConnectionProfile, EventSet, MailboxSelection, ReconnectPolicy, Secret, Security, SessionPolicy,
};
use tracing::debug;

use crate::credentials::{PasswordSource, resolve_password};
use crate::error::ConfigError;

pub use model::{Config, Encryption, ImapSection, MailboxesSetting, NotifySection, ReconnectSection};
pub use validation::{ValidationError, validate};

/// Application directory under the platform configuration directory.
const APP_DIR: &str = "imap-notify";

/// Default configuration file name.
const CONFIG_FILE: &str = "config.toml";

/// Returns `$XDG_CONFIG_HOME/imap-notify/config.toml` (or the platform
/// equivalent).
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Everything the watcher needs, with the password resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where and how to connect.
    pub profile: ConnectionProfile,
    /// Session timing and NOTIFY events.
    pub session: SessionPolicy,
    /// Reconnect timing.
    pub reconnect: ReconnectPolicy,
    /// Shell command to run per burst.
    pub command: Option<String>,
}

impl Config {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for the schema or a
    /// value is invalid.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Effective security mode.
    #[must_use]
    pub fn security(&self) -> Security {
        match (self.imap.encryption, self.imap.imaps, self.imap.starttls) {
            (Some(Encryption::Imaps), _, _) | (None, Some(true), _) => Security::Implicit,
            (Some(Encryption::None), _, _) => Security::None,
            // An explicit `starttls = false` without `imaps` means plaintext.
            (None, _, Some(false)) => Security::None,
            _ => Security::StartTls,
        }
    }

    /// Effective port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.imap
            .port
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or_else(|| self.security().default_port())
    }

    /// Mailboxes to watch.
    #[must_use]
    pub fn mailbox_selection(&self) -> MailboxSelection {
        match &self.imap.mailboxes {
            MailboxesSetting::Keyword(keyword) if keyword.eq_ignore_ascii_case("all") => MailboxSelection::All,
            MailboxesSetting::Keyword(_) => MailboxSelection::Subscribed,
            MailboxesSetting::Names(names) => MailboxSelection::named(names.iter().cloned()),
        }
    }

    /// Where the password comes from.
    #[must_use]
    pub fn password_source(&self) -> PasswordSource {
        if let Some(password) = &self.imap.password {
            PasswordSource::Inline(Secret::new(password.clone()))
        } else if let Some(command) = &self.imap.password_command {
            PasswordSource::Command(command.clone())
        } else {
            PasswordSource::Keyring
        }
    }

    /// Session policy from `[imap]` and `[notify]`.
    #[must_use]
    pub fn session_policy(&self) -> SessionPolicy {
        let events = self
            .imap
            .events
            .as_ref()
            .and_then(|names| EventSet::from_names(names).ok())
            .unwrap_or_default();
        SessionPolicy {
            debounce: Duration::from_secs(self.notify.debounce_secs),
            read_timeout: Duration::from_secs(self.notify.read_timeout_secs),
            keepalive: Duration::from_secs(self.notify.keepalive_secs),
            read_only: self.imap.read_only,
            events,
            refresh_on_connect: self.notify.refresh_on_connect,
            ..SessionPolicy::default()
        }
    }

    /// Reconnect policy from `[reconnect]`.
    #[must_use]
    pub const fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_secs(self.reconnect.initial_delay_secs),
            max_delay: Duration::from_secs(self.reconnect.max_delay_secs),
            max_attempts: self.reconnect.max_attempts,
        }
    }

    /// Obtains the password and builds the runtime settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the password cannot be resolved.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let secret = resolve_password(&self.password_source(), &self.imap.username)?;
        let profile = ConnectionProfile::builder(self.imap.host.trim(), self.imap.username.clone(), secret)
            .security(self.security())
            .port(self.port())
            .mailboxes(self.mailbox_selection())
            .build();

        Ok(Settings {
            profile,
            session: self.session_policy(),
            reconnect: self.reconnect_policy(),
            command: self.notify.command.clone(),
        })
    }
}
