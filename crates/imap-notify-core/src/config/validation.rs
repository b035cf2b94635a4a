//! Configuration validation.

use imap_notify_proto::{EventSet, EventSetError};

use super::model::{Config, MailboxesSetting};

/// A single invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `imap.host` is empty.
    #[error("IMAP host is required")]
    EmptyHost,
    /// `imap.port` outside 1-65535.
    #[error("IMAP port must be 1-65535, got {0}")]
    InvalidPort(i64),
    /// `imaps` and `starttls` both enabled, or mixed with `encryption`.
    #[error("Conflicting encryption settings")]
    ConflictingEncryption,
    /// `imap.username` is empty.
    #[error("IMAP username is required")]
    EmptyUsername,
    /// None of `password`, `password_command`, `keyring`.
    #[error("One of password, password_command or keyring is required")]
    MissingPassword,
    /// More than one password source.
    #[error("Only one of password, password_command or keyring may be set")]
    MultiplePasswordSources,
    /// `mailboxes` keyword other than `all`/`subscribed`.
    #[error("mailboxes must be \"all\", \"subscribed\" or a list, got {0:?}")]
    InvalidMailboxKeyword(String),
    /// Empty mailbox list or empty name.
    #[error("Mailbox names must not be empty")]
    EmptyMailbox,
    /// Bad NOTIFY event list.
    #[error("events: {0}")]
    InvalidEvents(EventSetError),
    /// A duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    /// `max_delay_secs` below `initial_delay_secs`.
    #[error("reconnect.max_delay_secs must not be below initial_delay_secs")]
    InvalidBackoff,
}

impl ValidationError {
    /// The configuration key this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyHost => "imap.host",
            Self::InvalidPort(_) => "imap.port",
            Self::ConflictingEncryption => "imap.encryption",
            Self::EmptyUsername => "imap.username",
            Self::MissingPassword | Self::MultiplePasswordSources => "imap.password",
            Self::InvalidMailboxKeyword(_) | Self::EmptyMailbox => "imap.mailboxes",
            Self::InvalidEvents(_) => "imap.events",
            Self::ZeroDuration(field) => field,
            Self::InvalidBackoff => "reconnect.max_delay_secs",
        }
    }
}

/// Validates a parsed configuration, collecting every problem.
///
/// # Errors
///
/// Returns all invalid values.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let imap = &config.imap;

    if imap.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if let Some(port) = imap.port
        && !(1..=65535).contains(&port)
    {
        errors.push(ValidationError::InvalidPort(port));
    }
    let legacy_imaps = imap.imaps.unwrap_or(false);
    let legacy_starttls = imap.starttls.unwrap_or(false);
    if (legacy_imaps && legacy_starttls)
        || (imap.encryption.is_some() && (imap.imaps.is_some() || imap.starttls.is_some()))
    {
        errors.push(ValidationError::ConflictingEncryption);
    }
    if imap.username.trim().is_empty() {
        errors.push(ValidationError::EmptyUsername);
    }

    let sources = [imap.password.is_some(), imap.password_command.is_some(), imap.keyring]
        .into_iter()
        .filter(|set| *set)
        .count();
    match sources {
        0 => errors.push(ValidationError::MissingPassword),
        1 => {}
        _ => errors.push(ValidationError::MultiplePasswordSources),
    }

    match &imap.mailboxes {
        MailboxesSetting::Keyword(keyword) => {
            if !matches!(keyword.to_ascii_lowercase().as_str(), "all" | "subscribed") {
                errors.push(ValidationError::InvalidMailboxKeyword(keyword.clone()));
            }
        }
        MailboxesSetting::Names(names) => {
            if names.is_empty() || names.iter().any(String::is_empty) {
                errors.push(ValidationError::EmptyMailbox);
            }
        }
    }

    if let Some(events) = &imap.events
        && let Err(e) = EventSet::from_names(events)
    {
        errors.push(ValidationError::InvalidEvents(e));
    }

    let notify = &config.notify;
    for (value, field) in [
        (notify.debounce_secs, "notify.debounce_secs"),
        (notify.keepalive_secs, "notify.keepalive_secs"),
        (notify.read_timeout_secs, "notify.read_timeout_secs"),
        (config.reconnect.initial_delay_secs, "reconnect.initial_delay_secs"),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(field));
        }
    }
    if config.reconnect.max_delay_secs < config.reconnect.initial_delay_secs {
        errors.push(ValidationError::InvalidBackoff);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
