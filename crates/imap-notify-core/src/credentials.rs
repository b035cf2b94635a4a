//! Password resolution.
//!
//! The password comes from exactly one of three places:
//! - inline in the configuration file
//! - the standard output of `password_command`, run through `sh -c`
//! - the platform credential store:
//!   - Linux: Secret Service (GNOME Keyring, `KWallet`)
//!   - macOS: Keychain
//!   - Windows: Credential Manager

use std::process::Command;

use imap_notify_proto::Secret;
use keyring::Entry;
use tracing::debug;

use crate::error::CredentialError;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "imap-notify";

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Where the IMAP password comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    /// Given inline.
    Inline(Secret),
    /// Printed by a shell command.
    Command(String),
    /// Stored in the system keyring under the username.
    Keyring,
}

/// Resolves the password for `username`.
///
/// # Errors
///
/// Returns an error if the command fails or the keyring has no usable
/// entry.
pub fn resolve_password(source: &PasswordSource, username: &str) -> CredentialResult<Secret> {
    match source {
        PasswordSource::Inline(secret) => Ok(secret.clone()),
        PasswordSource::Command(command) => run_password_command(command),
        PasswordSource::Keyring => keyring_password(username),
    }
}

/// Runs `command` with `sh -c` and returns its standard output without
/// trailing whitespace.
fn run_password_command(command: &str) -> CredentialResult<Secret> {
    debug!("Running password command");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(CredentialError::CommandSpawn)?;

    if !output.status.success() {
        return Err(CredentialError::CommandFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8(output.stdout).map_err(|_| CredentialError::NotUtf8)?;
    let password = stdout.trim_end();
    if password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }
    Ok(Secret::new(password))
}

/// Retrieves the password from the system keyring.
fn keyring_password(username: &str) -> CredentialResult<Secret> {
    let entry = Entry::new(SERVICE_NAME, username)?;
    match entry.get_password() {
        Ok(password) => {
            debug!(%username, "Loaded password from keyring");
            Ok(Secret::new(password))
        }
        Err(keyring::Error::NoEntry) => Err(CredentialError::NotInKeyring {
            username: username.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_password() {
        let secret = resolve_password(&PasswordSource::Inline(Secret::new("hunter2")), "alice").unwrap();
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_password_command_strips_trailing_whitespace() {
        let source = PasswordSource::Command("printf '  s3cret \\n'".to_string());
        let secret = resolve_password(&source, "alice").unwrap();
        assert_eq!(secret.expose(), "  s3cret");
    }

    #[test]
    fn test_password_command_invalid_utf8() {
        let source = PasswordSource::Command("printf '\\377\\376'".to_string());
        assert!(matches!(
            resolve_password(&source, "alice"),
            Err(CredentialError::NotUtf8)
        ));
    }

    #[test]
    fn test_password_command_failure() {
        let source = PasswordSource::Command("echo locked >&2; exit 3".to_string());
        match resolve_password(&source, "alice") {
            Err(CredentialError::CommandFailed { stderr, .. }) => assert_eq!(stderr, "locked"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_password_command_empty_output() {
        let source = PasswordSource::Command("true".to_string());
        assert!(matches!(
            resolve_password(&source, "alice"),
            Err(CredentialError::EmptyPassword)
        ));
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_keyring_roundtrip() {
        let username = "imap-notify-test-user";
        let entry = Entry::new(SERVICE_NAME, username).unwrap();
        entry.set_password("from-keyring").unwrap();

        let secret = resolve_password(&PasswordSource::Keyring, username).unwrap();
        assert_eq!(secret.expose(), "from-keyring");

        entry.delete_credential().unwrap();
        assert!(matches!(
            resolve_password(&PasswordSource::Keyring, username),
            Err(CredentialError::NotInKeyring { .. })
        ));
    }
}
