//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ValidationError;

/// Errors loading or interpreting the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `--config` given and no platform configuration directory.
    #[error("No configuration directory found; pass --config")]
    NoConfigDir,

    /// The file could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("Invalid configuration syntax: {0}")]
    Syntax(#[from] toml::de::Error),

    /// One or more values are invalid.
    #[error("Invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    /// The password could not be obtained.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors obtaining the IMAP password.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// The keyring has no entry for the user.
    #[error("No password stored in the keyring for {username}")]
    NotInKeyring {
        /// Keyring entry name.
        username: String,
    },

    /// `password_command` could not be started.
    #[error("Cannot run password command: {0}")]
    CommandSpawn(#[source] std::io::Error),

    /// `password_command` exited unsuccessfully.
    #[error("Password command failed ({status}): {stderr}")]
    CommandFailed {
        /// Exit status as reported by the OS.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The command printed nothing but whitespace.
    #[error("Password command produced no usable password")]
    EmptyPassword,

    /// The command output is not valid UTF-8.
    #[error("Password command output is not valid UTF-8")]
    NotUtf8,
}

/// Errors running the external action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The shell could not be started.
    #[error("Cannot start action: {0}")]
    Spawn(#[from] std::io::Error),

    /// The command exited unsuccessfully.
    #[error("Action exited with {0}")]
    Failed(std::process::ExitStatus),
}
