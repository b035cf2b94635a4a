//! # imap-notify-core
//!
//! Everything around the watcher that is not IMAP:
//! - the TOML configuration file and its validation
//! - password resolution (inline, `password_command`, system keyring)
//! - the action runner that executes the user's command once per burst

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod action;
pub mod config;
pub mod credentials;
mod error;

pub use action::ActionRunner;
pub use config::{Config, Settings, ValidationError, default_path};
pub use credentials::{PasswordSource, resolve_password};
pub use error::{ActionError, ConfigError, CredentialError};
