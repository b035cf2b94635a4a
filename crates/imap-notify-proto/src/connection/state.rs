//! Session states.

use std::fmt;

/// Where a watch session is in its lifecycle.
///
/// ```text
/// Disconnected -> Connecting -> Authenticating -> Selecting -> Watching
///       ^              |              |               |           |
///       |              +--------------+---------------+-----------+--> Failed
///       +----------------------- clean shutdown ------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Socket/TLS setup and greeting.
    Connecting,
    /// LOGIN in flight.
    Authenticating,
    /// SELECT/EXAMINE of the configured mailboxes and NOTIFY.
    Selecting,
    /// NOTIFY active; events are being dispatched.
    Watching,
    /// The connection attempt is over and must not be reused.
    Failed,
}

impl SessionState {
    /// Returns true if the transition is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Authenticating | Self::Selecting)
                | (Self::Authenticating, Self::Selecting)
                | (Self::Selecting, Self::Watching)
                | (Self::Watching, Self::Disconnected)
                | (
                    Self::Connecting | Self::Authenticating | Self::Selecting | Self::Watching,
                    Self::Failed
                )
        )
    }

    /// Returns true for the terminal failure state.
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Selecting => "selecting",
            Self::Watching => "watching",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
