//! Response codes carried in `[...]` after a status keyword.

use super::Capability;

/// Response code attached to a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: Human-readable message that MUST be shown to user.
    Alert,
    /// CAPABILITY list embedded in a greeting or LOGIN completion.
    Capability(Vec<Capability>),
    /// READ-ONLY: Mailbox selected as read-only.
    ReadOnly,
    /// READ-WRITE: Mailbox selected as read-write.
    ReadWrite,
    /// AUTHENTICATIONFAILED (RFC 5530).
    AuthenticationFailed,
    /// NONEXISTENT (RFC 5530): the mailbox does not exist.
    NonExistent,
    /// NOTIFICATIONOVERFLOW (RFC 5465): the server stopped sending
    /// notifications and the client must resynchronize.
    NotificationOverflow,
    /// BADEVENT (RFC 5465): unsupported event in a NOTIFY command.
    BadEvent(Vec<String>),
    /// Any other code, kept verbatim.
    Other(String),
}
