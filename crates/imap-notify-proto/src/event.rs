//! Decoded server events.

use crate::command::CommandKind;
use crate::types::{Capability, Flags, Mailbox, MailboxCounts, ResponseCode, SeqNum, Status, Tag, Uid};

/// One server response, decoded with session context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// `STATUS` data, typically for a mailbox that is not selected.
    MailboxStatus {
        /// Mailbox.
        mailbox: Mailbox,
        /// Reported counters.
        counts: MailboxCounts,
    },
    /// `FETCH` data for a message in the selected mailbox.
    FlagsChanged {
        /// Selected mailbox, if known.
        mailbox: Option<Mailbox>,
        /// Sequence number.
        seq: SeqNum,
        /// UID, if reported.
        uid: Option<Uid>,
        /// New flags, if reported.
        flags: Option<Flags>,
    },
    /// `EXISTS`: message count of the selected mailbox.
    MessageExists {
        /// Selected mailbox, if known.
        mailbox: Option<Mailbox>,
        /// New message count.
        count: u32,
    },
    /// `EXPUNGE`: a message left the selected mailbox.
    MessageExpunged {
        /// Selected mailbox, if known.
        mailbox: Option<Mailbox>,
        /// Sequence number of the removed message.
        seq: SeqNum,
    },
    /// `RECENT` count of the selected mailbox.
    Recent {
        /// Selected mailbox, if known.
        mailbox: Option<Mailbox>,
        /// Recent count.
        count: u32,
    },
    /// A mailbox appeared (or its subscription changed).
    MailboxCreated {
        /// Mailbox.
        mailbox: Mailbox,
    },
    /// A mailbox was deleted.
    MailboxDeleted {
        /// Mailbox.
        mailbox: Mailbox,
    },
    /// A mailbox was renamed.
    MailboxRenamed {
        /// Old name.
        from: Mailbox,
        /// New name.
        to: Mailbox,
    },
    /// Tagged completion of a pending command.
    CommandComplete {
        /// Tag of the command.
        tag: Tag,
        /// Which command completed.
        kind: CommandKind,
        /// OK, NO or BAD.
        outcome: Status,
        /// Response code, if any.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged OK/NO/BAD/PREAUTH.
    Condition {
        /// Status keyword.
        status: Status,
        /// Response code, if any.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged BYE.
    Bye {
        /// Server explanation.
        text: String,
    },
    /// Untagged CAPABILITY.
    Capability(Vec<Capability>),
    /// Untagged FLAGS: the flags defined for the selected mailbox.
    MailboxFlags(Flags),
    /// Continuation request.
    Continuation {
        /// Text after `+`.
        text: String,
    },
    /// Well-formed response with a keyword we do not interpret.
    Unparsed {
        /// The keyword.
        keyword: String,
        /// The raw response.
        raw: String,
    },
    /// Broken line or unexpected tag.
    Malformed {
        /// The raw response.
        raw: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ServerEvent {
    /// Returns true if the event means mailbox contents may have changed.
    ///
    /// Anything we cannot interpret counts as a change, so the caller errs
    /// on the side of refreshing.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        match self {
            Self::MailboxStatus { .. }
            | Self::FlagsChanged { .. }
            | Self::MessageExists { .. }
            | Self::MessageExpunged { .. }
            | Self::Recent { .. }
            | Self::MailboxCreated { .. }
            | Self::MailboxDeleted { .. }
            | Self::MailboxRenamed { .. }
            | Self::Unparsed { .. } => true,
            Self::Condition { code, .. } => {
                matches!(code, Some(ResponseCode::NotificationOverflow))
            }
            Self::CommandComplete { .. }
            | Self::Bye { .. }
            | Self::Capability(_)
            | Self::MailboxFlags(_)
            | Self::Continuation { .. }
            | Self::Malformed { .. } => false,
        }
    }

    /// True for `* OK [NOTIFICATIONOVERFLOW]`.
    #[must_use]
    pub const fn is_overflow(&self) -> bool {
        matches!(
            self,
            Self::Condition {
                code: Some(ResponseCode::NotificationOverflow),
                ..
            }
        )
    }
}
