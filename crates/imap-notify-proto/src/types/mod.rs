//! Core IMAP types used by the watcher.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod secret;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid};
pub use mailbox::{Mailbox, MailboxCounts, MailboxSelection};
pub use response_code::ResponseCode;
pub use secret::Secret;
