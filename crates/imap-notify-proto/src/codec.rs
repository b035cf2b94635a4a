//! Tagging, pending-command bookkeeping and context-aware decoding.

use std::collections::HashMap;

use crate::command::{Command, CommandKind, TagGenerator};
use crate::event::ServerEvent;
use crate::parser::{Response, ResponseParser, Untagged};
use crate::types::{Mailbox, Status, Tag};

/// A command ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    /// Tag assigned to the command.
    pub tag: Tag,
    /// Command kind.
    pub kind: CommandKind,
    /// Wire parts; a continuation is required between consecutive parts.
    pub parts: Vec<Vec<u8>>,
    /// Loggable rendering with credentials removed.
    pub display: String,
}

/// Encodes commands and decodes responses for one connection.
#[derive(Debug, Default)]
pub struct Codec {
    tags: TagGenerator,
    pending: HashMap<Tag, CommandKind>,
    selecting: HashMap<Tag, Mailbox>,
    selected: Option<Mailbox>,
    literal_plus: bool,
}

impl Codec {
    /// Creates a codec for a fresh connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows non-synchronizing literals (server announced `LITERAL+`).
    pub const fn set_literal_plus(&mut self, enabled: bool) {
        self.literal_plus = enabled;
    }

    /// Assigns a fresh tag and registers the command as pending.
    pub fn encode(&mut self, command: &Command) -> EncodedCommand {
        let tag = self.tags.next_tag();
        let kind = command.kind();
        self.pending.insert(tag.clone(), kind);
        if let Some(mailbox) = command.target_mailbox() {
            self.selecting.insert(tag.clone(), mailbox.clone());
        }

        EncodedCommand {
            parts: command.serialize(tag.as_str(), self.literal_plus),
            display: command.redacted(tag.as_str()),
            tag,
            kind,
        }
    }

    /// Decodes one complete response. Never fails: broken input and
    /// unknown tags come back as [`ServerEvent::Malformed`].
    pub fn decode(&mut self, raw: &[u8]) -> ServerEvent {
        let response = match ResponseParser::parse(raw) {
            Ok(response) => response,
            Err(err) => {
                return ServerEvent::Malformed {
                    raw: lossy(raw),
                    reason: err.to_string(),
                };
            }
        };

        match response {
            Response::Tagged {
                tag,
                status,
                code,
                text,
            } => self.complete(tag, status, code, text, raw),
            Response::Continuation(text) => ServerEvent::Continuation { text },
            Response::Untagged(untagged) => self.untagged(untagged, raw),
        }
    }

    fn complete(
        &mut self,
        tag: Tag,
        outcome: Status,
        code: Option<crate::types::ResponseCode>,
        text: String,
        raw: &[u8],
    ) -> ServerEvent {
        let Some(kind) = self.pending.remove(&tag) else {
            return ServerEvent::Malformed {
                raw: lossy(raw),
                reason: format!("Unexpected tag {tag}"),
            };
        };

        if let Some(mailbox) = self.selecting.remove(&tag) {
            // A failed SELECT leaves no mailbox selected.
            self.selected = outcome.is_ok().then_some(mailbox);
        }

        ServerEvent::CommandComplete {
            tag,
            kind,
            outcome,
            code,
            text,
        }
    }

    fn untagged(&self, untagged: Untagged, raw: &[u8]) -> ServerEvent {
        let mailbox = || self.selected.clone();
        match untagged {
            Untagged::Condition {
                status: Status::Bye,
                text,
                ..
            } => ServerEvent::Bye { text },
            Untagged::Condition { status, code, text } => {
                ServerEvent::Condition { status, code, text }
            }
            Untagged::Capability(caps) => ServerEvent::Capability(caps),
            Untagged::Flags(flags) => ServerEvent::MailboxFlags(flags),
            Untagged::Exists(count) => ServerEvent::MessageExists {
                mailbox: mailbox(),
                count,
            },
            Untagged::Recent(count) => ServerEvent::Recent {
                mailbox: mailbox(),
                count,
            },
            Untagged::Expunge(seq) => ServerEvent::MessageExpunged {
                mailbox: mailbox(),
                seq,
            },
            Untagged::Fetch { seq, uid, flags } => ServerEvent::FlagsChanged {
                mailbox: mailbox(),
                seq,
                uid,
                flags,
            },
            Untagged::Status { mailbox, counts } => ServerEvent::MailboxStatus { mailbox, counts },
            Untagged::List {
                attributes,
                mailbox,
                old_name,
                ..
            } => match old_name {
                Some(from) => ServerEvent::MailboxRenamed { from, to: mailbox },
                None if attributes
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case("\\NonExistent")) =>
                {
                    ServerEvent::MailboxDeleted { mailbox }
                }
                None => ServerEvent::MailboxCreated { mailbox },
            },
            Untagged::Other { keyword } => ServerEvent::Unparsed {
                keyword,
                raw: lossy(raw),
            },
        }
    }

    /// Returns true if the tag is awaiting completion.
    #[must_use]
    pub fn is_pending(&self, tag: &Tag) -> bool {
        self.pending.contains_key(tag)
    }

    /// Number of commands awaiting completion.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Mailbox whose SELECT/EXAMINE most recently succeeded.
    #[must_use]
    pub const fn selected(&self) -> Option<&Mailbox> {
        self.selected.as_ref()
    }
}

fn lossy(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end().to_string()
}
