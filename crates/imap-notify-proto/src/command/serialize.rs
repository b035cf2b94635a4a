//! Command serialization helpers.

use crate::parser::lexer::is_atom_char;
use crate::types::Mailbox;

use super::notify::{MailboxFilter, NotifyEvent, NotifyRequest};

/// Accumulates the bytes of one command.
///
/// A synchronizing literal splits the command: everything up to and
/// including `{n}\r\n` is one part, and the client must wait for a `+`
/// continuation before sending the next part.
#[derive(Debug)]
pub struct CommandWriter {
    parts: Vec<Vec<u8>>,
    buf: Vec<u8>,
    literal_plus: bool,
}

impl CommandWriter {
    /// Creates a writer. With `literal_plus`, literals are sent inline.
    #[must_use]
    pub const fn new(literal_plus: bool) -> Self {
        Self {
            parts: Vec::new(),
            buf: Vec::new(),
            literal_plus,
        }
    }

    /// Appends raw protocol bytes.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an astring: atom, quoted string or literal.
    pub fn astring(&mut self, s: &str) {
        if s.bytes().any(needs_literal) {
            self.literal(s.as_bytes());
        } else if s.is_empty() || s.starts_with('+') || s.bytes().any(needs_quoting) {
            self.buf.push(b'"');
            for b in s.bytes() {
                if b == b'"' || b == b'\\' {
                    self.buf.push(b'\\');
                }
                self.buf.push(b);
            }
            self.buf.push(b'"');
        } else {
            self.buf.extend_from_slice(s.as_bytes());
        }
    }

    /// Writes a mailbox name.
    pub fn mailbox(&mut self, mailbox: &Mailbox) {
        self.astring(mailbox.as_str());
    }

    fn literal(&mut self, data: &[u8]) {
        if self.literal_plus {
            self.buf
                .extend_from_slice(format!("{{{}+}}\r\n", data.len()).as_bytes());
        } else {
            self.buf
                .extend_from_slice(format!("{{{}}}\r\n", data.len()).as_bytes());
            self.parts.push(std::mem::take(&mut self.buf));
        }
        self.buf.extend_from_slice(data);
    }

    /// Terminates the command with CRLF and returns its parts.
    #[must_use]
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(b"\r\n");
        self.parts.push(self.buf);
        self.parts
    }
}

/// Returns true if the byte cannot appear in a quoted string.
const fn needs_literal(b: u8) -> bool {
    matches!(b, b'\r' | b'\n' | 0) || b > 0x7F
}

/// Returns true if the byte cannot appear in an atom.
const fn needs_quoting(b: u8) -> bool {
    !is_atom_char(b) || b == b'\\'
}

fn write_event_list(w: &mut CommandWriter, events: impl IntoIterator<Item = NotifyEvent>) {
    w.raw(b"(");
    for (i, event) in events.into_iter().enumerate() {
        if i > 0 {
            w.raw(b" ");
        }
        w.raw(event.as_str().as_bytes());
    }
    w.raw(b")");
}

/// Writes the arguments of `NOTIFY SET`.
pub fn write_notify(w: &mut CommandWriter, request: &NotifyRequest) {
    w.raw(b"SET");

    let selected = request.events.message_events();
    if !selected.is_empty() {
        w.raw(b" (SELECTED ");
        write_event_list(w, selected);
        w.raw(b")");
    }

    w.raw(b" (");
    match &request.filter {
        MailboxFilter::Personal => w.raw(b"PERSONAL"),
        MailboxFilter::Subscribed => w.raw(b"SUBSCRIBED"),
        MailboxFilter::Mailboxes(mailboxes) => {
            w.raw(b"MAILBOXES (");
            for (i, mailbox) in mailboxes.iter().enumerate() {
                if i > 0 {
                    w.raw(b" ");
                }
                w.mailbox(mailbox);
            }
            w.raw(b")");
        }
    }
    w.raw(b" ");
    write_event_list(w, request.events.iter());
    w.raw(b")");
}
