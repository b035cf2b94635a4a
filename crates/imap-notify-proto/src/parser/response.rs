//! Structural decoding of a single server response.
//!
//! This layer knows the grammar but nothing about the session: it does not
//! know which tags are outstanding or which mailbox is selected. The
//! [`Codec`](crate::Codec) adds that context.

#![allow(clippy::missing_errors_doc)]

use super::lexer::{Lexer, Token};
use crate::types::{Capability, Flags, Mailbox, MailboxCounts, ResponseCode, SeqNum, Status, Tag, Uid};
use crate::{Error, Result};

/// A decoded server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged completion response.
    Tagged {
        /// Tag echoed by the server.
        tag: Tag,
        /// Completion status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged server data.
    Untagged(Untagged),
    /// Continuation request (`+`).
    Continuation(String),
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Untagged {
    /// `* OK|NO|BAD|PREAUTH|BYE [code] text`
    Condition {
        /// Status keyword.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<Capability>),
    /// `* FLAGS (...)`
    Flags(Flags),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(SeqNum),
    /// `* n FETCH (...)`, reduced to the attributes the watcher cares about.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// UID, if reported.
        uid: Option<Uid>,
        /// Flags, if reported.
        flags: Option<Flags>,
    },
    /// `* STATUS mailbox (...)`
    Status {
        /// Mailbox the counters belong to.
        mailbox: Mailbox,
        /// Reported counters.
        counts: MailboxCounts,
    },
    /// `* LIST (attrs) delim mailbox [extended data]`
    List {
        /// Mailbox attributes as sent (e.g. `\NonExistent`).
        attributes: Vec<String>,
        /// Hierarchy delimiter.
        delimiter: Option<char>,
        /// Mailbox name.
        mailbox: Mailbox,
        /// Previous name from the `OLDNAME` extended item (RFC 5465 renames).
        old_name: Option<Mailbox>,
    },
    /// Well-formed response with a keyword we do not interpret.
    Other {
        /// The keyword, upper-cased.
        keyword: String,
    },
}

/// Stateless response decoder.
pub struct ResponseParser;

impl ResponseParser {
    /// Decodes one complete response (as returned by the transport).
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => {
                lexer.expect_space()?;
                parse_untagged(&mut lexer).map(Response::Untagged)
            }
            Token::Plus => {
                if lexer.peek() == Some(b' ') {
                    lexer.next_token()?;
                }
                Ok(Response::Continuation(lexer.rest_of_line()))
            }
            Token::Atom(tag) => parse_tagged(&mut lexer, tag),
            Token::Number(tag) => parse_tagged(&mut lexer, &tag.to_string()),
            token => Err(Error::Parse {
                position: 0,
                message: format!("Expected *, +, or tag, got {token:?}"),
            }),
        }
    }
}

fn parse_tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
    lexer.expect_space()?;
    let keyword = lexer.read_atom()?;
    let status = match Status::parse(keyword) {
        Some(status @ (Status::Ok | Status::No | Status::Bad)) => status,
        _ => return Err(lexer.error(&format!("Invalid completion status: {keyword}"))),
    };
    let (code, text) = parse_resp_text(lexer)?;
    Ok(Response::Tagged {
        tag: Tag::new(tag),
        status,
        code,
        text,
    })
}

fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Untagged> {
    match lexer.next_token()? {
        Token::Atom(keyword) => {
            if let Some(status) = Status::parse(keyword) {
                let (code, text) = parse_resp_text(lexer)?;
                return Ok(Untagged::Condition { status, code, text });
            }
            let upper = keyword.to_uppercase();
            match upper.as_str() {
                "CAPABILITY" => Ok(Untagged::Capability(parse_capabilities(lexer)?)),
                "FLAGS" => {
                    lexer.expect_space()?;
                    Ok(Untagged::Flags(lexer.read_flag_list()?))
                }
                "STATUS" => {
                    lexer.expect_space()?;
                    parse_status(lexer)
                }
                "LIST" | "LSUB" => {
                    lexer.expect_space()?;
                    parse_list(lexer)
                }
                _ => {
                    check_well_formed(lexer)?;
                    Ok(Untagged::Other { keyword: upper })
                }
            }
        }
        Token::Number(n) => {
            lexer.expect_space()?;
            let keyword = lexer.read_atom()?.to_uppercase();
            match keyword.as_str() {
                "EXISTS" => Ok(Untagged::Exists(n)),
                "RECENT" => Ok(Untagged::Recent(n)),
                "EXPUNGE" => Ok(Untagged::Expunge(seq_num(lexer, n)?)),
                "FETCH" => {
                    let seq = seq_num(lexer, n)?;
                    lexer.expect_space()?;
                    parse_fetch(lexer, seq)
                }
                _ => {
                    check_well_formed(lexer)?;
                    Ok(Untagged::Other { keyword })
                }
            }
        }
        token => Err(lexer.error(&format!("Unexpected token in untagged response: {token:?}"))),
    }
}

fn seq_num(lexer: &Lexer<'_>, n: u32) -> Result<SeqNum> {
    SeqNum::new(n).ok_or_else(|| lexer.error("Invalid sequence number 0"))
}

/// Parses `[code] text` after a status keyword. Both parts are optional.
fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
    if lexer.peek() == Some(b' ') {
        lexer.next_token()?;
    }
    let code = if lexer.peek() == Some(b'[') {
        Some(parse_response_code(lexer)?)
    } else {
        None
    };
    if lexer.peek() == Some(b' ') {
        lexer.next_token()?;
    }
    Ok((code, lexer.rest_of_line()))
}

fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;
    let name = lexer.read_atom()?;

    let code = match name.to_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "AUTHENTICATIONFAILED" => ResponseCode::AuthenticationFailed,
        "NONEXISTENT" => ResponseCode::NonExistent,
        "NOTIFICATIONOVERFLOW" => ResponseCode::NotificationOverflow,
        "CAPABILITY" => {
            let mut caps = Vec::new();
            loop {
                match lexer.next_token()? {
                    Token::RBracket => return Ok(ResponseCode::Capability(caps)),
                    Token::Space => {}
                    Token::Atom(cap) => caps.push(Capability::parse(cap)),
                    token => {
                        return Err(lexer.error(&format!("Unexpected token in CAPABILITY: {token:?}")));
                    }
                }
            }
        }
        "BADEVENT" => {
            lexer.expect_space()?;
            lexer.expect(Token::LParen)?;
            let mut events = Vec::new();
            loop {
                match lexer.next_token()? {
                    Token::RParen => break,
                    Token::Space => {}
                    Token::Atom(event) => events.push(event.to_string()),
                    token => {
                        return Err(lexer.error(&format!("Unexpected token in BADEVENT: {token:?}")));
                    }
                }
            }
            ResponseCode::BadEvent(events)
        }
        other => ResponseCode::Other(other.to_string()),
    };

    // Skip any arguments we did not interpret.
    loop {
        match lexer.next_token()? {
            Token::RBracket => return Ok(code),
            Token::Crlf | Token::Eof => return Err(lexer.error("Unterminated response code")),
            _ => {}
        }
    }
}

fn parse_capabilities(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::Crlf | Token::Eof => return Ok(caps),
            Token::Space => {}
            Token::Atom(cap) => caps.push(Capability::parse(cap)),
            token => return Err(lexer.error(&format!("Unexpected token in CAPABILITY: {token:?}"))),
        }
    }
}

fn parse_status(lexer: &mut Lexer<'_>) -> Result<Untagged> {
    let mailbox = Mailbox::new(lexer.read_astring()?);
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut counts = MailboxCounts::default();
    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name.to_uppercase(),
            token => return Err(lexer.error(&format!("Unexpected token in STATUS: {token:?}"))),
        };
        lexer.expect_space()?;
        match lexer.next_token()? {
            Token::Number(value) => match name.as_str() {
                "MESSAGES" => counts.messages = Some(value),
                "UNSEEN" => counts.unseen = Some(value),
                "UIDNEXT" => counts.uid_next = Some(value),
                _ => {}
            },
            // HIGHESTMODSEQ can exceed 32 bits
            Token::Atom(_) => {}
            token => return Err(lexer.error(&format!("Expected number in STATUS, got {token:?}"))),
        }
    }

    Ok(Untagged::Status { mailbox, counts })
}

fn parse_list(lexer: &mut Lexer<'_>) -> Result<Untagged> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(attr) => attributes.push(attr.to_string()),
            token => return Err(lexer.error(&format!("Unexpected token in LIST attributes: {token:?}"))),
        }
    }
    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Quoted(s) => s.chars().next(),
        Token::Nil => None,
        token => return Err(lexer.error(&format!("Expected LIST delimiter, got {token:?}"))),
    };
    lexer.expect_space()?;
    let mailbox = Mailbox::new(lexer.read_astring()?);

    let mut old_name = None;
    if lexer.peek() == Some(b' ') {
        lexer.next_token()?;
        lexer.expect(Token::LParen)?;
        loop {
            match lexer.next_token()? {
                Token::RParen => break,
                Token::Space => {}
                token => {
                    let item = match token {
                        Token::Atom(s) => s.to_string(),
                        Token::Quoted(s) => s,
                        token => {
                            return Err(lexer.error(&format!("Unexpected LIST extended item: {token:?}")));
                        }
                    };
                    lexer.expect_space()?;
                    if item.eq_ignore_ascii_case("OLDNAME") {
                        lexer.expect(Token::LParen)?;
                        old_name = Some(Mailbox::new(lexer.read_astring()?));
                        lexer.expect(Token::RParen)?;
                    } else {
                        lexer.skip_value()?;
                    }
                }
            }
        }
    }

    Ok(Untagged::List {
        attributes,
        delimiter,
        mailbox,
        old_name,
    })
}

fn parse_fetch(lexer: &mut Lexer<'_>, seq: SeqNum) -> Result<Untagged> {
    lexer.expect(Token::LParen)?;
    let mut uid = None;
    let mut flags = None;

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name.to_uppercase(),
            token => return Err(lexer.error(&format!("Unexpected token in FETCH: {token:?}"))),
        };
        // Section specifiers such as BODY[HEADER] split the attribute name.
        if lexer.peek() == Some(b'[') {
            loop {
                match lexer.next_token()? {
                    Token::RBracket => break,
                    Token::Crlf | Token::Eof => return Err(lexer.error("Unterminated section")),
                    _ => {}
                }
            }
            if lexer.peek().is_some_and(|b| b != b' ') {
                lexer.next_token()?;
            }
        }
        lexer.expect_space()?;
        match name.as_str() {
            "FLAGS" => flags = Some(lexer.read_flag_list()?),
            "UID" => uid = Uid::new(lexer.read_number()?),
            _ => lexer.skip_value()?,
        }
    }

    Ok(Untagged::Fetch { seq, uid, flags })
}

/// Walks the rest of an uninterpreted response, failing only on broken
/// quoting or literals.
fn check_well_formed(lexer: &mut Lexer<'_>) -> Result<()> {
    loop {
        match lexer.peek() {
            None => return Ok(()),
            Some(b'"' | b'{') => {
                lexer.next_token()?;
            }
            Some(_) => {
                if lexer.next_token().is_err() {
                    lexer.skip_byte();
                }
            }
        }
    }
}
