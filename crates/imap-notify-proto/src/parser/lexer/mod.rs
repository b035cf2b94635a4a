//! Tokenizer for IMAP server responses.
//!
//! Works on one complete response as delivered by the transport, literals
//! included, and never reads past the end of it.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::types::{Flag, Flags};
use crate::{Error, Result};

/// Cursor over the bytes of a single response.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            b'\r' if self.input.get(self.pos + 1) == Some(&b'\n') => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'\r' => Err(self.error("CR without LF")),
            b'"' => self.quoted(),
            b'{' => self.literal(),
            _ if is_atom_char(byte) => self.atom(),
            _ => Err(self.error(&format!("Unexpected character: {byte:#04x}"))),
        }
    }

    fn quoted(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let mut out = Vec::new();

        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(c @ (b'"' | b'\\')) => out.push(c),
                    Some(c) => return Err(self.error(&format!("Invalid escape: \\{}", c as char))),
                    None => return Err(self.error("Unterminated quoted string")),
                },
                Some(b'\r' | b'\n') | None => return Err(self.error("Unterminated quoted string")),
                Some(c) => out.push(c),
            }
        }

        String::from_utf8(out)
            .map(Token::Quoted)
            .map_err(|_| self.error("Invalid UTF-8 in quoted string"))
    }

    fn literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        if self.bump() != Some(b'}') || digits.is_empty() {
            return Err(self.error("Malformed literal length"));
        }
        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("Malformed literal length"))?;

        if self.bump() != Some(b'\r') || self.bump() != Some(b'\n') {
            return Err(self.error("Expected CRLF after literal length"));
        }

        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("Unterminated literal"))?;
        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(Token::Literal(data))
    }

    fn atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }
        let s = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("Invalid UTF-8 in atom"))?;

        if s.eq_ignore_ascii_case("NIL") {
            return Ok(Token::Nil);
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            // Numbers beyond 32 bits (e.g. MODSEQ) stay atoms.
            if let Ok(n) = s.parse() {
                return Ok(Token::Number(n));
            }
        }
        Ok(Token::Atom(s))
    }

    /// Creates a parse error at the current position.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        match self.next_token()? {
            Token::Space => Ok(()),
            token => Err(self.error(&format!("Expected space, got {token:?}"))),
        }
    }

    /// Consumes a specific punctuation token.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {expected:?}, got {token:?}")))
        }
    }

    /// Reads an astring (atom, number, quoted string or literal).
    pub fn read_astring(&mut self) -> Result<String> {
        let start = self.pos;
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            // Keep the original spelling ("007", "nil").
            Token::Number(_) | Token::Nil => {
                Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
            }
            Token::Quoted(s) => Ok(s),
            Token::Literal(data) => String::from_utf8(data.to_vec())
                .map_err(|_| self.error("Invalid UTF-8 in literal")),
            token => Err(self.error(&format!("Expected astring, got {token:?}"))),
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("Expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("Expected atom, got {token:?}"))),
        }
    }

    /// Reads a parenthesized flag list.
    pub fn read_flag_list(&mut self) -> Result<Flags> {
        self.expect(Token::LParen)?;
        let mut flags = Flags::new();
        loop {
            match self.next_token()? {
                Token::RParen => return Ok(flags),
                Token::Space => {}
                // `\*` in PERMANENTFLAGS lexes as `\` followed by `*`
                Token::Atom("\\") | Token::Asterisk => {}
                Token::Atom(s) => flags.insert(Flag::parse(s)),
                token => return Err(self.error(&format!("Unexpected token in flag list: {token:?}"))),
            }
        }
    }

    /// Skips one value of any shape: atom, string, literal or nested list.
    pub fn skip_value(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_token()? {
                Token::LParen => depth += 1,
                Token::RParen if depth > 0 => depth -= 1,
                Token::Space if depth > 0 => continue,
                Token::Crlf | Token::Eof | Token::RParen => {
                    return Err(self.error("Unbalanced parenthesis"));
                }
                _ => {}
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Skips a single byte.
    pub(crate) fn skip_byte(&mut self) {
        self.bump();
    }

    /// Returns the text up to CRLF (or end of input) and consumes it.
    pub fn rest_of_line(&mut self) -> String {
        let remaining = &self.input[self.pos..];
        let end = remaining
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(remaining.len());
        let text = String::from_utf8_lossy(&remaining[..end]).into_owned();
        self.pos += end;
        text
    }
}

/// Returns true if the byte may appear in an atom.
///
/// `\` is accepted so that flags such as `\Seen` lex as one atom.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 |
        0x23..=0x24 |
        0x26..=0x27 |
        0x2B..=0x5A |
        0x5C |
        0x5E..=0x7A |
        0x7C |
        0x7E
    )
}
