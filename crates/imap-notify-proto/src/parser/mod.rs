//! IMAP response parsing.
//!
//! [`lexer`] tokenizes a single response; [`ResponseParser`] turns the
//! tokens into a [`Response`].

pub mod lexer;
mod response;

pub use response::{Response, ResponseParser, Untagged};
