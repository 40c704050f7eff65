//! nom parsers for the IMAP formal syntax, server side.
//!
//! The submodules mirror the grammar: [`core`] holds the low-level lexer,
//! the rest build typed response values on top of it. Internal parsers
//! work on `&[u8]` with an extended error type; the public entry points in
//! [`response`] convert failures into [`crate::error::Error`] values that
//! carry the full offending line and the byte offset reached.

use std::num::{ParseIntError, TryFromIntError};

use nom::error::{ErrorKind, FromExternalError, ParseError};

pub mod core;
pub mod datetime;
pub mod envelope;
pub mod fetch;
pub mod response;

pub(crate) mod body;
pub(crate) mod flag;

pub use response::{parse_response, parse_tagged, parse_untagged};

/// An extended version of [`nom::IResult`].
pub(crate) type ImapResult<'a, O> = Result<(&'a [u8], O), nom::Err<ImapParseError<&'a [u8]>>>;

/// An extended version of [`nom::error::Error`] that remembers why a
/// branch failed, not only where.
#[derive(Debug)]
pub(crate) struct ImapParseError<I> {
    pub input: I,
    pub kind: ImapErrorKind,
}

#[derive(Debug)]
pub(crate) enum ImapErrorKind {
    BadNumber,
    BadDateTime,
    RecursionLimitExceeded,
    InvalidResponseCode,
    Nom(ErrorKind),
}

impl<I> ParseError<I> for ImapParseError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        Self {
            input,
            kind: ImapErrorKind::Nom(kind),
        }
    }

    fn append(input: I, kind: ErrorKind, _: Self) -> Self {
        Self {
            input,
            kind: ImapErrorKind::Nom(kind),
        }
    }
}

impl<I> FromExternalError<I, ParseIntError> for ImapParseError<I> {
    fn from_external_error(input: I, _: ErrorKind, _: ParseIntError) -> Self {
        Self {
            input,
            kind: ImapErrorKind::BadNumber,
        }
    }
}

impl<I> FromExternalError<I, TryFromIntError> for ImapParseError<I> {
    fn from_external_error(input: I, _: ErrorKind, _: TryFromIntError) -> Self {
        Self {
            input,
            kind: ImapErrorKind::BadNumber,
        }
    }
}

impl ImapErrorKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            ImapErrorKind::BadNumber => "number out of range".to_string(),
            ImapErrorKind::BadDateTime => "malformed date-time".to_string(),
            ImapErrorKind::RecursionLimitExceeded => "nesting too deep".to_string(),
            ImapErrorKind::InvalidResponseCode => "invalid response code".to_string(),
            ImapErrorKind::Nom(kind) => format!("syntax error ({})", kind.description()),
        }
    }
}
