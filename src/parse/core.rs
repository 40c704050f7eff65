//! The low-level lexer: atoms, numbers, quoted strings, literals and
//! generic parenthesised data.
//!
//! Everything operates on a byte slice containing one complete response
//! (literals already reassembled by the framer). Parsers follow the
//! streaming convention: running out of input yields `Incomplete`, which
//! the entry points treat as a truncated line.

use std::str::from_utf8;

use abnf_core::streaming::crlf;
use nom::{
    branch::alt,
    bytes::streaming::{tag, take, take_while1},
    character::streaming::digit1,
    combinator::{map, map_res, opt},
    sequence::{delimited, terminated, tuple},
};

use crate::parse::{ImapErrorKind, ImapParseError, ImapResult};
use crate::types::core::{unescape_quoted, Data, TokenKind};

/// How deep `anything` recurses into nested lists before giving up.
const MAX_LIST_DEPTH: usize = 16;

/// `ATOM-CHAR`: anything printable except the specials claimed by the
/// grammar: `(`, `)`, `{`, `%`, `*`, DQUOTE, backslash and `]`.
pub fn is_atom_char(byte: u8) -> bool {
    matches!(byte, 0x21..=0x7e)
        && !matches!(
            byte,
            b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\' | b']'
        )
}

/// `ASTRING-CHAR = ATOM-CHAR / "]"`
pub fn is_astring_char(byte: u8) -> bool {
    is_atom_char(byte) || byte == b']'
}

/// `TEXT-CHAR = %x01-09 / %x0B-0C / %x0E-7F`
pub fn is_text_char(byte: u8) -> bool {
    matches!(byte, 0x01..=0x09 | 0x0b..=0x0c | 0x0e..=0x7f)
}

// ----- number -----

/// `number = 1*DIGIT`
///
/// Unsigned 32-bit integer (0 <= n < 4,294,967,296)
pub fn number(input: &[u8]) -> ImapResult<u32> {
    map_res(
        // `unwrap` is safe because `1*DIGIT` is ASCII-only.
        map(digit1, |val| from_utf8(val).unwrap()),
        str::parse::<u32>,
    )(input)
}

/// `number64 = 1*DIGIT`
///
/// Unsigned 63-bit integer, used by MODSEQ/HIGHESTMODSEQ.
pub fn number64(input: &[u8]) -> ImapResult<u64> {
    map_res(
        map(digit1, |val| from_utf8(val).unwrap()),
        str::parse::<u64>,
    )(input)
}

/// `nz-number = digit-nz *DIGIT`
pub fn nz_number(input: &[u8]) -> ImapResult<u32> {
    let (remaining, value) = number(input)?;
    if value == 0 {
        return Err(nom::Err::Error(ImapParseError {
            input,
            kind: ImapErrorKind::BadNumber,
        }));
    }
    Ok((remaining, value))
}

// ----- atom -----

/// `atom = 1*ATOM-CHAR`
pub fn atom(input: &[u8]) -> ImapResult<String> {
    let (remaining, parsed) = take_while1(is_atom_char)(input)?;
    // `unwrap` is safe, `is_atom_char` only passes ASCII.
    Ok((remaining, from_utf8(parsed).unwrap().to_string()))
}

// ----- string -----

/// `quoted = DQUOTE *QUOTED-CHAR DQUOTE`
///
/// The only escapes are `\"` and `\\`; CR, LF, NUL and any other
/// backslash sequence are rejected.
pub fn quoted(input: &[u8]) -> ImapResult<String> {
    let (remaining, _) = tag(b"\"")(input)?;

    let mut end = 0;
    loop {
        match remaining.get(end).copied() {
            None => return Err(nom::Err::Incomplete(nom::Needed::Unknown)),
            Some(b'"') => break,
            Some(b'\\') => match remaining.get(end + 1).copied() {
                None => return Err(nom::Err::Incomplete(nom::Needed::Unknown)),
                Some(b'"') | Some(b'\\') => end += 2,
                Some(_) => {
                    return Err(nom::Err::Error(ImapParseError {
                        input: &remaining[end..],
                        kind: ImapErrorKind::Nom(nom::error::ErrorKind::Escaped),
                    }));
                }
            },
            Some(byte) if is_text_char(byte) => end += 1,
            Some(_) => {
                return Err(nom::Err::Error(ImapParseError {
                    input: &remaining[end..],
                    kind: ImapErrorKind::Nom(nom::error::ErrorKind::Char),
                }));
            }
        }
    }

    // `unwrap` is safe, every accepted byte is ASCII.
    let content = from_utf8(&remaining[..end]).unwrap();
    Ok((
        &remaining[end + 1..],
        unescape_quoted(content).into_owned(),
    ))
}

/// `literal = ["~"] "{" number "}" CRLF *OCTET`
///
/// The `~`-prefixed LITERAL8 form may contain arbitrary octets. The plain
/// form is nominally 7-bit but NUL bytes are tolerated in it as well.
pub fn literal(input: &[u8]) -> ImapResult<(Vec<u8>, TokenKind)> {
    let (remaining, (binary, length)) = terminated(
        tuple((
            map(opt(tag(b"~")), |tilde| tilde.is_some()),
            delimited(tag(b"{"), number, tag(b"}")),
        )),
        crlf,
    )(input)?;

    let (remaining, data) = take(length)(remaining)?;

    let kind = if binary {
        TokenKind::Literal8
    } else {
        TokenKind::Literal
    };
    Ok((remaining, (data.to_vec(), kind)))
}

/// `string = quoted / literal`
pub fn string(input: &[u8]) -> ImapResult<(Vec<u8>, TokenKind)> {
    alt((
        map(quoted, |text| {
            (text.into_bytes(), TokenKind::QuotedString)
        }),
        literal,
    ))(input)
}

/// `astring = 1*ASTRING-CHAR / string`
pub fn astring(input: &[u8]) -> ImapResult<(Vec<u8>, TokenKind)> {
    alt((
        map(take_while1(is_astring_char), |bytes: &[u8]| {
            (bytes.to_vec(), TokenKind::Atom)
        }),
        string,
    ))(input)
}

/// `nstring = astring / nil`
///
/// A bare atom spelling `NIL` (any case) yields the distinguished null
/// value; a quoted or literal `"NIL"` stays a string.
pub fn nstring(input: &[u8]) -> ImapResult<Option<(Vec<u8>, TokenKind)>> {
    let (remaining, (data, kind)) = astring(input)?;
    if kind == TokenKind::Atom && data.eq_ignore_ascii_case(b"NIL") {
        Ok((remaining, None))
    } else {
        Ok((remaining, Some((data, kind))))
    }
}

/// `nil = "NIL"`
pub fn nil(input: &[u8]) -> ImapResult<&[u8]> {
    let (remaining, parsed) = nom::bytes::streaming::tag_no_case(b"NIL")(input)?;
    // Reject an atom that merely starts with "nil", e.g. "NILS".
    if let Some(&next) = remaining.first() {
        if is_astring_char(next) {
            return Err(nom::Err::Error(ImapParseError {
                input,
                kind: ImapErrorKind::Nom(nom::error::ErrorKind::Tag),
            }));
        }
    }
    Ok((remaining, parsed))
}

/// A mailbox name: astring with the case-insensitive atom `INBOX`
/// normalised to uppercase.
pub fn mailbox(input: &[u8]) -> ImapResult<String> {
    let (remaining, (data, _)) = astring(input)?;
    let name = if data.eq_ignore_ascii_case(b"INBOX") {
        "INBOX".to_string()
    } else {
        String::from_utf8_lossy(&data).into_owned()
    };
    Ok((remaining, name))
}

// ----- generic data -----

/// A parenthesised (or, for response codes, bracketed) list of arbitrary
/// values. `NIL` in list position yields the distinguished
/// [`Data::NilList`].
pub fn list(open: u8, close: u8) -> impl Fn(&[u8]) -> ImapResult<Data> {
    move |input: &[u8]| list_limited(input, open, close, MAX_LIST_DEPTH)
}

fn list_limited(input: &[u8], open: u8, close: u8, depth: usize) -> ImapResult<Data> {
    if let Ok((remaining, _)) = nil(input) {
        return Ok((remaining, Data::NilList));
    }

    if input.first() != Some(&open) {
        return Err(nom::Err::Error(ImapParseError {
            input,
            kind: ImapErrorKind::Nom(nom::error::ErrorKind::Char),
        }));
    }
    let mut remaining = &input[1..];
    let mut items = Vec::new();
    loop {
        match remaining.first().copied() {
            None => return Err(nom::Err::Incomplete(nom::Needed::Unknown)),
            Some(byte) if byte == close => {
                remaining = &remaining[1..];
                break;
            }
            Some(b' ') => remaining = &remaining[1..],
            Some(_) => {
                let (rest, item) = anything_limited(remaining, depth)?;
                items.push(item);
                remaining = rest;
            }
        }
    }
    Ok((remaining, Data::List(items)))
}

/// Parses whatever comes next, dispatching on the first byte: lists,
/// strings, NIL, numbers, atoms. An atom may be followed immediately by
/// `[...]` and/or `<...>` groups, which are appended verbatim; this is
/// how `BODY[HEADER.FIELDS (...)]<0>` fetch keys survive as single
/// tokens.
pub fn anything(input: &[u8]) -> ImapResult<Data> {
    anything_limited(input, MAX_LIST_DEPTH)
}

fn anything_limited(input: &[u8], depth: usize) -> ImapResult<Data> {
    if depth == 0 {
        return Err(nom::Err::Failure(ImapParseError {
            input,
            kind: ImapErrorKind::RecursionLimitExceeded,
        }));
    }

    match input.first().copied() {
        None => Err(nom::Err::Incomplete(nom::Needed::Unknown)),
        Some(b'(') => list_limited(input, b'(', b')', depth - 1),
        Some(b'[') => list_limited(input, b'[', b']', depth - 1),
        Some(b'"') => map(quoted, |text| Data::String {
            data: text.into_bytes(),
            kind: TokenKind::QuotedString,
        })(input),
        Some(b'{') | Some(b'~') => {
            map(literal, |(data, kind)| Data::String { data, kind })(input)
        }
        Some(b'0'..=b'9') => map(number64, Data::Number)(input),
        Some(b'N') | Some(b'n') if nil(input).is_ok() => {
            let (remaining, _) = nil(input)?;
            Ok((remaining, Data::Nil))
        }
        Some(_) => {
            let (mut remaining, mut text) = atom(input)?;
            // Verbatim [section] and <partial> groups.
            loop {
                let (terminator, rest) = match remaining.first().copied() {
                    Some(b'[') => (b']', &remaining[1..]),
                    Some(b'<') => (b'>', &remaining[1..]),
                    _ => break,
                };
                let end = match rest.iter().position(|&b| b == terminator) {
                    Some(end) => end,
                    None => return Err(nom::Err::Incomplete(nom::Needed::Unknown)),
                };
                text.push(remaining[0] as char);
                text.push_str(&String::from_utf8_lossy(&rest[..end]));
                text.push(terminator as char);
                remaining = &rest[end + 1..];
            }
            Ok((remaining, Data::Atom(text)))
        }
    }
}
