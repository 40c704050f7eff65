//! FETCH attribute decoding.
//!
//! `msg-att = "(" key SP value *(SP key SP value) ")"`. Keys are
//! uppercased for matching; a `BODY[...]<...>` key keeps its section path
//! and partial range byte-exact because the model later looks payloads up
//! by that very key.

use abnf_core::streaming::sp;
use nom::{
    bytes::streaming::{tag, take_while1},
    combinator::map,
    multi::separated_list1,
    sequence::delimited,
};

use crate::parse::body::body;
use crate::parse::core::{is_atom_char, nstring, number, number64};
use crate::parse::datetime::date_time;
use crate::parse::envelope::envelope;
use crate::parse::flag::flag_list;
use crate::parse::{ImapErrorKind, ImapParseError, ImapResult};
use crate::types::response::FetchItem;

/// `msg-att`: the parenthesised attribute list of a FETCH response.
pub fn msg_att(input: &[u8]) -> ImapResult<Vec<FetchItem>> {
    delimited(tag(b"("), separated_list1(sp, msg_att_item), tag(b")"))(input)
}

/// One `key SP value` pair.
fn msg_att_item(input: &[u8]) -> ImapResult<FetchItem> {
    let (remaining, key) = fetch_key(input)?;
    let (remaining, _) = sp(remaining)?;

    let head = match key.iter().position(|&b| b == b'[') {
        Some(bracket) => &key[..bracket],
        None => &key[..],
    };

    match head {
        b"UID" => map(number, FetchItem::Uid)(remaining),
        b"RFC822.SIZE" => map(number, FetchItem::Rfc822Size)(remaining),
        b"FLAGS" => map(flag_list, FetchItem::Flags)(remaining),
        b"MODSEQ" => map(
            delimited(tag(b"("), number64, tag(b")")),
            FetchItem::ModSeq,
        )(remaining),
        b"INTERNALDATE" => map(date_time, FetchItem::InternalDate)(remaining),
        b"ENVELOPE" => map(envelope, FetchItem::Envelope)(remaining),
        b"BODYSTRUCTURE" => map(body(8), FetchItem::BodyStructure)(remaining),
        b"BODY" if key.len() == 4 => map(body(8), FetchItem::Body)(remaining),
        b"BODY" | b"RFC822" | b"RFC822.HEADER" | b"RFC822.TEXT" => map(nstring, |value| {
            FetchItem::Data {
                key: key.clone(),
                payload: value.map(|(data, _)| data).unwrap_or_default(),
            }
        })(remaining),
        _ => Err(nom::Err::Failure(ImapParseError {
            input,
            kind: ImapErrorKind::Nom(nom::error::ErrorKind::Tag),
        })),
    }
}

/// Reads an attribute key: an atom, uppercased, plus verbatim `[...]`
/// and/or `<...>` groups.
fn fetch_key(input: &[u8]) -> ImapResult<Vec<u8>> {
    let (mut remaining, head) = take_while1(is_atom_char)(input)?;
    let mut key = head.to_ascii_uppercase();

    loop {
        let terminator = match remaining.first().copied() {
            Some(b'[') => b']',
            Some(b'<') => b'>',
            _ => break,
        };
        let end = match remaining[1..].iter().position(|&b| b == terminator) {
            Some(end) => end,
            None => return Err(nom::Err::Incomplete(nom::Needed::Unknown)),
        };
        key.extend_from_slice(&remaining[..end + 2]);
        remaining = &remaining[end + 2..];
    }

    Ok((remaining, key))
}
