//! Tagged and untagged response parsing.
//!
//! [`parse_tagged`] and [`parse_untagged`] are the public entry points the
//! session feeds with complete lines (literals already reassembled).
//! Failures come back as [`crate::error::Error`] values carrying the whole
//! line and the offset the parser got stuck at.

use std::str::from_utf8;

use abnf_core::streaming::{crlf, sp};
use nom::{
    branch::alt,
    bytes::streaming::{tag, tag_no_case, take_while, take_while1},
    combinator::{map, opt, value},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::{delimited, preceded, terminated, tuple},
};

use crate::error::Error;
use crate::parse::core::{
    anything, astring, atom, is_astring_char, is_text_char, list, mailbox, nil, number, number64,
    quoted,
};
use crate::parse::fetch::msg_att;
use crate::parse::flag::{flag_list, name_attribute_list};
use crate::parse::{ImapErrorKind, ImapParseError, ImapResult};
use crate::types::core::{Data, Tag};
use crate::types::response::{
    Code, ESearchItem, ESearchResponse, ListResponse, NamespaceEntry, NamespaceResponse,
    NumberKind, NumberResponse, Response, State, StateKind, StatusItem, StatusResponse, ThreadNode,
};
use crate::types::sequence::Sequence;

/// How deep a THREAD forest may nest.
const MAX_THREAD_DEPTH: usize = 50;

// ----- public entry points -----

/// Parses one complete response line, dispatching on the prefix: `* ` to
/// the untagged grammar, anything else to the tagged one. Continuation
/// requests (`+ `) are not responses and are handled by the session
/// before parsing.
pub fn parse_response(line: &[u8]) -> Result<Response, Error> {
    if line.starts_with(b"* ") {
        parse_untagged(line)
    } else {
        parse_tagged(line)
    }
}

/// Parses a tagged response: `tag SP ("OK" / "NO" / "BAD") SP resp-text
/// CRLF`.
///
/// A tagged PREAUTH or BYE is well-formed syntax in a place that cannot
/// accept it and is rejected as such.
pub fn parse_tagged(line: &[u8]) -> Result<Response, Error> {
    let (rest, tag_text) = run(line, take_while1(|b| is_astring_char(b) && b != b'+'))?;
    let (rest, _) = run_at(line, rest, sp)?;
    let (rest, kind) = run_at(line, rest, state_kind)?;

    match kind {
        StateKind::Ok | StateKind::No | StateKind::Bad => {}
        StateKind::PreAuth | StateKind::Bye => {
            return Err(Error::UnexpectedHere {
                message: format!("{kind} cannot be tagged"),
                line: line.to_vec(),
                offset: offset_of(line, rest),
            });
        }
    }

    let (rest, (code, message)) = run_at(line, rest, resp_text)?;
    finish(line, rest)?;

    Ok(Response::State(State {
        // `unwrap` is safe, astring chars are ASCII.
        tag: Some(Tag(from_utf8(tag_text).unwrap().to_string())),
        kind,
        code,
        message,
    }))
}

/// Parses an untagged response. After the leading `* `, a leading number
/// selects the numbered grammar (`EXISTS`, `RECENT`, `EXPUNGE`, `FETCH`);
/// otherwise the response kind atom decides.
pub fn parse_untagged(line: &[u8]) -> Result<Response, Error> {
    let (rest, _) = run(line, tag(b"* "))?;

    if let Ok((after_number, n)) = number(rest) {
        if after_number.first() == Some(&b' ') {
            return parse_untagged_number(line, &after_number[1..], n);
        }
    }

    let (rest, kind_atom) = run_at(line, rest, atom)?;
    parse_untagged_text(line, rest, &kind_atom)
}

fn parse_untagged_number(line: &[u8], rest: &[u8], n: u32) -> Result<Response, Error> {
    let (rest, kind_atom) = run_at(line, rest, atom)?;

    let kind = match kind_atom.to_ascii_uppercase().as_str() {
        "EXISTS" => NumberKind::Exists,
        "RECENT" => NumberKind::Recent,
        "EXPUNGE" => NumberKind::Expunge,
        "FETCH" => {
            let (rest, items) = run_at(line, rest, preceded(sp, msg_att))?;
            finish(line, rest)?;
            return Ok(Response::Fetch(crate::types::response::FetchResponse {
                seq: n,
                items,
            }));
        }
        other => {
            return Err(Error::UnrecognizedResponseKind {
                kind: other.to_string(),
                line: line.to_vec(),
            });
        }
    };

    finish(line, rest)?;
    Ok(Response::Number(NumberResponse { kind, number: n }))
}

fn parse_untagged_text(line: &[u8], rest: &[u8], kind_atom: &str) -> Result<Response, Error> {
    let response = match kind_atom.to_ascii_uppercase().as_str() {
        "OK" | "NO" | "BAD" | "PREAUTH" | "BYE" => {
            let kind = match kind_atom.to_ascii_uppercase().as_str() {
                "OK" => StateKind::Ok,
                "NO" => StateKind::No,
                "BAD" => StateKind::Bad,
                "PREAUTH" => StateKind::PreAuth,
                _ => StateKind::Bye,
            };
            let (rest, (code, message)) = run_at(line, rest, preceded(sp, resp_text))?;
            finish(line, rest)?;
            Response::State(State {
                tag: None,
                kind,
                code,
                message,
            })
        }
        "CAPABILITY" => {
            let (rest, caps) = run_at(line, rest, many1(preceded(sp, atom)))?;
            finish(line, rest)?;
            Response::Capability(caps)
        }
        "LIST" => {
            let (rest, response) = run_at(line, rest, preceded(sp, list_body(false)))?;
            finish(line, rest)?;
            Response::List(response)
        }
        "LSUB" => {
            let (rest, response) = run_at(line, rest, preceded(sp, list_body(true)))?;
            finish(line, rest)?;
            Response::List(response)
        }
        "FLAGS" => {
            let (rest, flags) = run_at(line, rest, preceded(sp, flag_list))?;
            finish(line, rest)?;
            Response::Flags(flags)
        }
        "SEARCH" => {
            let (rest, numbers) = run_at(line, rest, many0(preceded(sp, number)))?;
            finish(line, rest)?;
            Response::Search(numbers)
        }
        "SORT" => {
            let (rest, numbers) = run_at(line, rest, many0(preceded(sp, number)))?;
            finish(line, rest)?;
            Response::Sort(numbers)
        }
        "ESEARCH" => {
            let (rest, response) = run_at(line, rest, esearch_body)?;
            finish(line, rest)?;
            Response::ESearch(response)
        }
        "STATUS" => {
            let (rest, response) = run_at(line, rest, preceded(sp, status_body))?;
            finish(line, rest)?;
            Response::Status(response)
        }
        "NAMESPACE" => {
            let (rest, response) = run_at(line, rest, preceded(sp, namespace_body))?;
            finish(line, rest)?;
            Response::Namespace(response)
        }
        "THREAD" => {
            let (rest, forest) =
                run_at(line, rest, opt(preceded(sp, many1(thread_group(MAX_THREAD_DEPTH)))))?;
            finish(line, rest)?;
            Response::Thread(forest.unwrap_or_default())
        }
        "ID" => {
            let (rest, parameters) = run_at(line, rest, preceded(sp, id_params))?;
            finish(line, rest)?;
            Response::Id(parameters)
        }
        "ENABLED" => {
            let (rest, caps) = run_at(line, rest, many0(preceded(sp, atom)))?;
            finish(line, rest)?;
            Response::Enabled(caps)
        }
        "VANISHED" => {
            let (rest, (earlier, uids)) = run_at(
                line,
                rest,
                preceded(
                    sp,
                    tuple((
                        map(opt(terminated(tag_no_case(b"(EARLIER)"), sp)), |e| {
                            e.is_some()
                        }),
                        sequence_set,
                    )),
                ),
            )?;
            finish(line, rest)?;
            Response::Vanished { earlier, uids }
        }
        "GENURLAUTH" => {
            let (rest, url) = run_at(line, rest, preceded(sp, astring))?;
            finish(line, rest)?;
            Response::GenUrlAuth(String::from_utf8_lossy(&url.0).into_owned())
        }
        other => {
            return Err(Error::UnrecognizedResponseKind {
                kind: other.to_string(),
                line: line.to_vec(),
            });
        }
    };

    Ok(response)
}

// ----- state payload -----

fn state_kind(input: &[u8]) -> ImapResult<StateKind> {
    terminated(
        alt((
            value(StateKind::Ok, tag_no_case(b"OK")),
            value(StateKind::No, tag_no_case(b"NO")),
            value(StateKind::Bad, tag_no_case(b"BAD")),
            value(StateKind::PreAuth, tag_no_case(b"PREAUTH")),
            value(StateKind::Bye, tag_no_case(b"BYE")),
        )),
        sp,
    )(input)
}

/// `resp-text = ["[" resp-text-code "]" SP] text`
///
/// The text is opaque and, leniently, may be empty.
fn resp_text(input: &[u8]) -> ImapResult<(Option<Code>, String)> {
    let (rest, code) = opt(delimited(tag(b"["), resp_text_code, tag(b"]")))(input)?;
    let (rest, _) = if code.is_some() {
        opt(sp)(rest)?
    } else {
        (rest, None)
    };
    let (rest, text) = take_while(is_text_char)(rest)?;
    Ok((rest, (code, String::from_utf8_lossy(text).into_owned())))
}

/// `resp-text-code`: the bracketed payload of a state response.
fn resp_text_code(input: &[u8]) -> ImapResult<Code> {
    let (rest, name) = atom(input)?;

    let result = match name.to_ascii_uppercase().as_str() {
        "ALERT" => Ok((rest, Code::Alert)),
        "PARSE" => Ok((rest, Code::Parse)),
        "READ-ONLY" => Ok((rest, Code::ReadOnly)),
        "READ-WRITE" => Ok((rest, Code::ReadWrite)),
        "TRYCREATE" => Ok((rest, Code::TryCreate)),
        "BADCHARSET" => map(
            opt(preceded(
                sp,
                delimited(tag(b"("), separated_list1(sp, charset), tag(b")")),
            )),
            |charsets| Code::BadCharset(charsets.unwrap_or_default()),
        )(rest),
        "CAPABILITY" => map(many1(preceded(sp, atom)), Code::Capability)(rest),
        "PERMANENTFLAGS" => map(preceded(sp, flag_list), Code::PermanentFlags)(rest),
        "UIDNEXT" => map(preceded(sp, number), Code::UidNext)(rest),
        "UIDVALIDITY" => map(preceded(sp, number), Code::UidValidity)(rest),
        "UNSEEN" => map(preceded(sp, number), Code::Unseen)(rest),
        "APPENDUID" => map(
            tuple((preceded(sp, number), preceded(sp, sequence_set))),
            |(uid_validity, uids)| Code::AppendUid { uid_validity, uids },
        )(rest),
        "COPYUID" => map(
            tuple((
                preceded(sp, number),
                preceded(sp, sequence_set),
                preceded(sp, sequence_set),
            )),
            |(uid_validity, from, to)| Code::CopyUid {
                uid_validity,
                from,
                to,
            },
        )(rest),
        "HIGHESTMODSEQ" => map(preceded(sp, number64), Code::HighestModSeq)(rest),
        _ => {
            // Open-ended fallback: keep the raw payload text.
            let (rest, data) = opt(preceded(
                sp,
                take_while1(|b| is_text_char(b) && b != b']'),
            ))(rest)?;
            return Ok((
                rest,
                Code::Other {
                    name,
                    data: data.map(|d| String::from_utf8_lossy(d).into_owned()),
                },
            ));
        }
    };

    // A known code whose payload does not match its documented shape is
    // its own error kind, not a generic syntax error.
    result.map_err(|err| match err {
        nom::Err::Incomplete(needed) => nom::Err::Incomplete(needed),
        nom::Err::Error(e) | nom::Err::Failure(e) => nom::Err::Failure(ImapParseError {
            input: e.input,
            kind: ImapErrorKind::InvalidResponseCode,
        }),
    })
}

fn charset(input: &[u8]) -> ImapResult<String> {
    alt((quoted, atom))(input)
}

// ----- LIST / LSUB -----

fn list_body(lsub: bool) -> impl Fn(&[u8]) -> ImapResult<ListResponse> {
    move |input: &[u8]| {
        let (rest, (attributes, _, separator, _, name, extended)) = tuple((
            name_attribute_list,
            sp,
            list_separator,
            sp,
            mailbox,
            opt(preceded(sp, list(b'(', b')'))),
        ))(input)?;

        let extended = match extended {
            None | Some(Data::NilList) => Vec::new(),
            Some(Data::List(items)) => pair_up(items),
            Some(_) => Vec::new(),
        };

        Ok((
            rest,
            ListResponse {
                lsub,
                attributes,
                separator,
                name,
                extended,
            },
        ))
    }
}

/// The hierarchy delimiter: a single quoted character, or NIL for flat
/// namespaces.
fn list_separator(input: &[u8]) -> ImapResult<Option<char>> {
    alt((
        map(nil, |_| None),
        map(quoted, |text| text.chars().next()),
    ))(input)
}

/// Folds a flat extended-data list into (key, value) pairs. A key without
/// a value gets [`Data::Nil`].
fn pair_up(items: Vec<Data>) -> Vec<(String, Data)> {
    let mut pairs = Vec::new();
    let mut items = items.into_iter();
    while let Some(key) = items.next() {
        let value = items.next().unwrap_or(Data::Nil);
        pairs.push((key.to_text(), value));
    }
    pairs
}

// ----- STATUS -----

fn status_att(input: &[u8]) -> ImapResult<StatusItem> {
    alt((
        value(StatusItem::Messages, tag_no_case(b"MESSAGES")),
        value(StatusItem::Recent, tag_no_case(b"RECENT")),
        value(StatusItem::UidNext, tag_no_case(b"UIDNEXT")),
        value(StatusItem::UidValidity, tag_no_case(b"UIDVALIDITY")),
        value(StatusItem::Unseen, tag_no_case(b"UNSEEN")),
    ))(input)
}

/// `status-att-list` with its closing paren. Trailing whitespace before
/// the `)` is accepted; some servers emit it.
fn status_body(input: &[u8]) -> ImapResult<StatusResponse> {
    let (rest, (mailbox, _, _, items)) = tuple((
        mailbox,
        sp,
        tag(b"("),
        separated_list0(sp, tuple((status_att, sp, number))),
    ))(input)?;

    #[cfg(feature = "quirk_trailing_space_status")]
    let (rest, _) = opt(sp)(rest)?;

    let (rest, _) = tag(b")")(rest)?;

    Ok((
        rest,
        StatusResponse {
            mailbox,
            items: items.into_iter().map(|(item, _, n)| (item, n)).collect(),
        },
    ))
}

// ----- NAMESPACE -----

fn namespace_body(input: &[u8]) -> ImapResult<NamespaceResponse> {
    let (rest, (personal, _, users, _, other)) = tuple((
        namespace_group,
        sp,
        namespace_group,
        sp,
        namespace_group,
    ))(input)?;

    Ok((
        rest,
        NamespaceResponse {
            personal,
            users,
            other,
        },
    ))
}

/// `namespace = nil / "(" 1*namespace-descr ")"`
fn namespace_group(input: &[u8]) -> ImapResult<Vec<NamespaceEntry>> {
    alt((
        map(nil, |_| Vec::new()),
        delimited(tag(b"("), many1(namespace_descr), tag(b")")),
    ))(input)
}

/// `namespace-descr = "(" string SP (DQUOTE QUOTED-CHAR DQUOTE / nil)
/// *(namespace-response-extensions) ")"`
///
/// Extensions are parsed and dropped.
fn namespace_descr(input: &[u8]) -> ImapResult<NamespaceEntry> {
    let (rest, (prefix, _, separator, _)) = delimited(
        tag(b"("),
        tuple((
            quoted,
            sp,
            list_separator,
            many0(preceded(sp, anything)),
        )),
        tag(b")"),
    )(input)?;

    Ok((rest, NamespaceEntry { prefix, separator }))
}

// ----- ESEARCH -----

/// `esearch-response = "ESEARCH" [search-correlator] [SP "UID"]
/// *(SP search-return-data)`
fn esearch_body(input: &[u8]) -> ImapResult<ESearchResponse> {
    let (rest, correlator) = opt(preceded(
        sp,
        delimited(
            tuple((tag(b"("), tag_no_case(b"TAG"), sp)),
            quoted,
            tag(b")"),
        ),
    ))(input)?;

    let (rest, uid) = map(opt(preceded(sp, tag_no_case(b"UID"))), |u| u.is_some())(rest)?;

    let (rest, items) = many0(preceded(sp, esearch_item))(rest)?;

    Ok((
        rest,
        ESearchResponse {
            tag: correlator,
            uid,
            items,
        },
    ))
}

fn esearch_item(input: &[u8]) -> ImapResult<ESearchItem> {
    let (rest, label) = atom(input)?;
    let label = label.to_ascii_uppercase();
    let (rest, _) = sp(rest)?;

    match label.as_str() {
        // Incremental context updates carry (context, uid set) pairs.
        "ADDTO" | "REMOVEFROM" => {
            let (rest, updates) = delimited(
                tag(b"("),
                separated_list1(sp, tuple((number, preceded(sp, sequence_set)))),
                tag(b")"),
            )(rest)?;
            Ok((rest, ESearchItem::Incremental { label, updates }))
        }
        _ => {
            let (rest, set) = sequence_set(rest)?;
            Ok((rest, ESearchItem::Value { label, set }))
        }
    }
}

// ----- THREAD -----

fn thread_group(depth: usize) -> impl Fn(&[u8]) -> ImapResult<ThreadNode> {
    move |input: &[u8]| thread_group_limited(input, depth)
}

fn thread_group_limited(input: &[u8], depth: usize) -> ImapResult<ThreadNode> {
    if depth == 0 {
        return Err(nom::Err::Failure(ImapParseError {
            input,
            kind: ImapErrorKind::RecursionLimitExceeded,
        }));
    }
    let members = move |input| thread_members_limited(input, depth.saturating_sub(1));
    delimited(tag(b"("), members, tag(b")"))(input)
}

/// The inside of a thread group: a number followed either by a linear
/// continuation (`3 6 ...`) or by nested sibling groups (`(4 23)(44 ...)`).
fn thread_members_limited(input: &[u8], depth: usize) -> ImapResult<ThreadNode> {
    if depth == 0 {
        return Err(nom::Err::Failure(ImapParseError {
            input,
            kind: ImapErrorKind::RecursionLimitExceeded,
        }));
    }

    let (rest, id) = number(input)?;

    if rest.first() == Some(&b' ') {
        let rest = &rest[1..];
        match rest.first().copied() {
            Some(b'(') => {
                let group = move |input| thread_group_limited(input, depth.saturating_sub(1));
                let (rest, children) = many1(group)(rest)?;
                return Ok((rest, ThreadNode { number: id, children }));
            }
            _ => {
                let (rest, child) = thread_members_limited(rest, depth.saturating_sub(1))?;
                return Ok((
                    rest,
                    ThreadNode {
                        number: id,
                        children: vec![child],
                    },
                ));
            }
        }
    }

    Ok((
        rest,
        ThreadNode {
            number: id,
            children: Vec::new(),
        },
    ))
}

// ----- ID -----

/// `id-response = "ID" SP id-params-list`;
/// `id-params-list = "(" *(string SP nstring) ")" / nil`
#[allow(clippy::type_complexity)]
fn id_params(input: &[u8]) -> ImapResult<Option<Vec<(String, Option<String>)>>> {
    alt((
        map(nil, |_| None),
        map(
            delimited(
                tag(b"("),
                separated_list0(
                    sp,
                    tuple((
                        map(quoted, |k| k),
                        preceded(sp, crate::parse::core::nstring),
                    )),
                ),
                tag(b")"),
            ),
            |pairs| {
                Some(
                    pairs
                        .into_iter()
                        .map(|(key, value)| {
                            (
                                key,
                                value.map(|(data, _)| {
                                    String::from_utf8_lossy(&data).into_owned()
                                }),
                            )
                        })
                        .collect(),
                )
            },
        ),
    ))(input)
}

// ----- shared helpers -----

/// A `sequence-set` token, e.g. `2731:2733` or `1,3:5`.
fn sequence_set(input: &[u8]) -> ImapResult<Sequence> {
    let (rest, token) = take_while1(|b: u8| {
        b.is_ascii_digit() || b == b':' || b == b',' || b == b'*'
    })(input)?;

    // `unwrap` is safe, the token is ASCII.
    match from_utf8(token).unwrap().parse::<Sequence>() {
        Ok(sequence) => Ok((rest, sequence)),
        Err(_) => Err(nom::Err::Failure(ImapParseError {
            input,
            kind: ImapErrorKind::BadNumber,
        })),
    }
}

fn offset_of(line: &[u8], rest: &[u8]) -> usize {
    line.len() - rest.len()
}

/// Runs an internal parser against the start of the line, converting
/// failures into crate errors.
fn run<'a, O>(
    line: &'a [u8],
    mut parser: impl FnMut(&'a [u8]) -> ImapResult<'a, O>,
) -> Result<(&'a [u8], O), Error> {
    run_at(line, line, &mut parser)
}

/// Same as [`run`], continuing at `rest` for offset bookkeeping.
fn run_at<'a, O>(
    line: &'a [u8],
    rest: &'a [u8],
    mut parser: impl FnMut(&'a [u8]) -> ImapResult<'a, O>,
) -> Result<(&'a [u8], O), Error> {
    match parser(rest) {
        Ok(result) => Ok(result),
        Err(nom::Err::Incomplete(_)) => Err(Error::parse(
            "truncated response",
            line,
            line.len(),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = offset_of(line, e.input);
            match e.kind {
                ImapErrorKind::InvalidResponseCode => Err(Error::InvalidResponseCode {
                    message: format!("at offset {offset}"),
                }),
                kind => Err(Error::parse(kind.describe(), line, offset)),
            }
        }
    }
}

/// Consumes the terminating CRLF and insists nothing follows it.
fn finish(line: &[u8], rest: &[u8]) -> Result<(), Error> {
    let (rest, _) = run_at(line, rest, crlf)?;
    if !rest.is_empty() {
        return Err(Error::TooMuchData {
            message: format!("{} bytes after CRLF", rest.len()),
        });
    }
    Ok(())
}
