//! Server responses as one tagged sum.
//!
//! Every message the server can send maps to exactly one [`Response`]
//! variant; consumers dispatch with `match` instead of downcasting. The
//! `Display` implementations form a canonical printer whose output parses
//! back to an equal value, which the round-trip tests rely on.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

use crate::types::body::BodyStructure;
use crate::types::core::{escape_quoted, Data, Tag, TokenKind};
use crate::types::envelope::Envelope;
use crate::types::flag::{Flag, NameAttribute};
use crate::types::sequence::Sequence;

/// A parsed server response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// OK/NO/BAD/PREAUTH/BYE, tagged or untagged.
    State(State),
    Capability(Vec<String>),
    /// `* n EXISTS` / `* n RECENT` / `* n EXPUNGE`.
    Number(NumberResponse),
    /// LIST or LSUB.
    List(ListResponse),
    Flags(Vec<Flag>),
    Search(Vec<u32>),
    ESearch(ESearchResponse),
    Status(StatusResponse),
    Namespace(NamespaceResponse),
    Sort(Vec<u32>),
    Thread(Vec<ThreadNode>),
    Fetch(FetchResponse),
    /// RFC 2971 ID: key/value map or NIL.
    Id(Option<Vec<(String, Option<String>)>>),
    Enabled(Vec<String>),
    /// QRESYNC VANISHED.
    Vanished { earlier: bool, uids: Sequence },
    /// URLAUTH GENURLAUTH.
    GenUrlAuth(String),
}

/// Status condition of a [`State`] response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Ok,
    No,
    Bad,
    PreAuth,
    Bye,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StateKind::Ok => "OK",
            StateKind::No => "NO",
            StateKind::Bad => "BAD",
            StateKind::PreAuth => "PREAUTH",
            StateKind::Bye => "BYE",
        })
    }
}

/// An OK/NO/BAD/PREAUTH/BYE response with its optional response code and
/// the free-text message. The message text is opaque: the engine copies
/// it, nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// `None` for untagged state responses.
    pub tag: Option<Tag>,
    pub kind: StateKind,
    pub code: Option<Code>,
    pub message: String,
}

/// A response code in the `[...]` bracket of a state response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Alert,
    BadCharset(Vec<String>),
    /// `[CAPABILITY ...]` piggybacked on a state response.
    Capability(Vec<String>),
    Parse,
    PermanentFlags(Vec<Flag>),
    ReadOnly,
    ReadWrite,
    TryCreate,
    UidNext(u32),
    UidValidity(u32),
    Unseen(u32),
    /// UIDPLUS `[APPENDUID uidvalidity uid]`.
    AppendUid { uid_validity: u32, uids: Sequence },
    /// UIDPLUS `[COPYUID uidvalidity from to]`.
    CopyUid {
        uid_validity: u32,
        from: Sequence,
        to: Sequence,
    },
    /// CONDSTORE; up to 63 bits.
    HighestModSeq(u64),
    /// Anything else; payload preserved as raw text.
    Other { name: String, data: Option<String> },
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Alert => f.write_str("ALERT"),
            Code::BadCharset(charsets) => {
                f.write_str("BADCHARSET")?;
                if !charsets.is_empty() {
                    write!(f, " ({})", charsets.join(" "))?;
                }
                Ok(())
            }
            Code::Capability(caps) => write!(f, "CAPABILITY {}", caps.join(" ")),
            Code::Parse => f.write_str("PARSE"),
            Code::PermanentFlags(flags) => {
                f.write_str("PERMANENTFLAGS (")?;
                for (i, flag) in flags.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{flag}")?;
                }
                f.write_str(")")
            }
            Code::ReadOnly => f.write_str("READ-ONLY"),
            Code::ReadWrite => f.write_str("READ-WRITE"),
            Code::TryCreate => f.write_str("TRYCREATE"),
            Code::UidNext(n) => write!(f, "UIDNEXT {n}"),
            Code::UidValidity(n) => write!(f, "UIDVALIDITY {n}"),
            Code::Unseen(n) => write!(f, "UNSEEN {n}"),
            Code::AppendUid { uid_validity, uids } => {
                write!(f, "APPENDUID {uid_validity} {uids}")
            }
            Code::CopyUid {
                uid_validity,
                from,
                to,
            } => write!(f, "COPYUID {uid_validity} {from} {to}"),
            Code::HighestModSeq(n) => write!(f, "HIGHESTMODSEQ {n}"),
            Code::Other { name, data } => {
                f.write_str(name)?;
                if let Some(data) = data {
                    write!(f, " {data}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Exists,
    Recent,
    Expunge,
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NumberKind::Exists => "EXISTS",
            NumberKind::Recent => "RECENT",
            NumberKind::Expunge => "EXPUNGE",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberResponse {
    pub kind: NumberKind,
    pub number: u32,
}

/// A LIST or LSUB line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    pub lsub: bool,
    pub attributes: Vec<NameAttribute>,
    /// Hierarchy delimiter; `None` means a flat name.
    pub separator: Option<char>,
    pub name: String,
    /// LIST-EXTENDED extended data, e.g. `CHILDINFO` or `OLDNAME`,
    /// preserved generically.
    pub extended: Vec<(String, Data)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusItem {
    Messages,
    Recent,
    UidNext,
    UidValidity,
    Unseen,
}

impl fmt::Display for StatusItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusItem::Messages => "MESSAGES",
            StatusItem::Recent => "RECENT",
            StatusItem::UidNext => "UIDNEXT",
            StatusItem::UidValidity => "UIDVALIDITY",
            StatusItem::Unseen => "UNSEEN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub mailbox: String,
    pub items: Vec<(StatusItem, u32)>,
}

impl StatusResponse {
    pub fn get(&self, wanted: StatusItem) -> Option<u32> {
        self.items
            .iter()
            .find(|(item, _)| *item == wanted)
            .map(|(_, n)| *n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceEntry {
    pub prefix: String,
    pub separator: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceResponse {
    pub personal: Vec<NamespaceEntry>,
    pub users: Vec<NamespaceEntry>,
    pub other: Vec<NamespaceEntry>,
}

/// One labelled item of an ESEARCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ESearchItem {
    /// A label plus uint set: `MIN 17`, `COUNT 5`, `ALL 1:4,9`, ...
    Value { label: String, set: Sequence },
    /// Incremental-threading update: `ADDTO (1 2731:2733 ...)` or
    /// `REMOVEFROM (...)`; pairs of (context position, uid set).
    Incremental {
        label: String,
        updates: Vec<(u32, Sequence)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ESearchResponse {
    /// The tag echoed back in `(TAG "...")`, if any.
    pub tag: Option<String>,
    /// Whether the `UID` indicator was present.
    pub uid: bool,
    pub items: Vec<ESearchItem>,
}

/// A node of a THREAD response forest: message number plus child forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadNode {
    pub number: u32,
    pub children: Vec<ThreadNode>,
}

/// One attribute inside a FETCH response, keys uppercased on parse.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchItem {
    Uid(u32),
    Rfc822Size(u32),
    Flags(Vec<Flag>),
    /// CONDSTORE MODSEQ; the wire form is a singleton list.
    ModSeq(u64),
    InternalDate(DateTime<FixedOffset>),
    Envelope(Envelope),
    /// Plain `BODY` (the non-extensible form).
    Body(BodyStructure),
    BodyStructure(BodyStructure),
    /// Raw payload of `BODY[...]<...>`, `RFC822`, `RFC822.HEADER` or
    /// `RFC822.TEXT`. The key is preserved byte-exactly, section path and
    /// partial range included, because it is the lookup key.
    Data { key: Vec<u8>, payload: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Message sequence number.
    pub seq: u32,
    /// Ordered attribute map, wire order preserved.
    pub items: Vec<FetchItem>,
}

impl FetchResponse {
    pub fn uid(&self) -> Option<u32> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Uid(uid) => Some(*uid),
            _ => None,
        })
    }

    pub fn size(&self) -> Option<u32> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Rfc822Size(n) => Some(*n),
            _ => None,
        })
    }

    pub fn flags(&self) -> Option<&[Flag]> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Flags(flags) => Some(flags.as_slice()),
            _ => None,
        })
    }

    pub fn internal_date(&self) -> Option<DateTime<FixedOffset>> {
        self.items.iter().find_map(|item| match item {
            FetchItem::InternalDate(dt) => Some(*dt),
            _ => None,
        })
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Envelope(envelope) => Some(envelope),
            _ => None,
        })
    }

    pub fn body_structure(&self) -> Option<&BodyStructure> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Body(bs) | FetchItem::BodyStructure(bs) => Some(bs),
            _ => None,
        })
    }

    /// Byte-exact payload lookup, e.g. `payload(b"BODY[1.2]")`.
    pub fn payload(&self, key: &[u8]) -> Option<&[u8]> {
        self.items.iter().find_map(|item| match item {
            FetchItem::Data { key: k, payload } if k == key => Some(payload.as_slice()),
            _ => None,
        })
    }
}

impl Response {
    /// Short name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Response::State(_) => "State",
            Response::Capability(_) => "Capability",
            Response::Number(_) => "Number",
            Response::List(_) => "List",
            Response::Flags(_) => "Flags",
            Response::Search(_) => "Search",
            Response::ESearch(_) => "ESearch",
            Response::Status(_) => "Status",
            Response::Namespace(_) => "Namespace",
            Response::Sort(_) => "Sort",
            Response::Thread(_) => "Thread",
            Response::Fetch(_) => "Fetch",
            Response::Id(_) => "Id",
            Response::Enabled(_) => "Enabled",
            Response::Vanished { .. } => "Vanished",
            Response::GenUrlAuth(_) => "GenUrlAuth",
        }
    }

    /// The tag of a tagged state response.
    pub fn tag(&self) -> Option<&Tag> {
        match self {
            Response::State(state) => state.tag.as_ref(),
            _ => None,
        }
    }
}

// ----- canonical printer -----

/// IMAP date-time form `dd-Mon-yyyy hh:mm:ss +hhmm` with SP-padded day.
pub(crate) fn format_date_time(dt: &DateTime<FixedOffset>) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let offset = dt.offset().local_minus_utc();
    let (sign, offset) = if offset < 0 {
        ('-', -offset)
    } else {
        ('+', offset)
    };
    format!(
        "{:2}-{}-{:04} {:02}:{:02}:{:02} {}{:02}{:02}",
        dt.day(),
        MONTHS[dt.month0() as usize],
        dt.year(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        sign,
        offset / 3600,
        (offset % 3600) / 60,
    )
}

fn quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "\"{}\"", escape_quoted(text))
}

fn join_numbers(f: &mut fmt::Formatter<'_>, numbers: &[u32]) -> fmt::Result {
    for n in numbers {
        write!(f, " {n}")?;
    }
    Ok(())
}

impl fmt::Display for ThreadNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number)?;
        if self.children.len() == 1 {
            // A linear chain stays flat: (2 3 4).
            write!(f, " {}", self.children[0])
        } else {
            for (i, child) in self.children.iter().enumerate() {
                if i == 0 {
                    f.write_str(" ")?;
                }
                write!(f, "({child})")?;
            }
            Ok(())
        }
    }
}

impl fmt::Display for FetchItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchItem::Uid(n) => write!(f, "UID {n}"),
            FetchItem::Rfc822Size(n) => write!(f, "RFC822.SIZE {n}"),
            FetchItem::Flags(flags) => {
                f.write_str("FLAGS (")?;
                for (i, flag) in flags.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{flag}")?;
                }
                f.write_str(")")
            }
            FetchItem::ModSeq(n) => write!(f, "MODSEQ ({n})"),
            FetchItem::InternalDate(dt) => {
                write!(f, "INTERNALDATE \"{}\"", format_date_time(dt))
            }
            FetchItem::Envelope(envelope) => write!(f, "ENVELOPE {envelope}"),
            FetchItem::Body(bs) => write!(f, "BODY {bs}"),
            FetchItem::BodyStructure(bs) => write!(f, "BODYSTRUCTURE {bs}"),
            FetchItem::Data { key, payload } => {
                f.write_str(&String::from_utf8_lossy(key))?;
                write!(f, " {{{}}}\r\n", payload.len())?;
                f.write_str(&String::from_utf8_lossy(payload))
            }
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{tag} ")?,
            None => f.write_str("* ")?,
        }
        write!(f, "{}", self.kind)?;
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        if !self.message.is_empty() {
            write!(f, " {}", self.message)?;
        }
        Ok(())
    }
}

impl fmt::Display for Response {
    /// Prints the full response line, CRLF excluded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::State(state) => write!(f, "{state}"),
            Response::Capability(caps) => write!(f, "* CAPABILITY {}", caps.join(" ")),
            Response::Number(NumberResponse { kind, number }) => {
                write!(f, "* {number} {kind}")
            }
            Response::List(list) => {
                write!(f, "* {} (", if list.lsub { "LSUB" } else { "LIST" })?;
                for (i, attribute) in list.attributes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{attribute}")?;
                }
                f.write_str(") ")?;
                match list.separator {
                    Some(c) => write!(f, "\"{}\"", escape_quoted(&c.to_string()))?,
                    None => f.write_str("NIL")?,
                }
                f.write_str(" ")?;
                quoted(f, &list.name)?;
                if !list.extended.is_empty() {
                    f.write_str(" (")?;
                    for (i, (key, value)) in list.extended.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        quoted(f, key)?;
                        write!(f, " {value}")?;
                    }
                    f.write_str(")")?;
                }
                Ok(())
            }
            Response::Flags(flags) => {
                f.write_str("* FLAGS (")?;
                for (i, flag) in flags.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{flag}")?;
                }
                f.write_str(")")
            }
            Response::Search(numbers) => {
                f.write_str("* SEARCH")?;
                join_numbers(f, numbers)
            }
            Response::Sort(numbers) => {
                f.write_str("* SORT")?;
                join_numbers(f, numbers)
            }
            Response::ESearch(esearch) => {
                f.write_str("* ESEARCH")?;
                if let Some(tag) = &esearch.tag {
                    write!(f, " (TAG \"{}\")", escape_quoted(tag))?;
                }
                if esearch.uid {
                    f.write_str(" UID")?;
                }
                for item in &esearch.items {
                    match item {
                        ESearchItem::Value { label, set } => write!(f, " {label} {set}")?,
                        ESearchItem::Incremental { label, updates } => {
                            write!(f, " {label} (")?;
                            for (i, (context, uids)) in updates.iter().enumerate() {
                                if i > 0 {
                                    f.write_str(" ")?;
                                }
                                write!(f, "{context} {uids}")?;
                            }
                            f.write_str(")")?;
                        }
                    }
                }
                Ok(())
            }
            Response::Status(status) => {
                f.write_str("* STATUS ")?;
                quoted(f, &status.mailbox)?;
                f.write_str(" (")?;
                for (i, (item, n)) in status.items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item} {n}")?;
                }
                f.write_str(")")
            }
            Response::Namespace(ns) => {
                fn group(f: &mut fmt::Formatter<'_>, entries: &[NamespaceEntry]) -> fmt::Result {
                    if entries.is_empty() {
                        return f.write_str("NIL");
                    }
                    f.write_str("(")?;
                    for entry in entries {
                        write!(f, "(\"{}\" ", escape_quoted(&entry.prefix))?;
                        match entry.separator {
                            Some(c) => write!(f, "\"{}\"", escape_quoted(&c.to_string()))?,
                            None => f.write_str("NIL")?,
                        }
                        f.write_str(")")?;
                    }
                    f.write_str(")")
                }
                f.write_str("* NAMESPACE ")?;
                group(f, &ns.personal)?;
                f.write_str(" ")?;
                group(f, &ns.users)?;
                f.write_str(" ")?;
                group(f, &ns.other)
            }
            Response::Thread(forest) => {
                f.write_str("* THREAD")?;
                if !forest.is_empty() {
                    f.write_str(" ")?;
                    for node in forest {
                        write!(f, "({node})")?;
                    }
                }
                Ok(())
            }
            Response::Fetch(fetch) => {
                write!(f, "* {} FETCH (", fetch.seq)?;
                for (i, item) in fetch.items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Response::Id(None) => f.write_str("* ID NIL"),
            Response::Id(Some(pairs)) => {
                f.write_str("* ID (")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    quoted(f, key)?;
                    f.write_str(" ")?;
                    match value {
                        Some(v) => quoted(f, v)?,
                        None => f.write_str("NIL")?,
                    }
                }
                f.write_str(")")
            }
            Response::Enabled(caps) => {
                f.write_str("* ENABLED")?;
                for cap in caps {
                    write!(f, " {cap}")?;
                }
                Ok(())
            }
            Response::Vanished { earlier, uids } => {
                f.write_str("* VANISHED ")?;
                if *earlier {
                    f.write_str("(EARLIER) ")?;
                }
                write!(f, "{uids}")
            }
            Response::GenUrlAuth(url) => {
                f.write_str("* GENURLAUTH ")?;
                quoted(f, url)
            }
        }
    }
}

impl fmt::Display for Data {
    /// Canonical form of a generic value; literals print with their `{N}`
    /// announcement so the output stays parseable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Atom(atom) => f.write_str(atom),
            Data::String { data, kind } => match kind {
                TokenKind::QuotedString | TokenKind::Atom => {
                    write!(f, "\"{}\"", escape_quoted(&String::from_utf8_lossy(data)))
                }
                TokenKind::Literal => {
                    write!(f, "{{{}}}\r\n", data.len())?;
                    f.write_str(&String::from_utf8_lossy(data))
                }
                TokenKind::Literal8 => {
                    write!(f, "~{{{}}}\r\n", data.len())?;
                    f.write_str(&String::from_utf8_lossy(data))
                }
            },
            Data::Number(n) => write!(f, "{n}"),
            Data::Nil | Data::NilList => f.write_str("NIL"),
            Data::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_response_prints() {
        let response = Response::Number(NumberResponse {
            kind: NumberKind::Exists,
            number: 3,
        });
        assert_eq!(response.to_string(), "* 3 EXISTS");
    }

    #[test]
    fn state_with_code_prints() {
        let response = Response::State(State {
            tag: Some(Tag::from("y01")),
            kind: StateKind::Ok,
            code: Some(Code::UidValidity(17)),
            message: "UIDs valid".into(),
        });
        assert_eq!(response.to_string(), "y01 OK [UIDVALIDITY 17] UIDs valid");
    }

    #[test]
    fn thread_forest_prints_nested() {
        // (2)(3 6 (4 23)(44 7 96))
        let forest = vec![
            ThreadNode {
                number: 2,
                children: vec![],
            },
            ThreadNode {
                number: 3,
                children: vec![ThreadNode {
                    number: 6,
                    children: vec![
                        ThreadNode {
                            number: 4,
                            children: vec![ThreadNode {
                                number: 23,
                                children: vec![],
                            }],
                        },
                        ThreadNode {
                            number: 44,
                            children: vec![ThreadNode {
                                number: 7,
                                children: vec![ThreadNode {
                                    number: 96,
                                    children: vec![],
                                }],
                            }],
                        },
                    ],
                }],
            },
        ];
        assert_eq!(
            Response::Thread(forest).to_string(),
            "* THREAD (2)(3 6 (4 23)(44 7 96))"
        );
    }

    #[test]
    fn fetch_lookup_helpers() {
        let fetch = FetchResponse {
            seq: 12,
            items: vec![
                FetchItem::Uid(666),
                FetchItem::Rfc822Size(1337),
                FetchItem::Data {
                    key: b"BODY[1]".to_vec(),
                    payload: b"hi".to_vec(),
                },
            ],
        };
        assert_eq!(fetch.uid(), Some(666));
        assert_eq!(fetch.size(), Some(1337));
        assert_eq!(fetch.payload(b"BODY[1]"), Some(&b"hi"[..]));
        assert_eq!(fetch.payload(b"BODY[2]"), None);
    }

    #[test]
    fn internal_date_formats_with_padded_day() {
        let dt = DateTime::parse_from_rfc3339("1981-04-06T12:03:32-06:30").unwrap();
        assert_eq!(format_date_time(&dt), " 6-Apr-1981 12:03:32 -0630");
    }
}
