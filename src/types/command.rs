//! Client commands as a tag plus an ordered list of wire parts.
//!
//! A part is an atom, a quoted string, a literal, or one of two reserved
//! markers (IDLE, STARTTLS) that change the connection state instead of
//! contributing argument bytes. The serialiser in [`crate::encode`] turns
//! a [`Command`] into line/literal fragments.

use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::types::core::Tag;
use crate::types::flag::Flag;
use crate::types::response::{format_date_time, StatusItem};
use crate::types::sequence::Sequence;

/// Wire encoding of one command part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// Emitted verbatim.
    Atom,
    /// Emitted surrounded by DQUOTE.
    QuotedString,
    /// Announced by `{N}` (or `{N+}` under LITERAL+), then the raw bytes.
    Literal,
    /// Announced by `~{N}`; may contain arbitrary octets.
    Literal8,
    /// Emits `IDLE` CRLF and parks the connection in the idle state until
    /// a later command flushes `DONE`.
    Idle,
    /// Emits `STARTTLS` CRLF and, after the tagged OK, upgrades the
    /// transport.
    StartTls,
}

/// One part of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub kind: PartKind,
    pub data: Vec<u8>,
}

impl Part {
    pub fn atom(text: impl Into<String>) -> Self {
        Part {
            kind: PartKind::Atom,
            data: text.into().into_bytes(),
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Part {
            kind: PartKind::QuotedString,
            data: text.into().into_bytes(),
        }
    }

    pub fn literal(data: impl Into<Vec<u8>>) -> Self {
        Part {
            kind: PartKind::Literal,
            data: data.into(),
        }
    }

    pub fn literal8(data: impl Into<Vec<u8>>) -> Self {
        Part {
            kind: PartKind::Literal8,
            data: data.into(),
        }
    }

    pub fn idle() -> Self {
        Part {
            kind: PartKind::Idle,
            data: b"IDLE".to_vec(),
        }
    }

    pub fn starttls() -> Self {
        Part {
            kind: PartKind::StartTls,
            data: b"STARTTLS".to_vec(),
        }
    }

    /// Picks the cheapest safe encoding for an astring argument: atom for
    /// short alphanumerics, quoted for printable ASCII free of `"`, `\`,
    /// CR, LF and NUL, literal otherwise.
    pub fn astring(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let is_atom = !data.is_empty()
            && data.len() <= 100
            && data.iter().all(u8::is_ascii_alphanumeric);
        if is_atom {
            return Part {
                kind: PartKind::Atom,
                data,
            };
        }
        let quotable = data
            .iter()
            .all(|&b| (0x20..=0x7e).contains(&b) && b != b'"' && b != b'\\');
        if quotable {
            Part {
                kind: PartKind::QuotedString,
                data,
            }
        } else {
            Part {
                kind: PartKind::Literal,
                data,
            }
        }
    }

    /// A mailbox name argument.
    pub fn mailbox(name: &str) -> Self {
        Part::astring(name.as_bytes().to_vec())
    }
}

/// A command ready for the outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub tag: Tag,
    pub parts: Vec<Part>,
}

impl Command {
    pub fn new(tag: Tag, parts: Vec<Part>) -> Self {
        Command { tag, parts }
    }

    /// Whether any part suspends the stream for a server round-trip.
    pub fn has_marker(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part.kind, PartKind::Idle | PartKind::StartTls))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        for part in &self.parts {
            write!(f, " {}", String::from_utf8_lossy(&part.data))?;
        }
        Ok(())
    }
}

// ----- part-list builders for the protocol commands -----
//
// Thin wrappers: each returns the part list for one command, tag excluded.
// The session assigns the tag at enqueue time.

pub fn capability() -> Vec<Part> {
    vec![Part::atom("CAPABILITY")]
}

pub fn noop() -> Vec<Part> {
    vec![Part::atom("NOOP")]
}

pub fn logout() -> Vec<Part> {
    vec![Part::atom("LOGOUT")]
}

pub fn starttls() -> Vec<Part> {
    vec![Part::starttls()]
}

pub fn login(user: &str, pass: &str) -> Vec<Part> {
    vec![
        Part::atom("LOGIN"),
        Part::astring(user.as_bytes().to_vec()),
        Part::astring(pass.as_bytes().to_vec()),
    ]
}

pub fn select(mailbox: &str) -> Vec<Part> {
    vec![Part::atom("SELECT"), Part::mailbox(mailbox)]
}

pub fn examine(mailbox: &str) -> Vec<Part> {
    vec![Part::atom("EXAMINE"), Part::mailbox(mailbox)]
}

pub fn create(mailbox: &str) -> Vec<Part> {
    vec![Part::atom("CREATE"), Part::mailbox(mailbox)]
}

pub fn delete(mailbox: &str) -> Vec<Part> {
    vec![Part::atom("DELETE"), Part::mailbox(mailbox)]
}

pub fn rename(old_name: &str, new_name: &str) -> Vec<Part> {
    vec![
        Part::atom("RENAME"),
        Part::mailbox(old_name),
        Part::mailbox(new_name),
    ]
}

pub fn subscribe(mailbox: &str) -> Vec<Part> {
    vec![Part::atom("SUBSCRIBE"), Part::mailbox(mailbox)]
}

pub fn unsubscribe(mailbox: &str) -> Vec<Part> {
    vec![Part::atom("UNSUBSCRIBE"), Part::mailbox(mailbox)]
}

pub fn list(reference: &str, mailbox: &str) -> Vec<Part> {
    vec![
        Part::atom("LIST"),
        Part::astring(reference.as_bytes().to_vec()),
        Part::astring(mailbox.as_bytes().to_vec()),
    ]
}

pub fn lsub(reference: &str, mailbox: &str) -> Vec<Part> {
    vec![
        Part::atom("LSUB"),
        Part::astring(reference.as_bytes().to_vec()),
        Part::astring(mailbox.as_bytes().to_vec()),
    ]
}

pub fn status(mailbox: &str, fields: &[StatusItem]) -> Vec<Part> {
    let list = fields
        .iter()
        .map(StatusItem::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    vec![
        Part::atom("STATUS"),
        Part::mailbox(mailbox),
        Part::atom(format!("({list})")),
    ]
}

pub fn append(
    mailbox: &str,
    message: Vec<u8>,
    flags: &[Flag],
    timestamp: Option<DateTime<FixedOffset>>,
) -> Vec<Part> {
    let mut parts = vec![Part::atom("APPEND"), Part::mailbox(mailbox)];
    if !flags.is_empty() {
        let list = flags
            .iter()
            .map(Flag::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        parts.push(Part::atom(format!("({list})")));
    }
    if let Some(timestamp) = timestamp {
        parts.push(Part::quoted(format_date_time(&timestamp)));
    }
    // A message containing NUL octets must travel as a LITERAL8.
    if message.contains(&0) {
        parts.push(Part::literal8(message));
    } else {
        parts.push(Part::literal(message));
    }
    parts
}

pub fn check() -> Vec<Part> {
    vec![Part::atom("CHECK")]
}

pub fn close() -> Vec<Part> {
    vec![Part::atom("CLOSE")]
}

pub fn expunge() -> Vec<Part> {
    vec![Part::atom("EXPUNGE")]
}

fn search_parts(command: &str, criteria: &[String], charset: Option<&str>) -> Vec<Part> {
    let mut parts = vec![Part::atom(command)];
    if let Some(charset) = charset {
        parts.push(Part::atom("CHARSET"));
        parts.push(Part::astring(charset.as_bytes().to_vec()));
    }
    for criterion in criteria {
        parts.push(Part::atom(criterion.clone()));
    }
    parts
}

pub fn search(criteria: &[String], charset: Option<&str>) -> Vec<Part> {
    search_parts("SEARCH", criteria, charset)
}

pub fn uid_search(criteria: &[String], charset: Option<&str>) -> Vec<Part> {
    search_parts("UID SEARCH", criteria, charset)
}

pub fn fetch(seq: &Sequence, items: &[String]) -> Vec<Part> {
    vec![
        Part::atom("FETCH"),
        Part::atom(seq.to_string()),
        Part::atom(format!("({})", items.join(" "))),
    ]
}

pub fn uid_fetch(seq: &Sequence, items: &[String]) -> Vec<Part> {
    vec![
        Part::atom("UID FETCH"),
        Part::atom(seq.to_string()),
        Part::atom(format!("({})", items.join(" "))),
    ]
}

pub fn store(seq: &Sequence, item: &str, value: &str) -> Vec<Part> {
    vec![
        Part::atom("STORE"),
        Part::atom(seq.to_string()),
        Part::atom(item),
        Part::atom(value),
    ]
}

pub fn uid_store(seq: &Sequence, item: &str, value: &str) -> Vec<Part> {
    vec![
        Part::atom("UID STORE"),
        Part::atom(seq.to_string()),
        Part::atom(item),
        Part::atom(value),
    ]
}

pub fn copy(seq: &Sequence, mailbox: &str) -> Vec<Part> {
    vec![
        Part::atom("COPY"),
        Part::atom(seq.to_string()),
        Part::mailbox(mailbox),
    ]
}

pub fn uid_copy(seq: &Sequence, mailbox: &str) -> Vec<Part> {
    vec![
        Part::atom("UID COPY"),
        Part::atom(seq.to_string()),
        Part::mailbox(mailbox),
    ]
}

pub fn unselect() -> Vec<Part> {
    vec![Part::atom("UNSELECT")]
}

pub fn idle() -> Vec<Part> {
    vec![Part::idle()]
}

pub fn namespace() -> Vec<Part> {
    vec![Part::atom("NAMESPACE")]
}

/// An experimental `X<atom>` command; the caller supplies every part.
pub fn x_atom(parts: Vec<Part>) -> Vec<Part> {
    parts
}

pub fn id(pairs: Option<&[(String, Option<String>)]>) -> Vec<Part> {
    let mut parts = vec![Part::atom("ID")];
    match pairs {
        None => parts.push(Part::atom("NIL")),
        Some(pairs) => {
            let mut list = Vec::new();
            for (key, value) in pairs {
                list.push(format!("\"{key}\""));
                match value {
                    Some(v) => list.push(format!("\"{v}\"")),
                    None => list.push("NIL".to_string()),
                }
            }
            parts.push(Part::atom(format!("({})", list.join(" "))));
        }
    }
    parts
}

pub fn enable(capabilities: &[String]) -> Vec<Part> {
    let mut parts = vec![Part::atom("ENABLE")];
    for capability in capabilities {
        parts.push(Part::atom(capability.clone()));
    }
    parts
}

pub fn compress_deflate() -> Vec<Part> {
    vec![Part::atom("COMPRESS"), Part::atom("DEFLATE")]
}

pub fn genurlauth(url: &str, mechanism: &str) -> Vec<Part> {
    vec![
        Part::atom("GENURLAUTH"),
        Part::quoted(url.to_string()),
        Part::atom(mechanism),
    ]
}
