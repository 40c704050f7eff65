//! Message flags and mailbox name attributes.

use std::fmt;

/// A message flag, as seen in `FLAGS` responses, `PERMANENTFLAGS` codes
/// and `FETCH FLAGS` attributes.
///
/// System flags get their own variants; everything else stays an atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    Recent,
    /// `\*` inside PERMANENTFLAGS: clients may create new keywords.
    Wildcard,
    /// A client-defined keyword (no leading backslash).
    Keyword(String),
    /// A `\`-prefixed flag this crate does not know.
    Extension(String),
}

impl Flag {
    /// Parses a flag atom, with or without the leading backslash.
    pub fn from_atom(atom: &str) -> Self {
        match atom.strip_prefix('\\') {
            None => Flag::Keyword(atom.to_string()),
            Some(name) => {
                if name == "*" {
                    return Flag::Wildcard;
                }
                match name.to_ascii_lowercase().as_str() {
                    "seen" => Flag::Seen,
                    "answered" => Flag::Answered,
                    "flagged" => Flag::Flagged,
                    "deleted" => Flag::Deleted,
                    "draft" => Flag::Draft,
                    "recent" => Flag::Recent,
                    _ => Flag::Extension(name.to_string()),
                }
            }
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Seen => f.write_str("\\Seen"),
            Flag::Answered => f.write_str("\\Answered"),
            Flag::Flagged => f.write_str("\\Flagged"),
            Flag::Deleted => f.write_str("\\Deleted"),
            Flag::Draft => f.write_str("\\Draft"),
            Flag::Recent => f.write_str("\\Recent"),
            Flag::Wildcard => f.write_str("\\*"),
            Flag::Keyword(k) => f.write_str(k),
            Flag::Extension(e) => write!(f, "\\{e}"),
        }
    }
}

/// A mailbox name attribute from a `LIST`/`LSUB` response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameAttribute {
    Noselect,
    Noinferiors,
    HasChildren,
    HasNoChildren,
    Marked,
    Unmarked,
    Extension(String),
}

impl NameAttribute {
    pub fn from_atom(atom: &str) -> Self {
        let name = atom.strip_prefix('\\').unwrap_or(atom);
        match name.to_ascii_lowercase().as_str() {
            "noselect" => NameAttribute::Noselect,
            "noinferiors" => NameAttribute::Noinferiors,
            "haschildren" => NameAttribute::HasChildren,
            "hasnochildren" => NameAttribute::HasNoChildren,
            "marked" => NameAttribute::Marked,
            "unmarked" => NameAttribute::Unmarked,
            _ => NameAttribute::Extension(name.to_string()),
        }
    }
}

impl fmt::Display for NameAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameAttribute::Noselect => f.write_str("\\Noselect"),
            NameAttribute::Noinferiors => f.write_str("\\Noinferiors"),
            NameAttribute::HasChildren => f.write_str("\\HasChildren"),
            NameAttribute::HasNoChildren => f.write_str("\\HasNoChildren"),
            NameAttribute::Marked => f.write_str("\\Marked"),
            NameAttribute::Unmarked => f.write_str("\\Unmarked"),
            NameAttribute::Extension(e) => write!(f, "\\{e}"),
        }
    }
}
