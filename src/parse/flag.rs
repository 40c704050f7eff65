//! Flag and mailbox-attribute atoms.

use abnf_core::streaming::sp;
use nom::{
    branch::alt,
    bytes::streaming::tag,
    combinator::map,
    multi::separated_list0,
    sequence::{delimited, preceded},
};

use crate::parse::core::atom;
use crate::parse::ImapResult;
use crate::types::flag::{Flag, NameAttribute};

/// `flag = "\Answered" / "\Flagged" / ... / keyword / "\" atom`
///
/// `flag-perm` is folded in: `\*` parses to [`Flag::Wildcard`].
pub(crate) fn flag(input: &[u8]) -> ImapResult<Flag> {
    alt((
        map(
            preceded(
                tag(b"\\"),
                alt((map(tag(b"*"), |_| "*".to_string()), atom)),
            ),
            |name| Flag::from_atom(&format!("\\{name}")),
        ),
        map(atom, |name| Flag::from_atom(&name)),
    ))(input)
}

/// `flag-list = "(" [flag *(SP flag)] ")"`
pub(crate) fn flag_list(input: &[u8]) -> ImapResult<Vec<Flag>> {
    delimited(tag(b"("), separated_list0(sp, flag), tag(b")"))(input)
}

/// `mbx-list-flags`, e.g. `\Noselect` or `\HasChildren`.
pub(crate) fn name_attribute(input: &[u8]) -> ImapResult<NameAttribute> {
    map(preceded(tag(b"\\"), atom), |name| {
        NameAttribute::from_atom(&name)
    })(input)
}

pub(crate) fn name_attribute_list(input: &[u8]) -> ImapResult<Vec<NameAttribute>> {
    delimited(tag(b"("), separated_list0(sp, name_attribute), tag(b")"))(input)
}
