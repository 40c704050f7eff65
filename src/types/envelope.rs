//! The ENVELOPE structure of RFC 3501 section 7.4.2.

use std::fmt;

use crate::types::core::escape_quoted;

/// One address from an envelope address list.
///
/// A `None` host denotes a group marker: `(name NIL NIL NIL)` starts a
/// group named by `mailbox`, `(NIL NIL NIL NIL)`-style entries with a
/// NIL mailbox end it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailAddress {
    /// Display name, RFC 2822 `display-name`.
    pub name: Option<String>,
    /// Source route, RFC 2822 obsolete `adl`.
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain.
    pub host: Option<String>,
}

impl MailAddress {
    pub fn new(
        name: Option<&str>,
        adl: Option<&str>,
        mailbox: Option<&str>,
        host: Option<&str>,
    ) -> Self {
        MailAddress {
            name: name.map(str::to_string),
            adl: adl.map(str::to_string),
            mailbox: mailbox.map(str::to_string),
            host: host.map(str::to_string),
        }
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn field(f: &mut fmt::Formatter<'_>, value: &Option<String>) -> fmt::Result {
            match value {
                Some(v) => write!(f, "\"{}\"", escape_quoted(v)),
                None => f.write_str("NIL"),
            }
        }
        f.write_str("(")?;
        field(f, &self.name)?;
        f.write_str(" ")?;
        field(f, &self.adl)?;
        f.write_str(" ")?;
        field(f, &self.mailbox)?;
        f.write_str(" ")?;
        field(f, &self.host)?;
        f.write_str(")")
    }
}

/// A message envelope.
///
/// The date is kept as the raw header text; interpreting RFC 2822 dates is
/// left to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    pub date: Option<String>,
    pub subject: Option<String>,
    pub from: Vec<MailAddress>,
    pub sender: Vec<MailAddress>,
    pub reply_to: Vec<MailAddress>,
    pub to: Vec<MailAddress>,
    pub cc: Vec<MailAddress>,
    pub bcc: Vec<MailAddress>,
    pub in_reply_to: Option<String>,
    pub message_id: Option<String>,
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn text(f: &mut fmt::Formatter<'_>, value: &Option<String>) -> fmt::Result {
            match value {
                Some(v) => write!(f, "\"{}\"", escape_quoted(v)),
                None => f.write_str("NIL"),
            }
        }
        fn addresses(f: &mut fmt::Formatter<'_>, list: &[MailAddress]) -> fmt::Result {
            if list.is_empty() {
                return f.write_str("NIL");
            }
            f.write_str("(")?;
            for address in list {
                write!(f, "{address}")?;
            }
            f.write_str(")")
        }

        f.write_str("(")?;
        text(f, &self.date)?;
        f.write_str(" ")?;
        text(f, &self.subject)?;
        for list in [
            &self.from,
            &self.sender,
            &self.reply_to,
            &self.to,
            &self.cc,
            &self.bcc,
        ] {
            f.write_str(" ")?;
            addresses(f, list)?;
        }
        f.write_str(" ")?;
        text(f, &self.in_reply_to)?;
        f.write_str(" ")?;
        text(f, &self.message_id)?;
        f.write_str(")")
    }
}
