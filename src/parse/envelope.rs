//! ENVELOPE parsing.

use abnf_core::streaming::sp;
use nom::{
    branch::alt,
    bytes::streaming::tag,
    combinator::map,
    multi::{many0, many1},
    sequence::{delimited, preceded, terminated, tuple},
};

use crate::parse::core::{nil, nstring};
use crate::parse::ImapResult;
use crate::types::envelope::{Envelope, MailAddress};

fn nstring_text(input: &[u8]) -> ImapResult<Option<String>> {
    map(nstring, |value| {
        value.map(|(data, _)| String::from_utf8_lossy(&data).into_owned())
    })(input)
}

/// ```abnf
/// envelope = "(" env-date SP env-subject SP env-from SP
///                env-sender SP env-reply-to SP env-to SP env-cc SP
///                env-bcc SP env-in-reply-to SP env-message-id ")"
/// ```
pub fn envelope(input: &[u8]) -> ImapResult<Envelope> {
    let mut parser = delimited(
        tag(b"("),
        tuple((
            terminated(nstring_text, sp), // date
            terminated(nstring_text, sp), // subject
            terminated(address_list, sp), // from
            terminated(address_list, sp), // sender
            terminated(address_list, sp), // reply-to
            terminated(address_list, sp), // to
            terminated(address_list, sp), // cc
            terminated(address_list, sp), // bcc
            terminated(nstring_text, sp), // in-reply-to
            nstring_text,                 // message-id
        )),
        tag(b")"),
    );

    let (remaining, (date, subject, from, sender, reply_to, to, cc, bcc, in_reply_to, message_id)) =
        parser(input)?;

    Ok((
        remaining,
        Envelope {
            date,
            subject,
            from,
            sender,
            reply_to,
            to,
            cc,
            bcc,
            in_reply_to,
            message_id,
        },
    ))
}

/// `env-from` and friends: `"(" 1*address ")" / nil`.
///
/// Some servers put spaces between the addresses; those are skipped.
fn address_list(input: &[u8]) -> ImapResult<Vec<MailAddress>> {
    alt((
        map(nil, |_| Vec::new()),
        delimited(
            tag(b"("),
            many1(preceded(many0(sp), address)),
            preceded(many0(sp), tag(b")")),
        ),
    ))(input)
}

/// `address = "(" addr-name SP addr-adl SP addr-mailbox SP addr-host ")"`
pub(crate) fn address(input: &[u8]) -> ImapResult<MailAddress> {
    let mut parser = delimited(
        tag(b"("),
        tuple((
            terminated(nstring_text, sp),
            terminated(nstring_text, sp),
            terminated(nstring_text, sp),
            nstring_text,
        )),
        tag(b")"),
    );

    let (remaining, (name, adl, mailbox, host)) = parser(input)?;

    Ok((
        remaining,
        MailAddress {
            name,
            adl,
            mailbox,
            host,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_address() {
        let (_, parsed) = address(b"(\"Joe\" NIL \"joe\" \"example.org\") ").unwrap();
        assert_eq!(
            parsed,
            MailAddress::new(Some("Joe"), None, Some("joe"), Some("example.org"))
        );
    }

    #[test]
    fn group_marker_has_nil_host() {
        let (_, parsed) = address(b"(NIL NIL \"undisclosed\" NIL) ").unwrap();
        assert_eq!(parsed.host, None);
        assert_eq!(parsed.mailbox.as_deref(), Some("undisclosed"));
    }

    #[test]
    fn envelope_with_nil_lists() {
        let input = b"(\"Wed, 17 Jul 1996 02:23:25 -0700 (PDT)\" \"subject\" ((\"A\" NIL \"a\" \"h\")) NIL NIL ((\"B\" NIL \"b\" \"h\")) NIL NIL NIL \"<id@h>\") ";
        let (_, parsed) = envelope(input).unwrap();
        assert_eq!(parsed.subject.as_deref(), Some("subject"));
        assert_eq!(parsed.from.len(), 1);
        assert!(parsed.sender.is_empty());
        assert_eq!(parsed.to[0].mailbox.as_deref(), Some("b"));
        assert_eq!(parsed.message_id.as_deref(), Some("<id@h>"));
        assert!(parsed.in_reply_to.is_none());
    }

    #[test]
    fn literal_subject_is_accepted() {
        let input = b"(NIL {7}\r\nsubject NIL NIL NIL NIL NIL NIL NIL NIL) ";
        let (_, parsed) = envelope(input).unwrap();
        assert_eq!(parsed.subject.as_deref(), Some("subject"));
    }

    #[test]
    fn spaces_between_addresses_are_tolerated() {
        let input = b"((\"A\" NIL \"a\" \"h\") (\"B\" NIL \"b\" \"h\")) ";
        let (_, parsed) = address_list(input).unwrap();
        assert_eq!(parsed.len(), 2);
    }
}
