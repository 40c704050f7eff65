//! BODY / BODYSTRUCTURE parsing.
//!
//! The grammar is recursive (multiparts nest, message/rfc822 embeds a
//! whole body); recursion is depth-limited so a hostile server cannot
//! overflow the stack.

use abnf_core::streaming::sp;
use nom::{
    branch::alt,
    bytes::streaming::{tag, tag_no_case},
    combinator::{map, opt},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::{delimited, preceded, tuple},
};

use crate::parse::core::{nil, nstring, number, string};
use crate::parse::envelope::envelope;
use crate::parse::{ImapErrorKind, ImapParseError, ImapResult};
use crate::types::body::{BasicFields, BodyExtension, BodyStructure, PartExtension};

fn istring(input: &[u8]) -> ImapResult<String> {
    map(string, |(data, _)| {
        String::from_utf8_lossy(&data).into_owned()
    })(input)
}

fn nstring_text(input: &[u8]) -> ImapResult<Option<String>> {
    map(nstring, |value| {
        value.map(|(data, _)| String::from_utf8_lossy(&data).into_owned())
    })(input)
}

/// `body = "(" (body-type-1part / body-type-mpart) ")"`
pub fn body(remaining_recursions: usize) -> impl Fn(&[u8]) -> ImapResult<BodyStructure> {
    move |input: &[u8]| body_limited(input, remaining_recursions)
}

fn body_limited(input: &[u8], remaining_recursions: usize) -> ImapResult<BodyStructure> {
    if remaining_recursions == 0 {
        return Err(nom::Err::Failure(ImapParseError {
            input,
            kind: ImapErrorKind::RecursionLimitExceeded,
        }));
    }

    let one_part =
        move |input| body_type_1part_limited(input, remaining_recursions.saturating_sub(1));
    let multi_part =
        move |input| body_type_mpart_limited(input, remaining_recursions.saturating_sub(1));

    delimited(tag(b"("), alt((one_part, multi_part)), tag(b")"))(input)
}

/// `body-type-1part = (body-type-msg / body-type-text / body-type-basic)
///                    [SP body-ext-1part]`
fn body_type_1part_limited(
    input: &[u8],
    remaining_recursions: usize,
) -> ImapResult<BodyStructure> {
    let body_type_msg = move |input| body_type_msg_limited(input, remaining_recursions);

    let (remaining, (mut structure, extension)) = tuple((
        alt((body_type_msg, body_type_text, body_type_basic)),
        opt(preceded(sp, body_ext_1part)),
    ))(input)?;

    if let Some(parsed_extension) = extension {
        match &mut structure {
            BodyStructure::Basic { extension, .. }
            | BodyStructure::Text { extension, .. }
            | BodyStructure::Message { extension, .. } => *extension = parsed_extension,
            BodyStructure::Multipart { .. } => unreachable!(),
        }
    }

    Ok((remaining, structure))
}

/// `body-type-basic = media-basic SP body-fields`
fn body_type_basic(input: &[u8]) -> ImapResult<BodyStructure> {
    let (remaining, ((media_type, media_subtype), _, fields)) =
        tuple((media_basic, sp, body_fields))(input)?;

    Ok((
        remaining,
        BodyStructure::Basic {
            media_type,
            media_subtype,
            fields,
            extension: PartExtension::default(),
        },
    ))
}

/// `body-type-msg = media-message SP body-fields SP envelope SP body SP
/// body-fld-lines`
fn body_type_msg_limited(input: &[u8], remaining_recursions: usize) -> ImapResult<BodyStructure> {
    let body = move |input| body_limited(input, remaining_recursions);

    let (remaining, (_, _, fields, _, envelope, _, nested, _, lines)) = tuple((
        media_message,
        sp,
        body_fields,
        sp,
        envelope,
        sp,
        body,
        sp,
        number,
    ))(input)?;

    Ok((
        remaining,
        BodyStructure::Message {
            fields,
            envelope: Box::new(envelope),
            body: Box::new(nested),
            lines,
            extension: PartExtension::default(),
        },
    ))
}

/// `body-type-text = media-text SP body-fields SP body-fld-lines`
fn body_type_text(input: &[u8]) -> ImapResult<BodyStructure> {
    let (remaining, (media_subtype, _, fields, _, lines)) =
        tuple((media_text, sp, body_fields, sp, number))(input)?;

    Ok((
        remaining,
        BodyStructure::Text {
            media_subtype,
            fields,
            lines,
            extension: PartExtension::default(),
        },
    ))
}

/// `body-type-mpart = 1*body SP media-subtype [SP body-ext-mpart]`
fn body_type_mpart_limited(input: &[u8], remaining_recursions: usize) -> ImapResult<BodyStructure> {
    let body = move |input| body_limited(input, remaining_recursions);

    let (remaining, (parts, _, media_subtype, extension)) = tuple((
        many1(body),
        sp,
        istring,
        opt(preceded(sp, body_ext_mpart)),
    ))(input)?;

    let (parameters, extension) = extension.unwrap_or_default();

    Ok((
        remaining,
        BodyStructure::Multipart {
            parts,
            media_subtype,
            parameters,
            extension,
        },
    ))
}

/// `media-basic = ((DQUOTE ("APPLICATION" / "AUDIO" / "IMAGE" / "MESSAGE"
/// / "VIDEO") DQUOTE) / string) SP media-subtype`
///
/// Relaxed to any string pair; a client gains nothing from
/// special-casing the registered top-level types.
fn media_basic(input: &[u8]) -> ImapResult<(String, String)> {
    let (remaining, (media_type, _, media_subtype)) = tuple((istring, sp, istring))(input)?;
    Ok((remaining, (media_type, media_subtype)))
}

/// `media-message = DQUOTE "MESSAGE" DQUOTE SP DQUOTE "RFC822" DQUOTE`
fn media_message(input: &[u8]) -> ImapResult<()> {
    map(
        tuple((
            tag(b"\""),
            tag_no_case(b"MESSAGE"),
            tag(b"\""),
            sp,
            tag(b"\""),
            tag_no_case(b"RFC822"),
            tag(b"\""),
        )),
        |_| (),
    )(input)
}

/// `media-text = DQUOTE "TEXT" DQUOTE SP media-subtype`
fn media_text(input: &[u8]) -> ImapResult<String> {
    preceded(
        tuple((tag(b"\""), tag_no_case(b"TEXT"), tag(b"\""), sp)),
        istring,
    )(input)
}

/// `body-fields = body-fld-param SP body-fld-id SP body-fld-desc SP
/// body-fld-enc SP body-fld-octets`
fn body_fields(input: &[u8]) -> ImapResult<BasicFields> {
    let (remaining, (parameters, _, content_id, _, description, _, encoding, _, octets)) =
        tuple((
            body_fld_param,
            sp,
            nstring_text,
            sp,
            nstring_text,
            sp,
            istring,
            sp,
            number,
        ))(input)?;

    Ok((
        remaining,
        BasicFields {
            parameters,
            content_id,
            description,
            encoding,
            octets,
        },
    ))
}

/// `body-fld-param = "(" string SP string *(SP string SP string) ")" / nil`
fn body_fld_param(input: &[u8]) -> ImapResult<Vec<(String, String)>> {
    alt((
        delimited(
            tag(b"("),
            separated_list0(
                sp,
                map(tuple((istring, sp, istring)), |(key, _, value)| {
                    (key, value)
                }),
            ),
            tag(b")"),
        ),
        map(nil, |_| vec![]),
    ))(input)
}

/// ```abnf
/// body-ext-1part = body-fld-md5
///                   [SP body-fld-dsp
///                     [SP body-fld-lang
///                       [SP body-fld-loc *(SP body-extension)]]]
/// ```
fn body_ext_1part(input: &[u8]) -> ImapResult<PartExtension> {
    let (remaining, (md5, tail)) = tuple((nstring_text, opt(ext_tail)))(input)?;
    let mut extension = tail.unwrap_or_default();
    extension.md5 = md5;
    Ok((remaining, extension))
}

/// `body-ext-mpart = body-fld-param [SP body-fld-dsp [SP body-fld-lang
/// [SP body-fld-loc *(SP body-extension)]]]`
fn body_ext_mpart(input: &[u8]) -> ImapResult<(Vec<(String, String)>, PartExtension)> {
    let (remaining, (parameters, tail)) = tuple((body_fld_param, opt(ext_tail)))(input)?;
    Ok((remaining, (parameters, tail.unwrap_or_default())))
}

/// The shared `dsp / lang / loc / extension` suffix.
fn ext_tail(input: &[u8]) -> ImapResult<PartExtension> {
    let (remaining, (disposition, tail)) = preceded(
        sp,
        tuple((
            body_fld_dsp,
            opt(preceded(
                sp,
                tuple((
                    body_fld_lang,
                    opt(preceded(
                        sp,
                        tuple((nstring_text, many0(preceded(sp, body_extension(8))))),
                    )),
                )),
            )),
        )),
    )(input)?;

    let mut extension = PartExtension {
        disposition,
        ..PartExtension::default()
    };
    if let Some((language, rest)) = tail {
        extension.language = language;
        if let Some((location, extensions)) = rest {
            extension.location = location;
            extension.extensions = extensions;
        }
    }
    Ok((remaining, extension))
}

/// `body-fld-dsp = "(" string SP body-fld-param ")" / nil`
#[allow(clippy::type_complexity)]
fn body_fld_dsp(input: &[u8]) -> ImapResult<Option<(String, Vec<(String, String)>)>> {
    alt((
        delimited(
            tag(b"("),
            map(
                tuple((istring, sp, body_fld_param)),
                |(kind, _, parameters)| Some((kind, parameters)),
            ),
            tag(b")"),
        ),
        map(nil, |_| None),
    ))(input)
}

/// `body-fld-lang = nstring / "(" string *(SP string) ")"`
fn body_fld_lang(input: &[u8]) -> ImapResult<Vec<String>> {
    alt((
        map(nstring_text, |value| match value {
            Some(language) => vec![language],
            None => vec![],
        }),
        delimited(tag(b"("), separated_list1(sp, istring), tag(b")")),
    ))(input)
}

/// `body-extension = nstring / number / "(" body-extension *(SP
/// body-extension) ")"`
fn body_extension(remaining_recursions: usize) -> impl Fn(&[u8]) -> ImapResult<BodyExtension> {
    move |input: &[u8]| body_extension_limited(input, remaining_recursions)
}

fn body_extension_limited(input: &[u8], remaining_recursions: usize) -> ImapResult<BodyExtension> {
    if remaining_recursions == 0 {
        return Err(nom::Err::Failure(ImapParseError {
            input,
            kind: ImapErrorKind::RecursionLimitExceeded,
        }));
    }

    let nested = move |input| body_extension_limited(input, remaining_recursions.saturating_sub(1));

    alt((
        map(number, BodyExtension::Number),
        map(nstring_text, BodyExtension::Text),
        map(
            delimited(tag(b"("), separated_list1(sp, nested), tag(b")")),
            BodyExtension::List,
        ),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_text_part() {
        let input =
            b"(\"TEXT\" \"PLAIN\" (\"CHARSET\" \"US-ASCII\") NIL NIL \"7BIT\" 2279 48) ";
        let (_, parsed) = body(8)(input).unwrap();
        match parsed {
            BodyStructure::Text {
                media_subtype,
                fields,
                lines,
                ..
            } => {
                assert_eq!(media_subtype, "PLAIN");
                assert_eq!(fields.octets, 2279);
                assert_eq!(fields.encoding, "7BIT");
                assert_eq!(lines, 48);
            }
            other => panic!("expected text part, got {other:?}"),
        }
    }

    #[test]
    fn multipart_with_subtype() {
        let input = b"((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 5 1)(\"TEXT\" \"HTML\" NIL NIL NIL \"7BIT\" 6 1) \"ALTERNATIVE\") ";
        let (_, parsed) = body(8)(input).unwrap();
        match parsed {
            BodyStructure::Multipart {
                parts,
                media_subtype,
                ..
            } => {
                assert_eq!(parts.len(), 2);
                assert_eq!(media_subtype, "ALTERNATIVE");
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn message_rfc822_nests() {
        let input = b"(\"MESSAGE\" \"RFC822\" NIL NIL NIL \"7BIT\" 342 (NIL \"inner\" NIL NIL NIL NIL NIL NIL NIL NIL) (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 14 2) 6) ";
        let (_, parsed) = body(8)(input).unwrap();
        match parsed {
            BodyStructure::Message {
                envelope,
                body,
                lines,
                ..
            } => {
                assert_eq!(envelope.subject.as_deref(), Some("inner"));
                assert!(matches!(*body, BodyStructure::Text { .. }));
                assert_eq!(lines, 6);
            }
            other => panic!("expected message part, got {other:?}"),
        }
    }

    #[test]
    fn one_part_extension_fields() {
        let input = b"(\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 5 1 \"md5sum\" (\"INLINE\" NIL) \"en\" \"loc\" 7) ";
        let (_, parsed) = body(8)(input).unwrap();
        match parsed {
            BodyStructure::Text { extension, .. } => {
                assert_eq!(extension.md5.as_deref(), Some("md5sum"));
                assert_eq!(extension.disposition, Some(("INLINE".into(), vec![])));
                assert_eq!(extension.language, vec!["en".to_string()]);
                assert_eq!(extension.location.as_deref(), Some("loc"));
                assert_eq!(extension.extensions, vec![BodyExtension::Number(7)]);
            }
            other => panic!("expected text part, got {other:?}"),
        }
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let mut input = Vec::new();
        for _ in 0..64 {
            input.extend_from_slice(b"(");
        }
        input.extend_from_slice(b"\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 5 1");
        assert!(body(8)(&input).is_err());
    }
}
