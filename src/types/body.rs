//! The BODYSTRUCTURE tree of RFC 3501 sections 7.4.2 / 9.

use std::fmt;

use crate::types::core::escape_quoted;
use crate::types::envelope::Envelope;

/// Fields shared by every one-part body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasicFields {
    /// `("name" "value" ...)` parameter pairs.
    pub parameters: Vec<(String, String)>,
    pub content_id: Option<String>,
    pub description: Option<String>,
    /// Content transfer encoding (`7BIT`, `BASE64`, ...).
    pub encoding: String,
    /// Size in octets.
    pub octets: u32,
}

/// The optional extension fields of a one-part body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartExtension {
    pub md5: Option<String>,
    /// `(disposition-type (param pairs))`.
    pub disposition: Option<(String, Vec<(String, String)>)>,
    pub language: Vec<String>,
    pub location: Option<String>,
    /// Open-ended future expansion values.
    pub extensions: Vec<BodyExtension>,
}

impl PartExtension {
    pub fn is_empty(&self) -> bool {
        self.md5.is_none()
            && self.disposition.is_none()
            && self.language.is_empty()
            && self.location.is_none()
            && self.extensions.is_empty()
    }
}

/// `body-extension`: nstring, number, or a nested list thereof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyExtension {
    Text(Option<String>),
    Number(u32),
    List(Vec<BodyExtension>),
}

/// A node of the MIME tree returned by `FETCH BODYSTRUCTURE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyStructure {
    /// Any one-part body that is neither text nor message/rfc822.
    Basic {
        media_type: String,
        media_subtype: String,
        fields: BasicFields,
        extension: PartExtension,
    },
    /// `text/*`; carries a line count.
    Text {
        media_subtype: String,
        fields: BasicFields,
        lines: u32,
        extension: PartExtension,
    },
    /// `message/rfc822`; carries the nested message's envelope and body.
    Message {
        fields: BasicFields,
        envelope: Box<Envelope>,
        body: Box<BodyStructure>,
        lines: u32,
        extension: PartExtension,
    },
    /// `multipart/*`; an ordered list of children.
    Multipart {
        parts: Vec<BodyStructure>,
        media_subtype: String,
        /// Parameter pairs from the multipart extension data.
        parameters: Vec<(String, String)>,
        extension: PartExtension,
    },
}

impl BodyStructure {
    /// Media type/subtype of this node, multiparts included.
    pub fn media(&self) -> (String, String) {
        match self {
            BodyStructure::Basic {
                media_type,
                media_subtype,
                ..
            } => (media_type.clone(), media_subtype.clone()),
            BodyStructure::Text { media_subtype, .. } => ("text".into(), media_subtype.clone()),
            BodyStructure::Message { .. } => ("message".into(), "rfc822".into()),
            BodyStructure::Multipart { media_subtype, .. } => {
                ("multipart".into(), media_subtype.clone())
            }
        }
    }

    /// Children of this node: the parts of a multipart, the nested body of
    /// a message/rfc822, nothing otherwise.
    pub fn children(&self) -> &[BodyStructure] {
        match self {
            BodyStructure::Multipart { parts, .. } => parts,
            BodyStructure::Message { body, .. } => std::slice::from_ref(body),
            _ => &[],
        }
    }
}

fn nstring(f: &mut fmt::Formatter<'_>, value: &Option<String>) -> fmt::Result {
    match value {
        Some(v) => write!(f, "\"{}\"", escape_quoted(v)),
        None => f.write_str("NIL"),
    }
}

fn parameter_list(f: &mut fmt::Formatter<'_>, pairs: &[(String, String)]) -> fmt::Result {
    if pairs.is_empty() {
        return f.write_str("NIL");
    }
    f.write_str("(")?;
    for (i, (key, value)) in pairs.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(
            f,
            "\"{}\" \"{}\"",
            escape_quoted(key),
            escape_quoted(value)
        )?;
    }
    f.write_str(")")
}

impl fmt::Display for BodyExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyExtension::Text(value) => nstring(f, value),
            BodyExtension::Number(n) => write!(f, "{n}"),
            BodyExtension::List(items) => {
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

impl fmt::Display for BasicFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        parameter_list(f, &self.parameters)?;
        f.write_str(" ")?;
        nstring(f, &self.content_id)?;
        f.write_str(" ")?;
        nstring(f, &self.description)?;
        write!(f, " \"{}\" {}", escape_quoted(&self.encoding), self.octets)
    }
}

impl PartExtension {
    fn fmt_tail(&self, f: &mut fmt::Formatter<'_>, with_md5: bool) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        if with_md5 {
            f.write_str(" ")?;
            nstring(f, &self.md5)?;
        }
        f.write_str(" ")?;
        match &self.disposition {
            None => f.write_str("NIL")?,
            Some((kind, params)) => {
                write!(f, "(\"{}\" ", escape_quoted(kind))?;
                parameter_list(f, params)?;
                f.write_str(")")?;
            }
        }
        f.write_str(" ")?;
        match self.language.len() {
            0 => f.write_str("NIL")?,
            1 => write!(f, "\"{}\"", escape_quoted(&self.language[0]))?,
            _ => {
                f.write_str("(")?;
                for (i, lang) in self.language.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "\"{}\"", escape_quoted(lang))?;
                }
                f.write_str(")")?;
            }
        }
        f.write_str(" ")?;
        nstring(f, &self.location)?;
        for extension in &self.extensions {
            write!(f, " {extension}")?;
        }
        Ok(())
    }
}

impl fmt::Display for BodyStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        match self {
            BodyStructure::Basic {
                media_type,
                media_subtype,
                fields,
                extension,
            } => {
                write!(
                    f,
                    "\"{}\" \"{}\" {fields}",
                    escape_quoted(media_type),
                    escape_quoted(media_subtype)
                )?;
                extension.fmt_tail(f, true)?;
            }
            BodyStructure::Text {
                media_subtype,
                fields,
                lines,
                extension,
            } => {
                write!(
                    f,
                    "\"TEXT\" \"{}\" {fields} {lines}",
                    escape_quoted(media_subtype)
                )?;
                extension.fmt_tail(f, true)?;
            }
            BodyStructure::Message {
                fields,
                envelope,
                body,
                lines,
                extension,
            } => {
                write!(f, "\"MESSAGE\" \"RFC822\" {fields} {envelope} {body} {lines}")?;
                extension.fmt_tail(f, true)?;
            }
            BodyStructure::Multipart {
                parts,
                media_subtype,
                parameters,
                extension,
            } => {
                for part in parts {
                    write!(f, "{part}")?;
                }
                write!(f, " \"{}\"", escape_quoted(media_subtype))?;
                if !parameters.is_empty() || !extension.is_empty() {
                    f.write_str(" ")?;
                    parameter_list(f, parameters)?;
                    extension.fmt_tail(f, false)?;
                }
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_part_prints_canonically() {
        let part = BodyStructure::Text {
            media_subtype: "PLAIN".into(),
            fields: BasicFields {
                parameters: vec![("CHARSET".into(), "US-ASCII".into())],
                content_id: None,
                description: None,
                encoding: "7BIT".into(),
                octets: 2279,
            },
            lines: 48,
            extension: PartExtension::default(),
        };
        assert_eq!(
            part.to_string(),
            "(\"TEXT\" \"PLAIN\" (\"CHARSET\" \"US-ASCII\") NIL NIL \"7BIT\" 2279 48)"
        );
    }

    #[test]
    fn multipart_concatenates_children() {
        let child = |subtype: &str| BodyStructure::Text {
            media_subtype: subtype.into(),
            fields: BasicFields {
                encoding: "7BIT".into(),
                octets: 1,
                ..BasicFields::default()
            },
            lines: 1,
            extension: PartExtension::default(),
        };
        let multi = BodyStructure::Multipart {
            parts: vec![child("PLAIN"), child("HTML")],
            media_subtype: "ALTERNATIVE".into(),
            parameters: vec![],
            extension: PartExtension::default(),
        };
        let text = multi.to_string();
        assert!(text.starts_with("((\"TEXT\" \"PLAIN\""));
        assert!(text.ends_with(" \"ALTERNATIVE\")"));
        assert_eq!(multi.media().0, "multipart");
    }
}
