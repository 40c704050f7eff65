//! Command serialisation.
//!
//! Serialising a [`Command`] does not produce one flat byte string: a
//! synchronising literal must wait for a continuation request, IDLE parks
//! the connection, STARTTLS hands the stream to the TLS layer. The
//! encoder therefore yields a sequence of [`Fragment`]s and the session
//! walks them, pausing where the protocol demands it.

use std::collections::VecDeque;

use crate::types::command::{Command, PartKind};

/// One step of an encoded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Bytes that can go out immediately.
    Line { data: Vec<u8> },
    /// Literal payload. When `sync` is true the sender must first wait
    /// for a continuation request; with LITERAL+ the header already
    /// promised non-synchronising delivery.
    Literal { data: Vec<u8>, sync: bool },
    /// `IDLE` CRLF went out; wait for the continuation, then stay idle.
    AwaitIdle,
    /// `STARTTLS` CRLF went out; wait for the tagged OK, then upgrade the
    /// transport before reading on.
    AwaitTls,
}

/// An encoded command, iterable as fragments.
#[derive(Debug, Clone)]
pub struct Encoded {
    items: VecDeque<Fragment>,
}

impl Encoded {
    /// Concatenates the remaining fragments, ignoring the pauses. Only
    /// correct when nothing actually needs to pause, i.e. LITERAL+ is on
    /// and no marker parts are present.
    pub fn dump(self) -> Vec<u8> {
        let mut out = Vec::new();
        for fragment in self.items {
            match fragment {
                Fragment::Line { data } | Fragment::Literal { data, .. } => {
                    out.extend_from_slice(&data)
                }
                Fragment::AwaitIdle | Fragment::AwaitTls => {}
            }
        }
        out
    }
}

impl Iterator for Encoded {
    type Item = Fragment;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.pop_front()
    }
}

#[derive(Debug, Default)]
struct EncodeContext {
    accumulator: Vec<u8>,
    items: VecDeque<Fragment>,
}

impl EncodeContext {
    fn write(&mut self, bytes: &[u8]) {
        self.accumulator.extend_from_slice(bytes);
    }

    fn push_line(&mut self) {
        self.items.push_back(Fragment::Line {
            data: std::mem::take(&mut self.accumulator),
        });
    }

    fn push(&mut self, fragment: Fragment) {
        if !self.accumulator.is_empty() {
            self.push_line();
        }
        self.items.push_back(fragment);
    }

    fn into_encoded(mut self) -> Encoded {
        if !self.accumulator.is_empty() {
            self.push_line();
        }
        Encoded { items: self.items }
    }
}

/// Serialises a command into fragments.
///
/// `literal_plus` reflects whether the LITERAL+ capability is enabled on
/// the connection: literal headers then carry the `+` suffix and need no
/// continuation.
pub fn encode_command(command: &Command, literal_plus: bool) -> Encoded {
    let mut ctx = EncodeContext::default();
    ctx.write(command.tag.as_str().as_bytes());

    for part in &command.parts {
        ctx.write(b" ");
        match part.kind {
            PartKind::Atom => ctx.write(&part.data),
            PartKind::QuotedString => {
                ctx.write(b"\"");
                ctx.write(&part.data);
                ctx.write(b"\"");
            }
            PartKind::Literal => {
                if literal_plus {
                    ctx.write(format!("{{{}+}}\r\n", part.data.len()).as_bytes());
                } else {
                    ctx.write(format!("{{{}}}\r\n", part.data.len()).as_bytes());
                }
                ctx.push(Fragment::Literal {
                    data: part.data.clone(),
                    sync: !literal_plus,
                });
            }
            PartKind::Literal8 => {
                if literal_plus {
                    ctx.write(format!("~{{{}+}}\r\n", part.data.len()).as_bytes());
                } else {
                    ctx.write(format!("~{{{}}}\r\n", part.data.len()).as_bytes());
                }
                ctx.push(Fragment::Literal {
                    data: part.data.clone(),
                    sync: !literal_plus,
                });
            }
            PartKind::Idle => {
                ctx.write(b"IDLE\r\n");
                ctx.push(Fragment::AwaitIdle);
                return ctx.into_encoded();
            }
            PartKind::StartTls => {
                ctx.write(b"STARTTLS\r\n");
                ctx.push(Fragment::AwaitTls);
                return ctx.into_encoded();
            }
        }
    }

    ctx.write(b"\r\n");
    ctx.into_encoded()
}
