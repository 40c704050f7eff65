//! Serialise → re-tokenise round-trips for the command builders.
//!
//! With LITERAL+ enabled and no IDLE/STARTTLS markers, the serialisation
//! of any command is one contiguous byte string. Splitting it back into
//! tokens must reproduce the original part list, modulo atom case and
//! whitespace (an atom part may carry embedded spaces, e.g.
//! `(MESSAGES UIDNEXT)`, and comes back as several atoms).

use imap_engine::encode::encode_command;
use imap_engine::types::command::{self, Command, Part, PartKind};
use imap_engine::types::core::Tag;
use imap_engine::types::flag::Flag;
use imap_engine::types::response::StatusItem;
use imap_engine::types::sequence::Sequence;

/// A re-parsed wire token.
#[derive(Debug, PartialEq, Eq)]
struct Token {
    kind: PartKind,
    data: Vec<u8>,
}

/// Splits serialised command bytes (tag included) back into tokens.
fn tokenize(bytes: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = bytes;

    loop {
        while rest.first() == Some(&b' ') {
            rest = &rest[1..];
        }
        match rest.first().copied() {
            None => break,
            Some(b'\r') => {
                assert_eq!(rest, b"\r\n", "CRLF only at the very end");
                break;
            }
            Some(b'"') => {
                let close = rest[1..]
                    .iter()
                    .position(|&b| b == b'"')
                    .expect("closing quote");
                tokens.push(Token {
                    kind: PartKind::QuotedString,
                    data: rest[1..1 + close].to_vec(),
                });
                rest = &rest[close + 2..];
            }
            Some(b'{') | Some(b'~') => {
                let binary = rest[0] == b'~';
                if binary {
                    rest = &rest[1..];
                }
                let close = rest.iter().position(|&b| b == b'}').expect("closing brace");
                let mut digits = &rest[1..close];
                if digits.ends_with(b"+") {
                    digits = &digits[..digits.len() - 1];
                }
                let length: usize = std::str::from_utf8(digits).unwrap().parse().unwrap();
                assert_eq!(&rest[close + 1..close + 3], b"\r\n");
                let payload = &rest[close + 3..close + 3 + length];
                tokens.push(Token {
                    kind: if binary {
                        PartKind::Literal8
                    } else {
                        PartKind::Literal
                    },
                    data: payload.to_vec(),
                });
                rest = &rest[close + 3 + length..];
            }
            Some(_) => {
                let end = rest
                    .iter()
                    .position(|&b| b == b' ' || b == b'\r')
                    .unwrap_or(rest.len());
                tokens.push(Token {
                    kind: PartKind::Atom,
                    data: rest[..end].to_vec(),
                });
                rest = &rest[end..];
            }
        }
    }
    tokens
}

/// The expected token stream for a part list: the tag, then each part
/// with embedded-space atoms split apart.
fn normalize(tag: &Tag, parts: &[Part]) -> Vec<Token> {
    let mut expected = vec![Token {
        kind: PartKind::Atom,
        data: tag.as_str().as_bytes().to_vec(),
    }];
    for part in parts {
        match part.kind {
            PartKind::Atom => {
                for piece in part.data.split(|&b| b == b' ') {
                    expected.push(Token {
                        kind: PartKind::Atom,
                        data: piece.to_ascii_uppercase(),
                    });
                }
            }
            kind => expected.push(Token {
                kind,
                data: part.data.clone(),
            }),
        }
    }
    expected
}

fn assert_command_round_trip(parts: Vec<Part>) {
    let command = Command::new(Tag::from("y7"), parts);
    let bytes = encode_command(&command, true).dump();

    let mut got = tokenize(&bytes);
    for token in &mut got {
        if token.kind == PartKind::Atom {
            token.data = token.data.to_ascii_uppercase();
        }
    }
    let expected = normalize(&command.tag, &command.parts);
    assert_eq!(
        got, expected,
        "round trip diverged for {:?}",
        String::from_utf8_lossy(&bytes)
    );
}

#[test]
fn simple_commands() {
    assert_command_round_trip(command::capability());
    assert_command_round_trip(command::noop());
    assert_command_round_trip(command::logout());
    assert_command_round_trip(command::check());
    assert_command_round_trip(command::close());
    assert_command_round_trip(command::expunge());
    assert_command_round_trip(command::unselect());
    assert_command_round_trip(command::namespace());
}

#[test]
fn mailbox_commands() {
    assert_command_round_trip(command::select("INBOX"));
    assert_command_round_trip(command::examine("Archive/2024"));
    assert_command_round_trip(command::create("Sent Items"));
    assert_command_round_trip(command::rename("Old Name", "NewName"));
    assert_command_round_trip(command::list("", "%"));
    assert_command_round_trip(command::lsub("#news.", "comp.mail.*"));
    assert_command_round_trip(command::status(
        "blurdybloop",
        &[StatusItem::Messages, StatusItem::UidNext],
    ));
}

#[test]
fn credentials_fall_back_to_literals() {
    // The password forces a literal; LITERAL+ keeps it one byte string.
    assert_command_round_trip(command::login("alice", "pa\"ss\\word"));
    assert_command_round_trip(command::login("bob", "hunter2"));
}

#[test]
fn message_commands() {
    let seq: Sequence = "1:4,7".parse().unwrap();
    assert_command_round_trip(command::fetch(
        &seq,
        &["ENVELOPE".into(), "FLAGS".into(), "RFC822.SIZE".into()],
    ));
    assert_command_round_trip(command::store(&seq, "+FLAGS", "(\\Seen)"));
    assert_command_round_trip(command::copy(&seq, "Trash"));
    assert_command_round_trip(command::uid_fetch(&seq, &["BODYSTRUCTURE".into()]));
    assert_command_round_trip(command::uid_store(&seq, "-FLAGS", "(\\Draft)"));
    assert_command_round_trip(command::uid_copy(&seq, "Archive"));
    assert_command_round_trip(command::search(
        &["UNSEEN".into(), "SINCE".into(), "1-Feb-1994".into()],
        Some("UTF-8"),
    ));
    assert_command_round_trip(command::uid_search(&["ALL".into()], None));
}

#[test]
fn append_with_flags_and_literal() {
    assert_command_round_trip(command::append(
        "INBOX",
        b"From: a@b\r\n\r\nhello\r\n".to_vec(),
        &[Flag::Seen, Flag::Draft],
        None,
    ));
}

#[test]
fn append_with_nul_payload_round_trips_as_literal8() {
    let parts = command::append("INBOX", b"From: a@b\r\n\r\n\x00\x01\x02\r\n".to_vec(), &[], None);
    assert!(parts.iter().any(|part| part.kind == PartKind::Literal8));
    assert_command_round_trip(parts);
}

#[test]
fn extension_commands() {
    assert_command_round_trip(command::enable(&["CONDSTORE".into(), "QRESYNC".into()]));
    assert_command_round_trip(command::id(None));
    assert_command_round_trip(command::compress_deflate());
}
