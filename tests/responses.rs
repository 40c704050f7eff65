//! Known-answer tests for the response grammar, plus the print/parse
//! round-trip properties.

use chrono::{TimeZone, Utc};
use imap_engine::parse::{parse_response, parse_tagged, parse_untagged};
use imap_engine::types::core::Tag;
use imap_engine::types::flag::NameAttribute;
use imap_engine::types::response::{
    Code, ESearchItem, ESearchResponse, FetchItem, ListResponse, NumberKind, NumberResponse,
    Response, State, StateKind, StatusItem, StatusResponse,
};
use imap_engine::types::sequence::Sequence;

/// Parses a line, prints it canonically, re-parses, and insists both
/// passes agree.
fn assert_round_trip(line: &[u8]) -> Response {
    let first = parse_response(line).unwrap_or_else(|err| panic!("first parse failed: {err}"));
    let printed = format!("{first}\r\n");
    let second = parse_response(printed.as_bytes())
        .unwrap_or_else(|err| panic!("re-parse of {printed:?} failed: {err}"));
    assert_eq!(first, second, "canonical print changed the value");
    first
}

#[test]
fn exists_scenario() {
    let parsed = assert_round_trip(b"* 3 EXISTS\r\n");
    assert_eq!(
        parsed,
        Response::Number(NumberResponse {
            kind: NumberKind::Exists,
            number: 3
        })
    );
}

#[test]
fn list_scenario() {
    let parsed = assert_round_trip(b"* LIST (\\Noselect) \".\" \"\"\r\n");
    assert_eq!(
        parsed,
        Response::List(ListResponse {
            lsub: false,
            attributes: vec![NameAttribute::Noselect],
            separator: Some('.'),
            name: String::new(),
            extended: vec![],
        })
    );
}

#[test]
fn status_scenario() {
    let parsed = assert_round_trip(b"* STATUS blurdybloop (MESSAGES 231 UIDNEXT 44292)\r\n");
    assert_eq!(
        parsed,
        Response::Status(StatusResponse {
            mailbox: "blurdybloop".into(),
            items: vec![(StatusItem::Messages, 231), (StatusItem::UidNext, 44292)],
        })
    );
}

#[test]
fn fetch_scenario() {
    let parsed = assert_round_trip(b"* 12 FETCH (UID 666 RFC822.SIZE 1337)\r\n");
    match parsed {
        Response::Fetch(fetch) => {
            assert_eq!(fetch.seq, 12);
            assert_eq!(fetch.uid(), Some(666));
            assert_eq!(fetch.size(), Some(1337));
        }
        other => panic!("expected fetch, got {other:?}"),
    }
}

#[test]
fn internaldate_scenario() {
    let parsed = assert_round_trip(b"* 13 FETCH (INTERNALDATE \"6-Apr-1981 12:03:32 -0630\")\r\n");
    match parsed {
        Response::Fetch(fetch) => {
            assert_eq!(
                fetch.internal_date().unwrap().with_timezone(&Utc),
                Utc.with_ymd_and_hms(1981, 4, 6, 18, 33, 32).unwrap()
            );
        }
        other => panic!("expected fetch, got {other:?}"),
    }
}

#[test]
fn esearch_addto_scenario() {
    let parsed = assert_round_trip(b"* ESEARCH (TAG \"C01\") UID ADDTO (1 2731:2733)\r\n");
    assert_eq!(
        parsed,
        Response::ESearch(ESearchResponse {
            tag: Some("C01".into()),
            uid: true,
            items: vec![ESearchItem::Incremental {
                label: "ADDTO".into(),
                updates: vec![(1, Sequence::range(2731, 2733))],
            }],
        })
    );
}

#[test]
fn tagged_uidvalidity_scenario() {
    let parsed = assert_round_trip(b"y01 OK [UIDVALIDITY 17] UIDs valid\r\n");
    assert_eq!(
        parsed,
        Response::State(State {
            tag: Some(Tag::from("y01")),
            kind: StateKind::Ok,
            code: Some(Code::UidValidity(17)),
            message: "UIDs valid".into(),
        })
    );
}

#[test]
fn sequence_collapse_scenario() {
    let mut seq = Sequence::single(2);
    for n in [3, 4, 6, 7, 1, 99, 100, 101, 102, 333, 666] {
        seq.add(n).unwrap();
    }
    assert_eq!(seq.to_string(), "1:4,6:7,99:102,333,666");

    // Parsing the serialisation gives a set equal to the original.
    let reparsed: Sequence = seq.to_string().parse().unwrap();
    assert_eq!(reparsed, seq);
}

#[test]
fn more_round_trips() {
    // One representative line per response kind that carries data.
    let lines: &[&[u8]] = &[
        b"* CAPABILITY IMAP4rev1 LITERAL+ IDLE AUTH=PLAIN\r\n",
        b"* LSUB (\\Marked) \"/\" \"Lists/A\"\r\n",
        b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n",
        b"* SEARCH 2 84 882\r\n",
        b"* SORT 5 3 4 1 2\r\n",
        b"* THREAD (166)(167)(168 169)\r\n",
        b"* NAMESPACE ((\"\" \"/\")) NIL ((\"shared/\" \"/\"))\r\n",
        b"* ENABLED CONDSTORE QRESYNC\r\n",
        b"* VANISHED (EARLIER) 300:310,405\r\n",
        b"* ID (\"name\" \"Cyrus\" \"version\" \"1.5\")\r\n",
        b"* ID NIL\r\n",
        b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n",
        b"* OK [HIGHESTMODSEQ 715194045007] Ok\r\n",
        b"* NO [ALERT] System shutdown in 10 minutes\r\n",
        b"* BYE Autologout; idle for too long\r\n",
        b"a047 OK [READ-WRITE] SELECT completed\r\n",
        b"A003 OK [APPENDUID 38505 3955] APPEND completed\r\n",
        b"A004 OK [COPYUID 38505 304,319:320 3956:3958] Done\r\n",
        b"* 44 EXPUNGE\r\n",
        b"* 5 RECENT\r\n",
    ];
    for line in lines {
        assert_round_trip(line);
    }
}

#[test]
fn fetch_round_trips_with_structures() {
    let parsed = assert_round_trip(
        b"* 7 FETCH (FLAGS (\\Seen) ENVELOPE (\"Mon, 7 Feb 1994 21:52:25 -0800\" \"Hi\" ((\"A\" NIL \"a\" \"h.example\")) ((\"A\" NIL \"a\" \"h.example\")) ((\"A\" NIL \"a\" \"h.example\")) ((\"B\" NIL \"b\" \"x.example\")) NIL NIL NIL \"<m1@h.example>\") BODYSTRUCTURE (\"TEXT\" \"PLAIN\" (\"CHARSET\" \"US-ASCII\") NIL NIL \"7BIT\" 3028 92))\r\n",
    );
    match parsed {
        Response::Fetch(fetch) => {
            let envelope = fetch.envelope().unwrap();
            assert_eq!(envelope.subject.as_deref(), Some("Hi"));
            assert_eq!(envelope.to[0].host.as_deref(), Some("x.example"));
            assert!(fetch.body_structure().is_some());
        }
        other => panic!("expected fetch, got {other:?}"),
    }
}

#[test]
fn fetch_literal_payload_round_trips() {
    let parsed = assert_round_trip(b"* 1 FETCH (RFC822.HEADER {5}\r\nabcde)\r\n");
    match parsed {
        Response::Fetch(fetch) => {
            assert_eq!(fetch.payload(b"RFC822.HEADER"), Some(&b"abcde"[..]));
        }
        other => panic!("expected fetch, got {other:?}"),
    }
}

#[test]
fn date_strings_keep_their_instant() {
    // Conformant servers pad the day; the instant must survive a parse →
    // print → parse cycle either way.
    for (line, expected) in [
        (
            b"* 1 FETCH (INTERNALDATE \"17-Jul-1996 02:44:25 -0700\")\r\n".as_slice(),
            Utc.with_ymd_and_hms(1996, 7, 17, 9, 44, 25).unwrap(),
        ),
        (
            b"* 1 FETCH (INTERNALDATE \" 6-Apr-1981 12:03:32 -0630\")\r\n".as_slice(),
            Utc.with_ymd_and_hms(1981, 4, 6, 18, 33, 32).unwrap(),
        ),
        (
            b"* 1 FETCH (INTERNALDATE \"01-Jan-2000 01:00:00 +0100\")\r\n".as_slice(),
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
        ),
    ] {
        let parsed = assert_round_trip(line);
        match parsed {
            Response::Fetch(fetch) => {
                assert_eq!(fetch.internal_date().unwrap().with_timezone(&Utc), expected);
            }
            other => panic!("expected fetch, got {other:?}"),
        }
    }
}

#[test]
fn untagged_vs_tagged_dispatch() {
    assert!(matches!(
        parse_untagged(b"* OK ready\r\n").unwrap(),
        Response::State(State { tag: None, .. })
    ));
    assert!(matches!(
        parse_tagged(b"y9 NO nope\r\n").unwrap(),
        Response::State(State {
            kind: StateKind::No,
            ..
        })
    ));

    let item_list: Vec<FetchItem> = match parse_untagged(b"* 2 FETCH (UID 4)\r\n").unwrap() {
        Response::Fetch(fetch) => fetch.items,
        other => panic!("expected fetch, got {other:?}"),
    };
    assert_eq!(item_list, vec![FetchItem::Uid(4)]);
}
