//! End-to-end walks through the session and the tree model against a
//! scripted transport.

use std::io;

use imap_engine::cache::{Cache, NoCache};
use imap_engine::model::{Model, ModelEvent, MsgListProxy, NodeId};
use imap_engine::transport::Transport;
use imap_engine::types::response::Response;

/// A transport fed by the test body: reads come from a script buffer,
/// writes accumulate for assertions.
#[derive(Debug, Default)]
struct ScriptedTransport {
    inbound: Vec<u8>,
    outbound: Vec<u8>,
    dead: bool,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self::default()
    }

    fn server_sends(&mut self, bytes: &[u8]) {
        self.inbound.extend_from_slice(bytes);
    }

    fn written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

impl Transport for ScriptedTransport {
    fn read(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let take = max.min(self.inbound.len());
        Ok(self.inbound.drain(..take).collect())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.outbound.extend_from_slice(data);
        Ok(data.len())
    }

    fn start_tls(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn start_deflate(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn close(&mut self) {
        self.dead = true;
    }
}

fn drain_events<C: Cache>(model: &mut Model<ScriptedTransport, C>) -> Vec<ModelEvent> {
    let mut events = Vec::new();
    while let Some(event) = model.take_event() {
        events.push(event);
    }
    events
}

/// Drives the model through LIST → SELECT → UID enumeration and returns
/// the INBOX node.
fn populated_inbox(model: &mut Model<ScriptedTransport, NoCache>) -> NodeId {
    let root = model.root();
    model.load_mailboxes(root).unwrap();
    assert_eq!(
        model.session().transport_written(),
        b"y0 LIST \"\" \"%\"\r\n".to_vec()
    );

    model.session().feed(
        b"* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n\
          * LIST (\\Noselect \\HasChildren) \"/\" \"Work\"\r\n\
          y0 OK LIST done\r\n",
    );
    model.on_ready_read().unwrap();

    let events = drain_events(model);
    assert!(events.contains(&ModelEvent::ChildrenLoaded { parent: root }));
    assert_eq!(model.row_count(root), 2);

    let inbox = model.index(root, 0).unwrap();
    assert_eq!(model.tree().mailbox(inbox).unwrap().name, "INBOX");
    inbox
}

/// Selects the inbox and fills three messages with UIDs 100..=102.
fn selected_inbox(model: &mut Model<ScriptedTransport, NoCache>) -> NodeId {
    let inbox = populated_inbox(model);
    model.open_mailbox(inbox).unwrap();
    assert_eq!(
        model.session().transport_written(),
        b"y1 SELECT INBOX\r\n".to_vec()
    );

    model.session().feed(
        b"* 3 EXISTS\r\n\
          * 0 RECENT\r\n\
          * OK [UIDVALIDITY 17] UIDs valid\r\n\
          * OK [UIDNEXT 103] next\r\n\
          y1 OK [READ-WRITE] SELECT done\r\n",
    );
    model.on_ready_read().unwrap();
    assert_eq!(
        model.session().transport_written(),
        b"y2 FETCH 1:3 (UID)\r\n".to_vec()
    );

    model.session().feed(
        b"* 1 FETCH (UID 100)\r\n\
          * 2 FETCH (UID 101)\r\n\
          * 3 FETCH (UID 102)\r\n\
          y2 OK FETCH done\r\n",
    );
    model.on_ready_read().unwrap();

    let events = drain_events(model);
    assert!(events.contains(&ModelEvent::MessageListLoaded { mailbox: inbox }));
    inbox
}

trait SessionTestExt {
    fn transport_written(&mut self) -> Vec<u8>;
    fn feed(&mut self, bytes: &[u8]);
}

impl SessionTestExt for imap_engine::Session<ScriptedTransport> {
    fn transport_written(&mut self) -> Vec<u8> {
        self.transport_mut().written()
    }

    fn feed(&mut self, bytes: &[u8]) {
        self.transport_mut().server_sends(bytes);
    }
}

#[test]
fn framer_reassembles_a_fetch_with_literal() {
    let mut session = imap_engine::Session::new(ScriptedTransport::new());
    session
        .transport_mut()
        .server_sends(b"* 1 FETCH (RFC822.HEADER {5}\r\nabcde)\r\n");
    session.on_ready_read().unwrap();

    match session.get_response() {
        Some(Response::Fetch(fetch)) => {
            assert_eq!(fetch.payload(b"RFC822.HEADER"), Some(&b"abcde"[..]));
        }
        other => panic!("expected one fetch, got {other:?}"),
    }
    assert!(session.get_response().is_none());
}

#[test]
fn sync_literal_blocks_until_continuation() {
    let mut session = imap_engine::Session::new(ScriptedTransport::new());
    session.append("Drafts", b"draft".to_vec(), &[], None).unwrap();
    assert_eq!(
        session.transport_mut().written(),
        b"y0 APPEND Drafts {5}\r\n".to_vec()
    );

    session.transport_mut().server_sends(b"+ go ahead\r\n");
    session.on_ready_read().unwrap();
    assert_eq!(session.transport_mut().written(), b"draft\r\n".to_vec());
}

#[test]
fn mailbox_listing_and_attributes() {
    let mut model = Model::new(ScriptedTransport::new(), NoCache::new());
    let inbox = populated_inbox(&mut model);
    let root = model.root();
    let work = model.index(root, 1).unwrap();

    assert_eq!(model.has_child_mailboxes(inbox), Some(false));
    assert_eq!(model.has_child_mailboxes(work), Some(true));

    // \Noselect: the message list is permanently fetched, opening fails.
    let work_list = model.tree().mailbox(work).unwrap().message_list;
    assert!(model.tree().node(work_list).fetched);
    assert!(model.open_mailbox(work).is_err());
}

#[test]
fn select_sizes_list_and_fills_uids() {
    let mut model = Model::new(ScriptedTransport::new(), NoCache::new());
    let inbox = selected_inbox(&mut model);
    let list = model.tree().mailbox(inbox).unwrap().message_list;

    assert_eq!(model.tree().node(list).children.len(), 3);
    for (row, expected_uid) in [(0usize, 100u32), (1, 101), (2, 102)] {
        let slot = model.tree().node(list).children[row];
        assert_eq!(model.tree().message(slot).unwrap().uid, Some(expected_uid));
    }
    assert_eq!(model.cache().uid_validity(), 17);
    assert_eq!(model.cache().uid_next(), 103);
    assert_eq!(model.cache().exists(), 3);
    assert_eq!(model.cache().seq_to_uid(2), Some(101));
}

#[test]
fn expunge_removes_and_shifts() {
    let mut model = Model::new(ScriptedTransport::new(), NoCache::new());
    let inbox = selected_inbox(&mut model);
    let list = model.tree().mailbox(inbox).unwrap().message_list;
    let before: Vec<_> = model.tree().node(list).children.clone();

    model.session().feed(b"* 2 EXPUNGE\r\n");
    model.on_ready_read().unwrap();

    let after: Vec<_> = model.tree().node(list).children.clone();
    assert_eq!(after.len(), before.len() - 1);
    // Every slot at or above the removed row equals the old next slot.
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[2]);
    assert_eq!(model.cache().exists(), 2);
    // The shifted map was thrown away.
    assert_eq!(model.cache().seq_to_uid(1), None);

    let events = drain_events(&mut model);
    assert!(events.contains(&ModelEvent::RowsRemoved { list, row: 1 }));
}

#[test]
fn exists_resizes_with_unfetched_slots() {
    let mut model = Model::new(ScriptedTransport::new(), NoCache::new());
    let inbox = selected_inbox(&mut model);
    let list = model.tree().mailbox(inbox).unwrap().message_list;

    model.session().feed(b"* 5 EXISTS\r\n");
    model.on_ready_read().unwrap();

    assert_eq!(model.tree().node(list).children.len(), 5);
    let fresh = model.tree().node(list).children[4];
    assert!(model.tree().node(fresh).needs_fetch());
    assert_eq!(model.tree().message(fresh).unwrap().uid, None);

    let events = drain_events(&mut model);
    assert!(events.contains(&ModelEvent::RowsInserted {
        list,
        first: 3,
        count: 2
    }));
}

#[test]
fn message_metadata_flows_into_the_slot() {
    let mut model = Model::new(ScriptedTransport::new(), NoCache::new());
    let inbox = selected_inbox(&mut model);
    let list = model.tree().mailbox(inbox).unwrap().message_list;
    let first = model.tree().node(list).children[0];

    model.load_message_metadata(first).unwrap();
    assert_eq!(
        model.session().transport_written(),
        b"y3 FETCH 1 (ENVELOPE FLAGS RFC822.SIZE INTERNALDATE)\r\n".to_vec()
    );

    model.session().feed(
        b"* 1 FETCH (ENVELOPE (NIL \"hello\" NIL NIL NIL NIL NIL NIL NIL NIL) \
          FLAGS (\\Seen) RFC822.SIZE 2000 INTERNALDATE \"17-Jul-1996 02:44:25 -0700\")\r\n\
          y3 OK FETCH done\r\n",
    );
    model.on_ready_read().unwrap();

    let message = model.tree().message(first).unwrap();
    assert_eq!(
        message.envelope.as_ref().unwrap().subject.as_deref(),
        Some("hello")
    );
    assert_eq!(message.size, Some(2000));
    assert!(model.tree().node(first).fetched);

    let events = drain_events(&mut model);
    assert!(events.contains(&ModelEvent::MessageChanged { list, row: 0 }));
}

#[test]
fn body_structure_and_part_payload() {
    let mut model = Model::new(ScriptedTransport::new(), NoCache::new());
    let inbox = selected_inbox(&mut model);
    let list = model.tree().mailbox(inbox).unwrap().message_list;
    let first = model.tree().node(list).children[0];

    model.load_body_structure(first).unwrap();
    assert_eq!(
        model.session().transport_written(),
        b"y3 FETCH 1 (BODYSTRUCTURE)\r\n".to_vec()
    );
    model.session().feed(
        b"* 1 FETCH (BODYSTRUCTURE ((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1)\
          (\"TEXT\" \"HTML\" NIL NIL NIL \"7BIT\" 20 1) \"ALTERNATIVE\"))\r\n\
          y3 OK FETCH done\r\n",
    );
    model.on_ready_read().unwrap();

    let plain = model.tree().find_part(first, "1").unwrap();
    assert_eq!(model.tree().part(plain).unwrap().media_subtype, "PLAIN");

    model.load_part(plain).unwrap();
    assert_eq!(
        model.session().transport_written(),
        b"y4 FETCH 1 (BODY[1])\r\n".to_vec()
    );
    model.session().feed(b"* 1 FETCH (BODY[1] {2}\r\nhi)\r\ny4 OK done\r\n");
    model.on_ready_read().unwrap();

    assert_eq!(
        model.tree().part(plain).unwrap().data.as_deref(),
        Some(&b"hi"[..])
    );
    assert!(model.tree().node(plain).fetched);
}

#[test]
fn fetch_for_unsized_list_is_fatal() {
    let mut model = Model::new(ScriptedTransport::new(), NoCache::new());
    let inbox = populated_inbox(&mut model);
    model.open_mailbox(inbox).unwrap();
    model.session().transport_written();

    // FETCH before any EXISTS sized the list.
    model.session().feed(b"* 9 FETCH (UID 1)\r\n");
    model.on_ready_read().unwrap();

    let events = drain_events(&mut model);
    assert!(events
        .iter()
        .any(|event| matches!(event, ModelEvent::Disconnected { .. })));
}

#[test]
fn proxy_resets_when_rebound() {
    let mut model = Model::new(ScriptedTransport::new(), NoCache::new());
    let inbox = selected_inbox(&mut model);

    let mut proxy = MsgListProxy::new();
    assert_eq!(proxy.row_count(&model), 0);

    proxy.set_mailbox(&mut model, inbox);
    assert_eq!(
        proxy.take_event(),
        Some(imap_engine::model::MsgListEvent::Reset)
    );
    assert_eq!(proxy.row_count(&model), 3);
    assert!(proxy.message_state(&model, 0).is_some());
    assert!(proxy.message_at(&model, 3).is_none());
}
