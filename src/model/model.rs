//! The observable view-model tying the session to the mailbox tree.
//!
//! UI layers talk to the [`Model`]: they ask nodes for their children and
//! call the `load_*` methods when a node reports stale children. The
//! model translates those requests into protocol commands, applies the
//! responses to the tree and emits [`ModelEvent`]s for the observers to
//! drain.

use std::collections::{HashMap, VecDeque};

use crate::cache::Cache;
use crate::error::Error;
use crate::model::tree::{MessageState, NodeId, Payload, Tree};
use crate::session::{Session, SessionEvent};
use crate::transport::Transport;
use crate::types::core::Tag;
use crate::types::flag::NameAttribute;
use crate::types::response::{
    Code, FetchItem, FetchResponse, ListResponse, NumberKind, Response, State, StateKind,
};
use crate::types::sequence::Sequence;

/// Change notification for observers. Row numbers refer to the moment of
/// emission; observers must process events in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// A mailbox's child-mailbox list is now current.
    ChildrenLoaded { parent: NodeId },
    /// A mailbox's message list finished loading (sized and UID-mapped).
    MessageListLoaded { mailbox: NodeId },
    RowsInserted { list: NodeId, first: usize, count: usize },
    RowsRemoved { list: NodeId, row: usize },
    MessageChanged { list: NodeId, row: usize },
    /// A scheduled command came back NO/BAD.
    CommandFailed { message: String },
    /// The server flagged something for the user (`[ALERT]`).
    Alert { message: String },
    Disconnected { reason: String },
}

/// What an in-flight tagged command was for.
#[derive(Debug)]
enum Task {
    ListChildren { parent: NodeId },
    Select { mailbox: NodeId },
    FetchUids { mailbox: NodeId },
    FetchMetadata { message: NodeId },
    FetchStructure { message: NodeId },
    FetchPart { part: NodeId },
}

/// Response codes gathered between issuing SELECT and its completion.
#[derive(Debug, Default, Clone, Copy)]
struct SelectCodes {
    uid_validity: Option<u32>,
    uid_next: Option<u32>,
}

pub struct Model<T: Transport, C: Cache> {
    session: Session<T>,
    cache: C,
    tree: Tree,
    root: NodeId,
    /// The mailbox whose message list untagged EXISTS/EXPUNGE/FETCH apply
    /// to.
    selected: Option<NodeId>,
    pending: HashMap<Tag, Task>,
    /// LIST lines staged until their tagged completion attributes them.
    staged_lists: Vec<ListResponse>,
    select_codes: SelectCodes,
    events: VecDeque<ModelEvent>,
}

impl<T: Transport, C: Cache> Model<T, C> {
    pub fn new(transport: T, cache: C) -> Self {
        let (tree, root) = Tree::new();
        Model {
            session: Session::new(transport),
            cache,
            tree,
            root,
            selected: None,
            pending: HashMap::new(),
            staged_lists: Vec::new(),
            select_codes: SelectCodes::default(),
            events: VecDeque::new(),
        }
    }

    // ----- driver hooks -----

    /// Pumps the transport and applies everything that arrived.
    pub fn on_ready_read(&mut self) -> Result<(), Error> {
        self.session.on_ready_read()?;
        self.process();
        Ok(())
    }

    pub fn tick(&mut self, now: std::time::Instant) {
        self.session.tick(now);
        self.process();
    }

    /// Direct access to the protocol session, for commands the model does
    /// not mediate (LOGIN, IDLE, administration).
    pub fn session(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn take_event(&mut self) -> Option<ModelEvent> {
        self.events.pop_front()
    }

    // ----- index abstraction -----

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Number of child mailboxes under `parent` (the account root or a
    /// mailbox).
    pub fn row_count(&self, parent: NodeId) -> usize {
        self.tree.node(parent).children.len()
    }

    pub fn index(&self, parent: NodeId, row: usize) -> Option<NodeId> {
        self.tree.node(parent).children.get(row).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree.node(id).parent
    }

    /// Answered from attributes when possible: `\Noinferiors` and
    /// `\HasNoChildren` mean no, `\HasChildren` means yes, otherwise the
    /// children must be listed first (`None`).
    pub fn has_child_mailboxes(&self, mailbox: NodeId) -> Option<bool> {
        let state = self.tree.mailbox(mailbox)?;
        if state.attributes.contains(&NameAttribute::Noinferiors)
            || state.attributes.contains(&NameAttribute::HasNoChildren)
        {
            return Some(false);
        }
        if state.attributes.contains(&NameAttribute::HasChildren) {
            return Some(true);
        }
        let node = self.tree.node(mailbox);
        if node.fetched {
            Some(!node.children.is_empty())
        } else {
            None
        }
    }

    // ----- fetch requests -----

    /// Requests the child mailboxes of the account root or a mailbox.
    /// No-op while current or already in flight.
    pub fn load_mailboxes(&mut self, parent: NodeId) -> Result<(), Error> {
        if !self.tree.node(parent).needs_fetch() {
            return Ok(());
        }
        let pattern = match &self.tree.node(parent).payload {
            Payload::AccountRoot => "%".to_string(),
            Payload::Mailbox(state) => {
                format!("{}{}%", state.name, state.separator.unwrap_or('.'))
            }
            _ => {
                return Err(Error::InvalidArgument(
                    "mailboxes can only be listed under the root or a mailbox".to_string(),
                ))
            }
        };
        let tag = self.session.list("", &pattern)?;
        self.tree.node_mut(parent).set_loading();
        self.pending.insert(tag, Task::ListChildren { parent });
        Ok(())
    }

    /// Selects a mailbox and starts populating its message list. The
    /// EXISTS reply sizes the list; UIDs follow from cache or a
    /// `FETCH 1:n UID`.
    pub fn open_mailbox(&mut self, mailbox: NodeId) -> Result<(), Error> {
        let state = self
            .tree
            .mailbox(mailbox)
            .ok_or_else(|| Error::InvalidArgument("not a mailbox node".to_string()))?;
        if state.attributes.contains(&NameAttribute::Noselect) {
            return Err(Error::InvalidArgument(format!(
                "{} is \\Noselect",
                state.name
            )));
        }
        let list = state.message_list;
        if !self.tree.node(list).needs_fetch() {
            return Ok(());
        }
        let name = state.name.clone();
        let tag = self.session.select(&name)?;
        self.selected = Some(mailbox);
        self.select_codes = SelectCodes::default();
        self.tree.node_mut(list).set_loading();
        self.pending.insert(tag, Task::Select { mailbox });
        Ok(())
    }

    /// Requests envelope, flags, size and internal date of one message.
    pub fn load_message_metadata(&mut self, message: NodeId) -> Result<(), Error> {
        if !self.tree.node(message).needs_fetch() {
            return Ok(());
        }
        let seq = self
            .sequence_of(message)
            .ok_or_else(|| Error::InvalidArgument("message is not in a list".to_string()))?;
        let items = ["ENVELOPE", "FLAGS", "RFC822.SIZE", "INTERNALDATE"]
            .map(String::from)
            .to_vec();
        let tag = self.session.fetch(&Sequence::single(seq), &items)?;
        self.tree.node_mut(message).set_loading();
        self.pending.insert(tag, Task::FetchMetadata { message });
        Ok(())
    }

    /// Requests the MIME tree of one message.
    pub fn load_body_structure(&mut self, message: NodeId) -> Result<(), Error> {
        if self
            .tree
            .message(message)
            .map_or(false, |state| state.body.is_some())
        {
            return Ok(());
        }
        let seq = self
            .sequence_of(message)
            .ok_or_else(|| Error::InvalidArgument("message is not in a list".to_string()))?;
        let tag = self
            .session
            .fetch(&Sequence::single(seq), &["BODYSTRUCTURE".to_string()])?;
        self.pending.insert(tag, Task::FetchStructure { message });
        Ok(())
    }

    /// Requests the raw bytes of one body part.
    pub fn load_part(&mut self, part: NodeId) -> Result<(), Error> {
        let path = self
            .tree
            .part(part)
            .ok_or_else(|| Error::InvalidArgument("not a body part node".to_string()))?
            .path
            .clone();
        let message = self.message_of_part(part).ok_or_else(|| {
            Error::InvalidArgument("body part is not attached to a message".to_string())
        })?;
        let seq = self
            .sequence_of(message)
            .ok_or_else(|| Error::InvalidArgument("message is not in a list".to_string()))?;
        let tag = self
            .session
            .fetch(&Sequence::single(seq), &[format!("BODY[{path}]")])?;
        self.tree.node_mut(part).set_loading();
        self.pending.insert(tag, Task::FetchPart { part });
        Ok(())
    }

    // ----- response application -----

    /// Drains the session queues into tree mutations and events. Applying
    /// a response can itself tear the session down, so both queues drain
    /// until quiet.
    pub fn process(&mut self) {
        loop {
            let mut progressed = false;
            while let Some(event) = self.session.poll_event() {
                progressed = true;
                match event {
                    SessionEvent::Disconnected { reason } => {
                        self.pending.clear();
                        self.events.push_back(ModelEvent::Disconnected { reason });
                    }
                    SessionEvent::IdleStarted => {}
                }
            }
            while let Some(response) = self.session.get_response() {
                progressed = true;
                self.apply(response);
            }
            if !progressed {
                break;
            }
        }
    }

    fn apply(&mut self, response: Response) {
        match response {
            Response::State(state) => self.apply_state(state),
            Response::Number(number) => match number.kind {
                NumberKind::Exists => self.apply_exists(number.number),
                NumberKind::Expunge => self.apply_expunge(number.number),
                NumberKind::Recent => {}
            },
            Response::List(list) => self.staged_lists.push(list),
            Response::Fetch(fetch) => self.apply_fetch(fetch),
            // Search, sort, thread, capability and friends carry no tree
            // state; interested parties observe the session directly.
            _ => {}
        }
    }

    fn apply_state(&mut self, state: State) {
        match &state.code {
            Some(Code::UidValidity(n)) => self.select_codes.uid_validity = Some(*n),
            Some(Code::UidNext(n)) => self.select_codes.uid_next = Some(*n),
            Some(Code::Alert) => self.events.push_back(ModelEvent::Alert {
                message: state.message.clone(),
            }),
            _ => {}
        }

        let tag = match &state.tag {
            Some(tag) => tag.clone(),
            None => return,
        };
        let task = match self.pending.remove(&tag) {
            Some(task) => task,
            None => return,
        };

        if state.kind != StateKind::Ok {
            self.task_failed(&task, &state);
            return;
        }

        match task {
            Task::ListChildren { parent } => self.finish_list_children(parent),
            Task::Select { mailbox } => self.finish_select(mailbox),
            Task::FetchUids { mailbox } => {
                let list = match self.tree.mailbox(mailbox) {
                    Some(state) => state.message_list,
                    None => return,
                };
                self.tree.node_mut(list).set_fetched();
                self.events
                    .push_back(ModelEvent::MessageListLoaded { mailbox });
            }
            Task::FetchMetadata { message } => {
                // The data itself arrived via untagged FETCH; just make
                // sure the loading bit cannot stick.
                let node = self.tree.node_mut(message);
                if node.loading {
                    node.set_fetched();
                }
            }
            Task::FetchStructure { .. } => {}
            Task::FetchPart { part } => {
                let node = self.tree.node_mut(part);
                if node.loading {
                    node.set_fetched();
                }
            }
        }
    }

    fn task_failed(&mut self, task: &Task, state: &State) {
        let node = match task {
            Task::ListChildren { parent } => Some(*parent),
            Task::Select { mailbox } | Task::FetchUids { mailbox } => {
                self.tree.mailbox(*mailbox).map(|s| s.message_list)
            }
            Task::FetchMetadata { message } | Task::FetchStructure { message } => Some(*message),
            Task::FetchPart { part } => Some(*part),
        };
        if let Some(node) = node {
            self.tree.node_mut(node).loading = false;
        }
        if matches!(task, Task::ListChildren { .. }) {
            self.staged_lists.clear();
        }
        self.events.push_back(ModelEvent::CommandFailed {
            message: format!("{} {}", state.kind, state.message),
        });
    }

    fn finish_list_children(&mut self, parent: NodeId) {
        let entries = std::mem::take(&mut self.staged_lists);
        self.tree.clear_children(parent);

        let parent_name = self.tree.mailbox(parent).map(|s| s.name.clone());
        for entry in entries {
            // The listing of `prefix.%` may echo the parent itself.
            if parent_name.as_deref() == Some(entry.name.as_str()) {
                continue;
            }
            self.tree
                .alloc_mailbox(parent, entry.name, entry.separator, entry.attributes);
        }
        self.tree.node_mut(parent).set_fetched();
        self.events.push_back(ModelEvent::ChildrenLoaded { parent });
    }

    fn finish_select(&mut self, mailbox: NodeId) {
        let list = match self.tree.mailbox(mailbox) {
            Some(state) => state.message_list,
            None => return,
        };
        let exists = self.tree.node(list).children.len() as u32;

        // A changed UIDVALIDITY voids everything we ever cached.
        let new_validity = self.select_codes.uid_validity.unwrap_or(0);
        if self.cache.uid_validity() != 0 && self.cache.uid_validity() != new_validity {
            self.cache.forget();
        }
        self.cache.set_new_numbers(
            new_validity,
            self.select_codes.uid_next.unwrap_or(0),
            exists,
        );

        if exists == 0 {
            self.tree.node_mut(list).set_fetched();
            self.events
                .push_back(ModelEvent::MessageListLoaded { mailbox });
            return;
        }

        // Prefill the sequence↔UID map from cache where possible.
        let mut all_known = true;
        for seq in 1..=exists {
            match self.cache.seq_to_uid(seq) {
                Some(uid) => {
                    let slot = self.tree.node(list).children[(seq - 1) as usize];
                    if let Some(message) = self.tree.message_mut(slot) {
                        message.uid = Some(uid);
                    }
                }
                None => all_known = false,
            }
        }

        if all_known {
            self.tree.node_mut(list).set_fetched();
            self.events
                .push_back(ModelEvent::MessageListLoaded { mailbox });
            return;
        }

        match self
            .session
            .fetch(&Sequence::range(1, exists), &["UID".to_string()])
        {
            Ok(tag) => {
                self.pending.insert(tag, Task::FetchUids { mailbox });
            }
            Err(err) => {
                self.events.push_back(ModelEvent::CommandFailed {
                    message: err.to_string(),
                });
            }
        }
    }

    fn selected_list(&self) -> Option<NodeId> {
        self.selected
            .and_then(|mailbox| self.tree.mailbox(mailbox))
            .map(|state| state.message_list)
    }

    /// `* m EXISTS`: the list now holds m slots; new indices appear as
    /// empty unfetched messages.
    fn apply_exists(&mut self, m: u32) {
        let list = match self.selected_list() {
            Some(list) => list,
            None => return,
        };
        let current = self.tree.node(list).children.len();
        let wanted = m as usize;

        if wanted > current {
            for _ in current..wanted {
                self.tree
                    .alloc_child(list, Payload::Message(MessageState::default()));
            }
            self.events.push_back(ModelEvent::RowsInserted {
                list,
                first: current,
                count: wanted - current,
            });
        } else if wanted < current {
            let removed: Vec<_> = self.tree.node_mut(list).children.drain(wanted..).collect();
            for id in removed {
                self.tree.free_subtree(id);
            }
            for row in (wanted..current).rev() {
                self.events.push_back(ModelEvent::RowsRemoved { list, row });
            }
        }
    }

    /// `* n EXPUNGE`: slot n−1 disappears, higher slots shift down.
    fn apply_expunge(&mut self, n: u32) {
        let list = match self.selected_list() {
            Some(list) => list,
            None => return,
        };
        let row = (n - 1) as usize;
        if row >= self.tree.node(list).children.len() {
            log::warn!("EXPUNGE {n} outside the message list, ignoring");
            return;
        }
        let removed = self.tree.node_mut(list).children.remove(row);
        self.tree.free_subtree(removed);

        let (uid_validity, uid_next, exists) = (
            self.cache.uid_validity(),
            self.cache.uid_next(),
            self.cache.exists(),
        );
        self.cache
            .set_new_numbers(uid_validity, uid_next, exists.saturating_sub(1));
        // Sequence numbers above n all shifted; the stored map is void.
        self.cache.forget_seq_uid();

        self.events.push_back(ModelEvent::RowsRemoved { list, row });
    }

    fn apply_fetch(&mut self, fetch: FetchResponse) {
        let list = match self.selected_list() {
            Some(list) => list,
            None => {
                self.session
                    .disconnect("FETCH without a selected mailbox".to_string());
                return;
            }
        };
        let row = (fetch.seq.saturating_sub(1)) as usize;
        let slot = match self.tree.node(list).children.get(row).copied() {
            Some(slot) if fetch.seq >= 1 => slot,
            _ => {
                // The server talked about a message we were never told
                // exists; the stream is out of sync.
                self.session.disconnect(format!(
                    "FETCH for sequence {} outside the sized message list",
                    fetch.seq
                ));
                return;
            }
        };

        let mut metadata_touched = false;
        for item in fetch.items {
            match item {
                FetchItem::Uid(uid) => {
                    if let Some(message) = self.tree.message_mut(slot) {
                        message.uid = Some(uid);
                    }
                    self.cache.add_seq_uid(fetch.seq, uid);
                }
                FetchItem::Flags(flags) => {
                    if let Some(message) = self.tree.message_mut(slot) {
                        message.flags = flags;
                    }
                    metadata_touched = true;
                }
                FetchItem::Rfc822Size(size) => {
                    if let Some(message) = self.tree.message_mut(slot) {
                        message.size = Some(size);
                    }
                    metadata_touched = true;
                }
                FetchItem::InternalDate(dt) => {
                    if let Some(message) = self.tree.message_mut(slot) {
                        message.internal_date = Some(dt);
                    }
                    metadata_touched = true;
                }
                FetchItem::Envelope(envelope) => {
                    if let Some(message) = self.tree.message_mut(slot) {
                        message.envelope = Some(envelope);
                    }
                    metadata_touched = true;
                }
                FetchItem::Body(structure) | FetchItem::BodyStructure(structure) => {
                    self.tree.build_body_tree(slot, &structure);
                    metadata_touched = true;
                }
                FetchItem::ModSeq(_) => {}
                FetchItem::Data { key, payload } => {
                    self.apply_part_payload(slot, &key, payload);
                }
            }
        }

        if metadata_touched {
            self.tree.node_mut(slot).set_fetched();
        }
        self.events.push_back(ModelEvent::MessageChanged { list, row });
    }

    /// Routes a `BODY[...]` payload to the part node the section path
    /// names. Keys are matched byte-exactly on the section.
    fn apply_part_payload(&mut self, message: NodeId, key: &[u8], payload: Vec<u8>) {
        let section = match key.iter().position(|&b| b == b'[').and_then(|open| {
            key[open + 1..]
                .iter()
                .position(|&b| b == b']')
                .map(|close| &key[open + 1..open + 1 + close])
        }) {
            Some(section) => String::from_utf8_lossy(section).into_owned(),
            // RFC822 and friends carry no section; nothing in the part
            // tree to attach them to.
            None => return,
        };

        if let Some(part) = self.tree.find_part(message, &section) {
            if let Payload::BodyPart(state) = &mut self.tree.node_mut(part).payload {
                state.data = Some(payload);
            }
            self.tree.node_mut(part).set_fetched();
        } else {
            log::debug!("payload for unknown section {section:?} dropped");
        }
    }

    // ----- tree walking helpers -----

    /// 1-based position of a message inside its list.
    fn sequence_of(&self, message: NodeId) -> Option<u32> {
        let list = self.tree.node(message).parent?;
        self.tree
            .node(list)
            .children
            .iter()
            .position(|&child| child == message)
            .map(|index| (index + 1) as u32)
    }

    /// Walks from a body part up to the owning message.
    fn message_of_part(&self, part: NodeId) -> Option<NodeId> {
        let mut current = self.tree.node(part).parent?;
        loop {
            match self.tree.node(current).payload {
                Payload::Message(_) => return Some(current),
                _ => current = self.tree.node(current).parent?,
            }
        }
    }
}
