//! A flat message-list view over one mailbox at a time.
//!
//! UI tables bind to this proxy instead of the tree: it exposes the
//! selected mailbox's message list as rows and emits a full reset
//! whenever it is pointed at a different mailbox.

use crate::cache::Cache;
use crate::model::model::Model;
use crate::model::tree::{MessageState, NodeId};
use crate::transport::Transport;

/// Change notification of the proxy itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgListEvent {
    /// The proxy was rebound; every row the observer held is invalid.
    Reset,
}

/// The proxy. Bound to at most one mailbox.
#[derive(Debug, Default)]
pub struct MsgListProxy {
    mailbox: Option<NodeId>,
    events: Vec<MsgListEvent>,
}

impl MsgListProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mailbox(&self) -> Option<NodeId> {
        self.mailbox
    }

    /// Rebinds the proxy to another mailbox, resetting the view.
    pub fn set_mailbox<T: Transport, C: Cache>(
        &mut self,
        model: &mut Model<T, C>,
        mailbox: NodeId,
    ) {
        self.mailbox = Some(mailbox);
        self.events.push(MsgListEvent::Reset);
        // Kick off the load; a no-op when the list is already current.
        if let Err(err) = model.open_mailbox(mailbox) {
            log::debug!("cannot open mailbox: {err}");
        }
    }

    pub fn take_event(&mut self) -> Option<MsgListEvent> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.events.remove(0))
        }
    }

    fn list<T: Transport, C: Cache>(&self, model: &Model<T, C>) -> Option<NodeId> {
        let mailbox = self.mailbox?;
        model.tree().mailbox(mailbox).map(|state| state.message_list)
    }

    pub fn row_count<T: Transport, C: Cache>(&self, model: &Model<T, C>) -> usize {
        self.list(model)
            .map_or(0, |list| model.tree().node(list).children.len())
    }

    pub fn message_at<T: Transport, C: Cache>(
        &self,
        model: &Model<T, C>,
        row: usize,
    ) -> Option<NodeId> {
        let list = self.list(model)?;
        model.tree().node(list).children.get(row).copied()
    }

    pub fn message_state<'a, T: Transport, C: Cache>(
        &self,
        model: &'a Model<T, C>,
        row: usize,
    ) -> Option<&'a MessageState> {
        let id = self.message_at(model, row)?;
        model.tree().message(id)
    }
}
