//! The lazily populated account → mailbox → message → part tree and its
//! observers.

pub mod model;
pub mod msg_list;
pub mod tree;

pub use model::{Model, ModelEvent};
pub use msg_list::{MsgListEvent, MsgListProxy};
pub use tree::{MailboxState, MessageState, Node, NodeId, PartState, Payload, Tree};
