//! The arena-backed mailbox/message tree.
//!
//! Nodes own their children through the arena; parent links are plain
//! indices and never owning. Every node carries the two status bits
//! driving lazy population, `fetched` (children are current) and
//! `loading` (a request is in flight), never both at once.

use chrono::{DateTime, FixedOffset};

use crate::types::body::BodyStructure;
use crate::types::envelope::Envelope;
use crate::types::flag::{Flag, NameAttribute};

/// Opaque node handle; stable for the lifetime of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// What a tree node is.
#[derive(Debug)]
pub enum Payload {
    /// Parent of all top-level mailboxes.
    AccountRoot,
    Mailbox(MailboxState),
    /// The implicit single child of every mailbox holding its messages.
    MessageList,
    Message(MessageState),
    /// A node of a message's MIME tree.
    BodyPart(PartState),
}

#[derive(Debug)]
pub struct MailboxState {
    pub name: String,
    pub separator: Option<char>,
    pub attributes: Vec<NameAttribute>,
    /// The implicit message-list child.
    pub message_list: NodeId,
}

#[derive(Debug, Default)]
pub struct MessageState {
    pub uid: Option<u32>,
    pub envelope: Option<Envelope>,
    pub flags: Vec<Flag>,
    pub size: Option<u32>,
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// Root of the MIME part tree, present once BODYSTRUCTURE arrived.
    pub body: Option<NodeId>,
}

#[derive(Debug)]
pub struct PartState {
    /// Dotted section path (`"1.2"`); empty for the root part.
    pub path: String,
    pub media_type: String,
    pub media_subtype: String,
    pub octets: Option<u32>,
    /// Raw payload once `BODY[path]` was fetched.
    pub data: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub fetched: bool,
    pub loading: bool,
    pub payload: Payload,
}

impl Node {
    fn new(parent: Option<NodeId>, payload: Payload) -> Self {
        Node {
            parent,
            children: Vec::new(),
            fetched: false,
            loading: false,
            payload,
        }
    }

    /// Children may be (re)requested: neither current nor in flight.
    pub fn needs_fetch(&self) -> bool {
        !self.fetched && !self.loading
    }

    pub fn set_loading(&mut self) {
        self.loading = true;
        self.fetched = false;
    }

    pub fn set_fetched(&mut self) {
        self.fetched = true;
        self.loading = false;
    }
}

/// The arena. Removed slots are recycled through a free list.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
}

impl Tree {
    /// Creates the arena with an account root at the top.
    pub fn new() -> (Self, NodeId) {
        let mut tree = Tree {
            nodes: Vec::new(),
            free: Vec::new(),
        };
        let root = tree.insert(Node::new(None, Payload::AccountRoot));
        (tree, root)
    }

    fn insert(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0].as_ref().expect("live node")
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0].as_mut().expect("live node")
    }

    /// Allocates a child node, appended to the parent's child list.
    pub fn alloc_child(&mut self, parent: NodeId, payload: Payload) -> NodeId {
        let id = self.insert(Node::new(Some(parent), payload));
        self.node_mut(parent).children.push(id);
        id
    }

    /// Allocates a node attached to a parent but outside its ordinary
    /// child list (the mailbox → message-list edge, the message → body
    /// edge).
    pub fn alloc_implicit(&mut self, parent: NodeId, payload: Payload) -> NodeId {
        self.insert(Node::new(Some(parent), payload))
    }

    /// Allocates a mailbox together with its implicit message list.
    ///
    /// A `\Noselect` mailbox can never hold messages, so its list is born
    /// fetched.
    pub fn alloc_mailbox(
        &mut self,
        parent: NodeId,
        name: String,
        separator: Option<char>,
        attributes: Vec<NameAttribute>,
    ) -> NodeId {
        let id = self.alloc_child(
            parent,
            Payload::Mailbox(MailboxState {
                name,
                separator,
                attributes,
                message_list: NodeId(usize::MAX),
            }),
        );
        let list = self.alloc_implicit(id, Payload::MessageList);
        let noselect = matches!(
            &self.node(id).payload,
            Payload::Mailbox(state) if state.attributes.contains(&NameAttribute::Noselect)
        );
        if noselect {
            self.node_mut(list).set_fetched();
        }
        match &mut self.node_mut(id).payload {
            Payload::Mailbox(state) => state.message_list = list,
            _ => unreachable!(),
        }
        id
    }

    /// Destroys a node and everything below it. The parent's child list
    /// is not touched; callers that removed the id from an ordered slot
    /// already did that.
    pub fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes[current.0].take() {
                stack.extend(node.children);
                match node.payload {
                    Payload::Mailbox(state) => stack.push(state.message_list),
                    Payload::Message(state) => {
                        if let Some(body) = state.body {
                            stack.push(body);
                        }
                    }
                    _ => {}
                }
                self.free.push(current.0);
            }
        }
    }

    /// Drops all current children of a node (used when a child list is
    /// re-materialised).
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.free_subtree(child);
        }
    }

    pub fn mailbox(&self, id: NodeId) -> Option<&MailboxState> {
        match &self.node(id).payload {
            Payload::Mailbox(state) => Some(state),
            _ => None,
        }
    }

    pub fn message(&self, id: NodeId) -> Option<&MessageState> {
        match &self.node(id).payload {
            Payload::Message(state) => Some(state),
            _ => None,
        }
    }

    pub fn message_mut(&mut self, id: NodeId) -> Option<&mut MessageState> {
        match &mut self.node_mut(id).payload {
            Payload::Message(state) => Some(state),
            _ => None,
        }
    }

    pub fn part(&self, id: NodeId) -> Option<&PartState> {
        match &self.node(id).payload {
            Payload::BodyPart(state) => Some(state),
            _ => None,
        }
    }

    /// Builds the BodyPart subtree for a parsed BODYSTRUCTURE, returning
    /// the root part node.
    pub fn build_body_tree(&mut self, message: NodeId, structure: &BodyStructure) -> NodeId {
        let root = self.body_node(message, structure, String::new());
        let old = self
            .message_mut(message)
            .and_then(|state| state.body.replace(root));
        if let Some(old) = old {
            // Replaced on refetch; the old tree goes away.
            self.free_subtree(old);
        }
        root
    }

    fn body_node(&mut self, parent: NodeId, structure: &BodyStructure, path: String) -> NodeId {
        let (media_type, media_subtype) = structure.media();
        let octets = match structure {
            BodyStructure::Basic { fields, .. }
            | BodyStructure::Text { fields, .. }
            | BodyStructure::Message { fields, .. } => Some(fields.octets),
            BodyStructure::Multipart { .. } => None,
        };
        let id = self.insert(Node::new(
            Some(parent),
            Payload::BodyPart(PartState {
                path: path.clone(),
                media_type,
                media_subtype,
                octets,
                data: None,
            }),
        ));

        for (i, child) in structure.children().iter().enumerate() {
            let child_path = if path.is_empty() {
                (i + 1).to_string()
            } else {
                format!("{path}.{}", i + 1)
            };
            let child_id = self.body_node(id, child, child_path);
            self.node_mut(id).children.push(child_id);
        }

        // Leaves have nothing below them to enumerate.
        if self.node(id).children.is_empty() {
            self.node_mut(id).set_fetched();
        }
        id
    }

    /// Finds a body part by its dotted section path.
    pub fn find_part(&self, message: NodeId, path: &str) -> Option<NodeId> {
        let root = self.message(message)?.body?;
        if path.is_empty() {
            return Some(root);
        }
        let mut current = root;
        for piece in path.split('.') {
            let index: usize = piece.parse().ok()?;
            current = *self.node(current).children.get(index.checked_sub(1)?)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::body::{BasicFields, PartExtension};

    #[test]
    fn fetched_and_loading_exclude_each_other() {
        let (mut tree, root) = Tree::new();
        let node = tree.node_mut(root);
        node.set_loading();
        assert!(node.loading && !node.fetched);
        node.set_fetched();
        assert!(node.fetched && !node.loading);
    }

    #[test]
    fn noselect_list_is_born_fetched() {
        let (mut tree, root) = Tree::new();
        let mailbox = tree.alloc_mailbox(
            root,
            "dead".into(),
            Some('.'),
            vec![NameAttribute::Noselect],
        );
        let list = tree.mailbox(mailbox).unwrap().message_list;
        assert!(tree.node(list).fetched);
        assert!(!tree.node(list).loading);
    }

    #[test]
    fn clear_children_recycles_slots() {
        let (mut tree, root) = Tree::new();
        let a = tree.alloc_mailbox(root, "a".into(), None, vec![]);
        let _b = tree.alloc_mailbox(a, "a.b".into(), Some('.'), vec![]);
        tree.clear_children(root);
        assert!(tree.node(root).children.is_empty());
        // The freed slots get reused.
        let c = tree.alloc_mailbox(root, "c".into(), None, vec![]);
        assert!(tree.mailbox(c).is_some());
    }

    #[test]
    fn body_tree_paths() {
        let (mut tree, root) = Tree::new();
        let mailbox = tree.alloc_mailbox(root, "INBOX".into(), None, vec![]);
        let list = tree.mailbox(mailbox).unwrap().message_list;
        let message = tree.alloc_child(list, Payload::Message(MessageState::default()));

        let text = |subtype: &str| BodyStructure::Text {
            media_subtype: subtype.into(),
            fields: BasicFields {
                encoding: "7BIT".into(),
                octets: 10,
                ..BasicFields::default()
            },
            lines: 1,
            extension: PartExtension::default(),
        };
        let structure = BodyStructure::Multipart {
            parts: vec![
                text("PLAIN"),
                BodyStructure::Multipart {
                    parts: vec![text("HTML")],
                    media_subtype: "RELATED".into(),
                    parameters: vec![],
                    extension: PartExtension::default(),
                },
            ],
            media_subtype: "MIXED".into(),
            parameters: vec![],
            extension: PartExtension::default(),
        };

        tree.build_body_tree(message, &structure);
        let plain = tree.find_part(message, "1").unwrap();
        assert_eq!(tree.part(plain).unwrap().media_subtype, "PLAIN");
        let html = tree.find_part(message, "2.1").unwrap();
        assert_eq!(tree.part(html).unwrap().media_subtype, "HTML");
        assert!(tree.find_part(message, "3").is_none());
    }
}
