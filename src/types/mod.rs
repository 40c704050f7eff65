//! Data structures for the IMAP wire protocol and the commands that drive
//! it.

pub mod body;
pub mod command;
pub mod core;
pub mod envelope;
pub mod flag;
pub mod response;
pub mod sequence;

pub use body::{BasicFields, BodyExtension, BodyStructure, PartExtension};
pub use command::{Command, Part, PartKind};
pub use core::{Data, Tag, TokenKind};
pub use envelope::{Envelope, MailAddress};
pub use flag::{Flag, NameAttribute};
pub use response::{
    Code, ESearchItem, ESearchResponse, FetchItem, FetchResponse, ListResponse, NamespaceEntry,
    NamespaceResponse, NumberKind, NumberResponse, Response, State, StateKind, StatusItem,
    StatusResponse, ThreadNode,
};
pub use sequence::Sequence;
