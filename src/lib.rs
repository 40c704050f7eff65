//! An IMAP4rev1 client engine: wire codec, command scheduler and mailbox
//! tree model.
//!
//! The crate is sans-IO. A driver owns the event loop and a
//! [`transport::Transport`]; it feeds readability into the
//! [`session::Session`] (or the [`model::Model`] wrapping one) and drains
//! the queued responses and change events. Inside, bytes flow
//!
//! ```text
//! transport → framer → parser → response queue → model → UI events
//! ```
//!
//! and commands flow the other way, as tagged part lists serialised into
//! line/literal fragments with correct continuation, IDLE and STARTTLS
//! handling.
//!
//! Covered extensions: LITERAL+, LITERAL8, IDLE, NAMESPACE, UIDPLUS,
//! ENABLE, CONDSTORE, QRESYNC, ID, ESEARCH (incremental threading
//! included), SORT, THREAD, LIST-EXTENDED, STARTTLS, URLAUTH, UNSELECT
//! and COMPRESS=DEFLATE.

pub mod cache;
pub mod encode;
pub mod error;
pub mod framer;
pub mod model;
pub mod parse;
pub mod session;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use session::{CommandHandle, Session, SessionEvent};
pub use types::response::Response;
