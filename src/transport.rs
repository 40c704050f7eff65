//! The abstract byte-stream transport underneath the session.
//!
//! Concrete implementations (plain TCP, TLS, a spawned process piped over
//! a local socket) live outside this crate; the engine only needs the
//! operations below. The driver owning the event loop watches readability
//! itself and calls [`crate::session::Session::on_ready_read`] when bytes
//! arrive.

use std::io;

/// Connection state as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Connected,
    /// TLS handshake finished after STARTTLS.
    Encrypted,
    Closed,
}

/// A bidirectional byte stream.
pub trait Transport {
    /// Reads up to `max` bytes; an empty result means no data is
    /// currently available.
    fn read(&mut self, max: usize) -> io::Result<Vec<u8>>;

    /// Writes bytes, returning how many were accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Idempotently upgrades the stream to TLS. Called by the session
    /// after the tagged OK for STARTTLS, before any further read.
    fn start_tls(&mut self) -> io::Result<()>;

    /// Wraps the stream in DEFLATE compression (COMPRESS=DEFLATE).
    fn start_deflate(&mut self) -> io::Result<()>;

    /// Whether the peer is gone for good.
    fn is_dead(&self) -> bool;

    /// Closes the stream. Further reads and writes fail.
    fn close(&mut self);
}
