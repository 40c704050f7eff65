//! The command scheduler and response pump.
//!
//! A [`Session`] owns the transport, the framer, the outbound command
//! FIFO and the inbound response FIFO. Everything runs on one logical
//! task: the driver calls [`Session::on_ready_read`] when the transport
//! has bytes and [`Session::tick`] periodically; command methods may be
//! called at any point in between.
//!
//! Three conditions suspend output: a synchronising literal waiting for
//! its continuation request, an IDLE waiting for its initial continuation,
//! and a STARTTLS waiting for the tagged OK that precedes the TLS
//! handshake. Queueing a command while the connection idles first flushes
//! `DONE`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};

use crate::encode::{encode_command, Encoded, Fragment};
use crate::error::Error;
use crate::framer::Framer;
use crate::parse::parse_response;
use crate::transport::Transport;
use crate::types::command::{self, Command, Part};
use crate::types::core::Tag;
use crate::types::flag::Flag;
use crate::types::response::{Response, StateKind, StatusItem};
use crate::types::sequence::Sequence;

/// Identifies a queued command; equal to the tag it was assigned.
pub type CommandHandle = Tag;

/// Things that happened outside the regular response flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The connection is gone; queued commands were dropped.
    Disconnected { reason: String },
    /// The server accepted IDLE; the connection now sits in idle state.
    IdleStarted,
}

#[derive(Debug)]
struct QueuedCommand {
    command: Command,
    /// Fragment walk, built when emission starts.
    fragments: Option<Encoded>,
    /// A literal whose header went out; the payload waits for the
    /// continuation request.
    pending_literal: Option<Vec<u8>>,
}

/// How long a literal continuation may take before the connection is
/// declared stuck.
const CONTINUATION_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 8 * 1024;

/// Upper bound for a single response message, lines and literals
/// combined. Anything larger tears the connection down instead of
/// growing the buffers without limit.
const MAX_RESPONSE_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    framer: Framer,
    last_tag: u32,

    queue: VecDeque<QueuedCommand>,
    responses: VecDeque<Response>,
    events: VecDeque<SessionEvent>,

    idling: bool,
    awaiting_idle_start: bool,
    awaiting_literal_continuation: bool,
    starttls_tag: Option<Tag>,
    compress_tag: Option<Tag>,
    literal_plus: bool,

    continuation_deadline: Option<Instant>,
    disconnected: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Session {
            transport,
            framer: Framer::new(MAX_RESPONSE_SIZE),
            last_tag: 0,
            queue: VecDeque::new(),
            responses: VecDeque::new(),
            events: VecDeque::new(),
            idling: false,
            awaiting_idle_start: false,
            awaiting_literal_continuation: false,
            starttls_tag: None,
            compress_tag: None,
            literal_plus: false,
            continuation_deadline: None,
            disconnected: false,
        }
    }

    /// Enables or disables non-synchronising literals (LITERAL+).
    pub fn enable_literal_plus(&mut self, enabled: bool) {
        self.literal_plus = enabled;
    }

    /// The underlying transport, e.g. for connection setup by the driver.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_idling(&self) -> bool {
        self.idling
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    // ----- response queue -----

    pub fn has_response(&self) -> bool {
        !self.responses.is_empty()
    }

    /// De-queues the next parsed response, wire order preserved.
    pub fn get_response(&mut self) -> Option<Response> {
        self.responses.pop_front()
    }

    pub fn poll_event(&mut self) -> Option<SessionEvent> {
        self.events.pop_front()
    }

    // ----- event sources -----

    /// Drains the transport, reassembles complete responses and
    /// dispatches them. Call whenever the transport signals readability.
    pub fn on_ready_read(&mut self) -> Result<(), Error> {
        if self.disconnected {
            return Ok(());
        }

        loop {
            let bytes = match self.transport.read(READ_CHUNK) {
                Ok(bytes) => bytes,
                Err(err) => {
                    self.disconnect(format!("read failed: {err}"));
                    return Ok(());
                }
            };
            if bytes.is_empty() {
                break;
            }
            // Any inbound data counts as progress for the continuation
            // wait.
            if self.continuation_deadline.is_some() {
                self.continuation_deadline = Some(Instant::now() + CONTINUATION_TIMEOUT);
            }
            self.framer.enqueue_bytes(&bytes);
        }

        if self.transport.is_dead() && self.framer.mid_literal() {
            self.disconnect("connection closed in the middle of a literal".to_string());
            return Ok(());
        }

        loop {
            let message = match self.framer.progress() {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(err) => {
                    let reason = err.to_string();
                    self.disconnect(reason);
                    return Ok(());
                }
            };
            self.handle_message(&message);
            if self.disconnected {
                return Ok(());
            }
        }

        self.execute_commands();
        Ok(())
    }

    /// Enforces the continuation timeout. Call from the driver's timer.
    pub fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.continuation_deadline {
            if now >= deadline {
                self.disconnect(
                    Error::SocketTimeout(
                        "no continuation data within the allowed window".to_string(),
                    )
                    .to_string(),
                );
            }
        }
    }

    /// Closes the transport, discards queued commands and reports the
    /// disconnection.
    pub fn disconnect(&mut self, reason: String) {
        if self.disconnected {
            return;
        }
        log::warn!("session disconnected: {reason}");
        self.transport.close();
        self.queue.clear();
        self.disconnected = true;
        self.continuation_deadline = None;
        self.events.push_back(SessionEvent::Disconnected { reason });
    }

    // ----- inbound -----

    fn handle_message(&mut self, message: &[u8]) {
        if message.starts_with(b"+ ") || message == b"+\r\n" {
            self.handle_continuation();
            return;
        }

        let response = match parse_response(message) {
            Ok(response) => response,
            Err(err) if !err.is_fatal() => {
                log::warn!("dropping response: {err}");
                return;
            }
            Err(err) => {
                let reason = err.to_string();
                self.disconnect(reason);
                return;
            }
        };

        // The tagged answer to STARTTLS is processed before anything else
        // is read: on OK the transport is upgraded first, then the
        // response is delivered.
        if let Some(tag) = self.starttls_tag.clone() {
            if response.tag() == Some(&tag) {
                self.starttls_tag = None;
                if self.state_kind(&response) == Some(StateKind::Ok) {
                    if let Err(err) = self.transport.start_tls() {
                        self.disconnect(format!("TLS handshake failed: {err}"));
                        return;
                    }
                }
                self.responses.push_back(response);
                return;
            }
        }

        if let Some(tag) = self.compress_tag.clone() {
            if response.tag() == Some(&tag) {
                self.compress_tag = None;
                if self.state_kind(&response) == Some(StateKind::Ok) {
                    if let Err(err) = self.transport.start_deflate() {
                        self.disconnect(format!("enabling compression failed: {err}"));
                        return;
                    }
                }
            }
        }

        // A tagged failure while a literal header is on the wire aborts
        // the rest of that command.
        if self.awaiting_literal_continuation {
            let for_front = self
                .queue
                .front()
                .map_or(false, |front| response.tag() == Some(&front.command.tag));
            if for_front && self.state_kind(&response) != Some(StateKind::Ok) {
                log::debug!(
                    "command {} rejected mid-literal, aborting emission",
                    response.tag().expect("checked tagged")
                );
                self.queue.pop_front();
                self.awaiting_literal_continuation = false;
                self.continuation_deadline = None;
            }
        }

        self.responses.push_back(response);
    }

    fn state_kind(&self, response: &Response) -> Option<StateKind> {
        match response {
            Response::State(state) => Some(state.kind),
            _ => None,
        }
    }

    fn handle_continuation(&mut self) {
        if self.awaiting_literal_continuation {
            self.awaiting_literal_continuation = false;
            self.continuation_deadline = None;
            let data = self
                .queue
                .front_mut()
                .and_then(|front| front.pending_literal.take());
            if let Some(data) = data {
                if !self.write_all(&data) {
                    return;
                }
            }
            self.execute_commands();
        } else if self.awaiting_idle_start {
            self.awaiting_idle_start = false;
            self.idling = true;
            self.events.push_back(SessionEvent::IdleStarted);
            log::trace!("IDLE active");
            // Commands queued in the meantime now flush (DONE first).
            self.execute_commands();
        } else {
            self.disconnect(Error::UnexpectedContinuationRequest.to_string());
        }
    }

    // ----- outbound -----

    fn can_emit(&self) -> bool {
        !self.disconnected
            && !self.awaiting_literal_continuation
            && !self.awaiting_idle_start
            && self.starttls_tag.is_none()
    }

    fn execute_commands(&mut self) {
        while self.can_emit() && !self.queue.is_empty() {
            // Starting a fresh command while idling first terminates the
            // idle state.
            if self.queue.front().map_or(false, |c| c.fragments.is_none()) && self.idling {
                if !self.write_all(b"DONE\r\n") {
                    return;
                }
                self.idling = false;
                log::trace!("IDLE terminated by queued command");
            }

            let literal_plus = self.literal_plus;
            let fragment = {
                let front = self.queue.front_mut().expect("queue checked non-empty");
                if front.fragments.is_none() {
                    front.fragments = Some(encode_command(&front.command, literal_plus));
                }
                front.fragments.as_mut().expect("just built").next()
            };

            match fragment {
                None => {
                    self.queue.pop_front();
                }
                Some(Fragment::Line { data }) | Some(Fragment::Literal { data, sync: false }) => {
                    if !self.write_all(&data) {
                        return;
                    }
                }
                Some(Fragment::Literal { data, sync: true }) => {
                    if let Some(front) = self.queue.front_mut() {
                        front.pending_literal = Some(data);
                    }
                    self.awaiting_literal_continuation = true;
                    self.continuation_deadline = Some(Instant::now() + CONTINUATION_TIMEOUT);
                    return;
                }
                Some(Fragment::AwaitIdle) => {
                    self.awaiting_idle_start = true;
                    return;
                }
                Some(Fragment::AwaitTls) => {
                    let tag = self
                        .queue
                        .front()
                        .map(|front| front.command.tag.clone())
                        .expect("queue checked non-empty");
                    self.starttls_tag = Some(tag);
                    return;
                }
            }
        }
    }

    fn write_all(&mut self, mut data: &[u8]) -> bool {
        while !data.is_empty() {
            match self.transport.write(data) {
                Ok(0) => {
                    self.disconnect("transport accepted no bytes".to_string());
                    return false;
                }
                Ok(n) => data = &data[n..],
                Err(err) => {
                    self.disconnect(format!("write failed: {err}"));
                    return false;
                }
            }
        }
        true
    }

    // ----- command queueing -----

    fn generate_tag(&mut self) -> Tag {
        let tag = Tag(format!("y{}", self.last_tag));
        self.last_tag += 1;
        tag
    }

    /// Queues a command for emission and returns its handle (the tag).
    pub fn queue_command(&mut self, parts: Vec<Part>) -> Result<CommandHandle, Error> {
        if self.disconnected {
            return Err(Error::Socket("session is disconnected".to_string()));
        }
        if parts.is_empty() {
            return Err(Error::InvalidArgument("empty command".to_string()));
        }

        let tag = self.generate_tag();
        self.queue.push_back(QueuedCommand {
            command: Command::new(tag.clone(), parts),
            fragments: None,
            pending_literal: None,
        });
        self.execute_commands();
        Ok(tag)
    }

    // ----- thin command wrappers (RFC 3501 section 6 and extensions) -----

    pub fn capability(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::capability())
    }

    pub fn noop(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::noop())
    }

    pub fn logout(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::logout())
    }

    pub fn starttls(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::starttls())
    }

    pub fn login(&mut self, user: &str, pass: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::login(user, pass))
    }

    pub fn select(&mut self, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::select(mailbox))
    }

    pub fn examine(&mut self, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::examine(mailbox))
    }

    pub fn create(&mut self, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::create(mailbox))
    }

    pub fn delete(&mut self, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::delete(mailbox))
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::rename(old_name, new_name))
    }

    pub fn subscribe(&mut self, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::subscribe(mailbox))
    }

    pub fn unsubscribe(&mut self, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::unsubscribe(mailbox))
    }

    pub fn list(&mut self, reference: &str, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::list(reference, mailbox))
    }

    pub fn lsub(&mut self, reference: &str, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::lsub(reference, mailbox))
    }

    pub fn status(
        &mut self,
        mailbox: &str,
        fields: &[StatusItem],
    ) -> Result<CommandHandle, Error> {
        self.queue_command(command::status(mailbox, fields))
    }

    pub fn append(
        &mut self,
        mailbox: &str,
        message: Vec<u8>,
        flags: &[Flag],
        timestamp: Option<DateTime<FixedOffset>>,
    ) -> Result<CommandHandle, Error> {
        self.queue_command(command::append(mailbox, message, flags, timestamp))
    }

    pub fn check(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::check())
    }

    pub fn close(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::close())
    }

    pub fn expunge(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::expunge())
    }

    pub fn search(
        &mut self,
        criteria: &[String],
        charset: Option<&str>,
    ) -> Result<CommandHandle, Error> {
        self.queue_command(command::search(criteria, charset))
    }

    pub fn uid_search(
        &mut self,
        criteria: &[String],
        charset: Option<&str>,
    ) -> Result<CommandHandle, Error> {
        self.queue_command(command::uid_search(criteria, charset))
    }

    pub fn fetch(&mut self, seq: &Sequence, items: &[String]) -> Result<CommandHandle, Error> {
        self.queue_command(command::fetch(seq, items))
    }

    pub fn uid_fetch(&mut self, seq: &Sequence, items: &[String]) -> Result<CommandHandle, Error> {
        self.queue_command(command::uid_fetch(seq, items))
    }

    pub fn store(
        &mut self,
        seq: &Sequence,
        item: &str,
        value: &str,
    ) -> Result<CommandHandle, Error> {
        self.queue_command(command::store(seq, item, value))
    }

    pub fn uid_store(
        &mut self,
        seq: &Sequence,
        item: &str,
        value: &str,
    ) -> Result<CommandHandle, Error> {
        self.queue_command(command::uid_store(seq, item, value))
    }

    pub fn copy(&mut self, seq: &Sequence, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::copy(seq, mailbox))
    }

    pub fn uid_copy(&mut self, seq: &Sequence, mailbox: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::uid_copy(seq, mailbox))
    }

    pub fn unselect(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::unselect())
    }

    /// IDLE; terminated automatically when any further command is queued.
    pub fn idle(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::idle())
    }

    pub fn namespace(&mut self) -> Result<CommandHandle, Error> {
        self.queue_command(command::namespace())
    }

    /// An experimental `X<atom>` command built from raw parts.
    pub fn x_atom(&mut self, parts: Vec<Part>) -> Result<CommandHandle, Error> {
        self.queue_command(command::x_atom(parts))
    }

    pub fn id(
        &mut self,
        pairs: Option<&[(String, Option<String>)]>,
    ) -> Result<CommandHandle, Error> {
        self.queue_command(command::id(pairs))
    }

    pub fn enable(&mut self, capabilities: &[String]) -> Result<CommandHandle, Error> {
        self.queue_command(command::enable(capabilities))
    }

    /// COMPRESS=DEFLATE; on the tagged OK the transport's deflate layer is
    /// switched on before further reads.
    pub fn compress_deflate(&mut self) -> Result<CommandHandle, Error> {
        let handle = self.queue_command(command::compress_deflate())?;
        self.compress_tag = Some(handle.clone());
        Ok(handle)
    }

    pub fn genurlauth(&mut self, url: &str, mechanism: &str) -> Result<CommandHandle, Error> {
        self.queue_command(command::genurlauth(url, mechanism))
    }
}
