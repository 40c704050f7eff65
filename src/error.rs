//! Typed errors for everything that can go wrong between the wire and the
//! mailbox tree.
//!
//! Parse errors keep the complete offending line together with the byte
//! offset the parser had reached, so diagnostics can point at the exact
//! spot. A tagged `NO`/`BAD` is *not* an error: it is a regular response
//! delivered through the response queue.

use thiserror::Error;

/// Renders the offending line with a `^` marker below the failing offset.
///
/// Non-printable bytes are escaped so a malicious server cannot mess up the
/// terminal of whoever reads the log.
fn render_offending_line(line: &[u8], offset: usize) -> String {
    let mut printable = String::with_capacity(line.len());
    let mut marker_column = 0;

    for (i, byte) in line.iter().enumerate() {
        let escaped: String = match byte {
            b'\r' => "\\r".into(),
            b'\n' => "\\n".into(),
            0x20..=0x7e => (*byte as char).to_string(),
            other => format!("\\x{other:02x}"),
        };
        if i < offset {
            marker_column += escaped.len();
        }
        printable.push_str(&escaped);
    }

    format!("{}\n{}^ here", printable, " ".repeat(marker_column))
}

#[derive(Debug, Error)]
pub enum Error {
    /// A syntax violation in a server message.
    #[error("parse error: {message}\n{}", render_offending_line(.line, *.offset))]
    Parse {
        message: String,
        line: Vec<u8>,
        offset: usize,
    },

    /// Well-formed syntax in a place that cannot accept it, e.g. a tagged
    /// BYE.
    #[error("unexpected here: {message}\n{}", render_offending_line(.line, *.offset))]
    UnexpectedHere {
        message: String,
        line: Vec<u8>,
        offset: usize,
    },

    /// An atom that is not a known response kind. The session reports this
    /// and drops the single response; it is not fatal.
    #[error("unrecognized response kind {kind:?}")]
    UnrecognizedResponseKind { kind: String, line: Vec<u8> },

    /// A list or tuple had fewer elements than its documented shape.
    #[error("too little data: {message}")]
    NoData { message: String },

    /// More data than the documented shape (or the configured message
    /// size bound) allows.
    #[error("too much data: {message}")]
    TooMuchData { message: String },

    /// A response code's payload does not match its documented shape.
    #[error("invalid response code: {message}")]
    InvalidResponseCode { message: String },

    /// A `+` line arrived while no continuation was expected.
    #[error("unexpected continuation request")]
    UnexpectedContinuationRequest,

    /// A command was constructed with values violating its contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport failure.
    #[error("socket error: {0}")]
    Socket(String),

    /// A bounded wait (e.g. for a literal continuation) elapsed without
    /// progress.
    #[error("socket timeout: {0}")]
    SocketTimeout(String),
}

impl Error {
    /// Shorthand used by the response parser entry points.
    pub(crate) fn parse(message: impl Into<String>, line: &[u8], offset: usize) -> Self {
        Error::Parse {
            message: message.into(),
            line: line.to_vec(),
            offset,
        }
    }

    /// Whether the error must tear the connection down.
    ///
    /// Per the recovery policy, an unrecognized response kind is reported
    /// and the response dropped; everything else coming out of the parser
    /// terminates the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::UnrecognizedResponseKind { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Socket(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
