use std::fmt;

/// Result type alias for wire-level protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors surfaced by the protocol codecs
///
/// `Violation` corresponds to an unrecoverable parse failure: the reply
/// stream no longer makes sense and the caller must abandon the connection.
/// `Unsupported` is returned by encoders for commands a protocol does not
/// implement, so the caller can reject the workload up front instead of
/// aborting mid-run.
#[derive(Debug)]
pub enum ProtocolError {
    /// The protocol does not implement the requested command
    Unsupported {
        protocol: &'static str,
        command: &'static str,
    },

    /// The reply stream violated the wire protocol; the connection is dead
    Violation(String),

    /// Malformed caller-supplied input (e.g. credentials without a colon)
    Config(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Unsupported { protocol, command } => {
                write!(f, "{command} is not supported by the {protocol} protocol")
            }
            ProtocolError::Violation(msg) => write!(f, "protocol violation: {msg}"),
            ProtocolError::Config(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for ProtocolError {}
