use std::fmt::{self, Display, Formatter};

/// the result type used throughout the engine wherever the *kind* of
/// failure matters to the caller (planners, codecs, the protocol client).
/// CLI-level glue collapses this into `anyhow::Error` at the boundary,
/// same as `libbit`'s `BitGenericError` does for `BitError`.
pub type GsvnResult<T> = Result<T, GsvnError>;

#[derive(Debug, thiserror::Error)]
pub enum GsvnError {
    /// malformed wire data or an unexpected reply shape
    #[error("protocol error: {0}")]
    Protocol(String),

    /// handshake negotiation or credential failure
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// invalid codec stream, checksum mismatch, over-long varint, out-of-range offset
    #[error("delta error: {0}")]
    Delta(String),

    /// a path argument failed validation (see [`crate::path`])
    #[error("invalid path `{0}`: {1}")]
    Path(String, &'static str),

    /// a requested ref update is not a fast-forward and `force` was not set
    #[error("conflict on `{ref_name}`: {reason}")]
    Conflict { ref_name: String, reason: String },

    #[error("object not found: {0}")]
    MissingObject(String),

    /// the server reported one or more `(failure ...)` messages
    #[error("server reported failure: {0}")]
    ServerFailure(String),

    #[error("interrupted")]
    Interrupted,

    /// anything else that only matters as a `Display`-able cause, not a
    /// kind callers branch on (filesystem/config plumbing, mostly).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GsvnError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn delta(msg: impl Into<String>) -> Self {
        Self::Delta(msg.into())
    }

    pub fn conflict(ref_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict { ref_name: ref_name.into(), reason: reason.into() }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }
}

/// a server `(failure ((code message file line)...))` reply: every contained
/// message is reported (see §4.3 "Failure semantics"), then the whole thing
/// becomes a single [`GsvnError::ServerFailure`].
#[derive(Debug, Clone)]
pub struct ServerFailure {
    pub messages: Vec<String>,
}

impl Display for ServerFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, msg) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", msg)?;
        }
        Ok(())
    }
}

impl From<ServerFailure> for GsvnError {
    fn from(f: ServerFailure) -> Self {
        GsvnError::ServerFailure(f.to_string())
    }
}
