use thiserror::Error;

/// Errors from remote store operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service could not be reached.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The credential was missing, expired or revoked.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The server answered with an error status.
    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The server ended a listener with an error frame.
    #[error("Listener error: {0}")]
    Listener(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("CBOR error: {0}")]
    Cbor(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl RemoteError {
    /// Errors that reconnecting cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Listener(_))
    }
}
