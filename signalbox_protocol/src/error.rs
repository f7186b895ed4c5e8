//! Error types for the signaling protocol

use crate::MessageKind;
use thiserror::Error;

/// Errors that can occur while decoding or encoding envelopes
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The envelope itself is malformed, or carries an unknown kind/reach tag
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope is well-formed but its content doesn't match the schema of its kind
    #[error("invalid {kind} content: {source}")]
    InvalidContent {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
}
