//! Error types for the signaling server

use signalbox_protocol::{PeerId, ProtocolError};
use thiserror::Error;

/// Errors that can occur during signaling
#[derive(Error, Debug)]
pub enum SignalingError {
    /// Failed to send message to peer
    #[error("Failed to send message: {0}")]
    SendError(String),

    /// No live connection is registered under this ID
    #[error("Peer ID {0} does not exist")]
    UnknownPeer(PeerId),

    /// Tried to register an ID that is already live
    #[error("Peer ID {0} is already registered")]
    DuplicatePeer(PeerId),

    /// Envelope could not be decoded or encoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors from client requests
#[derive(Error, Debug)]
pub enum ClientRequestError {
    /// Connection was closed
    #[error("Connection closed")]
    Close,

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

/// Invalid server configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("peer ID length must be at least 1")]
    ZeroIdLength,

    #[error("signaling path {0:?} must start with '/' and not clash with /health")]
    InvalidPath(String),
}
