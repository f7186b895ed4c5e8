//! Wire protocol for the signalbox WebRTC signaling relay
//!
//! Every frame exchanged with the relay is a JSON [`Envelope`]:
//!
//! ```json
//! {"kind": "TextMessage", "reach": "AllPeers", "sender": "", "peerID": "",
//!  "content": {"title": "t", "message": "hi"}}
//! ```
//!
//! `kind` and `reach` are always written as their string tags. The `content`
//! object is kept as raw JSON when an envelope is decoded; its schema depends
//! on `kind` and is checked in a second step with [`Envelope::decode_content`].
//!
//! # Kinds
//!
//! - `GetAllPeerIDs` - list of connected peers (`{"peersIDs": [...]}`)
//! - `TextMessage` - free text (`{"title": ..., "message": ...}`)
//! - `Disconnect` - leave the relay (`{"notifyAll": bool}`)
//! - `Offer` / `Answer` - SDP blobs (`{"type": int, "sdp": ...}`)
//! - `ICECandidate` - ICE candidate (`{"candidate": ..., "sdpMid": ..., ...}`)
//! - `IdentifySelf` - the caller's own ID (`{"id": ...}`)
//! - `DisconnectionNotification` - a peer left (`{"disconnectedPeerID": ...}`)
//!
//! # Reach
//!
//! `Self` echoes back to the sender, `OnePeer` targets the peer named in
//! `peerID`, `AllPeers` goes to everybody but the sender, and `None` is
//! dropped by the relay.

#![forbid(unsafe_code)]

mod envelope;
mod error;
mod payload;

pub use envelope::{Envelope, SERVER_SENDER};
pub use error::ProtocolError;
pub use payload::{
    DisconnectContent, DisconnectionNotice, IceCandidateContent, IdentifySelfContent, Payload,
    PeerIdList, SessionDescription, TextContent,
};

use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The server-assigned identity of a connected peer
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    /// Generate a random identifier of exactly `length` characters from `[a-zA-Z0-9]`,
    /// using the operating system's entropy source.
    pub fn random(length: usize) -> Self {
        let id = OsRng
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();
        PeerId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        PeerId(id)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        PeerId(id.to_string())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an envelope carries. Determines the schema of its `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "GetAllPeerIDs")]
    GetAllPeerIds,
    TextMessage,
    Disconnect,
    Offer,
    Answer,
    #[serde(rename = "ICECandidate")]
    IceCandidate,
    IdentifySelf,
    /// Only ever sent by the server
    DisconnectionNotification,
}

impl MessageKind {
    /// The tag used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::GetAllPeerIds => "GetAllPeerIDs",
            MessageKind::TextMessage => "TextMessage",
            MessageKind::Disconnect => "Disconnect",
            MessageKind::Offer => "Offer",
            MessageKind::Answer => "Answer",
            MessageKind::IceCandidate => "ICECandidate",
            MessageKind::IdentifySelf => "IdentifySelf",
            MessageKind::DisconnectionNotification => "DisconnectionNotification",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which connections an envelope is delivered to
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReachType {
    /// Back to the sending connection only
    #[default]
    #[serde(rename = "Self")]
    ToSelf,
    /// The connection named by the envelope's `peerID`
    OnePeer,
    /// Every live connection except the sender
    AllPeers,
    /// Dropped without a response
    #[serde(rename = "None")]
    Nowhere,
}

impl ReachType {
    /// The tag used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ReachType::ToSelf => "Self",
            ReachType::OnePeer => "OnePeer",
            ReachType::AllPeers => "AllPeers",
            ReachType::Nowhere => "None",
        }
    }
}

impl fmt::Display for ReachType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
