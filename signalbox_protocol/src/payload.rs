//! Typed `content` schemas, one per [`MessageKind`]

use crate::{MessageKind, PeerId, ProtocolError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Content of `GetAllPeerIDs`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerIdList {
    #[serde(rename = "peersIDs")]
    pub peer_ids: Vec<PeerId>,
}

/// Content of `TextMessage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextContent {
    pub title: String,
    pub message: String,
}

impl TextContent {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Content of `Disconnect`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisconnectContent {
    /// Ask the server to tell the remaining peers about the departure
    #[serde(rename = "notifyAll")]
    pub notify_all: bool,
}

/// Content of `Offer` and `Answer`. The SDP is relayed untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionDescription {
    /// Numeric `RTCSdpType` code, left to the clients to interpret
    #[serde(rename = "type")]
    pub sdp_type: i32,
    pub sdp: String,
}

/// Content of `ICECandidate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IceCandidateContent {
    pub candidate: String,
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(rename = "usernameFragment")]
    pub username_fragment: Option<String>,
}

/// Content of `IdentifySelf`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentifySelfContent {
    pub id: PeerId,
}

/// Content of `DisconnectionNotification`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisconnectionNotice {
    #[serde(rename = "disconnectedPeerID")]
    pub disconnected_peer_id: PeerId,
}

/// Decoded `content` of an envelope, tagged by its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    PeerIds(PeerIdList),
    Text(TextContent),
    Disconnect(DisconnectContent),
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(IceCandidateContent),
    IdentifySelf(IdentifySelfContent),
    DisconnectionNotification(DisconnectionNotice),
}

impl Payload {
    /// The kind an envelope carrying this payload must have
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::PeerIds(_) => MessageKind::GetAllPeerIds,
            Payload::Text(_) => MessageKind::TextMessage,
            Payload::Disconnect(_) => MessageKind::Disconnect,
            Payload::Offer(_) => MessageKind::Offer,
            Payload::Answer(_) => MessageKind::Answer,
            Payload::IceCandidate(_) => MessageKind::IceCandidate,
            Payload::IdentifySelf(_) => MessageKind::IdentifySelf,
            Payload::DisconnectionNotification(_) => MessageKind::DisconnectionNotification,
        }
    }

    /// Decode raw content against the schema implied by `kind`
    pub fn decode(kind: MessageKind, content: &Value) -> Result<Self, ProtocolError> {
        let payload = match kind {
            MessageKind::GetAllPeerIds => Payload::PeerIds(parse(kind, content)?),
            MessageKind::TextMessage => Payload::Text(parse(kind, content)?),
            MessageKind::Disconnect => Payload::Disconnect(parse(kind, content)?),
            MessageKind::Offer => Payload::Offer(parse(kind, content)?),
            MessageKind::Answer => Payload::Answer(parse(kind, content)?),
            MessageKind::IceCandidate => Payload::IceCandidate(parse(kind, content)?),
            MessageKind::IdentifySelf => Payload::IdentifySelf(parse(kind, content)?),
            MessageKind::DisconnectionNotification => {
                Payload::DisconnectionNotification(parse(kind, content)?)
            }
        };
        Ok(payload)
    }

    /// Raw JSON form, as it appears in `content`
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        let value = match self {
            Payload::PeerIds(c) => serde_json::to_value(c)?,
            Payload::Text(c) => serde_json::to_value(c)?,
            Payload::Disconnect(c) => serde_json::to_value(c)?,
            Payload::Offer(c) | Payload::Answer(c) => serde_json::to_value(c)?,
            Payload::IceCandidate(c) => serde_json::to_value(c)?,
            Payload::IdentifySelf(c) => serde_json::to_value(c)?,
            Payload::DisconnectionNotification(c) => serde_json::to_value(c)?,
        };
        Ok(value)
    }
}

fn parse<T: DeserializeOwned>(kind: MessageKind, content: &Value) -> Result<T, ProtocolError> {
    T::deserialize(content).map_err(|source| ProtocolError::InvalidContent { kind, source })
}
