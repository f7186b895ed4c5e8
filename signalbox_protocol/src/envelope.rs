use crate::{MessageKind, Payload, PeerId, ProtocolError, ReachType, TextContent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `sender` value for envelopes the server answers itself, or that loop back
/// to their own sender
pub const SERVER_SENDER: &str = "server";

/// A single protocol message
///
/// Decoding only checks the envelope; `content` stays raw JSON until
/// [`Envelope::decode_content`] checks it against the schema of `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: MessageKind,
    #[serde(default)]
    pub reach: ReachType,
    #[serde(default)]
    pub sender: String,
    #[serde(rename = "peerID", default)]
    pub peer_id: PeerId,
    #[serde(default)]
    pub content: Value,
}

impl Envelope {
    /// Build an envelope whose kind and content both come from `payload`
    pub fn from_payload(payload: &Payload, reach: ReachType) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: payload.kind(),
            reach,
            sender: String::new(),
            peer_id: PeerId::default(),
            content: payload.to_value()?,
        })
    }

    /// A `TextMessage` titled "error", addressed back to whoever caused it
    pub fn error(message: impl Into<String>) -> Result<Self, ProtocolError> {
        Self::from_payload(
            &Payload::Text(TextContent::new("error", message)),
            ReachType::ToSelf,
        )
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = peer_id;
        self
    }

    /// Decode an envelope from a text or binary frame
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode `content` with the schema implied by `kind`
    pub fn decode_content(&self) -> Result<Payload, ProtocolError> {
        Payload::decode(self.kind, &self.content)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.encode().map_err(|_| std::fmt::Error)?;
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Envelope {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DisconnectContent, DisconnectionNotice, IceCandidateContent, IdentifySelfContent,
        PeerIdList, SessionDescription,
    };
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn decodes_wire_shape() {
        let raw = r#"{"kind":"TextMessage","reach":"OnePeer","sender":"","peerID":"abc","content":{"title":"t","message":"hi"}}"#;
        let envelope = Envelope::decode(raw.as_bytes()).unwrap();
        assert_eq!(envelope.kind, MessageKind::TextMessage);
        assert_eq!(envelope.reach, ReachType::OnePeer);
        assert_eq!(envelope.peer_id, PeerId::from("abc"));
        assert_eq!(envelope.content, json!({"title": "t", "message": "hi"}));
    }

    #[test]
    fn encodes_wire_shape() {
        let envelope = Envelope::error("boom").unwrap().with_sender(SERVER_SENDER);
        let value: Value = serde_json::from_str(&envelope.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "TextMessage",
                "reach": "Self",
                "sender": "server",
                "peerID": "",
                "content": {"title": "error", "message": "boom"}
            })
        );
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let envelope = Envelope::from_str(r#"{"kind":"IdentifySelf"}"#).unwrap();
        assert_eq!(envelope.reach, ReachType::ToSelf);
        assert!(envelope.sender.is_empty());
        assert!(envelope.peer_id.is_empty());
        assert_eq!(envelope.content, Value::Null);
    }

    #[test]
    fn rejects_malformed_envelopes() {
        assert!(Envelope::decode(b"not json").is_err());
        assert!(Envelope::decode(br#"{"reach":"Self"}"#).is_err());
        assert!(Envelope::decode(br#"{"kind":"Shout","reach":"Self"}"#).is_err());
        assert!(Envelope::decode(br#"{"kind":"TextMessage","reach":"Somewhere"}"#).is_err());
        assert!(Envelope::decode(br#"{"kind":3,"reach":"Self"}"#).is_err());
    }

    #[test]
    fn content_round_trips_for_every_kind() {
        let payloads = [
            Payload::PeerIds(PeerIdList {
                peer_ids: vec!["a".into(), "b".into()],
            }),
            Payload::Text(TextContent::new("t", "hi")),
            Payload::Disconnect(DisconnectContent { notify_all: true }),
            Payload::Offer(SessionDescription {
                sdp_type: 1,
                sdp: "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\n".into(),
            }),
            Payload::Answer(SessionDescription {
                sdp_type: 3,
                sdp: "v=0\r\n".into(),
            }),
            Payload::IceCandidate(IceCandidateContent {
                candidate: "candidate:0 1 UDP 2122252543 192.168.1.2 50000 typ host".into(),
                sdp_mid: Some("0".into()),
                sdp_m_line_index: Some(0),
                username_fragment: Some("ufrag".into()),
            }),
            Payload::IdentifySelf(IdentifySelfContent { id: "me".into() }),
            Payload::DisconnectionNotification(DisconnectionNotice {
                disconnected_peer_id: "gone".into(),
            }),
        ];

        for payload in payloads {
            let envelope = Envelope::from_payload(&payload, ReachType::AllPeers)
                .unwrap()
                .with_peer_id("target".into())
                .with_sender("someone");
            let decoded = Envelope::decode(envelope.encode().unwrap().as_bytes()).unwrap();
            assert_eq!(decoded, envelope);
            assert_eq!(decoded.decode_content().unwrap(), payload);
        }
    }

    #[test]
    fn content_is_checked_only_on_demand() {
        // the envelope itself is valid even though its content is not a TextMessage
        let envelope = Envelope::decode(br#"{"kind":"TextMessage","content":{"sdp":"x"}}"#).unwrap();
        assert!(envelope.decode_content().is_err());
    }
}
