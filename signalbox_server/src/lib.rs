//! WebSocket signaling relay for WebRTC peers
//!
//! Browser peers connect over a WebSocket, get a random ID, and use the relay
//! to find each other and trade offers, answers and ICE candidates before
//! talking directly.
//!
//! # Protocol
//!
//! Every frame is a JSON envelope (see [`signalbox_protocol`]):
//!
//! ```json
//! {"kind": "Offer", "reach": "OnePeer", "sender": "", "peerID": "<target>",
//!  "content": {"type": 1, "sdp": "..."}}
//! ```
//!
//! - `GetAllPeerIDs` - answered with the IDs of the connected peers
//! - `IdentifySelf` - answered with the caller's own ID
//! - `TextMessage`, `Offer`, `Answer`, `ICECandidate` - relayed untouched
//!   to `Self`, `OnePeer`, `AllPeers` or `None`
//! - `Disconnect` - leaves the relay; `{"notifyAll": true}` tells the others
//!
//! Malformed envelopes and unknown targets are reported back to the sender as
//! a `TextMessage` titled `"error"`; the connection stays open.
//!
//! # Example
//!
//! ```bash
//! # Start the server
//! signalbox-server 127.0.0.1:8090 --identify-sender
//!
//! # Connect and ask who you are
//! websocat ws://127.0.0.1:8090/signalingserver
//! {"kind":"IdentifySelf","reach":"Self"}
//! ```

#![forbid(unsafe_code)]

pub mod args;
pub mod error;
pub mod handler;
pub mod server;
pub mod session;
pub mod state;

pub use args::{Args, Config};
pub use error::{ClientRequestError, ConfigError, SignalingError};
pub use server::SignalingServer;
pub use session::{Session, SessionState};
pub use state::{PeerRegistry, PeerSender, ServerState};
