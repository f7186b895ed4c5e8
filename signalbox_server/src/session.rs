//! Per-connection routing engine
//!
//! A [`Session`] owns one peer's registry entry for as long as the peer is
//! connected. It decodes every inbound frame, builds the response for the
//! envelope's kind and delivers it according to the envelope's reach.
//!
//! Nothing in here touches a socket: frames come in as a stream of
//! `Result<Vec<u8>, ClientRequestError>` and go out through the
//! [`PeerSender`] queues held by the registry.

use crate::{
    args::Config,
    error::{ClientRequestError, SignalingError},
    state::{PeerRegistry, PeerSender},
};
use futures::{Stream, StreamExt};
use signalbox_protocol::{
    DisconnectContent, DisconnectionNotice, Envelope, IdentifySelfContent, MessageKind, Payload,
    PeerId, PeerIdList, ReachType, SERVER_SENDER,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// How many fresh IDs to try before giving up on a connection
const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Closed,
}

pub struct Session {
    id: PeerId,
    sender: PeerSender,
    registry: PeerRegistry,
    config: Arc<Config>,
    state: SessionState,
}

impl Session {
    /// Assign a fresh ID to a new connection and register it
    pub fn open(
        registry: PeerRegistry,
        config: Arc<Config>,
        sender: PeerSender,
    ) -> Result<Self, SignalingError> {
        let mut attempts = 0;
        let id = loop {
            let id = PeerId::random(config.id_length);
            match registry.register(id.clone(), sender.clone()) {
                Ok(()) => break id,
                Err(err) => {
                    attempts += 1;
                    error!(%id, attempts, "generated peer ID collides with a live peer");
                    if attempts == MAX_ID_ATTEMPTS {
                        return Err(err);
                    }
                }
            }
        };

        Ok(Self {
            id,
            sender,
            registry,
            config,
            state: SessionState::Connected,
        })
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Process frames until the peer leaves, the transport fails or the
    /// server shuts down
    pub async fn run<S>(mut self, mut frames: S, mut shutdown: watch::Receiver<bool>)
    where
        S: Stream<Item = Result<Vec<u8>, ClientRequestError>> + Unpin,
    {
        while self.state == SessionState::Connected {
            let frame = tokio::select! {
                frame = frames.next() => frame,
                _ = shutdown_requested(&mut shutdown) => {
                    debug!(peer_id = %self.id, "server shutting down");
                    None
                }
            };
            self.handle_frame(frame.unwrap_or(Err(ClientRequestError::Close)));
        }
    }

    /// Handle one inbound frame, or the transport error that replaced it
    pub fn handle_frame(&mut self, frame: Result<Vec<u8>, ClientRequestError>) {
        if self.state == SessionState::Closed {
            return;
        }
        match frame {
            Ok(bytes) => self.handle_message(&bytes),
            Err(ClientRequestError::Close) => {
                info!(peer_id = %self.id, "client disconnected");
                self.close(false);
            }
            Err(err) => {
                warn!(peer_id = %self.id, "error reading from client: {err}");
                self.close(false);
            }
        }
    }

    fn handle_message(&mut self, bytes: &[u8]) {
        trace!(peer_id = %self.id, "received {}", String::from_utf8_lossy(bytes));

        let request = match Envelope::decode(bytes) {
            Ok(request) => request,
            Err(err) => {
                warn!(peer_id = %self.id, "error decoding message: {err}");
                let reply = self.reply_error(
                    "Invalid message structure",
                    self.server_label(),
                    self.id.clone(),
                );
                if let Err(err) = reply {
                    error!(peer_id = %self.id, "error sending error message: {err}");
                }
                return;
            }
        };

        let kind = request.kind;
        let response = match kind {
            MessageKind::Disconnect => {
                // content is optional here; a bad one must not keep the peer connected
                let notify_all = match Payload::decode(kind, &request.content) {
                    Ok(Payload::Disconnect(DisconnectContent { notify_all })) => notify_all,
                    _ => false,
                };
                info!(peer_id = %self.id, "disconnect message received");
                self.close(notify_all);
                return;
            }
            MessageKind::DisconnectionNotification => {
                debug!(peer_id = %self.id, %kind, "ignoring unexpected message kind");
                return;
            }
            MessageKind::GetAllPeerIds => self.peer_list(),
            MessageKind::IdentifySelf => self.identity(),
            MessageKind::TextMessage
            | MessageKind::Offer
            | MessageKind::Answer
            | MessageKind::IceCandidate => Ok(Envelope {
                kind,
                reach: request.reach,
                sender: String::new(),
                peer_id: request.peer_id,
                content: request.content,
            }),
        };

        let result = response.and_then(|response| {
            let sender = self.sender_label(response.reach, &response.peer_id);
            self.deliver(response.with_sender(sender))
        });
        if let Err(err) = result {
            error!(peer_id = %self.id, %kind, "error handling message: {err}");
        }
    }

    fn peer_list(&self) -> Result<Envelope, SignalingError> {
        let mut peer_ids = self.registry.all_ids();
        if !self.config.include_self {
            peer_ids.retain(|id| *id != self.id);
        }
        let payload = Payload::PeerIds(PeerIdList { peer_ids });
        Ok(Envelope::from_payload(&payload, ReachType::ToSelf)?.with_peer_id(self.id.clone()))
    }

    fn identity(&self) -> Result<Envelope, SignalingError> {
        let payload = Payload::IdentifySelf(IdentifySelfContent {
            id: self.id.clone(),
        });
        Ok(Envelope::from_payload(&payload, ReachType::ToSelf)?.with_peer_id(self.id.clone()))
    }

    /// What goes in `sender` for a response from this peer
    fn sender_label(&self, reach: ReachType, target: &PeerId) -> String {
        if !self.config.identify_sender {
            String::new()
        } else if reach == ReachType::ToSelf || *target == self.id {
            SERVER_SENDER.to_string()
        } else {
            self.id.to_string()
        }
    }

    fn server_label(&self) -> String {
        if self.config.identify_sender {
            SERVER_SENDER.to_string()
        } else {
            String::new()
        }
    }

    /// Fan a response out according to its reach
    fn deliver(&self, response: Envelope) -> Result<(), SignalingError> {
        if response.reach == ReachType::Nowhere {
            return Ok(());
        }
        let text = response.encode()?;

        match response.reach {
            ReachType::ToSelf => self.send_to_self(text),
            ReachType::OnePeer => match self.registry.try_send(&response.peer_id, text) {
                Ok(()) => {}
                Err(err @ SignalingError::UnknownPeer(_)) => {
                    warn!(peer_id = %self.id, "{err}");
                    // always attributed to the server, whatever the labeling setting
                    self.reply_error(err.to_string(), SERVER_SENDER.to_string(), response.peer_id)?;
                }
                Err(err) => {
                    warn!(peer_id = %self.id, target = %response.peer_id, "failed to send message to peer: {err}");
                }
            },
            ReachType::AllPeers => self.broadcast(&text),
            ReachType::Nowhere => {}
        }
        Ok(())
    }

    /// Send to every live peer but this one. A failed recipient doesn't stop the rest.
    fn broadcast(&self, text: &str) {
        for (peer_id, sender) in self.registry.all_entries_except(&self.id) {
            if let Err(err) = sender.send(text.to_string()) {
                warn!(peer_id = %self.id, target = %peer_id, "failed to send message to peer: {err}");
            }
        }
    }

    fn send_to_self(&self, text: String) {
        if let Err(err) = self.sender.send(text) {
            warn!(peer_id = %self.id, "failed to send message to self: {err}");
        }
    }

    fn reply_error(
        &self,
        message: impl Into<String>,
        sender: String,
        peer_id: PeerId,
    ) -> Result<(), SignalingError> {
        let text = Envelope::error(message)?
            .with_sender(sender)
            .with_peer_id(peer_id)
            .encode()?;
        self.send_to_self(text);
        Ok(())
    }

    /// Leave the registry for good, telling the others if asked to
    fn close(&mut self, notify_all: bool) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.registry.unregister(&self.id);
        debug!(peer_id = %self.id, remaining = self.registry.len(), "peer unregistered");

        if notify_all || self.config.notify_departures {
            if let Err(err) = self.announce_departure() {
                error!(peer_id = %self.id, "error announcing departure: {err}");
            }
        }
    }

    fn announce_departure(&self) -> Result<(), SignalingError> {
        let payload = Payload::DisconnectionNotification(DisconnectionNotice {
            disconnected_peer_id: self.id.clone(),
        });
        let text = Envelope::from_payload(&payload, ReachType::AllPeers)?
            .with_sender(self.server_label())
            .encode()?;
        self.broadcast(&text);
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close(false);
    }
}

/// Completes once shutdown is signalled. Never completes if the server
/// dropped its end without signalling.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
