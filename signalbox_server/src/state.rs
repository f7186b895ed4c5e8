//! Server state management for the signaling server
//!
//! This module tracks which peers are connected and how to reach them.

use crate::{args::Config, error::SignalingError};
use signalbox_protocol::PeerId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio_util::task::TaskTracker;

/// Sending half of a connection's outbound queue
///
/// Every connection has exactly one writer task draining its queue, so writes
/// to a single socket never interleave no matter how many peers send to it.
#[derive(Debug, Clone)]
pub struct PeerSender(mpsc::UnboundedSender<String>);

impl PeerSender {
    /// Create a handle plus the queue the connection's writer drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// Queue an encoded envelope. Fails once the connection is gone.
    pub fn send(&self, text: String) -> Result<(), SignalingError> {
        self.0
            .send(text)
            .map_err(|_| SignalingError::SendError("connection closed".to_string()))
    }
}

/// Live connections keyed by peer ID
///
/// An ID is present exactly while its connection is live. Cloning gives
/// another handle to the same registry.
#[derive(Debug, Default, Clone)]
pub struct PeerRegistry {
    peers: Arc<Mutex<HashMap<PeerId, PeerSender>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PeerId, PeerSender>> {
        // entries are only ever inserted or removed whole
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a peer. An ID that is already live is refused and the existing
    /// entry is left alone.
    pub fn register(&self, id: PeerId, sender: PeerSender) -> Result<(), SignalingError> {
        let mut peers = self.lock();
        if peers.contains_key(&id) {
            return Err(SignalingError::DuplicatePeer(id));
        }
        peers.insert(id, sender);
        Ok(())
    }

    /// Remove a peer, returning whether it was present
    pub fn unregister(&self, id: &PeerId) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn lookup(&self, id: &PeerId) -> Option<PeerSender> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.lock().contains_key(id)
    }

    /// Snapshot of all live IDs, sorted
    pub fn all_ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every connection except `id`
    pub fn all_entries_except(&self, id: &PeerId) -> Vec<(PeerId, PeerSender)> {
        self.lock()
            .iter()
            .filter(|(peer_id, _)| *peer_id != id)
            .map(|(peer_id, sender)| (peer_id.clone(), sender.clone()))
            .collect()
    }

    /// Send to a single peer by ID
    pub fn try_send(&self, id: &PeerId, text: String) -> Result<(), SignalingError> {
        let sender = self
            .lookup(id)
            .ok_or_else(|| SignalingError::UnknownPeer(id.clone()))?;
        sender.send(text)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// State shared by every connection handler
#[derive(Debug, Clone)]
pub struct ServerState {
    pub registry: PeerRegistry,
    pub config: Arc<Config>,
    /// Upgraded connections, awaited on shutdown
    pub sessions: TaskTracker,
    shutdown: watch::Receiver<bool>,
}

impl ServerState {
    pub fn new(config: Config, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            registry: PeerRegistry::new(),
            config: Arc::new(config),
            sessions: TaskTracker::new(),
            shutdown,
        }
    }

    /// Resolves sessions once the server starts shutting down
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }
}
