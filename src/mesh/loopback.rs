//! Loopback Transport
//!
//! In-process implementation of the peer-transport contract. A
//! [`LoopbackMesh`] hub owns one endpoint per simulated node; links between
//! endpoints are explicit and bidirectional, so tests can build arbitrary
//! topologies (lines, rings, partitions) and inject per-peer write failures.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use log::debug;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::transport::{BroadcastOutcome, InboundFrame, PeerHandle, PeerTransport, TransportError};

struct Endpoint {
    display_name: String,
    inbound: mpsc::UnboundedSender<InboundFrame>,
    links: HashSet<String>,
    failing: bool,
}

/// Hub connecting any number of loopback endpoints.
pub struct LoopbackMesh {
    endpoints: DashMap<String, Endpoint>,
}

impl LoopbackMesh {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            endpoints: DashMap::new(),
        })
    }

    /// Register a new endpoint and return the transport handle for it. An
    /// endpoint starts with no links.
    pub fn endpoint(self: &Arc<Self>, id: &str, display_name: &str) -> LoopbackTransport {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        self.endpoints.insert(
            id.to_string(),
            Endpoint {
                display_name: display_name.to_string(),
                inbound: inbound_tx,
                links: HashSet::new(),
                failing: false,
            },
        );
        debug!("loopback endpoint registered: {id} ({display_name})");
        LoopbackTransport {
            mesh: Arc::clone(self),
            local_id: id.to_string(),
            incoming: Mutex::new(Some(inbound_rx)),
        }
    }

    /// Connect two endpoints bidirectionally.
    pub fn link(&self, a: &str, b: &str) {
        if let Some(mut endpoint) = self.endpoints.get_mut(a) {
            endpoint.links.insert(b.to_string());
        }
        if let Some(mut endpoint) = self.endpoints.get_mut(b) {
            endpoint.links.insert(a.to_string());
        }
    }

    /// Sever the connection between two endpoints.
    pub fn unlink(&self, a: &str, b: &str) {
        if let Some(mut endpoint) = self.endpoints.get_mut(a) {
            endpoint.links.remove(b);
        }
        if let Some(mut endpoint) = self.endpoints.get_mut(b) {
            endpoint.links.remove(a);
        }
    }

    /// Make every write TO this endpoint fail, simulating a peer whose radio
    /// link dropped mid-session.
    pub fn set_failing(&self, id: &str, failing: bool) {
        if let Some(mut endpoint) = self.endpoints.get_mut(id) {
            endpoint.failing = failing;
        }
    }

    fn neighbors(&self, id: &str) -> Vec<String> {
        self.endpoints
            .get(id)
            .map(|endpoint| endpoint.links.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn deliver(&self, from: &str, to: &str, frame: &[u8]) -> Result<(), TransportError> {
        let Some(endpoint) = self.endpoints.get(to) else {
            return Err(TransportError::NotConnected(to.to_string()));
        };
        if endpoint.failing {
            return Err(TransportError::WriteFailed {
                peer: to.to_string(),
                reason: "simulated write failure".to_string(),
            });
        }
        endpoint
            .inbound
            .send(InboundFrame {
                from: Some(from.to_string()),
                bytes: frame.to_vec(),
            })
            .map_err(|_| TransportError::WriteFailed {
                peer: to.to_string(),
                reason: "inbound channel closed".to_string(),
            })
    }
}

/// One node's view of the loopback mesh.
pub struct LoopbackTransport {
    mesh: Arc<LoopbackMesh>,
    local_id: String,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<InboundFrame>>>,
}

impl LoopbackTransport {
    pub fn local_id(&self) -> &str {
        &self.local_id
    }
}

#[async_trait]
impl PeerTransport for LoopbackTransport {
    async fn broadcast(&self, frame: &[u8]) -> BroadcastOutcome {
        let neighbors = self.mesh.neighbors(&self.local_id);

        // Attempt every peer independently; one failure never short-circuits
        // the rest.
        let attempts = neighbors.iter().map(|peer| {
            let mesh = Arc::clone(&self.mesh);
            let local = self.local_id.clone();
            let peer = peer.clone();
            async move { mesh.deliver(&local, &peer, frame) }
        });

        let mut outcome = BroadcastOutcome::default();
        for result in join_all(attempts).await {
            match result {
                Ok(()) => outcome.any_success = true,
                Err(error) => {
                    debug!("loopback write from {} failed: {error}", self.local_id);
                    outcome.errors.push(error);
                }
            }
        }
        outcome
    }

    async fn connected_peers(&self) -> Vec<PeerHandle> {
        self.mesh
            .neighbors(&self.local_id)
            .into_iter()
            .map(|id| {
                let display_name = self
                    .mesh
                    .endpoints
                    .get(&id)
                    .map(|endpoint| endpoint.display_name.clone())
                    .unwrap_or_default();
                PeerHandle { id, display_name }
            })
            .collect()
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<InboundFrame>> {
        self.incoming.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_linked_endpoints_only() {
        let mesh = LoopbackMesh::new();
        let alpha = mesh.endpoint("alpha", "Alpha");
        let bravo = mesh.endpoint("bravo", "Bravo");
        let charlie = mesh.endpoint("charlie", "Charlie");
        mesh.link("alpha", "bravo");

        let outcome = alpha.broadcast(b"ping").await;
        assert!(outcome.any_success);
        assert!(outcome.is_clean());

        let mut bravo_rx = bravo.take_incoming().unwrap();
        let frame = bravo_rx.recv().await.unwrap();
        assert_eq!(frame.bytes, b"ping");
        assert_eq!(frame.from.as_deref(), Some("alpha"));

        let mut charlie_rx = charlie.take_incoming().unwrap();
        assert!(charlie_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failing_peer_reports_error_without_aborting_others() {
        let mesh = LoopbackMesh::new();
        let alpha = mesh.endpoint("alpha", "Alpha");
        let _bravo = mesh.endpoint("bravo", "Bravo");
        let _charlie = mesh.endpoint("charlie", "Charlie");
        mesh.link("alpha", "bravo");
        mesh.link("alpha", "charlie");
        mesh.set_failing("charlie", true);

        let outcome = alpha.broadcast(b"data").await;
        assert!(outcome.any_success);
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(
            outcome.errors[0],
            TransportError::WriteFailed { ref peer, .. } if peer == "charlie"
        ));
    }

    #[tokio::test]
    async fn broadcast_with_no_peers_is_a_silent_no_op() {
        let mesh = LoopbackMesh::new();
        let loner = mesh.endpoint("loner", "Loner");
        let outcome = loner.broadcast(b"anyone?").await;
        assert!(!outcome.any_success);
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn take_incoming_yields_receiver_once() {
        let mesh = LoopbackMesh::new();
        let endpoint = mesh.endpoint("solo", "Solo");
        assert!(endpoint.take_incoming().is_some());
        assert!(endpoint.take_incoming().is_none());
    }

    #[tokio::test]
    async fn unlink_stops_delivery() {
        let mesh = LoopbackMesh::new();
        let alpha = mesh.endpoint("alpha", "Alpha");
        let bravo = mesh.endpoint("bravo", "Bravo");
        mesh.link("alpha", "bravo");
        mesh.unlink("alpha", "bravo");

        let outcome = alpha.broadcast(b"gone").await;
        assert!(!outcome.any_success);

        let mut bravo_rx = bravo.take_incoming().unwrap();
        assert!(bravo_rx.try_recv().is_err());
    }
}
