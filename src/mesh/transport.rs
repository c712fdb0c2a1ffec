//! Peer Transport Contract
//!
//! The abstract capability the mesh core runs on: broadcast a frame to every
//! currently connected peer, read the connected-peer list, and consume the
//! inbound frame stream. Concrete short-range radio transports (BLE GATT,
//! scanning, advertising, MTU negotiation) live behind this trait and are not
//! part of the core; [`crate::mesh::loopback`] provides the in-process
//! implementation used by tests and the simulator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// A directly connected mesh neighbor, as the transport reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerHandle {
    /// Transport-level address.
    pub id: String,
    pub display_name: String,
}

/// One reassembled inbound frame. Frame boundaries are the transport's
/// responsibility; the core never does stream reassembly.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    /// Arrival peer, when the transport can tell. Informational only: the
    /// router re-broadcasts to all peers regardless of provenance.
    pub from: Option<String>,
    pub bytes: Vec<u8>,
}

/// Per-peer delivery failure. Never aborts the rest of a broadcast.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("write to peer {peer} failed: {reason}")]
    WriteFailed { peer: String, reason: String },

    #[error("peer {0} is not connected")]
    NotConnected(String),
}

/// Aggregated result of one broadcast-to-all-peers attempt. Partial success
/// across a multi-peer broadcast is expected and surfaced as-is.
#[derive(Debug, Default)]
pub struct BroadcastOutcome {
    /// True when at least one peer write succeeded.
    pub any_success: bool,
    pub errors: Vec<TransportError>,
}

impl BroadcastOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Abstract "send bytes to a list of connected peers" capability.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Attempt to write `frame` to every currently connected peer. A failed
    /// write to one peer must not abort the attempts to the others; failures
    /// are collected, never thrown.
    async fn broadcast(&self, frame: &[u8]) -> BroadcastOutcome;

    /// Current connected-peer list. Informational (participant counts).
    async fn connected_peers(&self) -> Vec<PeerHandle>;

    /// Hand over the inbound frame stream. Yields `Some` exactly once; the
    /// mesh service takes the receiver and drives it from its own task.
    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<InboundFrame>>;
}
