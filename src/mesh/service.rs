//! Mesh Service
//!
//! Orchestrates the mesh core: outgoing sends (validate → stamp header →
//! encode → mark seen → broadcast) and the inbound path (decode → dedup →
//! deliver to subscribers → re-broadcast the original bytes unchanged).
//! Exposes the typed subscription API the feature layers build on.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{anyhow, Context, Error};
use dashmap::DashMap;
use log::{debug, info};
use serde_json::Value;
use thiserror::Error as ThisError;
use uuid::Uuid;

use crate::message::message_types::{MeshMessage, MessageHeader, MessageKind, MessagePayload};
use crate::message::router::FloodRouter;
use crate::message::storage::MessageLog;
use crate::message::wire::{self, WireError};
use crate::report::ErrorReporter;
use crate::state::identity::NodeIdentity;

use super::transport::{BroadcastOutcome, InboundFrame, PeerTransport};

/// Errors returned to the synchronous caller of [`MeshService::send`].
/// Transport-level partial failures are not errors; they come back inside
/// the [`BroadcastOutcome`].
#[derive(Debug, ThisError)]
pub enum SendError {
    /// Text without a body or a task without a title is rejected before it
    /// reaches the codec.
    #[error("message payload is empty")]
    EmptyPayload,

    #[error(transparent)]
    Encode(#[from] WireError),
}

/// Opaque handle for one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

type Handler = Arc<dyn Fn(&MeshMessage) + Send + Sync>;

/// Registry of per-variant subscriber callbacks. Subscribing appends — it
/// never replaces an earlier registration for the same variant.
#[derive(Default)]
struct SubscriberRegistry {
    handlers: DashMap<MessageKind, Vec<(SubscriptionId, Handler)>>,
}

impl SubscriberRegistry {
    fn subscribe(&self, kind: MessageKind, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        for mut entry in self.handlers.iter_mut() {
            let before = entry.len();
            entry.retain(|(existing, _)| *existing != id);
            if entry.len() != before {
                return true;
            }
        }
        false
    }

    fn dispatch(&self, message: &MeshMessage, reporter: &dyn ErrorReporter) {
        // Snapshot the handler list so callbacks run outside the registry
        // guard and may themselves subscribe or unsubscribe.
        let handlers: Vec<(SubscriptionId, Handler)> = match self.handlers.get(&message.kind()) {
            Some(entry) => entry
                .iter()
                .map(|(id, handler)| (*id, Arc::clone(handler)))
                .collect(),
            None => return,
        };

        for (id, handler) in handlers {
            let call = std::panic::catch_unwind(AssertUnwindSafe(|| handler(message)));
            if call.is_err() {
                reporter.report(anyhow!(
                    "subscriber {id:?} panicked while handling a {:?} message",
                    message.kind()
                ));
            }
        }
    }
}

/// One node's messaging façade over an abstract peer transport.
pub struct MeshService {
    identity: Arc<NodeIdentity>,
    transport: Arc<dyn PeerTransport>,
    router: FloodRouter,
    subscribers: SubscriberRegistry,
    log: MessageLog,
    reporter: Arc<dyn ErrorReporter>,
}

impl MeshService {
    pub fn new(
        identity: Arc<NodeIdentity>,
        transport: Arc<dyn PeerTransport>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Arc<Self> {
        Arc::new(Self {
            identity,
            transport,
            router: FloodRouter::new(),
            subscribers: SubscriberRegistry::default(),
            log: MessageLog::new(),
            reporter,
        })
    }

    /// Take the transport's inbound frame stream and drive it from a
    /// background task. Call once after construction.
    pub fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        let mut incoming = self
            .transport
            .take_incoming()
            .context("transport inbound receiver already taken")?;

        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(frame) = incoming.recv().await {
                service.handle_frame(frame).await;
            }
            debug!(
                "inbound frame stream ended for node 0x{:02x}",
                service.identity.id()
            );
        });

        info!(
            "mesh service started for node 0x{:02x} ({})",
            self.identity.id(),
            self.identity.name()
        );
        Ok(())
    }

    /// Originate a message: stamp this node's id and the next sequence
    /// number, encode, and broadcast to every connected peer. The outcome
    /// reports partial success per peer.
    pub async fn send(&self, payload: MessagePayload) -> Result<BroadcastOutcome, SendError> {
        if payload_is_blank(&payload) {
            let error = SendError::EmptyPayload;
            self.reporter.report(anyhow!("rejected send: {error}"));
            return Err(error);
        }

        let message = MeshMessage::new(
            MessageHeader {
                sender_id: self.identity.id(),
                sequence: self.identity.next_sequence(),
                sender: self.identity.name(),
            },
            payload,
        );
        let frame = wire::encode(&message)?;

        // Our own key goes into the seen-set up front: a copy flooding back
        // through the mesh must never be re-delivered or re-broadcast.
        self.router.observe_local(message.dedup_key());
        self.log.record(message.clone());

        debug!(
            "node 0x{:02x} sending {:?} #{} ({} bytes)",
            message.header.sender_id,
            message.kind(),
            message.header.sequence,
            frame.len()
        );
        Ok(self.transport.broadcast(&frame).await)
    }

    /// Presence signal: this node joined the mesh.
    pub async fn announce_connected(&self) -> Result<BroadcastOutcome, SendError> {
        self.send(MessagePayload::Connected).await
    }

    /// Presence signal: this node is leaving the mesh.
    pub async fn announce_disconnected(&self) -> Result<BroadcastOutcome, SendError> {
        self.send(MessagePayload::Disconnected).await
    }

    /// Register a callback for one message variant. Every subscriber
    /// registered for a variant fires for every novel message of that
    /// variant; registering twice appends a second, independent
    /// subscription.
    pub fn subscribe<F>(&self, kind: MessageKind, handler: F) -> SubscriptionId
    where
        F: Fn(&MeshMessage) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(kind, Arc::new(handler))
    }

    /// Remove one subscription. Returns false when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// All historically seen messages of a variant, in receipt order.
    pub fn messages_of_kind(&self, kind: MessageKind) -> Vec<MeshMessage> {
        self.log.of_kind(kind)
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Connected peers plus this node.
    pub async fn participant_count(&self) -> usize {
        self.transport.connected_peers().await.len() + 1
    }

    pub async fn connected_peer_names(&self) -> Vec<String> {
        self.transport
            .connected_peers()
            .await
            .into_iter()
            .map(|peer| peer.display_name)
            .collect()
    }

    pub async fn status(&self) -> Value {
        serde_json::json!({
            "node": {
                "id": self.identity.id(),
                "name": self.identity.name(),
            },
            "connected_peers": self.transport.connected_peers().await.len(),
            "seen_keys": self.router.seen_len(),
            "log": self.log.statistics(),
        })
    }

    /// Inbound path. Decode failures are reported and dropped here — they
    /// must never cross back into the transport's dispatch.
    async fn handle_frame(&self, inbound: InboundFrame) {
        let message = match wire::decode(&inbound.bytes) {
            Ok(message) => message,
            Err(error) => {
                self.reporter.report(Error::new(error).context(format!(
                    "dropping undecodable {}-byte frame: {}",
                    inbound.bytes.len(),
                    hex::encode(&inbound.bytes)
                )));
                return;
            }
        };

        let key = message.dedup_key();
        if !self.router.admit(key) {
            debug!("duplicate frame ({}, {}) dropped", key.0, key.1);
            return;
        }

        debug!(
            "node 0x{:02x} accepted {:?} #{} from {}",
            self.identity.id(),
            message.kind(),
            message.header.sequence,
            message.sender_display_name()
        );

        self.log.record(message.clone());
        self.subscribers.dispatch(&message, self.reporter.as_ref());

        // Flood: relay the original bytes unchanged to every connected peer.
        // Re-encoding here would be a second serialization path for the same
        // frame; the bytes that arrived are the bytes that leave.
        let outcome = self.transport.broadcast(&inbound.bytes).await;
        for error in &outcome.errors {
            self.reporter
                .report(anyhow!("re-broadcast of ({}, {}) failed: {error}", key.0, key.1));
        }
    }
}

fn payload_is_blank(payload: &MessagePayload) -> bool {
    match payload {
        MessagePayload::Text { message } => message.is_empty(),
        MessagePayload::Task { title, .. } => title.is_empty(),
        _ => false,
    }
}
