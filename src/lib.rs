//! TrailMesh — decentralized peer-to-peer messaging core for short-range
//! radio mesh networks.
//!
//! Nodes exchange typed messages (chat text, GPS positions, shared pins,
//! quick-chat alerts) over pairwise links; every novel message is flooded to
//! all connected peers and deduplicated by its `(sender_id, sequence)` key,
//! so nodes without a direct link still receive everything exactly once.
//!
//! The crate is transport-agnostic: the core depends only on the
//! [`mesh::transport::PeerTransport`] capability. Concrete radio transports
//! (BLE GATT plumbing, scanning, advertising) plug in behind that trait;
//! [`mesh::loopback`] ships an in-process implementation for tests and
//! simulations.

pub mod features;
pub mod mesh;
pub mod message;
pub mod report;
pub mod state;

pub use features::{ChatService, Pin, PinBoard, QuickAlert, QuickChatService};
pub use mesh::{
    BroadcastOutcome, InboundFrame, LoopbackMesh, LoopbackTransport, MeshService, PeerHandle,
    PeerTransport, SendError, SubscriptionId, TransportError,
};
pub use message::{
    FloodRouter, MeshMessage, MessageHeader, MessageKind, MessageLog, MessagePayload,
    QuickChatKind, WireError,
};
pub use report::{CollectingReporter, ErrorReporter, LogReporter};
pub use state::{JsonFilePreferences, MemoryPreferences, NodeIdentity, PreferenceStore};
