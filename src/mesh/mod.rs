//! Mesh Networking Module
//!
//! The service façade over an abstract peer transport, plus the in-process
//! loopback transport used by tests and the simulator.

pub mod loopback;
pub mod service;
pub mod transport;

pub use loopback::{LoopbackMesh, LoopbackTransport};
pub use service::{MeshService, SendError, SubscriptionId};
pub use transport::{BroadcastOutcome, InboundFrame, PeerHandle, PeerTransport, TransportError};
