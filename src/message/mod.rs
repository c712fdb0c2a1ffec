//! Message Handling Module
//!
//! The protocol core: typed message model, binary wire codec, the
//! dedup/flood router, and the receipt-ordered message log.

pub mod message_types;
pub mod router;
pub mod storage;
pub mod wire;

pub use message_types::{MeshMessage, MessageHeader, MessageKind, MessagePayload, QuickChatKind};
pub use router::FloodRouter;
pub use storage::MessageLog;
pub use wire::WireError;
