//! Feature Façades
//!
//! Thin typed services layered over the mesh service: chat text, the shared
//! pin board, and quick-chat alert beacons. Presentation and platform
//! notification delivery stay outside this crate.

pub mod chat;
pub mod pins;
pub mod quick_chat;

pub use chat::ChatService;
pub use pins::{Pin, PinBoard};
pub use quick_chat::{QuickAlert, QuickChatService};
