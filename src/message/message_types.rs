//! Message Type Definitions
//!
//! The closed set of message variants exchanged across the mesh. Every
//! message shares a common header (sender id, sequence number, display name)
//! and carries one variant-specific payload. The pair
//! `(sender_id, sequence)` uniquely identifies a message instance across the
//! whole mesh and is the sole deduplication key.

use serde::{Deserialize, Serialize};

/// Wire discriminant for a message variant, stored as a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    Connected = 0,
    Disconnected = 1,
    Gps = 2,
    Task = 3,
    Text = 4,
    QuickChat = 5,
}

impl MessageKind {
    /// Map a wire tag back to a kind. Unknown tags are a decode error, not a
    /// fallback value.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(MessageKind::Connected),
            1 => Some(MessageKind::Disconnected),
            2 => Some(MessageKind::Gps),
            3 => Some(MessageKind::Task),
            4 => Some(MessageKind::Text),
            5 => Some(MessageKind::QuickChat),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Category of a quick-chat beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum QuickChatKind {
    Help = 0,
    Found = 1,
    Other = 2,
}

impl QuickChatKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(QuickChatKind::Help),
            1 => Some(QuickChatKind::Found),
            2 => Some(QuickChatKind::Other),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Header fields shared by every message variant.
///
/// `sender_id` is a single byte chosen randomly per node at first run and
/// stable for the node's lifetime. `sequence` is assigned once at message
/// creation by the originating node and never reused by that sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub sender_id: u8,
    pub sequence: i32,
    pub sender: String,
}

/// Variant-specific message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessagePayload {
    /// Presence signal: a node joined the mesh.
    Connected,
    /// Presence signal: a node is leaving the mesh.
    Disconnected,
    /// Position report.
    Gps { longitude: f32, latitude: f32 },
    /// A shared task/pin. Optional source fields map to empty strings.
    Task {
        title: String,
        text_context: String,
        file_data: String,
    },
    /// Free-form chat text.
    Text { message: String },
    /// Canned alert beacon with the sender's position.
    QuickChat {
        longitude: f32,
        latitude: f32,
        kind: QuickChatKind,
    },
}

impl MessagePayload {
    pub fn text(message: impl Into<String>) -> Self {
        MessagePayload::Text {
            message: message.into(),
        }
    }

    pub fn gps(longitude: f32, latitude: f32) -> Self {
        MessagePayload::Gps {
            longitude,
            latitude,
        }
    }

    pub fn task(
        title: impl Into<String>,
        text_context: impl Into<String>,
        file_data: impl Into<String>,
    ) -> Self {
        MessagePayload::Task {
            title: title.into(),
            text_context: text_context.into(),
            file_data: file_data.into(),
        }
    }

    pub fn quick_chat(longitude: f32, latitude: f32, kind: QuickChatKind) -> Self {
        MessagePayload::QuickChat {
            longitude,
            latitude,
            kind,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MessagePayload::Connected => MessageKind::Connected,
            MessagePayload::Disconnected => MessageKind::Disconnected,
            MessagePayload::Gps { .. } => MessageKind::Gps,
            MessagePayload::Task { .. } => MessageKind::Task,
            MessagePayload::Text { .. } => MessageKind::Text,
            MessagePayload::QuickChat { .. } => MessageKind::QuickChat,
        }
    }
}

/// Key used for mesh-wide deduplication. Two messages sharing this key are
/// the same message regardless of payload bytes.
pub type DedupKey = (u8, i32);

/// One mesh message: shared header plus variant payload. Immutable once
/// created (at origination or at successful decode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshMessage {
    pub header: MessageHeader,
    pub payload: MessagePayload,
}

impl MeshMessage {
    pub fn new(header: MessageHeader, payload: MessagePayload) -> Self {
        Self { header, payload }
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn dedup_key(&self) -> DedupKey {
        (self.header.sender_id, self.header.sequence)
    }

    /// Display name for the sender, with a fallback for nodes that never set
    /// one.
    pub fn sender_display_name(&self) -> &str {
        if self.header.sender.is_empty() {
            "Anonymous"
        } else {
            &self.header.sender
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            MessagePayload::Text { message } => Some(message),
            _ => None,
        }
    }

    pub fn is_presence(&self) -> bool {
        matches!(
            self.payload,
            MessagePayload::Connected | MessagePayload::Disconnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip() {
        for kind in [
            MessageKind::Connected,
            MessageKind::Disconnected,
            MessageKind::Gps,
            MessageKind::Task,
            MessageKind::Text,
            MessageKind::QuickChat,
        ] {
            assert_eq!(MessageKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(MessageKind::from_tag(6), None);
        assert_eq!(MessageKind::from_tag(255), None);
    }

    #[test]
    fn quick_chat_tags_round_trip() {
        for kind in [QuickChatKind::Help, QuickChatKind::Found, QuickChatKind::Other] {
            assert_eq!(QuickChatKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(QuickChatKind::from_tag(3), None);
    }

    #[test]
    fn dedup_key_is_sender_and_sequence() {
        let message = MeshMessage::new(
            MessageHeader {
                sender_id: 7,
                sequence: 31,
                sender: "Robin".to_string(),
            },
            MessagePayload::text("hi"),
        );
        assert_eq!(message.dedup_key(), (7, 31));
        assert_eq!(message.kind(), MessageKind::Text);
    }

    #[test]
    fn anonymous_fallback_for_empty_sender() {
        let message = MeshMessage::new(
            MessageHeader {
                sender_id: 1,
                sequence: 0,
                sender: String::new(),
            },
            MessagePayload::Connected,
        );
        assert_eq!(message.sender_display_name(), "Anonymous");
        assert!(message.is_presence());
    }
}
