//! Message Log
//!
//! In-memory, receipt-ordered log of every novel message a node has
//! originated or accepted. Size-capped to keep long-running nodes bounded;
//! the log is not persisted across restarts.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use super::message_types::{MeshMessage, MessageKind};

const MAX_LOG_ENTRIES: usize = 10_000;

/// One logged message plus the moment this node recorded it.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub message: MeshMessage,
    pub received_at: DateTime<Utc>,
}

pub struct MessageLog {
    entries: Mutex<VecDeque<LogEntry>>,
    max_entries: usize,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn record(&self, message: MeshMessage) {
        let mut entries = self.entries.lock();
        entries.push_back(LogEntry {
            message,
            received_at: Utc::now(),
        });
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    /// All messages in receipt order.
    pub fn all(&self) -> Vec<MeshMessage> {
        self.entries
            .lock()
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Messages of one variant, in receipt order.
    pub fn of_kind(&self, kind: MessageKind) -> Vec<MeshMessage> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.message.kind() == kind)
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn statistics(&self) -> Value {
        let entries = self.entries.lock();

        let mut by_kind = std::collections::HashMap::new();
        for entry in entries.iter() {
            *by_kind
                .entry(format!("{:?}", entry.message.kind()))
                .or_insert(0u64) += 1;
        }

        serde_json::json!({
            "total_messages": entries.len(),
            "max_messages": self.max_entries,
            "by_kind": by_kind,
            "oldest": entries.front().map(|e| e.received_at),
            "newest": entries.back().map(|e| e.received_at),
        })
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::message_types::{MessageHeader, MessagePayload};

    fn text(sequence: i32, body: &str) -> MeshMessage {
        MeshMessage::new(
            MessageHeader {
                sender_id: 1,
                sequence,
                sender: "logger".to_string(),
            },
            MessagePayload::text(body),
        )
    }

    #[test]
    fn records_in_receipt_order() {
        let log = MessageLog::new();
        log.record(text(0, "first"));
        log.record(MeshMessage::new(
            MessageHeader {
                sender_id: 2,
                sequence: 0,
                sender: "other".to_string(),
            },
            MessagePayload::gps(1.0, 2.0),
        ));
        log.record(text(1, "second"));

        let texts = log.of_kind(MessageKind::Text);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].as_text(), Some("first"));
        assert_eq!(texts[1].as_text(), Some("second"));
        assert_eq!(log.of_kind(MessageKind::Gps).len(), 1);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn capacity_drops_oldest_entries() {
        let log = MessageLog::with_capacity(2);
        log.record(text(0, "a"));
        log.record(text(1, "b"));
        log.record(text(2, "c"));

        let texts = log.of_kind(MessageKind::Text);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].as_text(), Some("b"));
        assert_eq!(texts[1].as_text(), Some("c"));
    }

    #[test]
    fn statistics_counts_by_kind() {
        let log = MessageLog::new();
        log.record(text(0, "a"));
        log.record(text(1, "b"));
        let stats = log.statistics();
        assert_eq!(stats["total_messages"], 2);
        assert_eq!(stats["by_kind"]["Text"], 2);
    }
}
