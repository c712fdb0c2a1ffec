//! Node Identity
//!
//! One node's identity and sequence state, owned by the mesh service
//! instance and injected wherever it is needed. Keeping this explicit (no
//! process-wide statics) is what lets tests and the simulator run many
//! independent nodes in one process.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::preferences::PreferenceStore;

const USERNAME_KEY: &str = "username";

/// Stable per-process node identity: a random single-byte id, a persisted
/// display name, and the shared monotonic sequence counter used for every
/// message this node originates (all variants draw from the same counter).
pub struct NodeIdentity {
    id: u8,
    name: RwLock<String>,
    sequence: AtomicI32,
    prefs: Arc<dyn PreferenceStore>,
}

impl NodeIdentity {
    /// Pick a random node id and restore the display name from preferences.
    pub fn load(prefs: Arc<dyn PreferenceStore>) -> Arc<Self> {
        Self::with_id(rand::random::<u8>(), prefs)
    }

    /// Fixed node id, for deterministic topologies in tests and simulations.
    pub fn with_id(id: u8, prefs: Arc<dyn PreferenceStore>) -> Arc<Self> {
        let name = prefs.get(USERNAME_KEY, "");
        Arc::new(Self {
            id,
            name: RwLock::new(name),
            sequence: AtomicI32::new(0),
            prefs,
        })
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.write() = name.to_string();
        self.prefs.set(USERNAME_KEY, name);
    }

    /// A node without a display name has not finished first-run setup.
    pub fn is_named(&self) -> bool {
        !self.name.read().is_empty()
    }

    /// Return the next sequence number and advance the counter. Single
    /// mutation point; safe under concurrent senders.
    pub fn next_sequence(&self) -> i32 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Clear persisted state and the in-memory name.
    pub fn reset(&self) {
        self.prefs.remove(USERNAME_KEY);
        self.name.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::state::preferences::MemoryPreferences;

    #[test]
    fn name_round_trips_through_preferences() {
        let prefs = Arc::new(MemoryPreferences::new());
        let identity = NodeIdentity::with_id(7, Arc::clone(&prefs) as Arc<dyn PreferenceStore>);

        assert!(!identity.is_named());
        identity.set_name("Frankie");
        assert!(identity.is_named());
        assert_eq!(prefs.get("username", ""), "Frankie");

        // A new identity over the same store restores the name.
        let restored = NodeIdentity::with_id(8, prefs);
        assert_eq!(restored.name(), "Frankie");
    }

    #[test]
    fn reset_clears_name_and_store() {
        let prefs = Arc::new(MemoryPreferences::new());
        let identity = NodeIdentity::with_id(1, Arc::clone(&prefs) as Arc<dyn PreferenceStore>);
        identity.set_name("Temp");
        identity.reset();
        assert!(!identity.is_named());
        assert_eq!(prefs.get("username", "unset"), "unset");
    }

    #[test]
    fn sequences_are_strictly_increasing_without_gaps() {
        let identity = NodeIdentity::with_id(1, Arc::new(MemoryPreferences::new()));
        let sequences: Vec<i32> = (0..100).map(|_| identity.next_sequence()).collect();
        assert_eq!(sequences, (0..100).collect::<Vec<i32>>());
    }

    #[test]
    fn concurrent_sequence_allocation_never_repeats() {
        let identity = NodeIdentity::with_id(1, Arc::new(MemoryPreferences::new()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let identity = Arc::clone(&identity);
                std::thread::spawn(move || {
                    (0..50).map(|_| identity.next_sequence()).collect::<Vec<i32>>()
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let unique: HashSet<i32> = all.iter().copied().collect();
        assert_eq!(unique.len(), 400);
        assert_eq!(*all.iter().max().unwrap(), 399);
    }
}
