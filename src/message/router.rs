//! Dedup / Flood Router
//!
//! Decides, per inbound frame, whether a message is novel (deliver locally
//! and re-broadcast) or already seen (drop silently). Flooding relies on this
//! check to terminate: every node re-broadcasts every novel message to all of
//! its peers, so without it the mesh would storm.
//!
//! The membership check and the insert happen under a single lock
//! acquisition. A check-then-act split here is a real race: the same frame
//! arriving from two peers at once would be delivered and re-broadcast twice.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

use super::message_types::DedupKey;

/// Default cap on remembered dedup keys. Oldest entries are evicted first
/// once the cap is reached.
pub const DEFAULT_SEEN_CAPACITY: usize = 8192;

/// Tracks `(sender_id, sequence)` pairs already delivered or re-broadcast.
pub struct FloodRouter {
    seen: Mutex<SeenSet>,
}

impl FloodRouter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SEEN_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(SeenSet::new(capacity)),
        }
    }

    /// Mark a locally originated message as seen, so a copy looping back
    /// through the mesh is neither re-delivered nor re-broadcast.
    pub fn observe_local(&self, key: DedupKey) {
        self.seen.lock().insert(key);
    }

    /// Atomic check-and-insert. Returns `true` exactly once per key: the
    /// caller that gets `true` owns delivery and re-broadcast for that
    /// message.
    pub fn admit(&self, key: DedupKey) -> bool {
        self.seen.lock().insert(key)
    }

    /// Number of keys currently remembered.
    pub fn seen_len(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Default for FloodRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Hashed membership plus insertion-order queue, bounded by FIFO eviction.
struct SeenSet {
    entries: HashSet<DedupKey>,
    order: VecDeque<DedupKey>,
    capacity: usize,
}

impl SeenSet {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, key: DedupKey) -> bool {
        if !self.entries.insert(key) {
            return false;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        true
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn admit_accepts_each_key_once() {
        let router = FloodRouter::new();
        assert!(router.admit((2, 9)));
        assert!(!router.admit((2, 9)));
        assert!(router.admit((2, 10)));
        assert!(router.admit((3, 9)));
        assert_eq!(router.seen_len(), 3);
    }

    #[test]
    fn locally_observed_keys_are_not_admitted() {
        let router = FloodRouter::new();
        router.observe_local((7, 0));
        assert!(!router.admit((7, 0)));
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let router = FloodRouter::with_capacity(3);
        for sequence in 0..4 {
            assert!(router.admit((1, sequence)));
        }
        assert_eq!(router.seen_len(), 3);
        // (1, 0) was evicted and is admitted again; (1, 3) is still known.
        assert!(router.admit((1, 0)));
        assert!(!router.admit((1, 3)));
    }

    #[test]
    fn concurrent_admit_grants_exactly_one_winner() {
        let router = Arc::new(FloodRouter::new());
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let router = Arc::clone(&router);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if router.admit((42, 1000)) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
