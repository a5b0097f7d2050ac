//! Inode ID Allocator: unique 64-bit inode identifiers without
//! coordination (spec.md section 4.2). Named `IdGen` here; the reference
//! implementation calls its equivalent `flother` (a Twitter-Snowflake
//! style generator seeded with an epoch and a node id).
//!
//! Layout: `id = ((ms_since_epoch + 1) << 23) | (node_id << 10) | counter`,
//! with `node_id` in `[0, 8191]` and `counter` in `[0, 1023]` resetting
//! every millisecond. `epoch` and `node_id` come from `Config`, not from
//! this allocator's own construction time. Inode `1` is the root and is
//! never returned: the `+ 1` bias on `ms_since_epoch` guarantees `id` is
//! always at least `1 << 23`, regardless of how `node_id`, `counter`, or
//! the configured epoch line up at startup.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const NODE_ID_BITS: u32 = 13;
const COUNTER_BITS: u32 = 10;
const MAX_NODE_ID: u16 = (1 << NODE_ID_BITS) - 1;
const MAX_COUNTER: u16 = (1 << COUNTER_BITS) - 1;

struct AllocatorState {
    last_ms: u64,
    counter: u16,
}

/// Monotonic, lock-guarded inode id generator for one node.
pub struct IdGen {
    epoch_unix_ms: u64,
    node_id: u16,
    state: Mutex<AllocatorState>,
}

impl IdGen {
    /// `node_id` must fit in 13 bits (`0..=8191`); larger values are masked.
    /// `epoch_unix_ms` is the reference instant (`Config::epoch_unix_ms`):
    /// `now_ms()` below measures milliseconds elapsed since that wall-clock
    /// instant, not since this allocator was constructed.
    pub fn new(node_id: u16, epoch_unix_ms: u64) -> Self {
        IdGen {
            epoch_unix_ms,
            node_id: node_id & MAX_NODE_ID,
            state: Mutex::new(AllocatorState {
                last_ms: 0,
                counter: 0,
            }),
        }
    }

    /// Milliseconds elapsed since this allocator's reference epoch.
    /// Saturates to `0` rather than panicking if the system clock is
    /// behind the configured epoch.
    fn now_ms(&self) -> u64 {
        let wall_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_millis() as u64;
        wall_ms.saturating_sub(self.epoch_unix_ms)
    }

    /// Allocate the next unique, strictly-monotonic (per node) inode id.
    /// Spins (yielding the thread) across a millisecond boundary if the
    /// per-millisecond counter saturates.
    pub fn next(&self) -> u64 {
        let mut state = self.state.lock().expect("idgen mutex poisoned");
        let mut ms = self.now_ms();

        if ms < state.last_ms {
            // Clock moved backwards relative to our monotonic epoch clock;
            // this should not happen with `Instant`, but stay monotonic.
            ms = state.last_ms;
        }

        if ms == state.last_ms {
            if state.counter >= MAX_COUNTER {
                // Counter exhausted for this millisecond: wait for the next one.
                while ms <= state.last_ms {
                    std::thread::yield_now();
                    ms = self.now_ms();
                }
                state.counter = 0;
            } else {
                state.counter += 1;
            }
        } else {
            state.counter = 0;
        }
        state.last_ms = ms;

        let counter = state.counter as u64;
        drop(state);

        // `ms + 1` biases every id above `1 << 23`, so `id` can never be `0`
        // or `1` even at `ms == 0` with `node_id == 0` and `counter == 0`.
        ((ms + 1) << (NODE_ID_BITS + COUNTER_BITS)) | ((self.node_id as u64) << COUNTER_BITS) | counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn now_epoch_ms() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
    }

    #[test]
    fn never_returns_root_inode() {
        let gen = IdGen::new(1, now_epoch_ms());
        for _ in 0..1000 {
            assert_ne!(gen.next(), 1);
        }
    }

    /// Default-`Config` shape: `node_id == 0` and an epoch pinned to "now",
    /// so `ms_since_epoch` starts at `0` on the very first call. Without the
    /// `ms + 1` bias this produced `id == 0` then `id == 1`, colliding with
    /// the reserved root inode.
    #[test]
    fn default_node_id_and_fresh_epoch_never_collides_with_root() {
        let gen = IdGen::new(0, now_epoch_ms());
        let first = gen.next();
        let second = gen.next();
        assert_ne!(first, 1);
        assert_ne!(second, 1);
        assert!(second > first);
    }

    #[test]
    fn single_threaded_ids_strictly_increase() {
        let gen = IdGen::new(3, now_epoch_ms());
        let mut last = 0u64;
        for _ in 0..10_000 {
            let id = gen.next();
            assert!(id > last, "ids must be strictly increasing");
            last = id;
        }
    }

    #[test]
    fn concurrent_ids_are_unique() {
        let gen = Arc::new(IdGen::new(7, now_epoch_ms()));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gen = gen.clone();
            handles.push(std::thread::spawn(move || {
                let mut ids = Vec::with_capacity(5_000);
                for _ in 0..5_000 {
                    ids.push(gen.next());
                }
                ids
            }));
        }
        let mut all = std::collections::HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(all.insert(id), "duplicate id {id} across concurrent callers");
            }
        }
        assert_eq!(all.len(), 8 * 5_000);
    }

    #[test]
    fn node_id_is_masked_to_thirteen_bits() {
        let gen = IdGen::new(0xFFFF, now_epoch_ms());
        assert_eq!(gen.node_id, MAX_NODE_ID);
    }
}
