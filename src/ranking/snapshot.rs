//! Snapshot reads: the snapshot gate and the top-N collectors.
//!
//! ## The snapshot gate inverts reader/writer roles
//!
//! ```text
//!                 ┌────────────────────────────────────────────┐
//!                 │        SnapshotGate (RwLock<()>)           │
//!                 │                                            │
//!   register ───► │  shared side    → MutationPermit           │  many at once
//!                 │                                            │
//!   top/stats ──► │  exclusive side → SnapshotPermit           │  alone
//!   len       ──► │                                            │
//!                 └────────────────────────────────────────────┘
//! ```
//!
//! Registrations are the *writers* of the ranked list, yet they take the
//! **shared** side: they only touch small lock-coupled regions and can run
//! side by side. Snapshot reads take the **exclusive** side because a full
//! traversal must not interleave with any splice. The permits are named
//! after what they allow rather than `read`/`write` so that nobody "fixes"
//! the apparent inversion.
//!
//! ## Collectors
//!
//! [`collect_top`] and [`collect_statistics`] turn a list traversal into the
//! result shapes of the ranking traits, stopping after `min(count, len)`
//! entries.

use std::hash::Hash;

use crate::traits::Statistics;

#[cfg(feature = "concurrency")]
pub use gate::{MutationPermit, SnapshotGate, SnapshotPermit};

#[cfg(feature = "concurrency")]
mod gate {
    use std::time::Duration;

    use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

    use crate::error::GateTimeout;

    /// Structure-wide shared/exclusive gate between registrations and
    /// snapshot reads. See the module docs for why the roles are inverted.
    #[derive(Debug, Default)]
    pub struct SnapshotGate {
        lock: RwLock<()>,
    }

    /// Held by a registration for its whole duration. Many may coexist.
    #[must_use = "the gate is released when the permit is dropped"]
    pub struct MutationPermit<'a> {
        _guard: RwLockReadGuard<'a, ()>,
    }

    /// Held by a snapshot read. Excludes every registration.
    #[must_use = "the gate is released when the permit is dropped"]
    pub struct SnapshotPermit<'a> {
        _guard: RwLockWriteGuard<'a, ()>,
    }

    impl SnapshotGate {
        pub fn new() -> Self {
            Self::default()
        }

        /// Enters the gate as a mutator, waiting out any snapshot read.
        pub fn mutation(&self) -> MutationPermit<'_> {
            MutationPermit {
                _guard: self.lock.read(),
            }
        }

        /// Like [`mutation`](Self::mutation), giving up after `timeout`.
        pub fn try_mutation_for(&self, timeout: Duration) -> Result<MutationPermit<'_>, GateTimeout> {
            self.lock
                .try_read_for(timeout)
                .map(|guard| MutationPermit { _guard: guard })
                .ok_or_else(|| GateTimeout::new(timeout))
        }

        /// Enters the gate as a snapshot reader, waiting for in-flight
        /// registrations to drain.
        pub fn snapshot(&self) -> SnapshotPermit<'_> {
            SnapshotPermit {
                _guard: self.lock.write(),
            }
        }

        /// Like [`snapshot`](Self::snapshot), giving up after `timeout`.
        pub fn try_snapshot_for(&self, timeout: Duration) -> Result<SnapshotPermit<'_>, GateTimeout> {
            self.lock
                .try_write_for(timeout)
                .map(|guard| SnapshotPermit { _guard: guard })
                .ok_or_else(|| GateTimeout::new(timeout))
        }

        /// `true` while a snapshot read holds the gate.
        pub fn is_snapshot_active(&self) -> bool {
            self.lock.is_locked_exclusive()
        }
    }
}

/// Collects up to `min(count, len)` keys from a heaviest-first traversal.
pub fn collect_top<K, I>(entries: I, count: usize, len: usize) -> Vec<K>
where
    I: IntoIterator<Item = (K, u64)>,
{
    let limit = count.min(len);
    let mut top = Vec::with_capacity(limit);
    top.extend(entries.into_iter().take(limit).map(|(key, _)| key));
    top
}

/// Collects up to `min(count, len)` `(key, weight)` pairs, preserving order.
pub fn collect_statistics<K, I>(entries: I, count: usize, len: usize) -> Statistics<K>
where
    K: Hash + Eq,
    I: IntoIterator<Item = (K, u64)>,
{
    let limit = count.min(len);
    let mut stats = Statistics::with_capacity(limit);
    stats.extend(entries.into_iter().take(limit));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<(&'static str, u64)> {
        vec![("a", 3), ("c", 1), ("b", 1)]
    }

    #[test]
    fn collect_top_limits_to_count_and_len() {
        assert_eq!(collect_top(entries(), 2, 3), vec!["a", "c"]);
        assert_eq!(collect_top(entries(), 10, 3), vec!["a", "c", "b"]);
        assert!(collect_top(entries(), 0, 3).is_empty());
    }

    #[test]
    fn collect_statistics_preserves_traversal_order() {
        let stats = collect_statistics(entries(), 7, 3);
        let pairs: Vec<_> = stats.into_iter().collect();
        assert_eq!(pairs, vec![("a", 3), ("c", 1), ("b", 1)]);
    }

    #[cfg(feature = "concurrency")]
    mod gate_permits {
        use std::sync::Arc;
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        use super::super::SnapshotGate;

        #[test]
        fn mutations_share_the_gate() {
            let gate = SnapshotGate::new();
            let a = gate.mutation();
            let b = gate.try_mutation_for(Duration::from_millis(10));
            assert!(b.is_ok());
            assert!(!gate.is_snapshot_active());
            drop(a);
        }

        #[test]
        fn snapshot_excludes_mutations() {
            let gate = SnapshotGate::new();
            let permit = gate.snapshot();
            assert!(gate.is_snapshot_active());

            let err = gate
                .try_mutation_for(Duration::from_millis(5))
                .err()
                .unwrap();
            assert_eq!(err.waited(), Duration::from_millis(5));

            drop(permit);
            assert!(gate.try_mutation_for(Duration::from_millis(5)).is_ok());
        }

        #[test]
        fn snapshot_waits_for_in_flight_mutation() {
            let gate = Arc::new(SnapshotGate::new());
            let (tx, rx) = mpsc::channel();
            let permit = gate.mutation();

            let reader = {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    let _snapshot = gate.snapshot();
                    tx.send(()).unwrap();
                })
            };

            assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
            drop(permit);
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
            reader.join().unwrap();
        }
    }
}
