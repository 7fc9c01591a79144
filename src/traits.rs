//! # Ranking Trait Hierarchy
//!
//! Every engine exposes the same four operations: register an occurrence,
//! read the top keys, read the top keys with their weights, and read the
//! size. The traits differ only in how `register` borrows the structure.
//!
//! ```text
//!   ┌──────────────────────────────────────┐   ┌──────────────────────────────────────┐
//!   │        FrequencyRanking<K>           │   │   ConcurrentFrequencyRanking<K>      │
//!   │                                      │   │          : Send + Sync               │
//!   │  register(&mut, K)                   │   │  register(&, K)                      │
//!   │  top(&, n) → Vec<K>                  │   │  top(&, n) → Vec<K>                  │
//!   │  statistics(&, n) → Statistics<K>    │   │  statistics(&, n) → Statistics<K>    │
//!   │  len(&) / is_empty(&) / capacity(&)  │   │  len(&) / is_empty(&) / capacity(&)  │
//!   └──────────────────────────────────────┘   └──────────────────────────────────────┘
//!          ▲          ▲          ▲                        ▲               ▲
//!          │          │          │                        │               │
//!   Sequential   Concurrent   Synchronized ───────────────┘               │
//!                    └────────────────────────────────────────────────────┘
//! ```
//!
//! | Engine                  | `FrequencyRanking` | `ConcurrentFrequencyRanking` |
//! |-------------------------|--------------------|------------------------------|
//! | `SequentialRanking`     | ✅                 | ❌                           |
//! | `ConcurrentRanking`     | ✅                 | ✅                           |
//! | `SynchronizedRanking`   | ✅                 | ✅                           |
//!
//! ## Result Shape
//!
//! `top(n)` and `statistics(n)` return `min(n, len())` entries in descending
//! weight order. [`Statistics`] is an [`IndexMap`], so iteration order is the
//! ranking order and callers must not re-sort it to recover ties: among
//! equal weights, the most recently promoted key comes first.
//!
//! ## Collaborator Contract
//!
//! Any wrapper presenting this surface with its own concurrency strategy
//! must leave the structure in a state reachable by applying some
//! permutation of the same `register` calls to a `SequentialRanking`.

use indexmap::IndexMap;

/// Ordered key → weight mapping, heaviest first.
pub type Statistics<K> = IndexMap<K, u64>;

/// Four-operation ranking surface with exclusive `register`.
///
/// # Example
///
/// ```
/// use rankkit::ranking::sequential::SequentialRanking;
/// use rankkit::traits::FrequencyRanking;
///
/// fn feed<R: FrequencyRanking<&'static str>>(ranking: &mut R, words: &[&'static str]) {
///     for word in words {
///         ranking.register(*word);
///     }
/// }
///
/// let mut ranking = SequentialRanking::new(8);
/// feed(&mut ranking, &["a", "b", "a"]);
/// assert_eq!(ranking.top(1), vec!["a"]);
/// ```
pub trait FrequencyRanking<K> {
    /// Records one occurrence of `key`.
    fn register(&mut self, key: K);

    /// Up to `count` keys, heaviest first.
    fn top(&self, count: usize) -> Vec<K>;

    /// Up to `count` keys with their weights, heaviest first.
    fn statistics(&self, count: usize) -> Statistics<K>;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of tracked keys.
    fn capacity(&self) -> usize;
}

/// Four-operation ranking surface safe to share between threads.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use rankkit::ranking::concurrent::ConcurrentRanking;
/// use rankkit::traits::ConcurrentFrequencyRanking;
///
/// fn feed<R: ConcurrentFrequencyRanking<u32> + 'static>(ranking: Arc<R>) {
///     let handles: Vec<_> = (0..4)
///         .map(|_| {
///             let ranking = Arc::clone(&ranking);
///             thread::spawn(move || ranking.register(7))
///         })
///         .collect();
///     for handle in handles {
///         handle.join().unwrap();
///     }
/// }
///
/// let ranking = Arc::new(ConcurrentRanking::new(4));
/// feed(Arc::clone(&ranking));
/// assert_eq!(ranking.statistics(1)[&7], 4);
/// ```
pub trait ConcurrentFrequencyRanking<K>: Send + Sync {
    /// Records one occurrence of `key`.
    fn register(&self, key: K);

    /// Up to `count` keys, heaviest first, from a single consistent snapshot.
    fn top(&self, count: usize) -> Vec<K>;

    /// Up to `count` keys with weights, from a single consistent snapshot.
    fn statistics(&self, count: usize) -> Statistics<K>;

    /// Number of tracked keys, serialized against registrations.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of tracked keys.
    fn capacity(&self) -> usize;
}
