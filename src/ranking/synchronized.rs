//! Coarse-lock wrapper around [`SequentialRanking`].
//!
//! One `parking_lot::RwLock` serializes every registration; snapshot reads
//! share the read side. This is the simplest way to satisfy the concurrent
//! surface and the reference the lock-coupled engine is tested against.
//!
//! ```text
//!   register ──► write() ──┐
//!                          ├──► SequentialRanking<K>
//!   top/stats ──► read() ──┘
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{ConfigError, GateTimeout, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::RankingMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::ranking::sequential::SequentialRanking;
use crate::traits::{ConcurrentFrequencyRanking, FrequencyRanking, Statistics};

/// Thread-safe ranking that serializes every call.
///
/// # Example
///
/// ```
/// use rankkit::ranking::synchronized::SynchronizedRanking;
///
/// let ranking = SynchronizedRanking::new(4);
/// ranking.register('a');
/// ranking.register('a');
/// assert_eq!(ranking.weight(&'a'), Some(2));
/// ```
#[derive(Debug)]
pub struct SynchronizedRanking<K> {
    inner: RwLock<SequentialRanking<K>>,
    capacity: usize,
}

impl<K> SynchronizedRanking<K>
where
    K: Eq + Hash + Clone,
{
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(ranking) => ranking,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        SequentialRanking::try_new(capacity).map(Self::from_sequential)
    }

    /// Wraps an existing ranking, keeping its contents.
    pub fn from_sequential(ranking: SequentialRanking<K>) -> Self {
        Self {
            capacity: ranking.capacity(),
            inner: RwLock::new(ranking),
        }
    }

    pub fn into_inner(self) -> SequentialRanking<K> {
        self.inner.into_inner()
    }

    pub fn register(&self, key: K) {
        self.inner.write().register(key);
    }

    /// Gives up if the lock is not acquired within `timeout`.
    pub fn try_register_for(&self, key: K, timeout: Duration) -> Result<(), GateTimeout> {
        let mut inner = self
            .inner
            .try_write_for(timeout)
            .ok_or_else(|| GateTimeout::new(timeout))?;
        inner.register(key);
        Ok(())
    }

    pub fn top(&self, count: usize) -> Vec<K> {
        self.inner.read().top(count)
    }

    pub fn statistics(&self, count: usize) -> Statistics<K> {
        self.inner.read().statistics(count)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn weight(&self, key: &K) -> Option<u64> {
        self.inner.read().weight(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().contains(key)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: Debug,
    {
        self.inner.read().check_invariants()
    }
}

impl<K> ConcurrentFrequencyRanking<K> for SynchronizedRanking<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn register(&self, key: K) {
        SynchronizedRanking::register(self, key);
    }

    fn top(&self, count: usize) -> Vec<K> {
        SynchronizedRanking::top(self, count)
    }

    fn statistics(&self, count: usize) -> Statistics<K> {
        SynchronizedRanking::statistics(self, count)
    }

    fn len(&self) -> usize {
        SynchronizedRanking::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K> FrequencyRanking<K> for SynchronizedRanking<K>
where
    K: Eq + Hash + Clone,
{
    fn register(&mut self, key: K) {
        self.inner.get_mut().register(key);
    }

    fn top(&self, count: usize) -> Vec<K> {
        SynchronizedRanking::top(self, count)
    }

    fn statistics(&self, count: usize) -> Statistics<K> {
        SynchronizedRanking::statistics(self, count)
    }

    fn len(&self) -> usize {
        SynchronizedRanking::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(feature = "metrics")]
impl<K> MetricsSnapshotProvider<RankingMetricsSnapshot> for SynchronizedRanking<K>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> RankingMetricsSnapshot {
        self.inner.read().metrics_snapshot()
    }
}
