//! Unified builder for every ranking engine.
//!
//! Collects the construction-time parameters in one place and either
//! builds a concrete engine or hides the choice behind [`Ranking`].
//!
//! ## Example
//!
//! ```rust
//! use rankkit::builder::{RankingBuilder, RankingEngine};
//!
//! let mut ranking = RankingBuilder::new(100).build::<u64>(RankingEngine::Sequential);
//! ranking.register(1);
//! ranking.register(1);
//! assert_eq!(ranking.statistics(1)[&1], 2);
//! ```

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::thread;

use crate::error::ConfigError;
#[cfg(feature = "concurrency")]
use crate::ranking::concurrent::ConcurrentRanking;
use crate::ranking::sequential::SequentialRanking;
#[cfg(feature = "concurrency")]
use crate::ranking::synchronized::SynchronizedRanking;
use crate::traits::{FrequencyRanking, Statistics};

/// Default shard count for the concurrent key index: four shards per
/// available core, rounded up to a power of two.
pub fn default_index_shards() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .saturating_mul(4)
        .next_power_of_two()
}

/// Available ranking engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingEngine {
    /// Single-threaded reference engine.
    Sequential,
    /// Lock-coupled engine with per-node locks.
    #[cfg(feature = "concurrency")]
    Concurrent,
    /// Sequential engine behind one `RwLock`.
    #[cfg(feature = "concurrency")]
    Synchronized,
}

/// Engine-agnostic ranking returned by [`RankingBuilder::build`].
#[derive(Debug)]
pub struct Ranking<K> {
    inner: RankingInner<K>,
}

#[derive(Debug)]
enum RankingInner<K> {
    Sequential(SequentialRanking<K>),
    #[cfg(feature = "concurrency")]
    Concurrent(ConcurrentRanking<K>),
    #[cfg(feature = "concurrency")]
    Synchronized(SynchronizedRanking<K>),
}

impl<K> Ranking<K>
where
    K: Eq + Hash + Clone,
{
    /// Records one occurrence of `key`.
    pub fn register(&mut self, key: K) {
        match &mut self.inner {
            RankingInner::Sequential(ranking) => ranking.register(key),
            #[cfg(feature = "concurrency")]
            RankingInner::Concurrent(ranking) => ranking.register(key),
            #[cfg(feature = "concurrency")]
            RankingInner::Synchronized(ranking) => ranking.register(key),
        }
    }

    /// Up to `count` keys, heaviest first.
    pub fn top(&self, count: usize) -> Vec<K> {
        match &self.inner {
            RankingInner::Sequential(ranking) => ranking.top(count),
            #[cfg(feature = "concurrency")]
            RankingInner::Concurrent(ranking) => ranking.top(count),
            #[cfg(feature = "concurrency")]
            RankingInner::Synchronized(ranking) => ranking.top(count),
        }
    }

    /// Up to `count` keys with their weights, heaviest first.
    pub fn statistics(&self, count: usize) -> Statistics<K> {
        match &self.inner {
            RankingInner::Sequential(ranking) => ranking.statistics(count),
            #[cfg(feature = "concurrency")]
            RankingInner::Concurrent(ranking) => ranking.statistics(count),
            #[cfg(feature = "concurrency")]
            RankingInner::Synchronized(ranking) => ranking.statistics(count),
        }
    }

    pub fn len(&self) -> usize {
        match &self.inner {
            RankingInner::Sequential(ranking) => ranking.len(),
            #[cfg(feature = "concurrency")]
            RankingInner::Concurrent(ranking) => ranking.len(),
            #[cfg(feature = "concurrency")]
            RankingInner::Synchronized(ranking) => ranking.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        match &self.inner {
            RankingInner::Sequential(ranking) => ranking.capacity(),
            #[cfg(feature = "concurrency")]
            RankingInner::Concurrent(ranking) => ranking.capacity(),
            #[cfg(feature = "concurrency")]
            RankingInner::Synchronized(ranking) => ranking.capacity(),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        match &self.inner {
            RankingInner::Sequential(ranking) => ranking.contains(key),
            #[cfg(feature = "concurrency")]
            RankingInner::Concurrent(ranking) => ranking.contains(key),
            #[cfg(feature = "concurrency")]
            RankingInner::Synchronized(ranking) => ranking.contains(key),
        }
    }

    pub fn weight(&self, key: &K) -> Option<u64> {
        match &self.inner {
            RankingInner::Sequential(ranking) => ranking.weight(key),
            #[cfg(feature = "concurrency")]
            RankingInner::Concurrent(ranking) => ranking.weight(key),
            #[cfg(feature = "concurrency")]
            RankingInner::Synchronized(ranking) => ranking.weight(key),
        }
    }

    /// Which engine backs this ranking.
    pub fn engine(&self) -> RankingEngine {
        match &self.inner {
            RankingInner::Sequential(_) => RankingEngine::Sequential,
            #[cfg(feature = "concurrency")]
            RankingInner::Concurrent(_) => RankingEngine::Concurrent,
            #[cfg(feature = "concurrency")]
            RankingInner::Synchronized(_) => RankingEngine::Synchronized,
        }
    }
}

impl<K> FrequencyRanking<K> for Ranking<K>
where
    K: Eq + Hash + Clone,
{
    fn register(&mut self, key: K) {
        Ranking::register(self, key);
    }

    fn top(&self, count: usize) -> Vec<K> {
        Ranking::top(self, count)
    }

    fn statistics(&self, count: usize) -> Statistics<K> {
        Ranking::statistics(self, count)
    }

    fn len(&self) -> usize {
        Ranking::len(self)
    }

    fn capacity(&self) -> usize {
        Ranking::capacity(self)
    }
}

/// Builder for ranking instances.
#[derive(Debug, Clone)]
pub struct RankingBuilder {
    capacity: usize,
    index_shards: Option<usize>,
    shard_seed: u64,
    preallocate: bool,
}

impl RankingBuilder {
    /// Starts a builder for a ranking holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            index_shards: None,
            shard_seed: 0,
            preallocate: true,
        }
    }

    /// Number of key-index shards used by the concurrent engine. Rounded
    /// up to a power of two. Defaults to [`default_index_shards`].
    pub fn index_shards(mut self, shards: usize) -> Self {
        self.index_shards = Some(shards);
        self
    }

    /// Seed mixed into shard selection.
    pub fn shard_seed(mut self, seed: u64) -> Self {
        self.shard_seed = seed;
        self
    }

    /// Whether to reserve index and node storage for `capacity` keys up
    /// front (default `true`).
    pub fn preallocate(mut self, preallocate: bool) -> Self {
        self.preallocate = preallocate;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    pub fn try_build_sequential<K>(&self) -> Result<SequentialRanking<K>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.validate()?;
        SequentialRanking::with_options(self.capacity, self.preallocate)
    }

    pub fn build_sequential<K>(&self) -> SequentialRanking<K>
    where
        K: Eq + Hash + Clone,
    {
        match self.try_build_sequential() {
            Ok(ranking) => ranking,
            Err(e) => panic!("{}", e),
        }
    }

    #[cfg(feature = "concurrency")]
    pub fn try_build_concurrent<K>(&self) -> Result<ConcurrentRanking<K>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.validate()?;
        if self.index_shards == Some(0) {
            return Err(ConfigError::ZeroIndexShards);
        }
        ConcurrentRanking::with_options(
            self.capacity,
            self.index_shards.unwrap_or_else(default_index_shards),
            self.shard_seed,
            self.preallocate,
        )
    }

    #[cfg(feature = "concurrency")]
    pub fn build_concurrent<K>(&self) -> ConcurrentRanking<K>
    where
        K: Eq + Hash + Clone,
    {
        match self.try_build_concurrent() {
            Ok(ranking) => ranking,
            Err(e) => panic!("{}", e),
        }
    }

    #[cfg(feature = "concurrency")]
    pub fn try_build_synchronized<K>(&self) -> Result<SynchronizedRanking<K>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.try_build_sequential()
            .map(SynchronizedRanking::from_sequential)
    }

    #[cfg(feature = "concurrency")]
    pub fn build_synchronized<K>(&self) -> SynchronizedRanking<K>
    where
        K: Eq + Hash + Clone,
    {
        match self.try_build_synchronized() {
            Ok(ranking) => ranking,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds the chosen engine behind the engine-agnostic [`Ranking`].
    pub fn try_build<K>(&self, engine: RankingEngine) -> Result<Ranking<K>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        let inner = match engine {
            RankingEngine::Sequential => RankingInner::Sequential(self.try_build_sequential()?),
            #[cfg(feature = "concurrency")]
            RankingEngine::Concurrent => RankingInner::Concurrent(self.try_build_concurrent()?),
            #[cfg(feature = "concurrency")]
            RankingEngine::Synchronized => {
                RankingInner::Synchronized(self.try_build_synchronized()?)
            },
        };
        Ok(Ranking { inner })
    }

    /// # Panics
    ///
    /// Panics on invalid configuration. See [`try_build`](Self::try_build).
    pub fn build<K>(&self, engine: RankingEngine) -> Ranking<K>
    where
        K: Eq + Hash + Clone,
    {
        match self.try_build(engine) {
            Ok(ranking) => ranking,
            Err(e) => panic!("{}", e),
        }
    }
}
