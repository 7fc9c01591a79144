use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::RankingMetricsSnapshot;
use crate::metrics::traits::{ConcurrentMetricsRecorder, RankingMetricsRecorder};

/// Plain counters for the sequential engine.
#[derive(Debug, Default, Clone)]
pub struct RankingMetrics {
    pub register_calls: u64,
    pub inserted: u64,
    pub promoted: u64,
    pub promote_steps: u64,
    pub evicted: u64,
}

impl RankingMetrics {
    pub fn snapshot(&self, len: usize, capacity: usize) -> RankingMetricsSnapshot {
        RankingMetricsSnapshot {
            register_calls: self.register_calls,
            inserted: self.inserted,
            promoted: self.promoted,
            promote_steps: self.promote_steps,
            evicted: self.evicted,
            len,
            capacity,
            ..Default::default()
        }
    }
}

impl RankingMetricsRecorder for RankingMetrics {
    fn record_register(&mut self) {
        self.register_calls += 1;
    }

    fn record_insert(&mut self) {
        self.inserted += 1;
    }

    fn record_promote(&mut self) {
        self.promoted += 1;
    }

    fn record_promote_step(&mut self) {
        self.promote_steps += 1;
    }

    fn record_evict(&mut self) {
        self.evicted += 1;
    }
}

/// Relaxed atomic counters for the concurrent engine.
///
/// Counters are observational; they carry no ordering with respect to the
/// ranked list itself.
#[derive(Debug, Default)]
pub struct AtomicRankingMetrics {
    register_calls: AtomicU64,
    inserted: AtomicU64,
    promoted: AtomicU64,
    promote_steps: AtomicU64,
    evicted: AtomicU64,
    snapshot_reads: AtomicU64,
    create_races_lost: AtomicU64,
    stale_insertion_points: AtomicU64,
    tombstone_aborts: AtomicU64,
    relocation_retries: AtomicU64,
}

impl AtomicRankingMetrics {
    pub fn snapshot(&self, len: usize, capacity: usize) -> RankingMetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        RankingMetricsSnapshot {
            register_calls: load(&self.register_calls),
            inserted: load(&self.inserted),
            promoted: load(&self.promoted),
            promote_steps: load(&self.promote_steps),
            evicted: load(&self.evicted),
            snapshot_reads: load(&self.snapshot_reads),
            create_races_lost: load(&self.create_races_lost),
            stale_insertion_points: load(&self.stale_insertion_points),
            tombstone_aborts: load(&self.tombstone_aborts),
            relocation_retries: load(&self.relocation_retries),
            len,
            capacity,
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.register_calls,
            &self.inserted,
            &self.promoted,
            &self.promote_steps,
            &self.evicted,
            &self.snapshot_reads,
            &self.create_races_lost,
            &self.stale_insertion_points,
            &self.tombstone_aborts,
            &self.relocation_retries,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl ConcurrentMetricsRecorder for AtomicRankingMetrics {
    fn record_register(&self) {
        bump(&self.register_calls);
    }

    fn record_insert(&self) {
        bump(&self.inserted);
    }

    fn record_promote(&self) {
        bump(&self.promoted);
    }

    fn record_promote_step(&self) {
        bump(&self.promote_steps);
    }

    fn record_evict(&self) {
        bump(&self.evicted);
    }

    fn record_snapshot_read(&self) {
        bump(&self.snapshot_reads);
    }

    fn record_create_race_lost(&self) {
        bump(&self.create_races_lost);
    }

    fn record_stale_insertion_point(&self) {
        bump(&self.stale_insertion_points);
    }

    fn record_tombstone_abort(&self) {
        bump(&self.tombstone_aborts);
    }

    fn record_relocation_retry(&self) {
        bump(&self.relocation_retries);
    }
}
