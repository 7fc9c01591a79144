//! # Metrics Trait Hierarchy
//!
//! Recording, snapshotting and export are separate concerns, each behind a
//! small trait, so engine code only ever *records*.
//!
//! ```text
//!   ┌─────────────────────────────┐      ┌─────────────────────────────┐
//!   │   RankingMetricsRecorder    │      │  ConcurrentMetricsRecorder  │
//!   │   (&mut self, sequential)   │      │  (&self, atomics)           │
//!   └──────────────┬──────────────┘      └──────────────┬──────────────┘
//!                  │                                    │
//!                  └─────────────────┬──────────────────┘
//!                                    ▼
//!                     RankingMetricsSnapshot (Copy)
//!                                    │
//!              ┌─────────────────────┴─────────────────────┐
//!              ▼                                           ▼
//!   MetricsSnapshotProvider<S>                   MetricsExporter<S>
//!   (tests, benches)                             (Prometheus text)
//! ```
//!
//! The race counters (`create_race_lost`, `stale_insertion_point`,
//! `tombstone_abort`, `relocation_retry`) only exist on the concurrent side;
//! the sequential engine never races.

/// Counters recorded by the sequential engine.
pub trait RankingMetricsRecorder {
    fn record_register(&mut self);
    fn record_insert(&mut self);
    fn record_promote(&mut self);
    /// One node leapfrogged during a promotion.
    fn record_promote_step(&mut self);
    fn record_evict(&mut self);
}

/// Counters recorded by the concurrent engine through shared references.
pub trait ConcurrentMetricsRecorder {
    fn record_register(&self);
    fn record_insert(&self);
    fn record_promote(&self);
    fn record_promote_step(&self);
    fn record_evict(&self);
    fn record_snapshot_read(&self);
    /// Another thread published the same first-seen key first.
    fn record_create_race_lost(&self);
    /// The insertion point moved between reading and locking it.
    fn record_stale_insertion_point(&self);
    /// A promotion found its node already evicted.
    fn record_tombstone_abort(&self);
    /// A promotion found its successor relinked and started over.
    fn record_relocation_retry(&self);
}

/// Point-in-time view of an engine's counters.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset counters between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
