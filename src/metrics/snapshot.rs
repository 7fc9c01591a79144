/// Counters and gauges of a ranking engine at one point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RankingMetricsSnapshot {
    pub register_calls: u64,
    pub inserted: u64,
    pub promoted: u64,
    pub promote_steps: u64, // nodes leapfrogged across all promotions
    pub evicted: u64,

    // concurrent engine only; always 0 for the sequential engine, whose
    // `&self` reads do not count themselves
    pub snapshot_reads: u64,
    pub create_races_lost: u64,
    pub stale_insertion_points: u64,
    pub tombstone_aborts: u64,
    pub relocation_retries: u64,

    // gauges captured at snapshot time
    pub len: usize,
    pub capacity: usize,
}

impl RankingMetricsSnapshot {
    /// Registrations whose increment was dropped because the key was evicted
    /// mid-flight.
    pub fn lost_increments(&self) -> u64 {
        self.tombstone_aborts
    }

    /// Fraction of registrations that introduced a new key.
    pub fn insert_ratio(&self) -> f64 {
        if self.register_calls == 0 {
            0.0
        } else {
            self.inserted as f64 / self.register_calls as f64
        }
    }
}
