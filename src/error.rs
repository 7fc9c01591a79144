//! Errors returned by rankkit.
//!
//! Construction fails with [`ConfigError`], structural checks fail with
//! [`InvariantError`] and the timed `try_*_for` calls of the concurrent
//! engines fail with [`GateTimeout`]. None of them carry a source error.
//!
//! ```
//! use rankkit::error::ConfigError;
//! use rankkit::ranking::sequential::SequentialRanking;
//!
//! let err = SequentialRanking::<String>::try_new(0).unwrap_err();
//! assert_eq!(err, ConfigError::ZeroCapacity);
//! ```

use std::time::Duration;

use thiserror::Error;

/// A construction parameter that no engine can work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A ranking must hold at least one key.
    #[error("ranking capacity must be greater than zero")]
    ZeroCapacity,
    /// The concurrent key index needs at least one shard.
    #[error("index shard count must be greater than zero")]
    ZeroIndexShards,
}

/// The ranked list, the key index and the insertion point disagree.
///
/// Returned by `check_invariants` with the first disagreement found while
/// walking from `TOP` to `BOTTOM`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ranking invariant violated: {detail}")]
pub struct InvariantError {
    detail: String,
}

impl InvariantError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.detail
    }
}

/// A timed wait on the snapshot gate elapsed.
///
/// The call that returned it did nothing: no weight was incremented and no
/// traversal happened, so it may simply be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("snapshot gate not acquired within {waited:?}")]
pub struct GateTimeout {
    waited: Duration,
}

impl GateTimeout {
    pub fn new(waited: Duration) -> Self {
        Self { waited }
    }

    /// How long the caller waited before giving up.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RankingBuilder;

    #[test]
    fn zero_capacity_is_reported_by_every_constructor() {
        let from_new = crate::ranking::sequential::SequentialRanking::<u8>::try_new(0);
        let from_builder = RankingBuilder::new(0).try_build_sequential::<u8>();
        assert_eq!(from_new.unwrap_err(), ConfigError::ZeroCapacity);
        assert_eq!(from_builder.unwrap_err(), ConfigError::ZeroCapacity);
        assert!(ConfigError::ZeroCapacity.to_string().contains("capacity"));
    }

    #[cfg(feature = "concurrency")]
    #[test]
    fn zero_shards_names_the_index() {
        let err = RankingBuilder::new(8)
            .index_shards(0)
            .try_build_concurrent::<u8>()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroIndexShards);
        assert!(err.to_string().contains("shard"));
    }

    #[test]
    fn invariant_error_keeps_detail_behind_prefix() {
        let err = InvariantError::new("BOTTOM.prev does not close the list");
        assert_eq!(err.message(), "BOTTOM.prev does not close the list");
        assert_eq!(
            err.to_string(),
            "ranking invariant violated: BOTTOM.prev does not close the list"
        );
    }

    #[test]
    fn gate_timeout_reports_wait() {
        let err = GateTimeout::new(Duration::from_millis(5));
        assert_eq!(err.waited(), Duration::from_millis(5));
        assert!(err.to_string().contains("5ms"));
    }

    #[test]
    fn errors_box_as_std_error() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(ConfigError::ZeroCapacity),
            Box::new(InvariantError::new("keyless node")),
            Box::new(GateTimeout::new(Duration::ZERO)),
        ];
        assert!(errors.iter().all(|e| !e.to_string().is_empty()));
    }
}
