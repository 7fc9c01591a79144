pub use crate::builder::{Ranking, RankingBuilder, RankingEngine};
pub use crate::error::{ConfigError, GateTimeout, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::RankingMetricsSnapshot;
#[cfg(feature = "concurrency")]
pub use crate::ranking::concurrent::ConcurrentRanking;
pub use crate::ranking::sequential::SequentialRanking;
#[cfg(feature = "concurrency")]
pub use crate::ranking::synchronized::SynchronizedRanking;
pub use crate::traits::{ConcurrentFrequencyRanking, FrequencyRanking, Statistics};
