pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use metrics_impl::{AtomicRankingMetrics, RankingMetrics};
pub use snapshot::RankingMetricsSnapshot;
pub use traits::{
    ConcurrentMetricsRecorder, MetricsExporter, MetricsReset, MetricsSnapshotProvider,
    RankingMetricsRecorder,
};
