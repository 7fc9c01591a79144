use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::metrics::snapshot::RankingMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for ranking metrics snapshots.
///
/// Writes the text exposition format so the output can be scraped by
/// Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<RankingMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &RankingMetricsSnapshot) {
        let counters = [
            ("register_calls_total", snapshot.register_calls),
            ("inserted_total", snapshot.inserted),
            ("promoted_total", snapshot.promoted),
            ("promote_steps_total", snapshot.promote_steps),
            ("evicted_total", snapshot.evicted),
            ("snapshot_reads_total", snapshot.snapshot_reads),
            ("create_races_lost_total", snapshot.create_races_lost),
            ("stale_insertion_points_total", snapshot.stale_insertion_points),
            ("tombstone_aborts_total", snapshot.tombstone_aborts),
            ("relocation_retries_total", snapshot.relocation_retries),
        ];
        for (suffix, value) in counters {
            self.write_metric("counter", suffix, value);
        }
        self.write_metric("gauge", "len", snapshot.len as u64);
        self.write_metric("gauge", "capacity", snapshot.capacity as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_counters_and_gauges_with_prefix() {
        let exporter = PrometheusTextExporter::new("rankkit", Vec::new());
        exporter.export(&RankingMetricsSnapshot {
            register_calls: 10,
            evicted: 2,
            len: 5,
            capacity: 8,
            ..Default::default()
        });

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("# TYPE rankkit_register_calls_total counter\n"));
        assert!(text.contains("rankkit_register_calls_total 10\n"));
        assert!(text.contains("rankkit_evicted_total 2\n"));
        assert!(text.contains("# TYPE rankkit_len gauge\n"));
        assert!(text.contains("rankkit_capacity 8\n"));
    }

    #[test]
    fn empty_prefix_uses_bare_names() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&RankingMetricsSnapshot::default());
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.starts_with("# TYPE register_calls_total counter\n"));
    }
}
