//! Bounded per-container histories and the chart series derived from them.

use std::collections::{BTreeMap, HashSet, VecDeque};

use tracing::debug;

use crate::types::{MetricField, MetricSample};

/// Samples kept per container.
pub const MAX_HISTORY_LENGTH: usize = 100;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// One named line on a chart: (unix seconds, value) points.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

/// Display adjustments applied while deriving a series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTransform {
    /// Multiplier applied to every value (unit conversion)
    pub scale: f64,
    /// Appended to the entity id in the series name
    pub suffix: Option<String>,
}

impl Default for SeriesTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            suffix: None,
        }
    }
}

impl SeriesTransform {
    pub fn scaled(scale: f64) -> Self {
        Self {
            scale,
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

/// Directional metrics drawn as two series per container on one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairedMetric {
    Network,
    BlockIo,
}

impl PairedMetric {
    pub fn fields(self) -> [(MetricField, &'static str); 2] {
        match self {
            PairedMetric::Network => [
                (MetricField::NetworkRxBytes, " Rx"),
                (MetricField::NetworkTxBytes, " Tx"),
            ],
            PairedMetric::BlockIo => [
                (MetricField::BlockReadBytes, " Read"),
                (MetricField::BlockWriteBytes, " Write"),
            ],
        }
    }
}

// Keeps a capped history per container; containers missing from the latest
// batch are forgotten.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    histories: BTreeMap<String, VecDeque<MetricSample>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one snapshot batch: append every sample, then prune containers
    /// the batch does not mention.
    pub fn ingest(&mut self, batch: Vec<MetricSample>) {
        let seen: HashSet<String> = batch.iter().map(|s| s.entity_id.clone()).collect();
        for sample in batch {
            let dq = self
                .histories
                .entry(sample.entity_id.clone())
                .or_insert_with(|| VecDeque::with_capacity(MAX_HISTORY_LENGTH));
            push_capped(dq, sample, MAX_HISTORY_LENGTH);
        }

        let before = self.histories.len();
        self.histories.retain(|id, _| seen.contains(id));
        let pruned = before - self.histories.len();
        if pruned > 0 {
            debug!(pruned, tracked = self.histories.len(), "pruned vanished containers");
        }
    }

    /// One series per tracked container for `field`. Samples missing the field
    /// contribute no point.
    pub fn derive_series(
        &self,
        field: MetricField,
        transform: Option<&SeriesTransform>,
    ) -> Vec<ChartSeries> {
        let default = SeriesTransform::default();
        let t = transform.unwrap_or(&default);
        self.histories
            .iter()
            .map(|(id, hist)| ChartSeries {
                name: match &t.suffix {
                    Some(suffix) => format!("{id}{suffix}"),
                    None => id.clone(),
                },
                points: hist
                    .iter()
                    .filter_map(|s| s.get(field).map(|v| (unix_secs(s), v * t.scale)))
                    .collect(),
            })
            .collect()
    }

    /// Both directions of a paired metric, suffixed with the direction label.
    pub fn derive_paired(&self, pair: PairedMetric, scale: f64) -> Vec<ChartSeries> {
        pair.fields()
            .into_iter()
            .flat_map(|(field, suffix)| {
                self.derive_series(field, Some(&SeriesTransform::scaled(scale).with_suffix(suffix)))
            })
            .collect()
    }

    pub fn history(&self, entity_id: &str) -> Option<&VecDeque<MetricSample>> {
        self.histories.get(entity_id)
    }

    pub fn latest(&self, entity_id: &str) -> Option<&MetricSample> {
        self.histories.get(entity_id).and_then(|h| h.back())
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.histories.keys().map(String::as_str)
    }

    /// Number of tracked containers.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

fn unix_secs(s: &MetricSample) -> f64 {
    s.timestamp.timestamp_millis() as f64 / 1000.0
}

/// Memory used as a percentage of the limit, if both are known.
pub fn memory_percent(s: &MetricSample) -> Option<f64> {
    let used = s.memory_used_bytes?;
    let limit = s.memory_limit_bytes.filter(|l| *l > 0.0)?;
    Some(used / limit * 100.0)
}
