//! Types that mirror the backend's JSON messages, plus the normalised sample
//! the aggregator works on.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A numeric field as it may arrive on the wire. Counters that can outgrow
/// `u64` (or JavaScript's safe integer range) are sent as decimal strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Number {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl Number {
    /// Converts to `f64` for charting. Unparsable or non-finite values give `None`.
    pub fn to_f64(&self) -> Option<f64> {
        let v = match self {
            Number::Unsigned(v) => *v as f64,
            Number::Signed(v) => *v as f64,
            Number::Float(v) => *v,
            Number::Text(s) => {
                let s = s.trim();
                // BigInt literals are sometimes serialised with their `n` suffix
                let s = s.strip_suffix('n').unwrap_or(s);
                s.parse::<f64>().ok()?
            }
        };
        v.is_finite().then_some(v)
    }
}

/// One entry of a `container_stats` reply.
///
/// Numeric fields and the timestamp are read leniently: a value of the wrong
/// type becomes `None` instead of failing the entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContainerStat {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "entityId")]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "timestamp", deserialize_with = "lenient_ts")]
    pub ts: Option<DateTime<Utc>>,
    #[serde(default, alias = "cpuPercent", deserialize_with = "lenient")]
    pub cpu_percent: Option<Number>,
    #[serde(default, alias = "memoryUsedBytes", deserialize_with = "lenient")]
    pub memory_used: Option<Number>,
    #[serde(default, alias = "memoryLimitBytes", deserialize_with = "lenient")]
    pub memory_limit: Option<Number>,
    #[serde(default, alias = "networkRxBytes", deserialize_with = "lenient")]
    pub network_rx: Option<Number>,
    #[serde(default, alias = "networkTxBytes", deserialize_with = "lenient")]
    pub network_tx: Option<Number>,
    #[serde(default, alias = "blockReadBytes", deserialize_with = "lenient")]
    pub block_read: Option<Number>,
    #[serde(default, alias = "blockWriteBytes", deserialize_with = "lenient")]
    pub block_write: Option<Number>,
}

impl ContainerStat {
    /// Key for the container: `name`, then `entityId`, then `id`. Docker
    /// prefixes names with `/`; that is stripped.
    pub fn key(&self) -> Option<String> {
        [&self.name, &self.entity_id, &self.id]
            .into_iter()
            .flatten()
            .map(|k| k.trim_start_matches('/'))
            .find(|k| !k.is_empty())
            .map(str::to_string)
    }

    /// Normalises into a [`MetricSample`]. Entries without a key are
    /// dropped; `fallback_ts` stands in for a missing timestamp.
    pub fn into_sample(self, fallback_ts: DateTime<Utc>) -> Option<MetricSample> {
        let entity_id = self.key()?;
        let num = |n: Option<Number>| n.as_ref().and_then(Number::to_f64);
        Some(MetricSample {
            entity_id,
            timestamp: self.ts.unwrap_or(fallback_ts),
            cpu_percent: num(self.cpu_percent),
            memory_used_bytes: num(self.memory_used),
            memory_limit_bytes: num(self.memory_limit),
            network_rx_bytes: num(self.network_rx),
            network_tx_bytes: num(self.network_tx),
            block_read_bytes: num(self.block_read),
            block_write_bytes: num(self.block_write),
        })
    }
}

fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| serde_json::from_value(v).ok()))
}

// RFC 3339 string or epoch milliseconds.
fn lenient_ts<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

/// Named numeric fields of a [`MetricSample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    CpuPercent,
    MemoryUsedBytes,
    MemoryLimitBytes,
    NetworkRxBytes,
    NetworkTxBytes,
    BlockReadBytes,
    BlockWriteBytes,
}

impl MetricField {
    pub const ALL: [MetricField; 7] = [
        MetricField::CpuPercent,
        MetricField::MemoryUsedBytes,
        MetricField::MemoryLimitBytes,
        MetricField::NetworkRxBytes,
        MetricField::NetworkTxBytes,
        MetricField::BlockReadBytes,
        MetricField::BlockWriteBytes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricField::CpuPercent => "cpuPercent",
            MetricField::MemoryUsedBytes => "memoryUsedBytes",
            MetricField::MemoryLimitBytes => "memoryLimitBytes",
            MetricField::NetworkRxBytes => "networkRxBytes",
            MetricField::NetworkTxBytes => "networkTxBytes",
            MetricField::BlockReadBytes => "blockReadBytes",
            MetricField::BlockWriteBytes => "blockWriteBytes",
        }
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| *c != '_').collect();
        MetricField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown metric field '{s}'"))
    }
}

/// Snapshot of one container at one refresh tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: Option<f64>,
    pub memory_used_bytes: Option<f64>,
    pub memory_limit_bytes: Option<f64>,
    pub network_rx_bytes: Option<f64>,
    pub network_tx_bytes: Option<f64>,
    pub block_read_bytes: Option<f64>,
    pub block_write_bytes: Option<f64>,
}

impl MetricSample {
    /// A sample with every numeric field missing.
    pub fn new(entity_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.into(),
            timestamp,
            cpu_percent: None,
            memory_used_bytes: None,
            memory_limit_bytes: None,
            network_rx_bytes: None,
            network_tx_bytes: None,
            block_read_bytes: None,
            block_write_bytes: None,
        }
    }

    pub fn with(mut self, field: MetricField, value: f64) -> Self {
        *self.slot(field) = Some(value);
        self
    }

    pub fn get(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::CpuPercent => self.cpu_percent,
            MetricField::MemoryUsedBytes => self.memory_used_bytes,
            MetricField::MemoryLimitBytes => self.memory_limit_bytes,
            MetricField::NetworkRxBytes => self.network_rx_bytes,
            MetricField::NetworkTxBytes => self.network_tx_bytes,
            MetricField::BlockReadBytes => self.block_read_bytes,
            MetricField::BlockWriteBytes => self.block_write_bytes,
        }
    }

    fn slot(&mut self, field: MetricField) -> &mut Option<f64> {
        match field {
            MetricField::CpuPercent => &mut self.cpu_percent,
            MetricField::MemoryUsedBytes => &mut self.memory_used_bytes,
            MetricField::MemoryLimitBytes => &mut self.memory_limit_bytes,
            MetricField::NetworkRxBytes => &mut self.network_rx_bytes,
            MetricField::NetworkTxBytes => &mut self.network_tx_bytes,
            MetricField::BlockReadBytes => &mut self.block_read_bytes,
            MetricField::BlockWriteBytes => &mut self.block_write_bytes,
        }
    }
}

/// A single log record yielded by a deploy action or a container log tail.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LogRecord {
    Text(String),
    Structured {
        line: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stream: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ts: Option<DateTime<Utc>>,
    },
}

impl LogRecord {
    /// Text to write to the terminal. stderr lines are tinted red.
    pub fn content(&self) -> String {
        match self {
            LogRecord::Text(s) => s.clone(),
            LogRecord::Structured { line, stream, .. } => match stream.as_deref() {
                Some("stderr") => format!("\x1b[31m{line}\x1b[0m"),
                _ => line.clone(),
            },
        }
    }
}

impl From<&str> for LogRecord {
    fn from(s: &str) -> Self {
        LogRecord::Text(s.to_string())
    }
}

impl From<String> for LogRecord {
    fn from(s: String) -> Self {
        LogRecord::Text(s)
    }
}

/// One frame of a log stream connection.
///
/// Control frames are objects tagged with `"type"` and nothing else besides
/// their payload: `{"type":"end"}` and `{"type":"error","error":"..."}`.
/// `{"type":"record","line":...}` carries a structured record. Every other
/// frame is a log line, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    End,
    Failure(String),
    Record(LogRecord),
}

impl StreamFrame {
    pub fn parse(text: &str) -> StreamFrame {
        let verbatim = || StreamFrame::Record(LogRecord::from(text));
        let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(text) else {
            return verbatim();
        };
        match map.get("type").and_then(Value::as_str) {
            Some("end") if map.len() == 1 => StreamFrame::End,
            Some("error") if map.len() == 2 => match map.get("error").and_then(Value::as_str) {
                Some(e) => StreamFrame::Failure(e.to_string()),
                None => verbatim(),
            },
            Some("record") => {
                map.remove("type");
                structured(map).map(StreamFrame::Record).unwrap_or_else(verbatim)
            }
            _ => verbatim(),
        }
    }
}

fn structured(map: Map<String, Value>) -> Option<LogRecord> {
    match serde_json::from_value(Value::Object(map)).ok()? {
        r @ LogRecord::Structured { .. } => Some(r),
        LogRecord::Text(_) => None,
    }
}
