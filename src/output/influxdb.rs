//! InfluxDB line protocol output formatter.

use crate::location::{LocationMap, resolve};
use crate::output::SnapshotFormatter;
use crate::snapshot::Snapshot;
use crate::transmitter::TrackedTransmitter;
use std::collections::BTreeMap;
use std::fmt;
#[cfg(test)]
use std::time::Duration;
use std::time::SystemTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
    pub timestamp: Option<SystemTime>,
}

/// Escape commas, equals signs and spaces in a tag value.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn fmt_tags(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    for (key, value) in data_point.tag_set.iter() {
        write!(fmt, ",{}={}", key, escape_tag(value))?;
    }
    Ok(())
}

fn fmt_fields(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    let mut first = true;
    for (key, value) in data_point.field_set.iter() {
        if first {
            first = false;
        } else {
            write!(fmt, ",")?;
        }
        write!(fmt, "{}={}", key, value)?;
    }
    Ok(())
}

fn fmt_timestamp(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    let since_epoch = data_point
        .timestamp
        .and_then(|time| time.duration_since(SystemTime::UNIX_EPOCH).ok());
    if let Some(elapsed) = since_epoch {
        write!(fmt, " {}", elapsed.as_nanos())?;
    }
    Ok(())
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        fmt_tags(self, fmt)?;
        write!(fmt, " ")?;
        fmt_fields(self, fmt)?;
        fmt_timestamp(self, fmt)
    }
}

/// InfluxDB line protocol formatter.
///
/// Emits one point per ranked beacon, tagged with its identifiers, its rank
/// and, when known, its location label. An empty snapshot yields no lines.
pub struct InfluxDbFormatter {
    /// The measurement name in InfluxDB
    measurement_name: String,
}

impl InfluxDbFormatter {
    /// Create a new InfluxDB formatter.
    ///
    /// # Arguments
    /// * `measurement_name` - The measurement name to use in the line protocol
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn tag_set(
        &self,
        rank: usize,
        entry: &TrackedTransmitter,
        locations: &LocationMap,
    ) -> BTreeMap<String, String> {
        let key = entry.key();
        let mut tags = BTreeMap::new();
        tags.insert("uuid".to_string(), key.uuid.hyphenated().to_string());
        tags.insert("major".to_string(), key.major.to_string());
        tags.insert("minor".to_string(), key.minor.to_string());
        tags.insert("rank".to_string(), rank.to_string());
        if let Some(label) = resolve(key.minor, locations) {
            tags.insert("location".to_string(), label.to_string());
        }
        tags
    }

    fn field_set(&self, entry: &TrackedTransmitter) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        fields.insert(
            "rssi".to_string(),
            FieldValue::Integer(i64::from(entry.signal_strength)),
        );
        fields.insert(
            "tx_power".to_string(),
            FieldValue::Integer(i64::from(entry.reference_tx_power)),
        );
        fields.insert(
            "distance".to_string(),
            FieldValue::Float(entry.estimated_distance),
        );
        fields
    }

    fn to_data_point(
        &self,
        rank: usize,
        entry: &TrackedTransmitter,
        locations: &LocationMap,
        timestamp: SystemTime,
    ) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: self.tag_set(rank, entry, locations),
            field_set: self.field_set(entry),
            timestamp: Some(timestamp),
        }
    }
}

impl SnapshotFormatter for InfluxDbFormatter {
    fn format(&self, snapshot: &Snapshot, locations: &LocationMap) -> String {
        let timestamp = SystemTime::now();
        snapshot
            .ranked()
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                self.to_data_point(index + 1, entry, locations, timestamp)
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
