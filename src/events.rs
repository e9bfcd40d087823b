//! Vehicle-detection event records as delivered by the ingestion service.
//!
//! Decoding is forgiving: individual fields that are missing or
//! carry an unexpected JSON type are normalized to "absent" instead of failing
//! the whole record. Only a body that is not a JSON array is rejected. Numbers
//! are kept in their textual form (`arbitrary_precision`), so an out-of-range
//! literal never fails the collection.
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct EventRecord {
    /// Opaque rendering key, passed through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Raw capture time; see [`EventRecord::captured_at`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub vehicle_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub material_type: Option<String>,
    /// Raw value as received; see [`EventRecord::load_reading`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_percentage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_exit: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,
    /// Fields this service does not know about, re-emitted unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventRecord {
    /// Numeric load reading, if the raw value is a finite number or a string
    /// holding one. Out-of-range values are returned as-is.
    pub fn load_reading(&self) -> Option<f64> {
        let reading = match self.load_percentage.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }?;
        reading.is_finite().then_some(reading)
    }

    /// Capture time from `timestamp`: a date-time string or integer epoch
    /// milliseconds. `None` when absent or unparseable.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        match self.timestamp.as_ref()? {
            Value::String(s) => parse_timestamp(s),
            Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
            _ => None,
        }
    }

    /// Builds a record from an arbitrary JSON element. Anything that is not
    /// an object yields a record with every field absent.
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            debug!(element = %value, "Event element is not an object; treating all fields as absent.");
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_else(|e| {
            debug!(error = %e, "Event object could not be decoded; treating all fields as absent.");
            Self::default()
        })
    }
}

/// Decodes a full event collection. Each element is decoded on its own, so a
/// malformed element never drops its neighbours.
pub fn decode_collection(body: &[u8]) -> Result<Vec<EventRecord>, serde_json::Error> {
    let elements: Vec<Value> = serde_json::from_slice(body)?;
    Ok(elements.into_iter().map(EventRecord::from_value).collect())
}

/// Accepts RFC 3339, or a naive ISO-8601 date-time which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}
