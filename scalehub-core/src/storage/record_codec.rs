use crate::error::{Result, ScaleError};
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Human readable form kept next to the machine timestamp.
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Latest weight observation for one machine
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub machine_id: String,
    /// kilograms
    pub weight: f64,
    /// ingestion time assigned by the server
    pub observed_at: DateTime<Utc>,
}

impl ObservationRecord {
    /// RFC 3339 timestamp as exposed over the API.
    pub fn timestamp(&self) -> String {
        format_timestamp(&self.observed_at)
    }

    pub fn last_updated(&self) -> String {
        self.observed_at.format(LAST_UPDATED_FORMAT).to_string()
    }
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// On-disk shape, one JSON object per machine file
#[derive(Debug, Serialize, Deserialize)]
struct DurableRecord {
    machine_id: String,
    weight: f64,
    timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

pub fn encode_record(record: &ObservationRecord) -> Result<Bytes> {
    if !record.weight.is_finite() {
        return Err(ScaleError::Internal(format!(
            "refusing to encode non-finite weight for machine {}",
            record.machine_id
        )));
    }

    let durable = DurableRecord {
        machine_id: record.machine_id.clone(),
        weight: record.weight,
        timestamp: record.timestamp(),
        last_updated: Some(record.last_updated()),
    };

    let data = serde_json::to_vec(&durable)
        .map_err(|e| ScaleError::Internal(format!("failed to encode record: {}", e)))?;
    Ok(Bytes::from(data))
}

/// Decode the durable bytes stored under `machine_id`.
///
/// The stored identifier must match the key it was read from; `last_updated`
/// is derived from `timestamp` and is not trusted on the way back in.
pub fn decode_record(machine_id: &str, data: &[u8]) -> Result<ObservationRecord> {
    let corrupt = |reason: String| ScaleError::CorruptRecord {
        machine_id: machine_id.to_string(),
        reason,
    };

    let durable: DurableRecord =
        serde_json::from_slice(data).map_err(|e| corrupt(format!("malformed json: {}", e)))?;

    if durable.machine_id != machine_id {
        return Err(corrupt(format!(
            "record belongs to machine {}",
            durable.machine_id
        )));
    }

    if !durable.weight.is_finite() {
        return Err(corrupt("weight is not finite".to_string()));
    }

    let observed_at = parse_timestamp(&durable.timestamp)
        .ok_or_else(|| corrupt(format!("invalid timestamp: {}", durable.timestamp)))?;

    Ok(ObservationRecord {
        machine_id: durable.machine_id,
        weight: durable.weight,
        observed_at,
    })
}

// Older files carry a naive local ISO timestamp without an offset; read those as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
