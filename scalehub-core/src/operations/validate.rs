use crate::{Result, ScaleError};
use serde::de::IgnoredAny;
use serde_json::Value;
use std::collections::HashMap;

pub const MISSING_WEIGHT_MESSAGE: &str = "No weight data provided";
pub const INVALID_WEIGHT_MESSAGE: &str = "Invalid weight format";

const MAX_MACHINE_ID_LEN: usize = 128;

/// Machine identifiers address a file in a shared directory, so only a
/// conservative character set is accepted.
pub fn validate_machine_id(machine_id: &str) -> Result<()> {
    if machine_id.is_empty() {
        return Err(ScaleError::InvalidRequest(
            "machine id cannot be empty".to_string(),
        ));
    }

    if machine_id.len() > MAX_MACHINE_ID_LEN {
        return Err(ScaleError::InvalidRequest(format!(
            "machine id longer than {} characters",
            MAX_MACHINE_ID_LEN
        )));
    }

    if machine_id == "." || machine_id == ".." {
        return Err(ScaleError::InvalidRequest(format!(
            "invalid machine id: {}",
            machine_id
        )));
    }

    if let Some(bad) = machine_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(ScaleError::InvalidRequest(format!(
            "invalid character {:?} in machine id",
            bad
        )));
    }

    Ok(())
}

/// Extract a finite weight from a raw `{"weight": ...}` body.
///
/// Numeric strings such as `"12.5"` are accepted alongside JSON numbers.
pub fn parse_weight_payload(payload: &[u8]) -> Result<f64> {
    let missing = || ScaleError::InvalidPayload(MISSING_WEIGHT_MESSAGE.to_string());

    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(missing());
    }

    let body: Value = match serde_json::from_slice(payload) {
        Ok(body) => body,
        Err(_) if has_weight_field(payload) => {
            return Err(ScaleError::InvalidPayload(INVALID_WEIGHT_MESSAGE.to_string()));
        }
        Err(_) => return Err(missing()),
    };
    let raw_weight = body
        .as_object()
        .and_then(|fields| fields.get("weight"))
        .ok_or_else(missing)?;

    let weight = match raw_weight {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    weight
        .filter(|w| w.is_finite())
        .ok_or_else(|| ScaleError::InvalidPayload(INVALID_WEIGHT_MESSAGE.to_string()))
}

// Numbers beyond f64 range fail to parse as a `Value` but skip cleanly here.
fn has_weight_field(payload: &[u8]) -> bool {
    serde_json::from_slice::<HashMap<String, IgnoredAny>>(payload)
        .map(|fields| fields.contains_key("weight"))
        .unwrap_or(false)
}
