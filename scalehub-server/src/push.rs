//! Device side of the relay: report one reading to a running hub.

use anyhow::{Context, bail};
use scalehub_core::validate_machine_id;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PushAck {
    pub machine_id: String,
    pub weight: f64,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
struct PushReply {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    ack: Option<PushAck>,
}

pub async fn push_weight(base_url: &str, machine_id: &str, weight: f64) -> anyhow::Result<PushAck> {
    validate_machine_id(machine_id)?;
    if !weight.is_finite() {
        bail!("weight must be a finite number");
    }

    let url = format!(
        "{}/api/update/{}",
        base_url.trim_end_matches('/'),
        machine_id
    );

    let response = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "weight": weight }))
        .send()
        .await
        .with_context(|| format!("failed to reach {}", url))?;

    let http_status = response.status();
    let reply: PushReply = response
        .json()
        .await
        .with_context(|| format!("unexpected reply from {} ({})", url, http_status))?;

    if reply.status != "success" {
        bail!(
            "hub rejected reading ({}): {}",
            http_status,
            reply.message.unwrap_or_else(|| "no message".to_string())
        );
    }

    reply
        .ack
        .with_context(|| format!("acknowledgement from {} is incomplete", url))
}
