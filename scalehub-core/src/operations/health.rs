use crate::{MachineStore, Result};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct HealthOperation {
    store: Arc<MachineStore>,
}

#[derive(Debug, Clone)]
pub struct HealthOperationResult {
    pub machines_count: usize,
    pub checked_at: DateTime<Utc>,
}

impl HealthOperation {
    pub fn new(store: Arc<MachineStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> Result<HealthOperationResult> {
        let machines = self.store.list().await?;
        Ok(HealthOperationResult {
            machines_count: machines.len(),
            checked_at: Utc::now().trunc_subsecs(6),
        })
    }
}
