use super::validate::validate_machine_id;
use crate::{MachineStore, ObservationRecord, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct GetLatestWeightOperation {
    store: Arc<MachineStore>,
}

#[derive(Debug, Clone)]
pub struct GetLatestWeightOperationRequest {
    pub machine_id: String,
}

#[derive(Debug, Clone)]
pub enum GetLatestWeightOperationOutcome {
    Found(ObservationRecord),
    /// the machine has not reported yet
    NotFound,
}

impl GetLatestWeightOperation {
    pub fn new(store: Arc<MachineStore>) -> Self {
        Self { store }
    }

    pub async fn run(
        &self,
        request: GetLatestWeightOperationRequest,
    ) -> Result<GetLatestWeightOperationOutcome> {
        validate_machine_id(&request.machine_id)?;

        match self.store.get(&request.machine_id).await? {
            Some(record) => Ok(GetLatestWeightOperationOutcome::Found(record)),
            None => Ok(GetLatestWeightOperationOutcome::NotFound),
        }
    }
}
