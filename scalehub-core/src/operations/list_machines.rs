use crate::{MachineStore, ObservationRecord, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct ListMachinesOperation {
    store: Arc<MachineStore>,
}

#[derive(Debug, Clone)]
pub struct ListMachinesOperationResult {
    /// sorted by machine id
    pub machines: Vec<ObservationRecord>,
}

impl ListMachinesOperation {
    pub fn new(store: Arc<MachineStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> Result<ListMachinesOperationResult> {
        let machines = self.store.list().await?;
        Ok(ListMachinesOperationResult { machines })
    }
}
