pub mod get_latest_weight;
pub mod health;
pub mod list_machines;
pub mod submit_weight;
pub mod validate;

pub use get_latest_weight::{
    GetLatestWeightOperation, GetLatestWeightOperationOutcome, GetLatestWeightOperationRequest,
};
pub use health::{HealthOperation, HealthOperationResult};
pub use list_machines::{ListMachinesOperation, ListMachinesOperationResult};
pub use submit_weight::{
    SubmitWeightOperation, SubmitWeightOperationRequest, SubmitWeightOperationResult,
};
pub use validate::{
    INVALID_WEIGHT_MESSAGE, MISSING_WEIGHT_MESSAGE, parse_weight_payload, validate_machine_id,
};
