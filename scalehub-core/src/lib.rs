//! Scalehub Core - latest-value weight store for remote scale devices
//!
//! Each machine keeps exactly one record:
//! - the most recent weight reading (kilograms)
//! - the server-side ingestion timestamp
//!
//! Records are persisted through a pluggable `RecordBackend`; the default
//! backend writes one JSON file per machine using write-temp-then-rename.

pub mod error;
pub mod operations;
pub mod storage;

pub use error::{Result, ScaleError};
pub use operations::{
    GetLatestWeightOperation, GetLatestWeightOperationOutcome, GetLatestWeightOperationRequest,
    HealthOperation, HealthOperationResult, INVALID_WEIGHT_MESSAGE, ListMachinesOperation,
    ListMachinesOperationResult, MISSING_WEIGHT_MESSAGE, SubmitWeightOperation,
    SubmitWeightOperationRequest, SubmitWeightOperationResult, parse_weight_payload,
    validate_machine_id,
};
pub use storage::{
    FsRecordBackend, MachineStore, MemoryRecordBackend, ObservationRecord, RecordBackend,
    RecordBackendBuilder, decode_record, encode_record, format_timestamp,
};
