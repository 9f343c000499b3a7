//! Storage modules for Scalehub
//!
//! Provides the durable record codec, keyed record backends and the
//! per-machine latest-value store built on top of them.

pub mod backend;
pub mod factory;
pub mod machine_store;
pub mod record_codec;

pub use backend::{FsRecordBackend, MemoryRecordBackend, RecordBackend};
pub use factory::RecordBackendBuilder;
pub use machine_store::MachineStore;
pub use record_codec::{ObservationRecord, decode_record, encode_record, format_timestamp};
