use super::backend::RecordBackend;
use super::record_codec::{ObservationRecord, decode_record, encode_record};
use crate::error::{Result, ScaleError};
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Latest-value store: one record per machine, overwritten on every put.
///
/// Writers to the same machine are serialized through a per-machine mutex.
/// Readers never take a lock and rely on the backend's atomic put instead.
pub struct MachineStore {
    backend: Arc<dyn RecordBackend>,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MachineStore {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn write_lock(&self, machine_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().await;
        locks.entry(machine_id.to_string()).or_default().clone()
    }

    // Drop the table entry once no other writer holds or waits on it.
    async fn release_write_lock(&self, machine_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.write_locks.lock().await;
        let idle = locks
            .get(machine_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(machine_id);
        }
    }

    #[cfg(test)]
    async fn tracked_write_locks(&self) -> usize {
        self.write_locks.lock().await.len()
    }

    /// Record `weight` as the latest observation for `machine_id`.
    ///
    /// Returns the ingestion timestamp. The timestamp is taken while holding
    /// the machine's write lock, so timestamps of one machine follow commit
    /// order.
    pub async fn put(&self, machine_id: &str, weight: f64) -> Result<DateTime<Utc>> {
        let lock = self.write_lock(machine_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.put_locked(machine_id, weight).await
        };
        self.release_write_lock(machine_id, lock).await;
        result
    }

    async fn put_locked(&self, machine_id: &str, weight: f64) -> Result<DateTime<Utc>> {
        let record = ObservationRecord {
            machine_id: machine_id.to_string(),
            weight,
            observed_at: Utc::now().trunc_subsecs(6),
        };

        let data = encode_record(&record)?;
        self.backend.put(machine_id, data).await?;

        tracing::debug!(
            "Machine {} weight={} observed_at={}",
            machine_id,
            weight,
            record.timestamp()
        );
        Ok(record.observed_at)
    }

    /// Current record for `machine_id`, or `None` when it has never reported.
    ///
    /// A record that cannot be decoded is logged and reported as absent.
    pub async fn get(&self, machine_id: &str) -> Result<Option<ObservationRecord>> {
        let Some(data) = self.backend.get(machine_id).await? else {
            return Ok(None);
        };

        match decode_record(machine_id, &data) {
            Ok(record) => Ok(Some(record)),
            Err(ScaleError::CorruptRecord { machine_id, reason }) => {
                tracing::warn!("Ignoring corrupt record for machine {}: {}", machine_id, reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Every machine with a readable record, sorted by identifier.
    ///
    /// An unreadable key space lists as empty; the failure is only logged.
    pub async fn list(&self) -> Result<Vec<ObservationRecord>> {
        let mut keys = match self.backend.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(
                    "Failed to enumerate machines on {} backend: {}",
                    self.backend.name(),
                    e
                );
                return Ok(Vec::new());
            }
        };
        keys.sort();
        keys.dedup();

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let data = match self.backend.get(&key).await {
                Ok(Some(data)) => data,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Skipping machine {} in listing: {}", key, e);
                    continue;
                }
            };

            match decode_record(&key, &data) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping machine {} in listing: {}", key, e);
                }
            }
        }

        Ok(records)
    }
}
