use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use ulid::Ulid;

const RECORD_PREFIX: &str = "machine_";
const RECORD_SUFFIX: &str = ".json";

/// Keyed persistence for durable record bytes.
///
/// `put` must be atomic per key: a concurrent `get` returns either the
/// previous bytes or the new bytes, never a mix of both.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// All keys that currently hold a record, in no particular order.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// One file per machine under `base_path`: `machine_{id}.json`
pub struct FsRecordBackend {
    base_path: PathBuf,
}

impl FsRecordBackend {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join(format!("{}{}{}", RECORD_PREFIX, key, RECORD_SUFFIX))
    }

    // Dot-prefixed so an interrupted write never shows up in `keys`.
    fn temp_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!(
            ".{}{}{}.{}.tmp",
            RECORD_PREFIX,
            key,
            RECORD_SUFFIX,
            Ulid::new()
        ))
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

fn key_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(RECORD_PREFIX)?
        .strip_suffix(RECORD_SUFFIX)
        .filter(|key| !key.is_empty())
}

#[async_trait]
impl RecordBackend for FsRecordBackend {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let record_path = self.record_path(key);

        // Write to temporary file first, then rename for atomicity
        let temp_path = self.temp_path(key);
        if let Err(e) = write_synced(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &record_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!("Stored record for machine {} at {:?}", key, record_path);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match fs::read(self.record_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry {:?}: {}", entry.path(), e);
                    continue;
                }
            }

            if let Some(key) = entry.file_name().to_str().and_then(key_from_file_name) {
                keys.push(key.to_string());
            }
        }

        Ok(keys)
    }
}

/// Volatile backend; records live as long as the process.
#[derive(Default)]
pub struct MemoryRecordBackend {
    records: RwLock<HashMap<String, Bytes>>,
}

impl MemoryRecordBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordBackend for MemoryRecordBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.records.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}
