use super::backend::{FsRecordBackend, MemoryRecordBackend, RecordBackend};
use crate::{Result, ScaleError};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RecordBackendBuilder {
    backend: Option<String>,
    data_dir: Option<PathBuf>,
}

impl RecordBackendBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    fn resolve_backend(&self) -> Result<String> {
        let backend = self
            .backend
            .as_deref()
            .unwrap_or("fs")
            .trim()
            .to_ascii_lowercase();

        if backend.is_empty() {
            return Err(ScaleError::Config(
                "storage backend cannot be empty".to_string(),
            ));
        }

        Ok(backend)
    }

    pub fn build(&self) -> Result<Arc<dyn RecordBackend>> {
        let backend = self.resolve_backend()?;

        match backend.as_str() {
            "fs" => {
                let data_dir = self.data_dir.clone().ok_or_else(|| {
                    ScaleError::Config("data_dir is required for fs backend".to_string())
                })?;

                if data_dir.as_os_str().is_empty() {
                    return Err(ScaleError::Config(
                        "data_dir cannot be empty for fs backend".to_string(),
                    ));
                }

                let store = FsRecordBackend::new(data_dir)?;
                Ok(Arc::new(store))
            }
            "memory" => Ok(Arc::new(MemoryRecordBackend::new())),
            other => Err(ScaleError::Config(format!(
                "unsupported storage backend: {}",
                other
            ))),
        }
    }
}
