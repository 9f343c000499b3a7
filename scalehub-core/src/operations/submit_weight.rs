use super::validate::{parse_weight_payload, validate_machine_id};
use crate::{MachineStore, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct SubmitWeightOperation {
    store: Arc<MachineStore>,
}

#[derive(Debug, Clone)]
pub struct SubmitWeightOperationRequest {
    pub machine_id: String,
    /// raw request body, expected to be `{"weight": <number>}`
    pub payload: Bytes,
}

#[derive(Debug, Clone)]
pub struct SubmitWeightOperationResult {
    pub machine_id: String,
    pub weight: f64,
    pub observed_at: DateTime<Utc>,
}

impl SubmitWeightOperation {
    pub fn new(store: Arc<MachineStore>) -> Self {
        Self { store }
    }

    pub async fn run(
        &self,
        request: SubmitWeightOperationRequest,
    ) -> Result<SubmitWeightOperationResult> {
        let SubmitWeightOperationRequest {
            machine_id,
            payload,
        } = request;

        validate_machine_id(&machine_id)?;
        let weight = parse_weight_payload(&payload)?;

        let observed_at = self.store.put(&machine_id, weight).await?;

        Ok(SubmitWeightOperationResult {
            machine_id,
            weight,
            observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{
        GetLatestWeightOperation, GetLatestWeightOperationOutcome, GetLatestWeightOperationRequest,
    };
    use crate::storage::machine_store::tests::FlakyBackend;
    use crate::{FsRecordBackend, ScaleError};
    use chrono::SubsecRound;

    fn submit_request(machine_id: &str, payload: &'static str) -> SubmitWeightOperationRequest {
        SubmitWeightOperationRequest {
            machine_id: machine_id.to_string(),
            payload: Bytes::from_static(payload.as_bytes()),
        }
    }

    async fn latest(store: &Arc<MachineStore>, machine_id: &str) -> GetLatestWeightOperationOutcome {
        GetLatestWeightOperation::new(store.clone())
            .run(GetLatestWeightOperationRequest {
                machine_id: machine_id.to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_get_latest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FsRecordBackend::new(temp_dir.path().to_path_buf()).unwrap());
        let store = Arc::new(MachineStore::new(backend));
        let op = SubmitWeightOperation::new(store.clone());

        let called_at = Utc::now().trunc_subsecs(6);
        let ack = tokio_test::assert_ok!(op.run(submit_request("1", r#"{"weight": 12.5}"#)).await);
        assert_eq!(ack.machine_id, "1");
        assert_eq!(ack.weight, 12.5);
        assert!(ack.observed_at >= called_at);

        match latest(&store, "1").await {
            GetLatestWeightOperationOutcome::Found(record) => {
                assert_eq!(record.weight, 12.5);
                assert_eq!(record.observed_at, ack.observed_at);
            }
            GetLatestWeightOperationOutcome::NotFound => panic!("record should exist"),
        }
    }

    #[tokio::test]
    async fn test_invalid_payload_leaves_store_untouched() {
        let store = Arc::new(MachineStore::new(Arc::new(crate::MemoryRecordBackend::new())));
        let op = SubmitWeightOperation::new(store.clone());

        let err = op
            .run(submit_request("5", r#"{"weight": "abc"}"#))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(
            latest(&store, "5").await,
            GetLatestWeightOperationOutcome::NotFound
        ));

        op.run(submit_request("5", r#"{"weight": 3}"#)).await.unwrap();
        op.run(submit_request("5", r#"{}"#)).await.unwrap_err();
        match latest(&store, "5").await {
            GetLatestWeightOperationOutcome::Found(record) => assert_eq!(record.weight, 3.0),
            GetLatestWeightOperationOutcome::NotFound => panic!("record should survive"),
        }
    }

    #[tokio::test]
    async fn test_invalid_machine_id_rejected() {
        let store = Arc::new(MachineStore::new(Arc::new(crate::MemoryRecordBackend::new())));
        let op = SubmitWeightOperation::new(store.clone());

        let err = op
            .run(submit_request("../x", r#"{"weight": 1}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ScaleError::InvalidRequest(_)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_isolated() {
        let backend = Arc::new(FlakyBackend::default());
        let store = Arc::new(MachineStore::new(backend.clone()));
        let op = SubmitWeightOperation::new(store.clone());

        op.run(submit_request("1", r#"{"weight": 10}"#)).await.unwrap();
        backend.fail_puts_for("1");

        let err = op
            .run(submit_request("1", r#"{"weight": 20}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ScaleError::Persistence(_)));
        assert!(!err.is_client_error());

        op.run(submit_request("2", r#"{"weight": 30}"#)).await.unwrap();

        match latest(&store, "1").await {
            GetLatestWeightOperationOutcome::Found(record) => assert_eq!(record.weight, 10.0),
            GetLatestWeightOperationOutcome::NotFound => panic!("record for 1 was lost"),
        }
        match latest(&store, "2").await {
            GetLatestWeightOperationOutcome::Found(record) => assert_eq!(record.weight, 30.0),
            GetLatestWeightOperationOutcome::NotFound => panic!("record for 2 missing"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_distinct_machines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FsRecordBackend::new(temp_dir.path().to_path_buf()).unwrap());
        let store = Arc::new(MachineStore::new(backend));
        let op = SubmitWeightOperation::new(store.clone());

        let machines = 24;
        let mut handles = Vec::new();
        for i in 0..machines {
            let op = op.clone();
            handles.push(tokio::spawn(async move {
                op.run(SubmitWeightOperationRequest {
                    machine_id: format!("m{}", i),
                    payload: Bytes::from(format!(r#"{{"weight": {}}}"#, i)),
                })
                .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        for i in 0..machines {
            match latest(&store, &format!("m{}", i)).await {
                GetLatestWeightOperationOutcome::Found(record) => {
                    assert_eq!(record.weight, i as f64)
                }
                GetLatestWeightOperationOutcome::NotFound => panic!("m{} missing", i),
            }
        }
        assert_eq!(store.list().await.unwrap().len(), machines);
    }
}
