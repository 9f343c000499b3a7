use crate::config::Config;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use scalehub_core::{
    GetLatestWeightOperation, GetLatestWeightOperationOutcome, GetLatestWeightOperationRequest,
    HealthOperation, ListMachinesOperation, MachineStore, Result, ScaleError,
    SubmitWeightOperation, SubmitWeightOperationRequest, format_timestamp,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct ServerState {
    pub submit_weight: SubmitWeightOperation,
    pub get_latest_weight: GetLatestWeightOperation,
    pub list_machines: ListMachinesOperation,
    pub health: HealthOperation,
}

impl ServerState {
    pub fn new(store: Arc<MachineStore>) -> Self {
        Self {
            submit_weight: SubmitWeightOperation::new(store.clone()),
            get_latest_weight: GetLatestWeightOperation::new(store.clone()),
            list_machines: ListMachinesOperation::new(store.clone()),
            health: HealthOperation::new(store),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    status: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct WeightResponse {
    status: &'static str,
    machine_id: String,
    weight: f64,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    status: &'static str,
    message: String,
    machine_id: String,
    weight: f64,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct MachineSummaryResponse {
    machine_id: String,
    weight: f64,
    last_updated: String,
}

#[derive(Debug, Serialize)]
struct MachinesResponse {
    status: &'static str,
    machines: Vec<MachineSummaryResponse>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    machines_count: usize,
}

pub async fn run_server(config: Config) -> Result<()> {
    let backend = config.record_backend_builder().build()?;
    tracing::info!(
        "Using {} storage backend (data dir {:?})",
        backend.name(),
        config.storage.data_dir
    );

    let store = Arc::new(MachineStore::new(backend));
    let app = build_router(Arc::new(ServerState::new(store)));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| ScaleError::Config(format!("failed to bind {}: {}", config.bind_addr, e)))?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ScaleError::Http(e.to_string()))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/weight/:machine_id", get(get_weight))
        .route("/api/update/:machine_id", post(update_weight))
        .route("/api/machines", get(list_machines))
        .route("/api/health", get(health_handler))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn message_response(status_code: StatusCode, status: &'static str, message: String) -> Response {
    (status_code, Json(MessageResponse { status, message })).into_response()
}

/// Client errors echo their message; anything else is logged and replaced
/// by `server_message`.
fn error_response(error: ScaleError, server_message: &str) -> Response {
    match error {
        ScaleError::InvalidPayload(message) | ScaleError::InvalidRequest(message) => {
            message_response(StatusCode::BAD_REQUEST, "error", message)
        }
        other => {
            tracing::error!("{}: {}", server_message, other);
            message_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                server_message.to_string(),
            )
        }
    }
}

async fn get_weight(
    State(state): State<Arc<ServerState>>,
    Path(machine_id): Path<String>,
) -> Response {
    let request = GetLatestWeightOperationRequest {
        machine_id: machine_id.clone(),
    };

    match state.get_latest_weight.run(request).await {
        Ok(GetLatestWeightOperationOutcome::Found(record)) => {
            let resp = WeightResponse {
                status: "success",
                timestamp: record.timestamp(),
                machine_id: record.machine_id,
                weight: record.weight,
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Ok(GetLatestWeightOperationOutcome::NotFound) => message_response(
            StatusCode::OK,
            "no_data",
            format!("No weight data available for Machine {}", machine_id),
        ),
        Err(e) => error_response(e, "Failed to load weight data"),
    }
}

async fn update_weight(
    State(state): State<Arc<ServerState>>,
    Path(machine_id): Path<String>,
    body: Bytes,
) -> Response {
    let request = SubmitWeightOperationRequest {
        machine_id,
        payload: body,
    };

    match state.submit_weight.run(request).await {
        Ok(ack) => {
            tracing::info!("Machine {} reported {} kg", ack.machine_id, ack.weight);
            let resp = UpdateResponse {
                status: "success",
                message: format!("Weight updated for Machine {}", ack.machine_id),
                timestamp: format_timestamp(&ack.observed_at),
                machine_id: ack.machine_id,
                weight: ack.weight,
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(e) => error_response(e, "Failed to save weight data"),
    }
}

async fn list_machines(State(state): State<Arc<ServerState>>) -> Response {
    match state.list_machines.run().await {
        Ok(result) => {
            let machines: Vec<MachineSummaryResponse> = result
                .machines
                .into_iter()
                .map(|record| MachineSummaryResponse {
                    last_updated: record.last_updated(),
                    machine_id: record.machine_id,
                    weight: record.weight,
                })
                .collect();

            let resp = MachinesResponse {
                status: "success",
                count: machines.len(),
                machines,
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(e) => error_response(e, "Failed to list machines"),
    }
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.health.run().await {
        Ok(result) => {
            let resp = HealthResponse {
                status: "healthy",
                timestamp: format_timestamp(&result.checked_at),
                machines_count: result.machines_count,
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(e) => error_response(e, "Health check failed"),
    }
}

async fn not_found() -> Response {
    message_response(
        StatusCode::NOT_FOUND,
        "error",
        "Endpoint not found".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use scalehub_core::{FsRecordBackend, MemoryRecordBackend};
    use serde_json::Value;
    use tower::ServiceExt;

    fn memory_app() -> Router {
        let store = Arc::new(MachineStore::new(Arc::new(MemoryRecordBackend::new())));
        build_router(Arc::new(ServerState::new(store)))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_get_weight_no_data() {
        let app = memory_app();
        let (status, body) = call(&app, Method::GET, "/api/weight/2", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no_data");
        assert_eq!(body["message"], "No weight data available for Machine 2");
    }

    #[tokio::test]
    async fn test_update_then_get() {
        let app = memory_app();

        let (status, ack) = call(&app, Method::POST, "/api/update/1", r#"{"weight": 10.5}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], "success");
        assert_eq!(ack["message"], "Weight updated for Machine 1");
        assert_eq!(ack["machine_id"], "1");
        assert_eq!(ack["weight"], 10.5);

        let (_, ack) = call(&app, Method::POST, "/api/update/1", r#"{"weight": 12.0}"#).await;

        let (status, body) = call(&app, Method::GET, "/api/weight/1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["machine_id"], "1");
        assert_eq!(body["weight"], 12.0);
        assert_eq!(body["timestamp"], ack["timestamp"]);
    }

    #[tokio::test]
    async fn test_update_rejects_bad_payload() {
        let app = memory_app();

        let (status, body) = call(&app, Method::POST, "/api/update/1", r#"{"weight": "abc"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Invalid weight format");

        let (status, body) = call(&app, Method::POST, "/api/update/1", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No weight data provided");

        let (status, body) = call(&app, Method::POST, "/api/update/1", r#"{"weight": 1e400}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid weight format");

        let (_, body) = call(&app, Method::GET, "/api/weight/1", "").await;
        assert_eq!(body["status"], "no_data");
    }

    #[tokio::test]
    async fn test_invalid_machine_id() {
        let app = memory_app();

        let (status, body) = call(&app, Method::POST, "/api/update/a%20b", r#"{"weight": 1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, _) = call(&app, Method::GET, "/api/weight/..", "").await;
        assert_ne!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_machines_and_health() {
        let app = memory_app();

        let (_, body) = call(&app, Method::GET, "/api/machines", "").await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["count"], 0);
        assert_eq!(body["machines"], serde_json::json!([]));

        call(&app, Method::POST, "/api/update/3", r#"{"weight": 30}"#).await;
        call(&app, Method::POST, "/api/update/1", r#"{"weight": "10"}"#).await;

        let (status, body) = call(&app, Method::GET, "/api/machines", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["machines"][0]["machine_id"], "1");
        assert_eq!(body["machines"][0]["weight"], 10.0);
        assert_eq!(body["machines"][1]["machine_id"], "3");
        assert!(body["machines"][1]["last_updated"].is_string());

        let (status, body) = call(&app, Method::GET, "/api/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["machines_count"], 2);
    }

    #[tokio::test]
    async fn test_missing_data_dir_lists_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("machine_data");
        let backend = Arc::new(FsRecordBackend::new(data_dir.clone()).unwrap());
        let app = build_router(Arc::new(ServerState::new(Arc::new(MachineStore::new(
            backend,
        )))));

        call(&app, Method::POST, "/api/update/1", r#"{"weight": 4}"#).await;
        std::fs::remove_dir_all(&data_dir).unwrap();

        let (status, body) = call(&app, Method::GET, "/api/machines", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["count"], 0);
        assert_eq!(body["machines"], serde_json::json!([]));

        let (status, body) = call(&app, Method::GET, "/api/health", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["machines_count"], 0);
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = memory_app();
        let (status, body) = call(&app, Method::GET, "/api/nope", "").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Endpoint not found");
    }
}
