//! HTTP front end.

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::{error, info, warn};

use pgforge_core::CoreError;
use pgforge_spec::{FieldError, RequestReader, SpecError, ValidationErrors};

use crate::error::HandlerError;
use crate::handler::{GenerationHandler, GenerationSummary};

/// Create the API router
pub fn create_router(handler: GenerationHandler) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/generate", post(generate))
        .with_state(handler)
}

/// Bind and serve until the process is stopped.
pub async fn start_server(host: &str, port: u16, handler: GenerationHandler) -> Result<()> {
    let app = create_router(handler);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "pgforge",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn generate(
    State(handler): State<GenerationHandler>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<GenerationSummary>, ApiError> {
    let Json(value) = payload.map_err(|rejection| ApiError::Malformed(rejection.body_text()))?;
    let raw = RequestReader::from_json_value(value)?;
    let summary = handler.handle(&raw).await?;
    Ok(Json(summary))
}

#[derive(Debug, Serialize)]
struct FieldReport {
    field: &'static str,
    kind: &'static str,
    reason: String,
}

impl From<&FieldError> for FieldReport {
    fn from(e: &FieldError) -> Self {
        Self {
            field: e.field.as_str(),
            kind: e.reason.kind(),
            reason: e.reason.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    fields: Vec<FieldReport>,
}

impl ErrorBody {
    fn message(error: String) -> Self {
        Self {
            error,
            fields: Vec::new(),
        }
    }

    fn rejected(errors: &ValidationErrors) -> Self {
        Self {
            error: errors.to_string(),
            fields: errors.iter().map(FieldReport::from).collect(),
        }
    }
}

enum ApiError {
    /// Body was not JSON.
    Malformed(String),
    /// Body was JSON but not a request.
    Request(SpecError),
    Handler(HandlerError),
}

impl From<SpecError> for ApiError {
    fn from(e: SpecError) -> Self {
        ApiError::Request(e)
    }
}

impl From<HandlerError> for ApiError {
    fn from(e: HandlerError) -> Self {
        ApiError::Handler(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::Malformed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::message(msg)),
            ApiError::Request(SpecError::Validation(errors))
            | ApiError::Handler(HandlerError::Core(CoreError::Validation(errors))) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::rejected(&errors))
            }
            ApiError::Request(e) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::message(e.to_string())),
            ApiError::Handler(e @ HandlerError::Collision(_)) => {
                warn!("{}", e);
                (StatusCode::CONFLICT, ErrorBody::message(e.to_string()))
            }
            ApiError::Handler(e) => {
                error!("Generation failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::message(e.to_string()))
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use pgforge_core::{FixedClock, Generator};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::store::MockArtifactStore;

    fn router(store: MockArtifactStore) -> Router {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 10, 20, 30).unwrap();
        let generator = Generator::default().with_clock(Arc::new(FixedClock::new(at)));
        create_router(GenerationHandler::new(Arc::new(generator), Arc::new(store)))
    }

    fn accepting_store() -> MockArtifactStore {
        let mut store = MockArtifactStore::new();
        store
            .expect_write_new()
            .returning(|name, _| Ok(PathBuf::from(name)));
        store
    }

    async fn post(router: Router, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/generate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn payload() -> Value {
        json!({
            "postgres_version": "14.10",
            "instance_type": "t2.micro",
            "num_replicas": 2,
            "max_connections": 100,
            "shared_buffers": "256MB"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(MockArtifactStore::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_generate_returns_summary() {
        let (status, body) = post(router(accepting_store()), &payload().to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Terraform and Ansible files generated successfully.");
        assert_eq!(body["infra_filename"], "main_20240517102030.tf");
        assert_eq!(body["config_filename"], "playbook_20240517102030.yml");
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let mut bad = payload();
        bad["shared_buffers"] = json!("256");
        bad["num_replicas"] = json!(-1);

        let mut store = MockArtifactStore::new();
        store.expect_write_new().never();
        let (status, body) = post(router(store), &bad.to_string()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["num_replicas", "shared_buffers"]);
        assert_eq!(body["fields"][0]["kind"], "out_of_range");
        assert!(body["error"].as_str().unwrap().contains("shared_buffers"));
    }

    #[tokio::test]
    async fn test_wrong_type_is_reported_against_its_field() {
        let mut bad = payload();
        bad["num_replicas"] = json!("two");

        let mut store = MockArtifactStore::new();
        store.expect_write_new().never();
        let (status, body) = post(router(store), &bad.to_string()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields = body["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0]["field"], "num_replicas");
        assert_eq!(fields[0]["kind"], "invalid_type");
        assert!(fields[0]["reason"].as_str().unwrap().contains("\"two\""));
    }

    #[tokio::test]
    async fn test_malformed_body_is_unprocessable() {
        let (status, body) = post(router(MockArtifactStore::new()), "{\"num_replicas\": ").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"].as_array().unwrap().is_empty());

        let (status, body) = post(router(MockArtifactStore::new()), "[1, 2]").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collision_is_a_conflict() {
        let mut store = MockArtifactStore::new();
        store
            .expect_write_new()
            .returning(|name, _| Err(HandlerError::Collision(PathBuf::from(name))));

        let (status, body) = post(router(store), &payload().to_string()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("main_20240517102030.tf"));
    }
}
