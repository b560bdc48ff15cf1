use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::{AdminError, IntakeError, StorageError};
use crate::models::credit_request::RequestStatus;
use crate::state::AppState;

mod admin;
mod requests;


/// Slack on top of the base64-encoded proof for the other JSON fields.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: AppState, proof_files: Option<&StorageConfig>) -> Router {
    assert!(
        state.start_time.elapsed() < Duration::from_secs(86_400),
        "Application uptime exceeds 24 hours before router creation"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let body_limit = submission_body_limit(state.intake.max_proof_bytes());
    let requests_router = requests::router()
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state.clone());
    let admin_router = admin::router().with_state(state.clone());

    let mut router = Router::new()
        .route("/health", get(health_live))
        .route("/health/ready", get(health_ready))
        .nest("/requests", requests_router)
        .nest("/admin", admin_router);

    if let Some(storage) = proof_files {
        router = router.nest_service(&storage.public_path, ServeDir::new(&storage.proof_dir));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn submission_body_limit(max_proof_bytes: u64) -> usize {
    let max_proof = usize::try_from(max_proof_bytes).unwrap_or(usize::MAX / 2);
    max_proof.div_ceil(3) * 4 + BODY_OVERHEAD_BYTES
}

async fn health_live(State(state): State<AppState>) -> Result<Json<HealthResponse>, HttpError> {
    let uptime = state.start_time.elapsed().as_secs();
    let response = HealthResponse {
        status: "live",
        uptime_seconds: uptime,
    };
    Ok(Json(response))
}

async fn health_ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, HttpError> {
    state
        .requests
        .ping()
        .await
        .map_err(|err| HttpError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))?;

    let response = ReadyResponse {
        status: "ready",
        packages: state.intake.package_sizes().to_vec(),
        max_proof_bytes: state.intake.max_proof_bytes(),
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
    packages: Vec<u32>,
    max_proof_bytes: u64,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    current_status: Option<RequestStatus>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: String) -> Self {
        assert!(status != StatusCode::OK, "Error status cannot be 200");
        assert!(!message.is_empty(), "Error message cannot be empty");
        Self {
            status,
            message,
            current_status: None,
        }
    }

    fn with_current_status(mut self, current: RequestStatus) -> Self {
        self.current_status = Some(current);
        self
    }
}

/// Malformed JSON bodies are validation failures; size and content-type
/// rejections keep their own status.
impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
            other => other,
        };
        HttpError::new(status, rejection.body_text())
    }
}

impl From<StorageError> for HttpError {
    fn from(err: StorageError) -> Self {
        warn!("Storage failure: {err}");
        HttpError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Storage temporarily unavailable, please retry".to_string(),
        )
    }
}

impl From<IntakeError> for HttpError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Validation(err) => HttpError::new(StatusCode::BAD_REQUEST, err.to_string()),
            IntakeError::Storage(err) => err.into(),
        }
    }
}

impl From<AdminError> for HttpError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Forbidden => HttpError::new(StatusCode::FORBIDDEN, err.to_string()),
            AdminError::NotFound(_) => HttpError::new(StatusCode::NOT_FOUND, err.to_string()),
            AdminError::InvalidTransition { current, .. } => {
                HttpError::new(StatusCode::CONFLICT, err.to_string()).with_current_status(current)
            }
            AdminError::Storage(err) => err.into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        info!("HTTP error: {}", self.message);
        let body = Json(ErrorBody {
            error: self.message,
            current_status: self.current_status,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_status: Option<RequestStatus>,
}
