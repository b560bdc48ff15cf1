//! Administrator endpoints. Every route takes a bearer token; the services
//! decide whether it belongs to an admin.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AdminIdentity, MAX_ADMIN_TOKEN_LEN};
use crate::fulfillment::next_statuses;
use crate::listing::{MAX_QUERY_LEN, RequestFilter};
use crate::models::credit_request::{CreditRequest, RequestStatus, StatusCounts};
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_requests))
        .route("/requests/stats", get(get_stats))
        .route("/requests/{request_id}", get(get_request))
        .route("/requests/{request_id}/status", post(advance_request))
}

impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                HttpError::new(StatusCode::FORBIDDEN, "Missing admin bearer token".to_string())
            })?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty() && token.len() <= MAX_ADMIN_TOKEN_LEN)
            .ok_or_else(|| {
                HttpError::new(
                    StatusCode::FORBIDDEN,
                    "Malformed admin bearer token".to_string(),
                )
            })?;
        Ok(AdminIdentity::new(token))
    }
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    status: Option<String>,
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    total: usize,
    requests: Vec<CreditRequest>,
}

#[derive(Debug, Serialize)]
struct RequestDetail {
    request: CreditRequest,
    next_statuses: Vec<RequestStatus>,
}

impl From<CreditRequest> for RequestDetail {
    fn from(request: CreditRequest) -> Self {
        let next_statuses = next_statuses(request.status);
        Self {
            request,
            next_statuses,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AdvanceBody {
    status: String,
}

async fn list_requests(
    admin: AdminIdentity,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, HttpError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(value) => Some(
            value
                .parse::<RequestStatus>()
                .map_err(|err| HttpError::new(StatusCode::BAD_REQUEST, err.to_string()))?,
        ),
    };
    if query.q.as_ref().is_some_and(|q| q.chars().count() > MAX_QUERY_LEN) {
        return Err(HttpError::new(
            StatusCode::BAD_REQUEST,
            format!("Search query exceeds {MAX_QUERY_LEN} characters"),
        ));
    }

    let filter = RequestFilter {
        status,
        query: query.q,
    };
    let requests = state.listing.list(&filter, &admin).await?;
    Ok(Json(ListResponse {
        total: requests.len(),
        requests,
    }))
}

async fn get_stats(
    admin: AdminIdentity,
    State(state): State<AppState>,
) -> Result<Json<StatusCounts>, HttpError> {
    Ok(Json(state.listing.stats(&admin).await?))
}

async fn get_request(
    admin: AdminIdentity,
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<RequestDetail>, HttpError> {
    let request = state.listing.get(request_id, &admin).await?;
    Ok(Json(request.into()))
}

async fn advance_request(
    admin: AdminIdentity,
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    payload: Result<Json<AdvanceBody>, JsonRejection>,
) -> Result<Json<RequestDetail>, HttpError> {
    let Json(body) = payload?;
    let target = body
        .status
        .parse::<RequestStatus>()
        .map_err(|err| HttpError::new(StatusCode::BAD_REQUEST, err.to_string()))?;
    let request = state
        .fulfillment
        .advance(request_id, target, &admin)
        .await?;
    Ok(Json(request.into()))
}
