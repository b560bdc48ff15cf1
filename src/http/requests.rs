//! Public intake endpoints used by the request form.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::intake::{EligibilityView, ProofFile, SubmissionInput};
use crate::models::credit_request::CreditRequest;
use crate::notify::NotificationView;
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_request))
        .route("/packages", get(get_packages))
        .route("/eligibility", get(check_eligibility))
}

#[derive(Debug, Deserialize)]
struct SubmitRequestBody {
    full_name: String,
    contact_handle: String,
    invite_link: String,
    credits_amount: u32,
    payment_proof: Option<ProofUpload>,
}

#[derive(Deserialize)]
struct ProofUpload {
    file_name: String,
    /// Size the client claims; defaults to the decoded length.
    size: Option<u64>,
    content_base64: String,
}

impl std::fmt::Debug for ProofUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofUpload")
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .field("encoded_len", &self.content_base64.len())
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    request: CreditRequest,
    notification: NotificationView,
}

#[derive(Debug, Serialize)]
struct PackagesResponse {
    packages: Vec<u32>,
    max_proof_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct EligibilityQuery {
    invite_link: String,
}

async fn submit_request(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), HttpError> {
    let Json(body) = payload?;
    let proof = body
        .payment_proof
        .map(|upload| decode_proof(upload, state.intake.max_proof_bytes()))
        .transpose()
        .map_err(|err| HttpError::new(StatusCode::BAD_REQUEST, err.to_string()))?;

    let request = state
        .intake
        .submit(SubmissionInput {
            full_name: body.full_name,
            contact_handle: body.contact_handle,
            invite_link: body.invite_link,
            credits_amount: body.credits_amount,
            proof,
        })
        .await?;

    let notification = state.notifier.compose(&request);
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            request,
            notification,
        }),
    ))
}

async fn get_packages(State(state): State<AppState>) -> Json<PackagesResponse> {
    Json(PackagesResponse {
        packages: state.intake.package_sizes().to_vec(),
        max_proof_bytes: state.intake.max_proof_bytes(),
    })
}

async fn check_eligibility(
    State(state): State<AppState>,
    Query(query): Query<EligibilityQuery>,
) -> Result<Json<EligibilityView>, HttpError> {
    let view = state.intake.check_eligibility(&query.invite_link).await?;
    Ok(Json(view))
}

fn decode_proof(upload: ProofUpload, max_bytes: u64) -> Result<ProofFile, ValidationError> {
    // Refuse oversized payloads before allocating the decoded buffer.
    let encoded = upload.content_base64.trim();
    let decoded_upper_bound = (encoded.len() as u64 / 4) * 3;
    if decoded_upper_bound > max_bytes + 2 {
        return Err(ValidationError::ProofTooLarge {
            size: decoded_upper_bound,
            max: max_bytes,
        });
    }

    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|err| ValidationError::ProofEncoding(err.to_string()))?;
    let declared_size = upload.size.unwrap_or(bytes.len() as u64);
    Ok(ProofFile {
        file_name: upload.file_name,
        declared_size,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_decodes_and_defaults_declared_size() {
        let upload = ProofUpload {
            file_name: "receipt.pdf".to_string(),
            size: None,
            content_base64: BASE64_STANDARD.encode(b"%PDF-1.7"),
        };
        let proof = decode_proof(upload, 1_024).unwrap();
        assert_eq!(proof.bytes, b"%PDF-1.7");
        assert_eq!(proof.declared_size, 8);
    }

    #[test]
    fn proof_with_bad_base64_is_rejected() {
        let upload = ProofUpload {
            file_name: "receipt.pdf".to_string(),
            size: None,
            content_base64: "not base64!!".to_string(),
        };
        assert!(matches!(
            decode_proof(upload, 1_024),
            Err(ValidationError::ProofEncoding(_))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected_before_decoding() {
        let upload = ProofUpload {
            file_name: "big.png".to_string(),
            size: None,
            content_base64: "A".repeat(4 * 1_000),
        };
        assert!(matches!(
            decode_proof(upload, 1_024),
            Err(ValidationError::ProofTooLarge { .. })
        ));
    }
}
