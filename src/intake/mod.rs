//! Request intake: validate a submission, decide entitlement, store the proof,
//! persist the request and consume the link's free request.
//!
//! The steps run strictly in order and each is awaited before the next:
//! validate, eligibility read, proof upload, request insert, ledger consume.
//! Anything failing before the insert leaves no trace. A lost consume race
//! after the insert is logged and the request keeps `is_free_request = true`.
//! A consume that keeps failing on storage is retried, then reported as a
//! storage error so the link is never left eligible behind a success.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::IntakeConfig;
use crate::error::{ConsumeError, IntakeError, ValidationError};
use crate::ledger::EntitlementLedger;
use crate::models::credit_request::{CreditRequest, NewCreditRequest};
use crate::repository::CreditRequestStore;
use crate::storage::ObjectStore;

pub const MAX_FULL_NAME_LEN: usize = 256;
pub const MAX_CONTACT_HANDLE_LEN: usize = 128;
pub const MAX_INVITE_LINK_LEN: usize = 2048;
const MAX_EXTENSION_LEN: usize = 16;
const NAME_SUFFIX_BYTES: usize = 6;
pub const CONSUME_ATTEMPTS: u32 = 3;
const CONSUME_RETRY_DELAY: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct SubmissionInput {
    pub full_name: String,
    pub contact_handle: String,
    pub invite_link: String,
    pub credits_amount: u32,
    pub proof: Option<ProofFile>,
}

#[derive(Clone)]
pub struct ProofFile {
    pub file_name: String,
    pub declared_size: u64,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ProofFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofFile")
            .field("file_name", &self.file_name)
            .field("declared_size", &self.declared_size)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Read-only answer for the form's "is this link free?" indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityView {
    pub invite_link: String,
    pub hostname_accepted: bool,
    pub eligible: bool,
}

pub struct IntakeService {
    ledger: Arc<dyn EntitlementLedger>,
    requests: Arc<dyn CreditRequestStore>,
    proofs: Arc<dyn ObjectStore>,
    policy: IntakeConfig,
}

impl IntakeService {
    pub fn new(
        ledger: Arc<dyn EntitlementLedger>,
        requests: Arc<dyn CreditRequestStore>,
        proofs: Arc<dyn ObjectStore>,
        policy: IntakeConfig,
    ) -> Self {
        assert!(
            !policy.package_sizes.is_empty(),
            "At least one package size must be offered"
        );
        Self {
            ledger,
            requests,
            proofs,
            policy,
        }
    }

    pub fn package_sizes(&self) -> &[u32] {
        &self.policy.package_sizes
    }

    pub fn max_proof_bytes(&self) -> u64 {
        self.policy.max_proof_bytes
    }

    pub async fn submit(&self, input: SubmissionInput) -> Result<CreditRequest, IntakeError> {
        let validated = self.validate(input)?;

        let is_free_request = if self.hostname_accepted(&validated.invite_link) {
            self.ledger.is_eligible(&validated.invite_link).await?
        } else {
            false
        };

        let payment_proof_url = match &validated.proof {
            Some(proof) => {
                let name = proof_object_name(&proof.file_name, Utc::now());
                Some(self.proofs.put(&name, &proof.bytes).await?)
            }
            None => None,
        };

        let request = self
            .requests
            .insert(NewCreditRequest {
                full_name: validated.full_name,
                contact_handle: validated.contact_handle,
                invite_link: validated.invite_link,
                credits_amount: validated.credits_amount,
                payment_proof_url,
                is_free_request,
            })
            .await?;

        if request.is_free_request {
            self.consume_entitlement(&request).await?;
        }

        info!(
            "Credit request {} received: {} credits, free={}, proof={}",
            request.id,
            request.credits_amount,
            request.is_free_request,
            request.payment_proof_url.is_some()
        );
        Ok(request)
    }

    pub async fn check_eligibility(&self, invite_link: &str) -> Result<EligibilityView, IntakeError> {
        let link = invite_link.trim();
        if link.is_empty() {
            return Err(ValidationError::EmptyField("invite_link").into());
        }
        let hostname_accepted = self.hostname_accepted(link);
        let eligible = hostname_accepted && self.ledger.is_eligible(link).await?;
        Ok(EligibilityView {
            invite_link: link.to_string(),
            hostname_accepted,
            eligible,
        })
    }

    fn hostname_accepted(&self, link: &str) -> bool {
        let lowered = link.to_ascii_lowercase();
        self.policy
            .accepted_hosts
            .iter()
            .any(|host| lowered.contains(host.as_str()))
    }

    async fn consume_entitlement(&self, request: &CreditRequest) -> Result<(), IntakeError> {
        let mut attempt = 1;
        loop {
            match self.ledger.consume(&request.invite_link, request.id).await {
                Ok(()) => return Ok(()),
                Err(ConsumeError::AlreadyConsumed) => {
                    let winner = self
                        .ledger
                        .consumer_of(&request.invite_link)
                        .await
                        .ok()
                        .flatten()
                        .map(|record| record.request_id.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    warn!(
                        "Double free grant: request {} kept is_free_request=true but link was consumed by request {}",
                        request.id, winner
                    );
                    return Ok(());
                }
                Err(ConsumeError::Storage(err)) if attempt < CONSUME_ATTEMPTS => {
                    warn!(
                        "Consume attempt {attempt}/{CONSUME_ATTEMPTS} for request {} failed: {err}",
                        request.id
                    );
                    tokio::time::sleep(CONSUME_RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                Err(ConsumeError::Storage(err)) => {
                    error!(
                        "Failed to record consumption for request {} after {CONSUME_ATTEMPTS} attempts: {err}",
                        request.id
                    );
                    return Err(err.into());
                }
            }
        }
    }

    fn validate(&self, input: SubmissionInput) -> Result<SubmissionInput, ValidationError> {
        let full_name = required_text(&input.full_name, "full_name", MAX_FULL_NAME_LEN)?;
        let contact_handle =
            required_text(&input.contact_handle, "contact_handle", MAX_CONTACT_HANDLE_LEN)?;
        let invite_link = required_text(&input.invite_link, "invite_link", MAX_INVITE_LINK_LEN)?;

        if !self.policy.package_sizes.contains(&input.credits_amount) {
            return Err(ValidationError::UnknownPackage {
                amount: input.credits_amount,
                allowed: self.policy.package_sizes.clone(),
            });
        }

        if let Some(proof) = &input.proof {
            self.validate_proof(proof)?;
        }

        Ok(SubmissionInput {
            full_name,
            contact_handle,
            invite_link,
            credits_amount: input.credits_amount,
            proof: input.proof,
        })
    }

    fn validate_proof(&self, proof: &ProofFile) -> Result<(), ValidationError> {
        let max = self.policy.max_proof_bytes;
        let actual = proof.bytes.len() as u64;
        if proof.declared_size > max || actual > max {
            return Err(ValidationError::ProofTooLarge {
                size: proof.declared_size.max(actual),
                max,
            });
        }
        if proof.declared_size != actual {
            return Err(ValidationError::ProofSizeMismatch {
                declared: proof.declared_size,
                actual,
            });
        }
        if actual == 0 {
            return Err(ValidationError::EmptyProof);
        }
        Ok(())
    }
}

fn required_text(
    value: &str,
    field: &'static str,
    max_len: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::FieldTooLong { field, max: max_len });
    }
    Ok(trimmed.to_string())
}

/// `<unix millis>-<random hex>[.<ext>]`, keeping the original extension.
pub fn proof_object_name(original: &str, now: DateTime<Utc>) -> String {
    let mut suffix = [0u8; NAME_SUFFIX_BYTES];
    rand::thread_rng().fill_bytes(&mut suffix);
    let stem = format!("{}-{}", now.timestamp_millis(), hex::encode(suffix));
    match file_extension(original) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn file_extension(original: &str) -> Option<String> {
    let ext = Path::new(original.trim()).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
