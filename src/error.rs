//! Error taxonomy shared by the ledger, intake and admin services.
//!
//! Everything here is returned as a value; the HTTP layer decides status codes.

use thiserror::Error;
use uuid::Uuid;

use crate::models::credit_request::RequestStatus;

/// Malformed or missing input, detected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("{field} exceeds {max} character limit")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("credits amount {amount} is not an offered package (allowed: {allowed:?})")]
    UnknownPackage { amount: u32, allowed: Vec<u32> },
    #[error("payment proof is {size} bytes, maximum is {max} bytes")]
    ProofTooLarge { size: u64, max: u64 },
    #[error("payment proof declares {declared} bytes but carries {actual}")]
    ProofSizeMismatch { declared: u64, actual: u64 },
    #[error("payment proof file is empty")]
    EmptyProof,
    #[error("payment proof content is not valid base64: {0}")]
    ProofEncoding(String),
    #[error("unknown request status '{0}'")]
    UnknownStatus(String),
}

/// Infrastructure failure at the storage boundary. Retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("object store error: {0}")]
    ObjectStore(String),
    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

impl From<sea_orm::DbErr> for StorageError {
    fn from(err: sea_orm::DbErr) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Outcome of a failed ledger consumption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsumeError {
    #[error("invite link already consumed")]
    AlreadyConsumed,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from administrator operations (listing and fulfillment).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    #[error("caller is not an authorized administrator")]
    Forbidden,
    #[error("credit request {0} not found")]
    NotFound(Uuid),
    #[error("cannot move request from {current} to {requested}")]
    InvalidTransition {
        current: RequestStatus,
        requested: RequestStatus,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
