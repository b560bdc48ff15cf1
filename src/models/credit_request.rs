use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{credit_request, used_invite_link};
use crate::error::{StorageError, ValidationError};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PAID: &str = "paid";
pub const STATUS_DELIVERED: &str = "delivered";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Paid,
    Delivered,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Paid,
        RequestStatus::Delivered,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => STATUS_PENDING,
            RequestStatus::Paid => STATUS_PAID,
            RequestStatus::Delivered => STATUS_DELIVERED,
            RequestStatus::Cancelled => STATUS_CANCELLED,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            STATUS_PENDING => Ok(RequestStatus::Pending),
            STATUS_PAID => Ok(RequestStatus::Paid),
            STATUS_DELIVERED => Ok(RequestStatus::Delivered),
            STATUS_CANCELLED => Ok(RequestStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// A persisted customer submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditRequest {
    pub id: Uuid,
    pub full_name: String,
    pub contact_handle: String,
    pub invite_link: String,
    pub credits_amount: u32,
    pub payment_proof_url: Option<String>,
    pub is_free_request: bool,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<credit_request::Model> for CreditRequest {
    type Error = StorageError;

    fn try_from(model: credit_request::Model) -> Result<Self, Self::Error> {
        let status = model
            .status
            .parse::<RequestStatus>()
            .map_err(|err| StorageError::Corrupt(format!("request {}: {err}", model.id)))?;
        let credits_amount = u32::try_from(model.credits_amount).map_err(|_| {
            StorageError::Corrupt(format!(
                "request {}: negative credits amount {}",
                model.id, model.credits_amount
            ))
        })?;
        Ok(Self {
            id: model.id,
            full_name: model.full_name,
            contact_handle: model.contact_handle,
            invite_link: model.invite_link,
            credits_amount,
            payment_proof_url: model.payment_proof_url,
            is_free_request: model.is_free_request,
            status,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

/// Validated fields handed from intake to the request store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCreditRequest {
    pub full_name: String,
    pub contact_handle: String,
    pub invite_link: String,
    pub credits_amount: u32,
    pub payment_proof_url: Option<String>,
    pub is_free_request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsedInviteLink {
    pub id: Uuid,
    pub invite_link: String,
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<used_invite_link::Model> for UsedInviteLink {
    fn from(model: used_invite_link::Model) -> Self {
        Self {
            id: model.id,
            invite_link: model.invite_link,
            request_id: model.request_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Per-status totals for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: u64,
    pub pending: u64,
    pub paid: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: RequestStatus, count: u64) {
        self.total += count;
        match status {
            RequestStatus::Pending => self.pending += count,
            RequestStatus::Paid => self.paid += count,
            RequestStatus::Delivered => self.delivered += count,
            RequestStatus::Cancelled => self.cancelled += count,
        }
    }
}
