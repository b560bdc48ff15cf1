//! Administrator-driven status workflow.
//!
//! ```text
//! pending ──► paid ──► delivered
//!    │          │
//!    └──────────┴────► cancelled
//! ```
//!
//! `advance` is the only writer of `credit_requests.status` after intake.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AdminAuthorizer, AdminIdentity};
use crate::error::AdminError;
use crate::models::credit_request::{CreditRequest, RequestStatus};
use crate::repository::CreditRequestStore;

pub fn is_legal_transition(from: RequestStatus, to: RequestStatus) -> bool {
    use RequestStatus::*;
    matches!(
        (from, to),
        (Pending, Paid) | (Paid, Delivered) | (Pending, Cancelled) | (Paid, Cancelled)
    )
}

/// Statuses reachable in one step from `from`.
pub fn next_statuses(from: RequestStatus) -> Vec<RequestStatus> {
    RequestStatus::ALL
        .into_iter()
        .filter(|to| is_legal_transition(from, *to))
        .collect()
}

pub struct FulfillmentService {
    requests: Arc<dyn CreditRequestStore>,
    authorizer: Arc<dyn AdminAuthorizer>,
}

impl FulfillmentService {
    pub fn new(
        requests: Arc<dyn CreditRequestStore>,
        authorizer: Arc<dyn AdminAuthorizer>,
    ) -> Self {
        Self {
            requests,
            authorizer,
        }
    }

    pub async fn advance(
        &self,
        request_id: Uuid,
        target: RequestStatus,
        admin: &AdminIdentity,
    ) -> Result<CreditRequest, AdminError> {
        if !self.authorizer.is_admin(admin).await {
            warn!("Rejected status change on {request_id}: caller is not an admin");
            return Err(AdminError::Forbidden);
        }

        let mut request = self
            .requests
            .find(request_id)
            .await?
            .ok_or(AdminError::NotFound(request_id))?;

        let current = request.status;
        if !is_legal_transition(current, target) {
            return Err(AdminError::InvalidTransition {
                current,
                requested: target,
            });
        }

        if !self
            .requests
            .update_status(request_id, current, target)
            .await?
        {
            // Someone else moved the row between our read and the update.
            let fresh = self
                .requests
                .find(request_id)
                .await?
                .ok_or(AdminError::NotFound(request_id))?;
            return Err(AdminError::InvalidTransition {
                current: fresh.status,
                requested: target,
            });
        }

        info!("Credit request {request_id} moved {current} -> {target}");
        request.status = target;
        Ok(request)
    }
}
