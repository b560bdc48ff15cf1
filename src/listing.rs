//! Admin view over credit requests: status filter, free-text search, counts.

use std::cmp::Ordering;
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{AdminAuthorizer, AdminIdentity};
use crate::error::AdminError;
use crate::models::credit_request::{CreditRequest, RequestStatus, StatusCounts};
use crate::repository::CreditRequestStore;

pub const MAX_QUERY_LEN: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    /// `None` lists every status.
    pub status: Option<RequestStatus>,
    pub query: Option<String>,
}

impl RequestFilter {
    fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .map(str::to_lowercase)
    }
}

/// Keep requests matching the filter, newest first.
///
/// Status must match exactly; the query is a case-insensitive substring of any
/// searchable text field.
pub fn filter_requests(requests: Vec<CreditRequest>, filter: &RequestFilter) -> Vec<CreditRequest> {
    let needle = filter.needle();
    let mut kept: Vec<CreditRequest> = requests
        .into_iter()
        .filter(|request| filter.status.is_none_or(|status| request.status == status))
        .filter(|request| match &needle {
            Some(needle) => matches_query(request, needle),
            None => true,
        })
        .collect();
    kept.sort_by(newest_first);
    kept
}

fn matches_query(request: &CreditRequest, needle: &str) -> bool {
    [
        &request.full_name,
        &request.contact_handle,
        &request.invite_link,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn newest_first(a: &CreditRequest, b: &CreditRequest) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

pub struct RequestListing {
    requests: Arc<dyn CreditRequestStore>,
    authorizer: Arc<dyn AdminAuthorizer>,
}

impl RequestListing {
    pub fn new(
        requests: Arc<dyn CreditRequestStore>,
        authorizer: Arc<dyn AdminAuthorizer>,
    ) -> Self {
        Self {
            requests,
            authorizer,
        }
    }

    pub async fn list(
        &self,
        filter: &RequestFilter,
        admin: &AdminIdentity,
    ) -> Result<Vec<CreditRequest>, AdminError> {
        self.authorize(admin).await?;
        let rows = self.requests.list(filter.status).await?;
        Ok(filter_requests(rows, filter))
    }

    pub async fn get(&self, id: Uuid, admin: &AdminIdentity) -> Result<CreditRequest, AdminError> {
        self.authorize(admin).await?;
        self.requests
            .find(id)
            .await?
            .ok_or(AdminError::NotFound(id))
    }

    pub async fn stats(&self, admin: &AdminIdentity) -> Result<StatusCounts, AdminError> {
        self.authorize(admin).await?;
        Ok(self.requests.count_by_status().await?)
    }

    async fn authorize(&self, admin: &AdminIdentity) -> Result<(), AdminError> {
        if self.authorizer.is_admin(admin).await {
            Ok(())
        } else {
            Err(AdminError::Forbidden)
        }
    }
}
