//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{AdminIdentity, StaticTokenAuthorizer};
use crate::config::IntakeConfig;
use crate::error::{ConsumeError, StorageError};
use crate::ledger::EntitlementLedger;
use crate::models::credit_request::{
    CreditRequest, NewCreditRequest, RequestStatus, StatusCounts, UsedInviteLink,
};
use crate::repository::CreditRequestStore;
use crate::storage::ObjectStore;

pub const ADMIN_TOKEN: &str = "test-admin-token-0123456789";

pub fn admin() -> AdminIdentity {
    AdminIdentity::new(ADMIN_TOKEN)
}

pub fn authorizer() -> StaticTokenAuthorizer {
    StaticTokenAuthorizer::new([ADMIN_TOKEN])
}

pub fn intruder() -> AdminIdentity {
    AdminIdentity::new("not-an-admin-token")
}

pub fn intake_policy() -> IntakeConfig {
    IntakeConfig::default()
}

/// Ledger keyed by link value; the map insert plays the unique index.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<HashMap<String, UsedInviteLink>>,
    lookups: AtomicUsize,
    /// Widens the read/write window so concurrent submissions interleave.
    lookup_delay: Option<Duration>,
}

impl MemoryLedger {
    pub fn with_lookup_delay(delay: Duration) -> Self {
        Self {
            lookup_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<UsedInviteLink> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn records_for(&self, link: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.invite_link == link)
            .count()
    }
}

#[async_trait]
impl EntitlementLedger for MemoryLedger {
    async fn is_eligible(&self, link: &str) -> Result<bool, StorageError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let eligible = !self.records.lock().unwrap().contains_key(link);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(eligible)
    }

    async fn consume(&self, link: &str, request_id: Uuid) -> Result<(), ConsumeError> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(link) {
            return Err(ConsumeError::AlreadyConsumed);
        }
        records.insert(
            link.to_string(),
            UsedInviteLink {
                id: Uuid::new_v4(),
                invite_link: link.to_string(),
                request_id,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn consumer_of(&self, link: &str) -> Result<Option<UsedInviteLink>, StorageError> {
        Ok(self.records.lock().unwrap().get(link).cloned())
    }
}

#[derive(Default)]
pub struct MemoryRequestStore {
    rows: Mutex<Vec<CreditRequest>>,
    /// When set, the next conditional update finds the row already moved.
    steal_next_update: Mutex<Option<RequestStatus>>,
}

impl MemoryRequestStore {
    pub fn all(&self) -> Vec<CreditRequest> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, request: CreditRequest) {
        self.rows.lock().unwrap().push(request);
    }

    pub fn status_of(&self, id: Uuid) -> Option<RequestStatus> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.status)
    }

    /// Simulate another administrator moving the row first.
    pub fn race_next_update_to(&self, status: RequestStatus) {
        *self.steal_next_update.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl CreditRequestStore for MemoryRequestStore {
    async fn insert(&self, request: NewCreditRequest) -> Result<CreditRequest, StorageError> {
        let stored = CreditRequest {
            id: Uuid::new_v4(),
            full_name: request.full_name,
            contact_handle: request.contact_handle,
            invite_link: request.invite_link,
            credits_amount: request.credits_amount,
            payment_proof_url: request.payment_proof_url,
            is_free_request: request.is_free_request,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn find(&self, id: Uuid) -> Result<Option<CreditRequest>, StorageError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<CreditRequest>, StorageError> {
        let mut rows: Vec<CreditRequest> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| status.is_none_or(|wanted| row.status == wanted))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StorageError> {
        let stolen = self.steal_next_update.lock().unwrap().take();
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Ok(false);
        };
        if let Some(other) = stolen {
            row.status = other;
        }
        if row.status != from {
            return Ok(false);
        }
        row.status = to;
        Ok(true)
    }

    async fn count_by_status(&self) -> Result<StatusCounts, StorageError> {
        let mut counts = StatusCounts::default();
        for row in self.rows.lock().unwrap().iter() {
            counts.add(row.status, 1);
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryObjectStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::ObjectStore("bucket unavailable".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(format!("memory://payment-proofs/{name}"))
    }
}
