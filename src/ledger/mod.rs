//! Entitlement ledger: which invitation links have already earned their free
//! request.
//!
//! The read (`is_eligible`) and the write (`consume`) are deliberately separate.
//! Intake embeds the read's answer into the request row, then consumes. Two
//! submissions racing on the same link can both read "eligible"; the unique
//! index on `used_invite_links.invite_link` guarantees only one `consume` wins.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, SqlErr,
};
use tracing::debug;
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::entities::used_invite_link;
use crate::error::{ConsumeError, StorageError};
use crate::models::credit_request::UsedInviteLink;

#[async_trait]
pub trait EntitlementLedger: Send + Sync {
    /// True iff no consumption record exists for exactly this link value.
    async fn is_eligible(&self, link: &str) -> Result<bool, StorageError>;

    /// Record that `request_id` consumed `link`. Exactly one caller per link
    /// ever succeeds; the rest get [`ConsumeError::AlreadyConsumed`].
    async fn consume(&self, link: &str, request_id: Uuid) -> Result<(), ConsumeError>;

    /// The consumption record for `link`, if any.
    async fn consumer_of(&self, link: &str) -> Result<Option<UsedInviteLink>, StorageError>;
}

/// Postgres-backed ledger.
///
/// Consumption is permanent, so links known to be consumed are cached and
/// answered without a round trip. "Eligible" answers are never cached.
pub struct SeaOrmLedger {
    database: Arc<DatabaseConnection>,
    consumed: Cache<String, Uuid>,
}

impl SeaOrmLedger {
    pub fn new(database: Arc<DatabaseConnection>, config: &CacheConfig) -> Self {
        assert!(
            config.consumed_links_max_capacity > 0,
            "Consumed link cache capacity must be positive"
        );
        let consumed = Cache::builder()
            .max_capacity(config.consumed_links_max_capacity)
            .time_to_live(Duration::from_secs(config.consumed_links_ttl_seconds))
            .build();
        Self { database, consumed }
    }

    async fn find_record(&self, link: &str) -> Result<Option<used_invite_link::Model>, StorageError> {
        let record = used_invite_link::Entity::find()
            .filter(used_invite_link::Column::InviteLink.eq(link))
            .one(self.database.as_ref())
            .await?;
        if let Some(found) = &record {
            self.consumed
                .insert(link.to_string(), found.request_id)
                .await;
        }
        Ok(record)
    }
}

#[async_trait]
impl EntitlementLedger for SeaOrmLedger {
    async fn is_eligible(&self, link: &str) -> Result<bool, StorageError> {
        if self.consumed.contains_key(link) {
            debug!("Invite link answered from consumed cache");
            return Ok(false);
        }
        Ok(self.find_record(link).await?.is_none())
    }

    async fn consume(&self, link: &str, request_id: Uuid) -> Result<(), ConsumeError> {
        let record = used_invite_link::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            invite_link: ActiveValue::Set(link.to_string()),
            request_id: ActiveValue::Set(request_id),
            created_at: ActiveValue::Set(Utc::now().fixed_offset()),
        };

        let inserted = used_invite_link::Entity::insert(record)
            .on_conflict(
                OnConflict::column(used_invite_link::Column::InviteLink)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.database.as_ref())
            .await;

        match inserted {
            Ok(0) => Err(ConsumeError::AlreadyConsumed),
            Ok(_) => {
                self.consumed.insert(link.to_string(), request_id).await;
                Ok(())
            }
            Err(err) if is_duplicate(&err) => Err(ConsumeError::AlreadyConsumed),
            Err(err) => Err(ConsumeError::Storage(err.into())),
        }
    }

    async fn consumer_of(&self, link: &str) -> Result<Option<UsedInviteLink>, StorageError> {
        Ok(self.find_record(link).await?.map(UsedInviteLink::from))
    }
}

fn is_duplicate(err: &DbErr) -> bool {
    matches!(err, DbErr::RecordNotInserted)
        || matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn cache_config() -> CacheConfig {
        CacheConfig {
            consumed_links_max_capacity: 1_000,
            consumed_links_ttl_seconds: 600,
        }
    }

    fn record(link: &str, request_id: Uuid) -> used_invite_link::Model {
        used_invite_link::Model {
            id: Uuid::new_v4(),
            invite_link: link.to_string(),
            request_id,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn unseen_link_is_eligible() {
        let database = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<used_invite_link::Model>::new()])
            .into_connection();
        let database = Arc::new(database);
        let ledger = SeaOrmLedger::new(database, &cache_config());

        assert!(ledger.is_eligible("https://lovable.dev/invite/a").await.unwrap());
    }

    #[tokio::test]
    async fn consumed_link_is_cached_after_first_lookup() {
        let link = "https://lovable.dev/invite/b";
        // Only one query result is queued; a second round trip would error.
        let database = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![record(link, Uuid::new_v4())]])
            .into_connection();
        let database = Arc::new(database);
        let ledger = SeaOrmLedger::new(database, &cache_config());

        assert!(!ledger.is_eligible(link).await.unwrap());
        assert!(!ledger.is_eligible(link).await.unwrap());
    }

    #[tokio::test]
    async fn consume_reports_conflict_when_no_row_inserted() {
        let database = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();
        let database = Arc::new(database);
        let ledger = SeaOrmLedger::new(database, &cache_config());
        let link = "https://lovable.app/invite/c";

        assert_eq!(ledger.consume(link, Uuid::new_v4()).await, Ok(()));
        assert_eq!(
            ledger.consume(link, Uuid::new_v4()).await,
            Err(ConsumeError::AlreadyConsumed)
        );
    }

    #[tokio::test]
    async fn successful_consume_marks_link_ineligible_without_query() {
        let database = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let database = Arc::new(database);
        let ledger = SeaOrmLedger::new(database, &cache_config());
        let link = "https://lovable.dev/invite/d";

        ledger.consume(link, Uuid::new_v4()).await.unwrap();
        assert!(!ledger.is_eligible(link).await.unwrap());
    }

    #[test]
    fn record_not_inserted_counts_as_duplicate() {
        assert!(is_duplicate(&DbErr::RecordNotInserted));
        assert!(!is_duplicate(&DbErr::Custom("boom".to_string())));
    }
}
