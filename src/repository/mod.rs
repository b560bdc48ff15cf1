//! Credit request persistence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::entities::credit_request;
use crate::error::StorageError;
use crate::models::credit_request::{
    CreditRequest, NewCreditRequest, RequestStatus, StatusCounts,
};

#[async_trait]
pub trait CreditRequestStore: Send + Sync {
    /// Persist a new request in `pending` with a fresh id and creation time.
    async fn insert(&self, request: NewCreditRequest) -> Result<CreditRequest, StorageError>;

    async fn find(&self, id: Uuid) -> Result<Option<CreditRequest>, StorageError>;

    /// Newest first, optionally restricted to one status.
    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<CreditRequest>, StorageError>;

    /// Single-row compare-and-set on status. Returns false when the row is
    /// missing or no longer in `from`.
    async fn update_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StorageError>;

    async fn count_by_status(&self) -> Result<StatusCounts, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}

pub struct SeaOrmRequestStore {
    database: Arc<DatabaseConnection>,
}

impl SeaOrmRequestStore {
    pub fn new(database: Arc<DatabaseConnection>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl CreditRequestStore for SeaOrmRequestStore {
    async fn insert(&self, request: NewCreditRequest) -> Result<CreditRequest, StorageError> {
        let credits_amount = i32::try_from(request.credits_amount).map_err(|_| {
            StorageError::Database(format!(
                "credits amount {} exceeds column bounds",
                request.credits_amount
            ))
        })?;
        let model = credit_request::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            full_name: ActiveValue::Set(request.full_name),
            contact_handle: ActiveValue::Set(request.contact_handle),
            invite_link: ActiveValue::Set(request.invite_link),
            credits_amount: ActiveValue::Set(credits_amount),
            payment_proof_url: ActiveValue::Set(request.payment_proof_url),
            is_free_request: ActiveValue::Set(request.is_free_request),
            status: ActiveValue::Set(RequestStatus::Pending.as_str().to_string()),
            created_at: ActiveValue::Set(Utc::now().fixed_offset()),
        };

        let inserted = credit_request::Entity::insert(model)
            .exec_with_returning(self.database.as_ref())
            .await?;
        CreditRequest::try_from(inserted)
    }

    async fn find(&self, id: Uuid) -> Result<Option<CreditRequest>, StorageError> {
        credit_request::Entity::find_by_id(id)
            .one(self.database.as_ref())
            .await?
            .map(CreditRequest::try_from)
            .transpose()
    }

    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<CreditRequest>, StorageError> {
        let mut select = credit_request::Entity::find();
        if let Some(status) = status {
            select = select.filter(credit_request::Column::Status.eq(status.as_str()));
        }

        select
            .order_by_desc(credit_request::Column::CreatedAt)
            .order_by_desc(credit_request::Column::Id)
            .all(self.database.as_ref())
            .await?
            .into_iter()
            .map(CreditRequest::try_from)
            .collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StorageError> {
        let result = credit_request::Entity::update_many()
            .col_expr(credit_request::Column::Status, Expr::value(to.as_str()))
            .filter(credit_request::Column::Id.eq(id))
            .filter(credit_request::Column::Status.eq(from.as_str()))
            .exec(self.database.as_ref())
            .await?;
        match result.rows_affected {
            0 => Ok(false),
            1 => Ok(true),
            touched => Err(StorageError::Corrupt(format!(
                "status update on request {id} touched {touched} rows"
            ))),
        }
    }

    async fn count_by_status(&self) -> Result<StatusCounts, StorageError> {
        let rows = credit_request::Entity::find()
            .select_only()
            .column(credit_request::Column::Status)
            .column_as(credit_request::Column::Id.count(), "total")
            .group_by(credit_request::Column::Status)
            .into_tuple::<(String, i64)>()
            .all(self.database.as_ref())
            .await?;

        let mut counts = StatusCounts::default();
        for (status, total) in rows {
            let status = status
                .parse::<RequestStatus>()
                .map_err(|err| StorageError::Corrupt(err.to_string()))?;
            counts.add(status, u64::try_from(total).unwrap_or(0));
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.database.ping().await.map_err(StorageError::from)
    }
}
