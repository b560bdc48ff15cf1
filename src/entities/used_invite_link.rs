//! Consumption record for an invitation link's free request.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "used_invite_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique across the table
    #[sea_orm(column_type = "String(StringLen::N(2048))", unique)]
    pub invite_link: String,
    pub request_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::credit_request::Entity",
        from = "Column::RequestId",
        to = "super::credit_request::Column::Id"
    )]
    CreditRequest,
}

impl Related<super::credit_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
