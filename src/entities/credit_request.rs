//! Credit request entity: one customer submission.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_type = "String(StringLen::N(256))")]
    pub full_name: String,
    #[sea_orm(column_type = "String(StringLen::N(128))")]
    pub contact_handle: String,
    #[sea_orm(column_type = "String(StringLen::N(2048))")]
    pub invite_link: String,
    pub credits_amount: i32,
    #[sea_orm(column_type = "String(StringLen::N(2048))", nullable)]
    pub payment_proof_url: Option<String>,
    /// Fixed at creation; never rewritten after a lost consumption race
    pub is_free_request: bool,
    /// One of pending, paid, delivered, cancelled
    #[sea_orm(column_type = "String(StringLen::N(16))")]
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::used_invite_link::Entity")]
    UsedInviteLink,
}

impl Related<super::used_invite_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsedInviteLink.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
