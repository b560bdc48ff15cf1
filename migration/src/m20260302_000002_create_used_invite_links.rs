use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

use crate::m20260302_000001_create_credit_requests::CreditRequests;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsedInviteLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsedInviteLinks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UsedInviteLinks::InviteLink)
                            .string_len(2048)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsedInviteLinks::RequestId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsedInviteLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_used_invite_links_request")
                            .from(UsedInviteLinks::Table, UsedInviteLinks::RequestId)
                            .to(CreditRequests::Table, CreditRequests::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One consumption record per link value. The ledger's insert relies on
        // this index for ON CONFLICT, so it must stay unique.
        manager
            .create_index(
                Index::create()
                    .name("uq_used_invite_links_invite_link")
                    .table(UsedInviteLinks::Table)
                    .col(UsedInviteLinks::InviteLink)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsedInviteLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UsedInviteLinks {
    Table,
    Id,
    InviteLink,
    RequestId,
    CreatedAt,
}
