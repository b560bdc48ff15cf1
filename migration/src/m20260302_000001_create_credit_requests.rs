use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CreditRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CreditRequests::FullName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditRequests::ContactHandle)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditRequests::InviteLink)
                            .string_len(2048)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditRequests::CreditsAmount)
                            .integer()
                            .not_null()
                            .check(Expr::col(CreditRequests::CreditsAmount).gt(0)),
                    )
                    .col(
                        ColumnDef::new(CreditRequests::PaymentProofUrl)
                            .string_len(2048)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CreditRequests::IsFreeRequest)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CreditRequests::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending")
                            .check(Expr::col(CreditRequests::Status).is_in([
                                "pending",
                                "paid",
                                "delivered",
                                "cancelled",
                            ])),
                    )
                    .col(
                        ColumnDef::new(CreditRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Admin listing filters on status and sorts newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_credit_requests_status_created")
                    .table(CreditRequests::Table)
                    .col(CreditRequests::Status)
                    .col(CreditRequests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_credit_requests_created")
                    .table(CreditRequests::Table)
                    .col(CreditRequests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum CreditRequests {
    Table,
    Id,
    FullName,
    ContactHandle,
    InviteLink,
    CreditsAmount,
    PaymentProofUrl,
    IsFreeRequest,
    Status,
    CreatedAt,
}
