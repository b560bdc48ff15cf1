pub use sea_orm_migration::prelude::*;

mod m20260302_000001_create_credit_requests;
mod m20260302_000002_create_used_invite_links;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260302_000001_create_credit_requests::Migration),
            Box::new(m20260302_000002_create_used_invite_links::Migration),
        ]
    }
}
