pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20261001_000001_accounts_and_catalog;
mod m20261001_000002_learning_progress;
mod m20261001_000003_commerce;
mod m20261001_000004_community;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_accounts_and_catalog::Migration),
            Box::new(m20261001_000002_learning_progress::Migration),
            Box::new(m20261001_000003_commerce::Migration),
            Box::new(m20261001_000004_community::Migration),
        ]
    }
}
