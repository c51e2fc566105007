pub use sea_orm_migration::prelude::*;

mod m20250901_000001_initial;
mod m20250901_000002_add_products;
mod m20250901_000003_add_payments_and_transactions;
mod m20250901_000004_add_subscriptions;
mod m20250901_000005_add_notifications_and_activity_logs;
mod m20250901_000006_add_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_initial::Migration),
            Box::new(m20250901_000002_add_products::Migration),
            Box::new(m20250901_000003_add_payments_and_transactions::Migration),
            Box::new(m20250901_000004_add_subscriptions::Migration),
            Box::new(m20250901_000005_add_notifications_and_activity_logs::Migration),
            Box::new(m20250901_000006_add_settings::Migration),
        ]
    }
}
