pub use sea_orm_migration::prelude::*;

mod m20250210_000001_create_users_table;
mod m20250210_000002_create_categories_table;
mod m20250210_000003_create_suppliers_table;
mod m20250210_000004_create_products_table;
mod m20250210_000005_create_stock_movements_table;
mod m20250210_000006_create_audit_logs_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250210_000001_create_users_table::Migration),
            Box::new(m20250210_000002_create_categories_table::Migration),
            Box::new(m20250210_000003_create_suppliers_table::Migration),
            Box::new(m20250210_000004_create_products_table::Migration),
            Box::new(m20250210_000005_create_stock_movements_table::Migration),
            Box::new(m20250210_000006_create_audit_logs_table::Migration),
        ]
    }
}
