pub use sea_orm_migration::prelude::*;

mod m20260815_000001_create_activation_batches;
mod m20260815_000002_create_activation_codes;
mod m20260815_000003_create_pro_users;
mod m20260815_000004_create_activation_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260815_000001_create_activation_batches::Migration),
      Box::new(m20260815_000002_create_activation_codes::Migration),
      Box::new(m20260815_000003_create_pro_users::Migration),
      Box::new(m20260815_000004_create_activation_logs::Migration),
    ]
  }
}
