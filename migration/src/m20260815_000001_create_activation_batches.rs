use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ActivationBatches::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ActivationBatches::BatchId)
              .string()
              .not_null()
              .primary_key(),
          )
          .col(
            ColumnDef::new(ActivationBatches::BatchName).string().not_null(),
          )
          .col(ColumnDef::new(ActivationBatches::CodeType).text().not_null())
          .col(
            ColumnDef::new(ActivationBatches::TotalCount)
              .integer()
              .not_null(),
          )
          .col(ColumnDef::new(ActivationBatches::CreatedBy).string().not_null())
          .col(ColumnDef::new(ActivationBatches::Notes).string().null())
          .col(
            ColumnDef::new(ActivationBatches::CreatedAt)
              .date_time()
              .not_null(),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ActivationBatches::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ActivationBatches {
  Table,
  BatchId,
  BatchName,
  CodeType,
  TotalCount,
  CreatedBy,
  Notes,
  CreatedAt,
}
