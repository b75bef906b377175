use sea_orm_migration::prelude::*;

use super::m20260815_000001_create_activation_batches::ActivationBatches;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ActivationCodes::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ActivationCodes::Code)
              .string()
              .not_null()
              .primary_key(),
          )
          .col(ColumnDef::new(ActivationCodes::CodeType).text().not_null())
          .col(ColumnDef::new(ActivationCodes::BatchId).string().not_null())
          .col(
            ColumnDef::new(ActivationCodes::IsUsed)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(ActivationCodes::IsDisabled)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(ActivationCodes::UsedBy).string().null())
          .col(ColumnDef::new(ActivationCodes::UsedByName).string().null())
          .col(ColumnDef::new(ActivationCodes::UsedAt).date_time().null())
          .col(ColumnDef::new(ActivationCodes::ExpiresAt).date_time().null())
          .col(ColumnDef::new(ActivationCodes::Notes).string().null())
          .col(
            ColumnDef::new(ActivationCodes::CreatedAt).date_time().not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_activation_codes_batch")
              .from(ActivationCodes::Table, ActivationCodes::BatchId)
              .to(ActivationBatches::Table, ActivationBatches::BatchId),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_activation_codes_batch")
          .table(ActivationCodes::Table)
          .col(ActivationCodes::BatchId)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_activation_codes_used_at")
          .table(ActivationCodes::Table)
          .col(ActivationCodes::UsedAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ActivationCodes::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ActivationCodes {
  Table,
  Code,
  CodeType,
  BatchId,
  IsUsed,
  IsDisabled,
  UsedBy,
  UsedByName,
  UsedAt,
  ExpiresAt,
  Notes,
  CreatedAt,
}
