use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ProUsers::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ProUsers::UserEmail)
              .string()
              .not_null()
              .primary_key(),
          )
          .col(ColumnDef::new(ProUsers::UserName).string().not_null())
          .col(ColumnDef::new(ProUsers::ProType).text().not_null())
          .col(ColumnDef::new(ProUsers::ExpiresAt).date_time().null())
          .col(
            ColumnDef::new(ProUsers::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(ProUsers::ActivationCodeUsed).string().not_null(),
          )
          .col(ColumnDef::new(ProUsers::ActivatedAt).date_time().not_null())
          .col(ColumnDef::new(ProUsers::LastLogin).date_time().null())
          .col(ColumnDef::new(ProUsers::RevokedAt).date_time().null())
          .col(ColumnDef::new(ProUsers::RevokedReason).string().null())
          .col(ColumnDef::new(ProUsers::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(ProUsers::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_pro_users_activated_at")
          .table(ProUsers::Table)
          .col(ProUsers::ActivatedAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(ProUsers::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum ProUsers {
  Table,
  UserEmail,
  UserName,
  ProType,
  ExpiresAt,
  IsActive,
  ActivationCodeUsed,
  ActivatedAt,
  LastLogin,
  RevokedAt,
  RevokedReason,
  CreatedAt,
  UpdatedAt,
}
