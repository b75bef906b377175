use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ActivationLogs::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ActivationLogs::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(ActivationLogs::Code).string().null())
          .col(ColumnDef::new(ActivationLogs::UserEmail).string().not_null())
          .col(ColumnDef::new(ActivationLogs::UserName).string().null())
          .col(ColumnDef::new(ActivationLogs::Action).text().not_null())
          .col(ColumnDef::new(ActivationLogs::IpAddress).string().null())
          .col(ColumnDef::new(ActivationLogs::UserAgent).string().null())
          .col(ColumnDef::new(ActivationLogs::Notes).string().null())
          .col(
            ColumnDef::new(ActivationLogs::CreatedAt).date_time().not_null(),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_activation_logs_email")
          .table(ActivationLogs::Table)
          .col(ActivationLogs::UserEmail)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ActivationLogs::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ActivationLogs {
  Table,
  Id,
  Code,
  UserEmail,
  UserName,
  Action,
  IpAddress,
  UserAgent,
  Notes,
  CreatedAt,
}
