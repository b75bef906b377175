use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AuditAction {
  #[sea_orm(string_value = "activate")]
  #[serde(rename = "activate")]
  Activate,
  #[sea_orm(string_value = "revoke")]
  #[serde(rename = "revoke")]
  Revoke,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activation_logs")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  pub code: Option<String>,
  pub user_email: String,
  pub user_name: Option<String>,
  pub action: AuditAction,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
  pub notes: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
