use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::code::CodeType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pro_users")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub user_email: String,
  pub user_name: String,
  pub pro_type: CodeType,
  pub expires_at: Option<DateTime>,
  pub is_active: bool,
  pub activation_code_used: String,
  pub activated_at: DateTime,
  pub last_login: Option<DateTime>,
  pub revoked_at: Option<DateTime>,
  pub revoked_reason: Option<String>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl Model {
  /// Expiry is evaluated lazily on every read, never swept proactively.
  pub fn is_expired(&self, now: DateTime) -> bool {
    self.expires_at.is_some_and(|at| at < now)
  }

  pub fn is_pro(&self, now: DateTime) -> bool {
    self.is_active && !self.is_expired(now)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
