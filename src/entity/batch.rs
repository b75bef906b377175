use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::code::{self, CodeType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activation_batches")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub batch_id: String,
  pub batch_name: String,
  pub code_type: CodeType,
  pub total_count: i32,
  pub created_by: String,
  pub notes: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "code::Entity")]
  Codes,
}

impl Related<code::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Codes.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
