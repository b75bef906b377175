use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum CodeType {
  #[sea_orm(string_value = "lifetime")]
  #[serde(rename = "lifetime")]
  Lifetime,
  #[sea_orm(string_value = "1year")]
  #[serde(rename = "1year")]
  #[default]
  OneYear,
  #[sea_orm(string_value = "6month")]
  #[serde(rename = "6month")]
  SixMonth,
}

impl CodeType {
  /// Entitlement duration granted on redemption, in days.
  /// `None` means the entitlement never expires.
  pub fn duration_days(self) -> Option<i64> {
    match self {
      CodeType::Lifetime => None,
      CodeType::OneYear => Some(365),
      CodeType::SixMonth => Some(180),
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activation_codes")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub code: String,
  pub code_type: CodeType,
  pub batch_id: String,
  pub is_used: bool,
  pub is_disabled: bool,
  pub used_by: Option<String>,
  pub used_by_name: Option<String>,
  pub used_at: Option<DateTime>,
  pub expires_at: Option<DateTime>,
  pub notes: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::batch::Entity",
    from = "Column::BatchId",
    to = "super::batch::Column::BatchId"
  )]
  Batch,
}

impl Related<super::batch::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Batch.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
