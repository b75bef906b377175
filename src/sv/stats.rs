use chrono::{Datelike, NaiveTime};
use sea_orm::{Iterable, QuerySelect, sea_query::Expr};
use serde::Serialize;

use crate::{
  entity::{CodeType, code, pro_user},
  prelude::*,
};

#[derive(Debug, Serialize)]
pub struct TypeCount {
  pub code_type: CodeType,
  pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct TypeBreakdown {
  pub code_type: CodeType,
  pub total: u64,
  pub used: u64,
  pub disabled: u64,
}

#[derive(Debug, Serialize)]
pub struct Overview {
  pub total_codes: u64,
  pub used_codes: u64,
  pub disabled_codes: u64,
  pub unused_codes: u64,
  pub total_pro_users: u64,
  pub pro_type_distribution: Vec<TypeCount>,
  pub expired_users: u64,
  pub today_new_users: u64,
  pub month_new_users: u64,
}

#[derive(Debug, Serialize)]
pub struct DailyCount {
  pub date: String,
  pub count: i64,
}

/// Reporting read-model: derived counts over the code and entitlement
/// stores, recomputed on demand. Nothing here is cached or kept
/// consistent with the write path.
pub struct Stats<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Stats<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn overview(&self, now: DateTime) -> Result<Overview> {
    let total_codes = code::Entity::find().count(self.db).await?;
    let used_codes = code::Entity::find()
      .filter(code::Column::IsUsed.eq(true))
      .count(self.db)
      .await?;
    let disabled_codes = code::Entity::find()
      .filter(code::Column::IsDisabled.eq(true))
      .filter(code::Column::IsUsed.eq(false))
      .count(self.db)
      .await?;
    let unused_codes = code::Entity::find()
      .filter(code::Column::IsUsed.eq(false))
      .filter(code::Column::IsDisabled.eq(false))
      .count(self.db)
      .await?;

    let total_pro_users = pro_user::Entity::find()
      .filter(pro_user::Column::IsActive.eq(true))
      .count(self.db)
      .await?;

    let mut pro_type_distribution = Vec::new();
    for code_type in CodeType::iter() {
      let count = pro_user::Entity::find()
        .filter(pro_user::Column::IsActive.eq(true))
        .filter(pro_user::Column::ProType.eq(code_type))
        .count(self.db)
        .await?;
      pro_type_distribution.push(TypeCount { code_type, count });
    }

    let expired_users = pro_user::Entity::find()
      .filter(pro_user::Column::ExpiresAt.is_not_null())
      .filter(pro_user::Column::ExpiresAt.lt(now))
      .count(self.db)
      .await?;

    let today = now.date().and_time(NaiveTime::MIN);
    let month = now.date().with_day(1).unwrap_or(now.date()).and_time(NaiveTime::MIN);

    let today_new_users = pro_user::Entity::find()
      .filter(pro_user::Column::ActivatedAt.gte(today))
      .count(self.db)
      .await?;
    let month_new_users = pro_user::Entity::find()
      .filter(pro_user::Column::ActivatedAt.gte(month))
      .count(self.db)
      .await?;

    Ok(Overview {
      total_codes,
      used_codes,
      disabled_codes,
      unused_codes,
      total_pro_users,
      pro_type_distribution,
      expired_users,
      today_new_users,
      month_new_users,
    })
  }

  /// Activation counts bucketed by day over the trailing window.
  pub async fn daily_activations(
    &self,
    days: i64,
    now: DateTime,
  ) -> Result<Vec<DailyCount>> {
    let cutoff = now - TimeDelta::days(days);

    let rows: Vec<(String, i64)> = code::Entity::find()
      .select_only()
      .column_as(Expr::cust("DATE(used_at)"), "date")
      .column_as(Expr::col(code::Column::Code).count(), "count")
      .filter(code::Column::IsUsed.eq(true))
      .filter(code::Column::UsedAt.gte(cutoff))
      .group_by(Expr::cust("DATE(used_at)"))
      .order_by_asc(Expr::cust("DATE(used_at)"))
      .into_tuple()
      .all(self.db)
      .await?;

    Ok(rows.into_iter().map(|(date, count)| DailyCount { date, count }).collect())
  }

  pub async fn type_breakdown(&self) -> Result<Vec<TypeBreakdown>> {
    let mut breakdown = Vec::new();
    for code_type in CodeType::iter() {
      let base =
        code::Entity::find().filter(code::Column::CodeType.eq(code_type));

      let total = base.clone().count(self.db).await?;
      let used = base
        .clone()
        .filter(code::Column::IsUsed.eq(true))
        .count(self.db)
        .await?;
      let disabled = base
        .filter(code::Column::IsDisabled.eq(true))
        .filter(code::Column::IsUsed.eq(false))
        .count(self.db)
        .await?;

      breakdown.push(TypeBreakdown { code_type, total, used, disabled });
    }
    Ok(breakdown)
  }
}
