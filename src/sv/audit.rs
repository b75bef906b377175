use sea_orm::QuerySelect;

use crate::{
  entity::{AuditAction, audit},
  prelude::*,
  sv::activation::ClientMeta,
};

/// Append-only activation log. Written after the fact, never read by
/// the entitlement engine.
pub struct Audit<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Audit<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  #[allow(clippy::too_many_arguments)]
  pub async fn record(
    &self,
    code: Option<&str>,
    user_email: &str,
    user_name: Option<&str>,
    action: AuditAction,
    meta: &ClientMeta,
    notes: Option<&str>,
    now: DateTime,
  ) -> Result<()> {
    audit::ActiveModel {
      code: Set(code.map(Into::into)),
      user_email: Set(user_email.to_string()),
      user_name: Set(
        user_name.filter(|name| !name.is_empty()).map(Into::into),
      ),
      action: Set(action),
      ip_address: Set(meta.ip.clone()),
      user_agent: Set(meta.user_agent.clone()),
      notes: Set(notes.map(Into::into)),
      created_at: Set(now),
      ..Default::default()
    }
    .insert(self.db)
    .await?;

    Ok(())
  }

  pub async fn recent(&self, limit: u64) -> Result<Vec<audit::Model>> {
    Ok(
      audit::Entity::find()
        .order_by_desc(audit::Column::CreatedAt)
        .limit(limit)
        .all(self.db)
        .await?,
    )
  }
}
