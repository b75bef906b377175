use rand::Rng;
use serde::Serialize;

use crate::{
  entity::{CodeType, batch},
  prelude::*,
  sv,
};

pub const MAX_BATCH_SIZE: u32 = 1000;

fn generate_batch_id(now: DateTime) -> String {
  let mut rng = rand::thread_rng();
  let suffix: String = (0..4)
    .map(|_| {
      let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
      chars[rng.gen_range(0..chars.len())] as char
    })
    .collect();
  format!("BATCH_{}_{}", now.format("%Y%m%d%H%M%S"), suffix)
}

#[derive(Debug, Serialize)]
pub struct GeneratedBatch {
  pub batch_id: String,
  pub batch_name: String,
  pub codes: Vec<String>,
}

/// Admin issuance: purely additive, never touches used or disabled
/// flags, not transactional with redemption.
pub struct Batches<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Batches<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn generate(
    &self,
    count: u32,
    code_type: CodeType,
    batch_name: &str,
    notes: Option<String>,
    created_by: &str,
    now: DateTime,
  ) -> Result<GeneratedBatch> {
    if count == 0 || count > MAX_BATCH_SIZE {
      return Err(Error::InvalidArgs(format!(
        "count must be between 1 and {MAX_BATCH_SIZE}"
      )));
    }

    let batch_id = generate_batch_id(now);
    let batch_name = if batch_name.trim().is_empty() {
      batch_id.clone()
    } else {
      batch_name.trim().to_string()
    };

    batch::ActiveModel {
      batch_id: Set(batch_id.clone()),
      batch_name: Set(batch_name.clone()),
      code_type: Set(code_type),
      total_count: Set(count as i32),
      created_by: Set(created_by.to_string()),
      notes: Set(notes),
      created_at: Set(now),
    }
    .insert(self.db)
    .await?;

    let codes =
      sv::Codes::new(self.db).issue(&batch_id, code_type, count, None, now).await?;

    info!("issued batch {batch_id} ({} codes)", codes.len());

    Ok(GeneratedBatch { batch_id, batch_name, codes })
  }

  pub async fn all(&self) -> Result<Vec<batch::Model>> {
    Ok(
      batch::Entity::find()
        .order_by_desc(batch::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::{Codes, test_utils::test_db};

  fn now() -> DateTime {
    Utc::now().naive_utc()
  }

  #[tokio::test]
  async fn test_generate_batch() {
    let db = test_db::setup().await;
    let sv = Batches::new(&db);

    let batch = sv
      .generate(10, CodeType::OneYear, "launch promo", None, "admin", now())
      .await
      .unwrap();

    assert_eq!(batch.codes.len(), 10);
    assert_eq!(batch.batch_name, "launch promo");
    assert!(batch.batch_id.starts_with("BATCH_"));

    let stored = Codes::new(&db).by_batch(&batch.batch_id).await.unwrap();
    assert_eq!(stored.len(), 10);
    assert!(stored.iter().all(|code| !code.is_used && !code.is_disabled));
  }

  #[tokio::test]
  async fn test_generate_bounds() {
    let db = test_db::setup().await;
    let sv = Batches::new(&db);

    assert!(matches!(
      sv.generate(0, CodeType::OneYear, "x", None, "admin", now()).await,
      Err(Error::InvalidArgs(_))
    ));
    assert!(matches!(
      sv.generate(1001, CodeType::OneYear, "x", None, "admin", now()).await,
      Err(Error::InvalidArgs(_))
    ));
  }

  #[tokio::test]
  async fn test_blank_name_falls_back_to_batch_id() {
    let db = test_db::setup().await;
    let sv = Batches::new(&db);

    let batch = sv
      .generate(1, CodeType::SixMonth, "  ", None, "admin", now())
      .await
      .unwrap();

    assert_eq!(batch.batch_name, batch.batch_id);

    let listed = sv.all().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].total_count, 1);
  }
}
