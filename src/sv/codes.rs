use rand::Rng;
use sea_orm::sea_query::Expr;

use crate::{
  entity::{CodeType, code},
  prelude::*,
};

/// Codes are fixed-width uppercase alphanumerics, typed by humans.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 16;

const MAX_COLLISION_RETRIES: usize = 8;

pub fn normalize_code(raw: &str) -> String {
  raw.trim().to_uppercase()
}

fn generate_code() -> String {
  let mut rng = rand::thread_rng();
  (0..CODE_LEN)
    .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
    .collect()
}

/// Canonical store of activation codes. The only mutations are batch
/// issuance, the conditional mark-used performed inside the redemption
/// transaction, and the admin disable action.
pub struct Codes<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Codes<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn lookup(&self, raw: &str) -> Result<Option<code::Model>> {
    let code = normalize_code(raw);
    Ok(code::Entity::find_by_id(code).one(self.db).await?)
  }

  /// Conditionally marks a code used. The `is_used = false` filter is
  /// the compare-and-swap that guarantees at most one successful
  /// redemption per code, even across server instances; zero affected
  /// rows means the race was lost.
  ///
  /// Generic over the connection so the entitlement engine can run it
  /// inside its own transaction.
  pub async fn mark_used<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    email: &str,
    name: &str,
    now: DateTime,
  ) -> Result<()> {
    let result = code::Entity::update_many()
      .col_expr(code::Column::IsUsed, Expr::value(true))
      .col_expr(code::Column::UsedBy, Expr::value(email))
      .col_expr(
        code::Column::UsedByName,
        Expr::value((!name.is_empty()).then(|| name.to_string())),
      )
      .col_expr(code::Column::UsedAt, Expr::value(now))
      .filter(code::Column::Code.eq(code))
      .filter(code::Column::IsUsed.eq(false))
      .exec(conn)
      .await?;

    if result.rows_affected == 0 {
      return Err(Error::CodeAlreadyUsed);
    }

    Ok(())
  }

  /// Disables an unused code. Used codes are terminal and cannot be
  /// disabled; the conditional update mirrors `mark_used`.
  pub async fn disable(
    &self,
    raw: &str,
    reason: Option<String>,
  ) -> Result<()> {
    let code = normalize_code(raw);

    let mut update = code::Entity::update_many()
      .col_expr(code::Column::IsDisabled, Expr::value(true))
      .filter(code::Column::Code.eq(&code))
      .filter(code::Column::IsUsed.eq(false));

    if let Some(reason) = reason {
      update = update.col_expr(code::Column::Notes, Expr::value(reason));
    }

    let result = update.exec(self.db).await?;

    if result.rows_affected == 0 {
      return match self.lookup(&code).await? {
        Some(_) => Err(Error::CodeAlreadyUsed),
        None => Err(Error::InvalidCode),
      };
    }

    Ok(())
  }

  /// Generates `count` unused codes for a batch.
  pub async fn issue(
    &self,
    batch_id: &str,
    code_type: CodeType,
    count: u32,
    expires_at: Option<DateTime>,
    now: DateTime,
  ) -> Result<Vec<String>> {
    let mut codes = Vec::with_capacity(count as usize);
    for _ in 0..count {
      codes.push(self.issue_one(batch_id, code_type, expires_at, now).await?);
    }
    Ok(codes)
  }

  async fn issue_one(
    &self,
    batch_id: &str,
    code_type: CodeType,
    expires_at: Option<DateTime>,
    now: DateTime,
  ) -> Result<String> {
    for _ in 0..MAX_COLLISION_RETRIES {
      let code = generate_code();

      if code::Entity::find_by_id(&code).one(self.db).await?.is_some() {
        warn!("activation code collision, retrying");
        continue;
      }

      code::ActiveModel {
        code: Set(code.clone()),
        code_type: Set(code_type),
        batch_id: Set(batch_id.to_string()),
        is_used: Set(false),
        is_disabled: Set(false),
        used_by: Set(None),
        used_by_name: Set(None),
        used_at: Set(None),
        expires_at: Set(expires_at),
        notes: Set(None),
        created_at: Set(now),
      }
      .insert(self.db)
      .await?;

      return Ok(code);
    }

    Err(Error::Internal("exhausted retries generating a unique code".into()))
  }

  pub async fn by_batch(&self, batch_id: &str) -> Result<Vec<code::Model>> {
    Ok(
      code::Entity::find()
        .filter(code::Column::BatchId.eq(batch_id))
        .order_by_asc(code::Column::Code)
        .all(self.db)
        .await?,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  fn now() -> DateTime {
    Utc::now().naive_utc()
  }

  #[tokio::test]
  async fn test_issue_unique_codes() {
    let db = test_db::setup().await;
    let sv = Codes::new(&db);

    let codes =
      sv.issue("BATCH_TEST", CodeType::OneYear, 50, None, now()).await.unwrap();

    assert_eq!(codes.len(), 50);
    let unique: std::collections::HashSet<_> = codes.iter().collect();
    assert_eq!(unique.len(), 50);

    for code in &codes {
      assert_eq!(code.len(), 16);
      assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
  }

  #[tokio::test]
  async fn test_lookup_normalizes() {
    let db = test_db::setup().await;
    let sv = Codes::new(&db);

    let codes =
      sv.issue("BATCH_TEST", CodeType::Lifetime, 1, None, now()).await.unwrap();

    let found =
      sv.lookup(&format!("  {}  ", codes[0].to_lowercase())).await.unwrap();
    assert_eq!(found.unwrap().code, codes[0]);
  }

  #[tokio::test]
  async fn test_mark_used_wins_only_once() {
    let db = test_db::setup().await;
    let sv = Codes::new(&db);

    let codes =
      sv.issue("BATCH_TEST", CodeType::OneYear, 1, None, now()).await.unwrap();

    Codes::mark_used(&db, &codes[0], "a@example.com", "A", now())
      .await
      .unwrap();

    // The second conditional update affects zero rows.
    assert!(matches!(
      Codes::mark_used(&db, &codes[0], "b@example.com", "B", now()).await,
      Err(Error::CodeAlreadyUsed)
    ));

    let row = sv.lookup(&codes[0]).await.unwrap().unwrap();
    assert_eq!(row.used_by.as_deref(), Some("a@example.com"));
  }

  #[tokio::test]
  async fn test_disable_unused() {
    let db = test_db::setup().await;
    let sv = Codes::new(&db);

    let codes =
      sv.issue("BATCH_TEST", CodeType::SixMonth, 1, None, now()).await.unwrap();

    sv.disable(&codes[0], Some("compromised batch".into())).await.unwrap();

    let row = sv.lookup(&codes[0]).await.unwrap().unwrap();
    assert!(row.is_disabled);
    assert!(!row.is_used);
  }

  #[tokio::test]
  async fn test_disable_used_fails() {
    let db = test_db::setup().await;
    let sv = Codes::new(&db);

    let codes =
      sv.issue("BATCH_TEST", CodeType::OneYear, 1, None, now()).await.unwrap();
    Codes::mark_used(&db, &codes[0], "a@example.com", "A", now())
      .await
      .unwrap();

    assert!(matches!(
      sv.disable(&codes[0], None).await,
      Err(Error::CodeAlreadyUsed)
    ));

    // Still used, never un-used.
    let row = sv.lookup(&codes[0]).await.unwrap().unwrap();
    assert!(row.is_used);
    assert!(!row.is_disabled);
  }

  #[tokio::test]
  async fn test_disable_unknown_code() {
    let db = test_db::setup().await;
    let sv = Codes::new(&db);

    assert!(matches!(
      sv.disable("NOSUCHCODE123456", None).await,
      Err(Error::InvalidCode)
    ));
  }
}
