use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{
  entity::{AuditAction, CodeType, code, pro_user},
  prelude::*,
  sv,
  sv::codes::normalize_code,
};

pub fn normalize_email(raw: &str) -> String {
  raw.trim().to_lowercase()
}

/// Opaque bearer token handed back on activation. A lightweight
/// credential derived from the request, not a signature.
fn user_token(email: &str, now: DateTime, secret: &str) -> String {
  let data = format!("{email}:{}:{secret}", now.and_utc().timestamp());
  hex::encode(Sha256::digest(data.as_bytes()))
}

#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
  pub ip: Option<String>,
  pub user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Redemption {
  pub user_email: String,
  pub user_name: String,
  pub pro_type: CodeType,
  pub expires_at: Option<DateTime>,
  pub is_lifetime: bool,
  pub activated_at: DateTime,
  pub user_token: String,
}

#[derive(Debug, Serialize)]
pub struct ProStatus {
  pub user_email: String,
  pub user_name: Option<String>,
  pub is_pro: bool,
  pub pro_type: Option<CodeType>,
  pub expires_at: Option<DateTime>,
  pub is_expired: bool,
  pub is_lifetime: bool,
  pub activated_at: Option<DateTime>,
  pub activation_code_used: Option<String>,
  pub last_login: Option<DateTime>,
}

/// The entitlement engine: redemption is the only state-changing
/// operation, everything else is a read.
pub struct Activation<'a> {
  db: &'a DatabaseConnection,
  secret: &'a str,
}

impl<'a> Activation<'a> {
  pub fn new(db: &'a DatabaseConnection, secret: &'a str) -> Self {
    Self { db, secret }
  }

  /// Redeems a code for a user, atomically consuming the code and
  /// upserting the user's Pro entitlement.
  ///
  /// The code row, the existing entitlement, the conditional mark-used
  /// and the upsert all happen inside one transaction, so concurrent
  /// redemptions of the same code settle on exactly one winner and
  /// concurrent redemptions by the same email serialize on the expiry
  /// extension. The audit entry is appended after commit, best-effort.
  pub async fn redeem(
    &self,
    raw_code: &str,
    raw_email: &str,
    raw_name: &str,
    meta: &ClientMeta,
    now: DateTime,
  ) -> Result<Redemption> {
    let code = normalize_code(raw_code);
    let email = normalize_email(raw_email);
    let name = raw_name.trim().to_string();

    if code.is_empty() {
      return Err(Error::InvalidArgs("activation code is required".into()));
    }
    if email.is_empty() {
      return Err(Error::InvalidArgs("user email is required".into()));
    }

    let txn = self.db.begin().await?;

    let row = code::Entity::find_by_id(&code)
      .one(&txn)
      .await?
      .ok_or(Error::InvalidCode)?;

    if row.is_used {
      return Err(Error::CodeAlreadyUsed);
    }
    if row.is_disabled {
      return Err(Error::CodeDisabled);
    }
    if row.expires_at.is_some_and(|at| at < now) {
      return Err(Error::CodeExpired);
    }

    let existing = pro_user::Entity::find_by_id(&email).one(&txn).await?;

    // Lifetime is monotonic: a shorter-duration code never overwrites
    // it, and the code is not consumed.
    if let Some(user) = &existing
      && user.is_pro(now)
      && user.expires_at.is_none()
      && row.code_type != CodeType::Lifetime
    {
      return Err(Error::AlreadyPro);
    }

    let expires_at = compute_expiry(row.code_type, existing.as_ref(), now);

    // Lost race: the transaction rolls back and the loser sees the
    // same outcome as any later redeemer.
    sv::Codes::mark_used(&txn, &code, &email, &name, now).await?;

    match existing {
      Some(user) => {
        let user_name = if name.is_empty() {
          user.user_name.clone()
        } else {
          name.clone()
        };

        pro_user::ActiveModel {
          user_name: Set(user_name),
          pro_type: Set(row.code_type),
          expires_at: Set(expires_at),
          is_active: Set(true),
          activation_code_used: Set(code.clone()),
          activated_at: Set(now),
          revoked_at: Set(None),
          revoked_reason: Set(None),
          updated_at: Set(now),
          ..user.into()
        }
        .update(&txn)
        .await?;
      }
      None => {
        pro_user::ActiveModel {
          user_email: Set(email.clone()),
          user_name: Set(name.clone()),
          pro_type: Set(row.code_type),
          expires_at: Set(expires_at),
          is_active: Set(true),
          activation_code_used: Set(code.clone()),
          activated_at: Set(now),
          last_login: Set(None),
          revoked_at: Set(None),
          revoked_reason: Set(None),
          created_at: Set(now),
          updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
      }
    }

    txn.commit().await?;

    info!("activated {code} for {email}");

    if let Err(err) = sv::Audit::new(self.db)
      .record(
        Some(&code),
        &email,
        Some(&name),
        AuditAction::Activate,
        meta,
        None,
        now,
      )
      .await
    {
      warn!("failed to append activation audit entry: {err}");
    }

    Ok(Redemption {
      user_token: user_token(&email, now, self.secret),
      user_email: email,
      user_name: name,
      pro_type: row.code_type,
      expires_at,
      is_lifetime: row.code_type == CodeType::Lifetime,
      activated_at: now,
    })
  }

  /// Pure read of a user's Pro status. Expiry is evaluated lazily
  /// against `now`; the stored `is_active` flag is never swept.
  pub async fn verify(&self, raw_email: &str, now: DateTime) -> Result<ProStatus> {
    let email = normalize_email(raw_email);
    if email.is_empty() {
      return Err(Error::InvalidArgs("user email is required".into()));
    }

    let Some(user) = pro_user::Entity::find_by_id(&email).one(self.db).await?
    else {
      return Ok(ProStatus {
        user_email: email,
        user_name: None,
        is_pro: false,
        pro_type: None,
        expires_at: None,
        is_expired: false,
        is_lifetime: false,
        activated_at: None,
        activation_code_used: None,
        last_login: None,
      });
    };

    let is_expired = user.is_expired(now);
    let is_pro = user.is_pro(now);
    let last_login = user.last_login;

    // Best-effort last-login touch, never blocks the response.
    let touch = pro_user::ActiveModel {
      last_login: Set(Some(now)),
      ..user.clone().into()
    };
    if let Err(err) = touch.update(self.db).await {
      warn!("failed to update last_login for {email}: {err}");
    }

    Ok(ProStatus {
      user_email: user.user_email,
      user_name: Some(user.user_name),
      is_pro,
      pro_type: Some(user.pro_type),
      expires_at: user.expires_at,
      is_expired,
      is_lifetime: user.pro_type == CodeType::Lifetime,
      activated_at: Some(user.activated_at),
      activation_code_used: Some(user.activation_code_used),
      last_login,
    })
  }

  /// Soft-revokes a user's entitlement. The consumed code stays used.
  pub async fn revoke(
    &self,
    raw_email: &str,
    reason: &str,
    meta: &ClientMeta,
    now: DateTime,
  ) -> Result<()> {
    let email = normalize_email(raw_email);
    if email.is_empty() {
      return Err(Error::InvalidArgs("user email is required".into()));
    }

    let user = pro_user::Entity::find_by_id(&email)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)?;

    if !user.is_active {
      return Err(Error::UserNotFound);
    }

    let code = user.activation_code_used.clone();

    pro_user::ActiveModel {
      is_active: Set(false),
      revoked_at: Set(Some(now)),
      revoked_reason: Set(Some(reason.to_string())),
      updated_at: Set(now),
      ..user.into()
    }
    .update(self.db)
    .await?;

    info!("revoked pro status of {email}");

    if let Err(err) = sv::Audit::new(self.db)
      .record(
        Some(&code),
        &email,
        None,
        AuditAction::Revoke,
        meta,
        Some(reason),
        now,
      )
      .await
    {
      warn!("failed to append revoke audit entry: {err}");
    }

    Ok(())
  }
}

/// New entitlement expiry per code type. An active, unexpired,
/// non-lifetime entitlement extends additively from its current
/// expiry; anything else starts from `now`.
fn compute_expiry(
  code_type: CodeType,
  existing: Option<&pro_user::Model>,
  now: DateTime,
) -> Option<DateTime> {
  let days = code_type.duration_days()?;

  let base = existing
    .and_then(|user| if user.is_active { user.expires_at } else { None })
    .filter(|at| *at > now)
    .unwrap_or(now);

  Some(base + TimeDelta::days(days))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::audit,
    sv::{Codes, test_utils::test_db},
  };

  const SECRET: &str = "test-secret";

  fn t0() -> DateTime {
    Utc::now().naive_utc()
  }

  async fn issue_one(db: &DatabaseConnection, ty: CodeType) -> String {
    Codes::new(db)
      .issue("BATCH_TEST", ty, 1, None, t0())
      .await
      .unwrap()
      .remove(0)
  }

  #[tokio::test]
  async fn test_redeem_one_year() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let code = issue_one(&db, CodeType::OneYear).await;
    let now = t0();

    let redemption = sv
      .redeem(&code, "User@Example.com", "User", &ClientMeta::default(), now)
      .await
      .unwrap();

    assert_eq!(redemption.user_email, "user@example.com");
    assert_eq!(redemption.pro_type, CodeType::OneYear);
    assert!(!redemption.is_lifetime);
    assert_eq!(redemption.expires_at, Some(now + TimeDelta::days(365)));
    assert_eq!(redemption.user_token.len(), 64);

    let status = sv.verify("user@example.com", now).await.unwrap();
    assert!(status.is_pro);
    assert_eq!(status.activation_code_used.as_deref(), Some(code.as_str()));
  }

  #[tokio::test]
  async fn test_redeem_same_code_twice() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let code = issue_one(&db, CodeType::OneYear).await;
    let now = t0();

    sv.redeem(&code, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();

    assert!(matches!(
      sv.redeem(&code, "b@example.com", "B", &ClientMeta::default(), now)
        .await,
      Err(Error::CodeAlreadyUsed)
    ));

    // The first redemption stands untouched.
    let row = Codes::new(&db).lookup(&code).await.unwrap().unwrap();
    assert_eq!(row.used_by.as_deref(), Some("a@example.com"));
  }

  #[tokio::test]
  async fn test_extension_is_additive() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let first = issue_one(&db, CodeType::OneYear).await;
    let redemption = sv
      .redeem(&first, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();
    let expiry = redemption.expires_at.unwrap();

    // Ten days before expiry the second year stacks on top of the
    // first, not on top of `now`.
    let later = expiry - TimeDelta::days(10);
    let second = issue_one(&db, CodeType::OneYear).await;
    let redemption = sv
      .redeem(&second, "a@example.com", "A", &ClientMeta::default(), later)
      .await
      .unwrap();

    assert_eq!(redemption.expires_at, Some(expiry + TimeDelta::days(365)));
  }

  #[tokio::test]
  async fn test_expired_entitlement_restarts_from_now() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let first = issue_one(&db, CodeType::SixMonth).await;
    sv.redeem(&first, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();

    let later = now + TimeDelta::days(200);
    let second = issue_one(&db, CodeType::SixMonth).await;
    let redemption = sv
      .redeem(&second, "a@example.com", "A", &ClientMeta::default(), later)
      .await
      .unwrap();

    assert_eq!(redemption.expires_at, Some(later + TimeDelta::days(180)));
  }

  #[tokio::test]
  async fn test_lifetime_dominance() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let yearly = issue_one(&db, CodeType::OneYear).await;
    sv.redeem(&yearly, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();

    let lifetime = issue_one(&db, CodeType::Lifetime).await;
    let redemption = sv
      .redeem(&lifetime, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();

    assert!(redemption.is_lifetime);
    assert_eq!(redemption.expires_at, None);

    // Pro forever after.
    let status = sv
      .verify("a@example.com", now + TimeDelta::days(10_000))
      .await
      .unwrap();
    assert!(status.is_pro);
    assert!(status.is_lifetime);
    assert!(!status.is_expired);
  }

  #[tokio::test]
  async fn test_lifetime_never_downgraded() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let lifetime = issue_one(&db, CodeType::Lifetime).await;
    sv.redeem(&lifetime, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();

    let yearly = issue_one(&db, CodeType::OneYear).await;
    assert!(matches!(
      sv.redeem(&yearly, "a@example.com", "A", &ClientMeta::default(), now)
        .await,
      Err(Error::AlreadyPro)
    ));

    // The rejected code is not consumed.
    let row = Codes::new(&db).lookup(&yearly).await.unwrap().unwrap();
    assert!(!row.is_used);
  }

  #[tokio::test]
  async fn test_disabled_and_expired_codes_rejected() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let disabled = issue_one(&db, CodeType::OneYear).await;
    Codes::new(&db).disable(&disabled, None).await.unwrap();
    assert!(matches!(
      sv.redeem(&disabled, "a@example.com", "A", &ClientMeta::default(), now)
        .await,
      Err(Error::CodeDisabled)
    ));

    let stale = Codes::new(&db)
      .issue(
        "BATCH_TEST",
        CodeType::OneYear,
        1,
        Some(now - TimeDelta::days(1)),
        now - TimeDelta::days(30),
      )
      .await
      .unwrap()
      .remove(0);
    assert!(matches!(
      sv.redeem(&stale, "a@example.com", "A", &ClientMeta::default(), now)
        .await,
      Err(Error::CodeExpired)
    ));

    assert!(matches!(
      sv.redeem(
        "NOSUCHCODE123456",
        "a@example.com",
        "A",
        &ClientMeta::default(),
        now
      )
      .await,
      Err(Error::InvalidCode)
    ));
  }

  #[tokio::test]
  async fn test_validation_rejects_empty_input() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    assert!(matches!(
      sv.redeem("  ", "a@example.com", "A", &ClientMeta::default(), now)
        .await,
      Err(Error::InvalidArgs(_))
    ));
    assert!(matches!(
      sv.redeem("SOMECODE", "  ", "A", &ClientMeta::default(), now).await,
      Err(Error::InvalidArgs(_))
    ));
  }

  #[tokio::test]
  async fn test_lazy_expiry_does_not_mutate_row() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let code = issue_one(&db, CodeType::SixMonth).await;
    sv.redeem(&code, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();

    let status = sv
      .verify("a@example.com", now + TimeDelta::days(200))
      .await
      .unwrap();
    assert!(!status.is_pro);
    assert!(status.is_expired);

    // Expiry is a read-time computation only.
    let row = pro_user::Entity::find_by_id("a@example.com")
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert!(row.is_active);
  }

  #[tokio::test]
  async fn test_verify_unknown_user() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);

    let status = sv.verify("nobody@example.com", t0()).await.unwrap();
    assert!(!status.is_pro);
    assert!(!status.is_expired);
    assert_eq!(status.pro_type, None);
  }

  #[tokio::test]
  async fn test_verify_touches_last_login() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let code = issue_one(&db, CodeType::OneYear).await;
    sv.redeem(&code, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();

    sv.verify("a@example.com", now).await.unwrap();

    let row = pro_user::Entity::find_by_id("a@example.com")
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(row.last_login, Some(now));
  }

  #[tokio::test]
  async fn test_revoke_leaves_code_used() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let code = issue_one(&db, CodeType::OneYear).await;
    sv.redeem(&code, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();

    sv.revoke("a@example.com", "refund", &ClientMeta::default(), now)
      .await
      .unwrap();

    let status = sv.verify("a@example.com", now).await.unwrap();
    assert!(!status.is_pro);

    let row = pro_user::Entity::find_by_id("a@example.com")
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert!(!row.is_active);
    assert_eq!(row.revoked_at, Some(now));
    assert_eq!(row.revoked_reason.as_deref(), Some("refund"));

    // Revocation never touches the consumed code.
    let code_row = Codes::new(&db).lookup(&code).await.unwrap().unwrap();
    assert!(code_row.is_used);
    assert_eq!(code_row.used_by.as_deref(), Some("a@example.com"));
  }

  #[tokio::test]
  async fn test_revoke_unknown_user() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);

    assert!(matches!(
      sv.revoke("nobody@example.com", "x", &ClientMeta::default(), t0())
        .await,
      Err(Error::UserNotFound)
    ));
  }

  #[tokio::test]
  async fn test_redeem_after_revoke_reactivates() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let first = issue_one(&db, CodeType::OneYear).await;
    sv.redeem(&first, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();
    sv.revoke("a@example.com", "chargeback", &ClientMeta::default(), now)
      .await
      .unwrap();

    // A revoked entitlement does not extend, it restarts.
    let second = issue_one(&db, CodeType::OneYear).await;
    let redemption = sv
      .redeem(&second, "a@example.com", "A", &ClientMeta::default(), now)
      .await
      .unwrap();
    assert_eq!(redemption.expires_at, Some(now + TimeDelta::days(365)));

    let row = pro_user::Entity::find_by_id("a@example.com")
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert!(row.is_active);
    assert_eq!(row.revoked_at, None);
    assert_eq!(row.revoked_reason, None);
    assert_eq!(row.activation_code_used, second);
  }

  #[tokio::test]
  async fn test_audit_trail() {
    let db = test_db::setup().await;
    let sv = Activation::new(&db, SECRET);
    let now = t0();

    let meta = ClientMeta {
      ip: Some("10.0.0.1".into()),
      user_agent: Some("test-agent".into()),
    };

    let code = issue_one(&db, CodeType::OneYear).await;
    sv.redeem(&code, "a@example.com", "A", &meta, now).await.unwrap();
    sv.revoke("a@example.com", "abuse", &meta, now).await.unwrap();

    let entries = audit::Entity::find()
      .order_by_asc(audit::Column::Id)
      .all(&db)
      .await
      .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, AuditAction::Activate);
    assert_eq!(entries[0].ip_address.as_deref(), Some("10.0.0.1"));
    assert_eq!(entries[1].action, AuditAction::Revoke);
    assert_eq!(entries[1].notes.as_deref(), Some("abuse"));
  }

  #[tokio::test]
  async fn test_user_token_is_stable_for_inputs() {
    let now = t0();
    let a = user_token("a@example.com", now, SECRET);
    let b = user_token("a@example.com", now, SECRET);
    let c = user_token("b@example.com", now, SECRET);

    assert_eq!(a, b);
    assert_ne!(a, c);
  }
}
