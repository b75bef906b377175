use std::net::SocketAddr;

use axum::{
  Json,
  extract::{ConnectInfo, Request, State},
  http::{HeaderMap, StatusCode},
  middleware::Next,
  response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
  entity::CodeType, prelude::*, state::AppState, sv,
  sv::activation::ClientMeta,
};

fn ok<T: serde::Serialize>(data: T) -> Json<json::Value> {
  Json(json::json!({ "success": true, "data": data }))
}

fn unauthorized() -> Response {
  (
    StatusCode::UNAUTHORIZED,
    Json(json::json!({
      "success": false,
      "error": "invalid API key",
      "code": "INVALID_API_KEY",
    })),
  )
    .into_response()
}

fn client_meta(addr: SocketAddr, headers: &HeaderMap) -> ClientMeta {
  ClientMeta {
    ip: Some(addr.ip().to_string()),
    user_agent: headers
      .get("user-agent")
      .and_then(|value| value.to_str().ok())
      .map(Into::into),
  }
}

/// Shared-credential gate for the client-facing write endpoints.
/// Domain authorization stops here; the engine assumes callers are
/// already vetted.
pub async fn require_api_key(
  State(app): State<Arc<AppState>>,
  req: Request,
  next: Next,
) -> Response {
  let provided =
    req.headers().get("x-api-key").and_then(|value| value.to_str().ok());
  if provided != Some(app.config.api_key.as_str()) {
    return unauthorized();
  }
  next.run(req).await
}

/// Elevated credential for issuance and reporting.
pub async fn require_admin_key(
  State(app): State<Arc<AppState>>,
  req: Request,
  next: Next,
) -> Response {
  let provided =
    req.headers().get("x-admin-key").and_then(|value| value.to_str().ok());
  if provided != Some(app.config.admin_key.as_str()) {
    return unauthorized();
  }
  next.run(req).await
}

pub async fn health() -> Json<json::Value> {
  Json(json::json!({
    "success": true,
    "message": "activation API is running",
    "timestamp": Utc::now().naive_utc(),
  }))
}

#[derive(Deserialize)]
pub struct ActivateReq {
  pub activation_code: String,
  pub user_email: String,
  #[serde(default)]
  pub user_name: String,
}

pub async fn activate(
  State(app): State<Arc<AppState>>,
  ConnectInfo(addr): ConnectInfo<SocketAddr>,
  headers: HeaderMap,
  Json(req): Json<ActivateReq>,
) -> Result<Json<json::Value>> {
  let meta = client_meta(addr, &headers);
  let redemption = app
    .activation()
    .redeem(
      &req.activation_code,
      &req.user_email,
      &req.user_name,
      &meta,
      Utc::now().naive_utc(),
    )
    .await?;
  Ok(ok(redemption))
}

#[derive(Deserialize)]
pub struct VerifyReq {
  pub user_email: String,
}

pub async fn verify(
  State(app): State<Arc<AppState>>,
  Json(req): Json<VerifyReq>,
) -> Result<Json<json::Value>> {
  let status =
    app.activation().verify(&req.user_email, Utc::now().naive_utc()).await?;
  Ok(ok(status))
}

#[derive(Deserialize)]
pub struct RevokeReq {
  pub user_email: String,
  #[serde(default)]
  pub reason: String,
}

pub async fn revoke(
  State(app): State<Arc<AppState>>,
  ConnectInfo(addr): ConnectInfo<SocketAddr>,
  headers: HeaderMap,
  Json(req): Json<RevokeReq>,
) -> Result<Json<json::Value>> {
  let meta = client_meta(addr, &headers);
  let now = Utc::now().naive_utc();
  app.activation().revoke(&req.user_email, &req.reason, &meta, now).await?;
  Ok(ok(json::json!({
    "user_email": sv::activation::normalize_email(&req.user_email),
    "revoked_at": now,
    "reason": req.reason,
  })))
}

#[derive(Deserialize)]
pub struct GenerateReq {
  pub count: u32,
  pub code_type: CodeType,
  #[serde(default)]
  pub batch_name: String,
  pub notes: Option<String>,
}

pub async fn generate(
  State(app): State<Arc<AppState>>,
  Json(req): Json<GenerateReq>,
) -> Result<Json<json::Value>> {
  let batch = sv::Batches::new(&app.db)
    .generate(
      req.count,
      req.code_type,
      &req.batch_name,
      req.notes,
      "api",
      Utc::now().naive_utc(),
    )
    .await?;
  Ok(ok(batch))
}

#[derive(Deserialize)]
pub struct DisableReq {
  pub code: String,
  pub reason: Option<String>,
}

pub async fn disable_code(
  State(app): State<Arc<AppState>>,
  Json(req): Json<DisableReq>,
) -> Result<Json<json::Value>> {
  sv::Codes::new(&app.db).disable(&req.code, req.reason).await?;
  Ok(ok(json::json!({
    "code": sv::codes::normalize_code(&req.code),
    "disabled": true,
  })))
}

pub async fn recent_logs(
  State(app): State<Arc<AppState>>,
) -> Result<Json<json::Value>> {
  let entries = sv::Audit::new(&app.db).recent(100).await?;
  Ok(ok(entries))
}

pub async fn batches(
  State(app): State<Arc<AppState>>,
) -> Result<Json<json::Value>> {
  let batches = sv::Batches::new(&app.db).all().await?;
  Ok(ok(batches))
}

pub async fn statistics(
  State(app): State<Arc<AppState>>,
) -> Result<Json<json::Value>> {
  let now = Utc::now().naive_utc();
  let stats = sv::Stats::new(&app.db);

  let overview = stats.overview(now).await?;
  let daily_activations = stats.daily_activations(30, now).await?;
  let type_breakdown = stats.type_breakdown().await?;

  Ok(ok(json::json!({
    "overview": overview,
    "daily_activations": daily_activations,
    "type_breakdown": type_breakdown,
  })))
}
