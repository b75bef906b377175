mod entity;
mod error;
mod handlers;
mod prelude;
mod state;
mod sv;

use std::{env, net::SocketAddr, time::Duration};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "activation=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let db_url = env::var("DATABASE_URL")
    .unwrap_or_else(|_| "sqlite:activation.db?mode=rwc".into());

  let config = Config {
    api_key: env::var("API_KEY").expect("API_KEY not set"),
    admin_key: env::var("ADMIN_API_KEY").expect("ADMIN_API_KEY not set"),
    server_secret: env::var("SERVER_SECRET").expect("SERVER_SECRET not set"),
  };

  info!("Starting Activation Server v{}", env!("CARGO_PKG_VERSION"));

  let app_state = Arc::new(
    AppState::new(&db_url, config).await.expect("Failed to init app state"),
  );

  let governor_conf = Arc::new(
    GovernorConfigBuilder::default()
      .per_second(2)
      .burst_size(100)
      .finish()
      .expect("Failed to build rate limiter config"),
  );

  let governor_limiter = governor_conf.limiter().clone();

  tokio::spawn(async move {
    loop {
      tokio::time::sleep(Duration::from_secs(60)).await;
      governor_limiter.retain_recent();
    }
  });

  let api = Router::new()
    .route("/api/activate", post(handlers::activate))
    .route("/api/verify", post(handlers::verify))
    .route("/api/revoke", post(handlers::revoke))
    .layer(middleware::from_fn_with_state(
      app_state.clone(),
      handlers::require_api_key,
    ));

  let admin = Router::new()
    .route("/api/admin/generate", post(handlers::generate))
    .route("/api/admin/disable", post(handlers::disable_code))
    .route("/api/admin/stats", get(handlers::statistics))
    .route("/api/admin/batches", get(handlers::batches))
    .route("/api/admin/logs", get(handlers::recent_logs))
    .layer(middleware::from_fn_with_state(
      app_state.clone(),
      handlers::require_admin_key,
    ));

  let app = Router::new()
    .route("/api/health", get(handlers::health))
    .merge(api)
    .merge(admin)
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(
          CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        ),
    )
    .with_state(app_state)
    .into_make_service_with_connect_info::<SocketAddr>();

  let port: u16 =
    env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(5001);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  info!("HTTP server listening on {}", addr);

  let listener =
    tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
  axum::serve(listener, app).await.expect("Server error");
}
