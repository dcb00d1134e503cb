pub mod config;
pub mod modules;
pub mod services;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use config::DbPool;
use modules::auth::auth_routes;
use modules::user::user_routes;
use services::jwt::JwtService;
use services::mailer::Mailer;
use services::phone_verification::PhoneVerifier;
use services::rate_limit::{create_rate_limiter, RateLimitLayer};
use services::security::security_headers;

pub struct AppState {
    pub db: DbPool,
    pub jwt_service: JwtService,
    pub phone_verifier: Arc<dyn PhoneVerifier>,
    pub mailer: Arc<dyn Mailer>,
    pub frontend_url: String,
}

pub async fn create_app(
    db: DbPool,
    jwt_service: JwtService,
    phone_verifier: Arc<dyn PhoneVerifier>,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
) -> Router {
    let state = Arc::new(AppState {
        db,
        jwt_service,
        phone_verifier,
        mailer,
        frontend_url,
    });

    // Sustained 20 req/s with burst of 50
    let rate_limiter = create_rate_limiter(20, 50);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/auth", auth_routes())
        .nest("/user", user_routes())
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 100)) // 100KB max body
        .layer(RateLimitLayer::new(rate_limiter))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Smart Energy Portal API"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
