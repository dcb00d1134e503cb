use std::sync::Arc;

use ebportal::config::{environment::Config, init_db};
use ebportal::services::jwt::JwtService;
use ebportal::services::mailer::BrevoMailer;
use ebportal::services::phone_verification::TwilioVerifyClient;
use ebportal::services::simulator::EnergySimulator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ebportal=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load environment configuration");

    let db = init_db().await;
    tracing::info!("Connected to MySQL");

    let jwt_service = JwtService::new(config.jwt_secret);

    let phone_verifier = Arc::new(TwilioVerifyClient::new(
        config.verify_account_sid,
        config.verify_auth_token,
        config.verify_service_sid,
    ));

    let mailer = Arc::new(BrevoMailer::new(
        config.mail_api_key,
        config.mail_sender_email,
        config.mail_sender_name,
    ));

    // Detached synthetic-readings job; request handling never waits on it.
    let simulator = EnergySimulator::new(db.clone(), config.simulation_interval_minutes);
    tokio::spawn(async move { simulator.run().await });

    let app = ebportal::create_app(
        db,
        jwt_service,
        phone_verifier,
        mailer,
        config.frontend_url,
    )
    .await;

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
