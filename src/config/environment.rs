use std::env;

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub mail_api_key: String,
    pub mail_sender_email: String,
    pub mail_sender_name: String,
    pub verify_account_sid: String,
    pub verify_auth_token: String,
    pub verify_service_sid: String,
    pub simulation_interval_minutes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set".to_string())?;

        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        let mail_api_key = env::var("MAIL_API_KEY")
            .map_err(|_| "MAIL_API_KEY must be set".to_string())?;

        let mail_sender_email = env::var("MAIL_SENDER_EMAIL")
            .map_err(|_| "MAIL_SENDER_EMAIL must be set".to_string())?;

        let mail_sender_name = env::var("MAIL_SENDER_NAME")
            .unwrap_or_else(|_| "Smart Energy System".to_string());

        let verify_account_sid = env::var("VERIFY_ACCOUNT_SID")
            .map_err(|_| "VERIFY_ACCOUNT_SID must be set".to_string())?;

        let verify_auth_token = env::var("VERIFY_AUTH_TOKEN")
            .map_err(|_| "VERIFY_AUTH_TOKEN must be set".to_string())?;

        let verify_service_sid = env::var("VERIFY_SERVICE_SID")
            .map_err(|_| "VERIFY_SERVICE_SID must be set".to_string())?;

        let simulation_interval_minutes = env::var("SIMULATION_INTERVAL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            database_url,
            jwt_secret,
            frontend_url,
            mail_api_key,
            mail_sender_email,
            mail_sender_name,
            verify_account_sid,
            verify_auth_token,
            verify_service_sid,
            simulation_interval_minutes,
        })
    }
}
