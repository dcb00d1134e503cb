use sqlx::{mysql::MySqlPoolOptions, MySql, Pool};

pub type DbPool = Pool<MySql>;

/// MySQL duplicate-key violation (error 1062). The unique indexes on
/// users.email and users.eb_consumer_id backstop every check-then-insert.
pub fn is_duplicate_entry(err: &sqlx::Error) -> bool {
    let text = err.to_string();
    text.contains("Duplicate entry") || text.contains("1062")
}

pub async fn init_db() -> DbPool {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");

    MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to MySQL")
}
