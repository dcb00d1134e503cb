use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// A portal account row. `phone` is a denormalized copy of the linked
/// consumer's phone; `eb_consumer_id` is unique, enforcing the 1:1 link.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub alternate_phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub country: String,
    pub profile_completed: bool,
    pub is_active: bool,
    pub eb_consumer_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Just enough of the joined account+consumer view to authenticate.
#[derive(Debug, Clone, FromRow)]
pub struct AccountCredentials {
    pub id: u64,
    pub password: String,
    pub is_active: bool,
}

/// Resolution target for the password-recovery flow.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRecovery {
    pub id: u64,
    pub phone: String,
}
