use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

/// The joined account+consumer view returned by GET /user/profile.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
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
    pub meter_id: String,
    pub consumer_type: String,
}
