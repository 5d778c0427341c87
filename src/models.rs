// data models for the booking api

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

// the booking api refuses more than this per booking
pub const MAX_SEATS_PER_BOOKING: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: u64,
    pub origin: String,
    pub destination: String,
    pub departure_date: DateTime<Utc>,
    pub available_seats: u32,
    pub total_seats: u32,
    #[serde(deserialize_with = "decimal_from_string_or_number")]
    pub price: f64,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub is_cancelled: bool,
}

impl Trip {
    pub fn has_seats_for(&self, seats: u32) -> bool {
        self.available_seats >= seats
    }
}

/// What a rider is looking for. Wire names follow the search form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SearchCriteria {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub origin: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub destination: String,
    #[serde(rename = "departure_date")]
    pub requested_date: NaiveDate,
    #[serde(rename = "number_of_seats")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub seat_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchResult {
    Matches { trips: Vec<Trip> },
    Closest { trip: Trip, seats_sufficient: bool },
    NoRoute,
}

#[cfg(test)]
impl SearchResult {
    pub fn closest(&self) -> Option<&Trip> {
        match self {
            SearchResult::Closest { trip, .. } => Some(trip),
            _ => None,
        }
    }

    pub fn matches(&self) -> &[Trip] {
        match self {
            SearchResult::Matches { trips } => trips,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub role: String,
}

impl UserProfile {
    pub fn is_manager(&self) -> bool {
        self.role == "manager"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: u64,
    pub trip_details: Trip,
    pub booking_date: DateTime<Utc>,
    pub number_of_seats: u32,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub cancellation_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "decimal_from_string_or_number")]
    pub total_price: f64,
    #[serde(default)]
    pub assigned_seats: Vec<u32>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_phone_number: String,
}

// body of POST /booking/book/
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBooking {
    pub trip: u64,
    pub user: u64,
    pub number_of_seats: u32,
    pub user_name: String,
    pub user_phone_number: String,
}

// manager trip form, used for create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewTrip {
    #[validate(range(min = 1, message = "is required"))]
    pub company: u64,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub origin: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub destination: String,
    pub departure_date: DateTime<Utc>,
    #[validate(range(min = 1, message = "must be greater than zero"))]
    pub total_seats: u32,
    #[serde(default)]
    pub available_seats: Option<u32>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripCancellation {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactMessage {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub full_name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub subject_of_message: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub message: String,
}

// django serializes DecimalField as a string
fn decimal_from_string_or_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Number(f64),
        Text(String),
    }

    match Decimal::deserialize(deserializer)? {
        Decimal::Number(n) => Ok(n),
        Decimal::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid decimal: {}", s))),
    }
}
