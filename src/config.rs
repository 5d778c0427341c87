// runtime configuration, read from env (shuttle secrets are copied there at startup)

use chrono::FixedOffset;

use crate::backend::BackendError;

pub const BOOKING_API_URL: &str = "BOOKING_API_URL";
pub const API_TIMEOUT_SECONDS: &str = "API_TIMEOUT_SECONDS";
pub const SERVICE_UTC_OFFSET_HOURS: &str = "SERVICE_UTC_OFFSET_HOURS";

// get booking api url from env
pub fn get_booking_api_url() -> Result<String, BackendError> {
    std::env::var(BOOKING_API_URL)
        .map_err(|_| BackendError::Config(format!("{} not found in environment", BOOKING_API_URL)))
}

// api timeout with fallback
pub fn get_api_timeout_seconds() -> u64 {
    std::env::var(API_TIMEOUT_SECONDS)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30)
}

// calendar used for date-only trip matching, UTC unless configured
pub fn get_service_offset() -> FixedOffset {
    let utc = FixedOffset::east_opt(0).expect("zero offset is valid");
    std::env::var(SERVICE_UTC_OFFSET_HOURS)
        .ok()
        .and_then(|s| parse_offset_hours(&s))
        .unwrap_or(utc)
}

fn parse_offset_hours(value: &str) -> Option<FixedOffset> {
    let hours = value.trim().parse::<i32>().ok()?;
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}
