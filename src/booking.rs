// client-side booking rules, checked before anything is sent to the booking api

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::models::{Booking, NewBooking, Trip, MAX_SEATS_PER_BOOKING};

const PHONE_NUMBER_PATTERN: &str = r"^\+?[0-9][0-9 \-]{5,18}[0-9]$";

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("Number of seats must be at least 1")]
    InvalidSeatCount,
    #[error("First name, last name and phone number are required")]
    MissingContactDetails,
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
    #[error("Cannot book more than {max} seats at once (requested {requested})")]
    TooManySeats { requested: u32, max: u32 },
    #[error("Only {available} seat(s) available (requested {requested})")]
    InsufficientSeats { requested: u32, available: u32 },
    #[error("Trip has been cancelled")]
    TripCancelled,
    #[error("Trip has already departed")]
    TripDeparted,
    #[error("Booking is already cancelled")]
    AlreadyCancelled,
    #[error("Only cancelled or past bookings can be deleted")]
    StillActive,
}

/// What the rider filled in for one trip.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub user_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub seats: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreparedBooking {
    pub payload: NewBooking,
    pub total_price: f64,
}

impl BookingDraft {
    /// Checks the draft against the trip as last fetched and builds the
    /// request body. The booking api re-checks all of this.
    pub fn prepare(&self, trip: &Trip, now: DateTime<Utc>) -> Result<PreparedBooking, BookingError> {
        if self.seats == 0 {
            return Err(BookingError::InvalidSeatCount);
        }

        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        let phone_number = self.phone_number.trim();

        if first_name.is_empty() || last_name.is_empty() || phone_number.is_empty() {
            return Err(BookingError::MissingContactDetails);
        }

        if !is_valid_phone_number(phone_number) {
            return Err(BookingError::InvalidPhoneNumber(phone_number.to_string()));
        }

        if self.seats > MAX_SEATS_PER_BOOKING {
            return Err(BookingError::TooManySeats {
                requested: self.seats,
                max: MAX_SEATS_PER_BOOKING,
            });
        }

        if !trip.has_seats_for(self.seats) {
            return Err(BookingError::InsufficientSeats {
                requested: self.seats,
                available: trip.available_seats,
            });
        }

        if trip.is_cancelled {
            return Err(BookingError::TripCancelled);
        }

        if trip.departure_date < now {
            return Err(BookingError::TripDeparted);
        }

        Ok(PreparedBooking {
            payload: NewBooking {
                trip: trip.id,
                user: self.user_id,
                number_of_seats: self.seats,
                user_name: format!("{} {}", first_name, last_name),
                user_phone_number: phone_number.to_string(),
            },
            total_price: trip.price * f64::from(self.seats),
        })
    }
}

// bookings can be cancelled until the bus leaves
pub fn check_cancellable(booking: &Booking, now: DateTime<Utc>) -> Result<(), BookingError> {
    if booking.is_cancelled {
        return Err(BookingError::AlreadyCancelled);
    }
    if booking.trip_details.departure_date < now {
        return Err(BookingError::TripDeparted);
    }
    Ok(())
}

// an active upcoming booking has to be cancelled before it can be removed
pub fn check_deletable(booking: &Booking, now: DateTime<Utc>) -> Result<(), BookingError> {
    if booking.is_cancelled || booking.trip_details.departure_date < now {
        return Ok(());
    }
    Err(BookingError::StillActive)
}

fn is_valid_phone_number(phone_number: &str) -> bool {
    match Regex::new(PHONE_NUMBER_PATTERN) {
        Ok(regex) => regex.is_match(phone_number),
        Err(_) => false,
    }
}
