// validation of incoming search, trip and contact forms

use validator::{Validate, ValidationErrors};

use crate::models::{ContactMessage, NewTrip, SearchCriteria};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("{0}")]
    Invalid(String),
    #[error("Origin and destination must be different")]
    SameOriginAndDestination,
    #[error("Available seats ({available}) exceed total seats ({total})")]
    SeatsExceedCapacity { available: u32, total: u32 },
    #[error("Price must be a finite amount")]
    InvalidPrice,
}

// renders field errors as "field: message; field2: message", sorted by field
impl From<ValidationErrors> for FormError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages: Vec<String> = errors
                    .iter()
                    .map(|error| match &error.message {
                        Some(message) => message.to_string(),
                        None => error.code.to_string(),
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect();
        fields.sort();
        FormError::Invalid(fields.join("; "))
    }
}

/// The matcher assumes well-formed criteria; this is where they are rejected.
pub fn validate_criteria(criteria: &SearchCriteria) -> Result<(), FormError> {
    criteria.validate()?;
    Ok(())
}

// a new trip starts with every seat available
pub fn prepare_new_trip(mut trip: NewTrip) -> Result<NewTrip, FormError> {
    validate_trip(&trip)?;
    trip.available_seats = Some(trip.total_seats);
    Ok(trip)
}

pub fn validate_trip(trip: &NewTrip) -> Result<(), FormError> {
    trip.validate()?;

    if trip.origin == trip.destination {
        return Err(FormError::SameOriginAndDestination);
    }
    if let Some(available) = trip.available_seats {
        if available > trip.total_seats {
            return Err(FormError::SeatsExceedCapacity {
                available,
                total: trip.total_seats,
            });
        }
    }
    if !trip.price.is_finite() {
        return Err(FormError::InvalidPrice);
    }
    Ok(())
}

pub fn validate_contact(message: &ContactMessage) -> Result<(), FormError> {
    message.validate()?;
    Ok(())
}
