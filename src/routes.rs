// http surface: riders, managers and the contact form

use axum::{
    extract::{FromRequest, FromRequestParts, OptionalFromRequest, Path, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::info;

use crate::backend::{BackendClient, BackendError};
use crate::booking::{check_cancellable, check_deletable, BookingDraft};
use crate::error::ApiError;
use crate::forms::{prepare_new_trip, validate_contact, validate_criteria, validate_trip};
use crate::matcher::{available_regions, company_trips, TripMatcher};
use crate::models::{
    AccessToken, ContactMessage, Credentials, NewTrip, SearchCriteria, SearchResult, TokenPair,
    UserProfile,
};
use crate::session::Session;

pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

const DEFAULT_CANCELLATION_REASON: &str = "Trip cancelled by the company";

#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub matcher: TripMatcher,
}

// json body whose rejections render like every other error
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

// a request without a json content type extracts as None
impl<T, S> OptionalFromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let json = <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(json.map(|Json(value)| AppJson(value)))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers).ok_or(ApiError::Unauthenticated)
    }
}

fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    let access = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    if access.is_empty() {
        return None;
    }

    let refresh = headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Some(Session::new(access, refresh))
}

// hands a refreshed access token back to the caller
fn with_session(session: &Session, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if session.was_refreshed() {
        if let Ok(value) = HeaderValue::from_str(session.access_token()) {
            response.headers_mut().insert(ACCESS_TOKEN_HEADER, value);
        }
    }
    response
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub trip_id: u64,
    pub number_of_seats: u32,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelTripRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/regions", get(regions))
        .route("/trips/search", post(search_trips))
        .route("/bookings", post(create_booking))
        .route("/bookings/me", get(my_bookings))
        .route("/bookings/{id}", delete(delete_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/manager/trips", get(list_company_trips).post(create_trip))
        .route("/manager/trips/{id}", get(manager_trip).put(update_trip))
        .route("/manager/trips/{id}/cancel", post(cancel_trip))
        .route("/contact", post(send_contact))
        .with_state(state)
}

async fn login(
    State(state): State<AppState>,
    AppJson(credentials): AppJson<Credentials>,
) -> Result<Json<TokenPair>, ApiError> {
    let tokens = state.backend.login(&credentials).await.map_err(|e| match e {
        BackendError::Unauthorized => ApiError::InvalidCredentials,
        other => other.into(),
    })?;
    Ok(Json(tokens))
}

async fn refresh(
    State(state): State<AppState>,
    AppJson(request): AppJson<RefreshRequest>,
) -> Result<Json<AccessToken>, ApiError> {
    let session = Session::new(String::new(), Some(request.refresh));
    let access = state.backend.refresh(&session).await?;
    Ok(Json(AccessToken { access }))
}

async fn regions(State(state): State<AppState>, mut session: Session) -> Result<Response, ApiError> {
    let trips = state.backend.fetch_trips(&mut session).await?;
    Ok(with_session(&session, Json(available_regions(&trips))))
}

async fn search_trips(
    State(state): State<AppState>,
    mut session: Session,
    AppJson(criteria): AppJson<SearchCriteria>,
) -> Result<Response, ApiError> {
    validate_criteria(&criteria)?;

    let trips = state.backend.fetch_trips(&mut session).await?;
    let result = state.matcher.find_matches(&criteria, &trips);

    match &result {
        SearchResult::Matches { trips } => info!(
            "Search {} -> {} on {}: {} matching trips",
            criteria.origin,
            criteria.destination,
            criteria.requested_date,
            trips.len()
        ),
        SearchResult::Closest { trip, .. } => info!(
            "Search {} -> {} on {}: no exact match, closest is trip {}",
            criteria.origin, criteria.destination, criteria.requested_date, trip.id
        ),
        SearchResult::NoRoute => info!(
            "Search {} -> {}: no trips on this route",
            criteria.origin, criteria.destination
        ),
    }

    Ok(with_session(&session, Json(result)))
}

async fn create_booking(
    State(state): State<AppState>,
    mut session: Session,
    AppJson(request): AppJson<BookingRequest>,
) -> Result<Response, ApiError> {
    let profile = state.backend.fetch_profile(&mut session).await?;

    // re-read the snapshot, the rider may have searched a while ago
    let trips = state.backend.fetch_trips(&mut session).await?;
    let trip = trips
        .iter()
        .find(|trip| trip.id == request.trip_id)
        .ok_or_else(|| ApiError::NotFound(format!("Trip {} not found", request.trip_id)))?;

    let draft = BookingDraft {
        user_id: profile.id,
        first_name: request.first_name.unwrap_or(profile.first_name),
        last_name: request.last_name.unwrap_or(profile.last_name),
        phone_number: request.phone_number.unwrap_or(profile.phone_number),
        seats: request.number_of_seats,
    };
    let prepared = draft.prepare(trip, Utc::now())?;

    let booking = state
        .backend
        .create_booking(&mut session, &prepared.payload)
        .await?;
    info!(
        "Booking {} created for trip {} ({} seats, total {})",
        booking.id, trip.id, booking.number_of_seats, prepared.total_price
    );

    Ok(with_session(&session, (StatusCode::CREATED, Json(booking))))
}

async fn my_bookings(State(state): State<AppState>, mut session: Session) -> Result<Response, ApiError> {
    let bookings = state.backend.my_bookings(&mut session).await?;
    Ok(with_session(&session, Json(bookings)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<u64>,
    mut session: Session,
) -> Result<Response, ApiError> {
    let bookings = state.backend.my_bookings(&mut session).await?;
    let booking = bookings
        .iter()
        .find(|booking| booking.id == booking_id)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", booking_id)))?;

    check_cancellable(booking, Utc::now())?;

    let cancelled = state.backend.cancel_booking(&mut session, booking_id).await?;
    info!("Booking {} cancelled", booking_id);
    Ok(with_session(&session, Json(cancelled)))
}

async fn delete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<u64>,
    mut session: Session,
) -> Result<Response, ApiError> {
    let bookings = state.backend.my_bookings(&mut session).await?;
    let booking = bookings
        .iter()
        .find(|booking| booking.id == booking_id)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {} not found", booking_id)))?;

    check_deletable(booking, Utc::now())?;

    state.backend.delete_booking(&mut session, booking_id).await?;
    info!("Booking {} deleted", booking_id);
    Ok(with_session(&session, StatusCode::NO_CONTENT))
}

async fn require_manager(backend: &BackendClient, session: &mut Session) -> Result<UserProfile, ApiError> {
    let profile = backend.fetch_profile(session).await?;
    if !profile.is_manager() {
        tracing::warn!("User {} tried to manage trips without the manager role", profile.username);
        return Err(ApiError::Forbidden("Only company managers can manage trips".to_string()));
    }
    Ok(profile)
}

async fn list_company_trips(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, ApiError> {
    let manager = require_manager(&state.backend, &mut session).await?;
    let trips = state.backend.fetch_trips(&mut session).await?;
    Ok(with_session(&session, Json(company_trips(&trips, &manager.username))))
}

// loads one trip into the edit form
async fn manager_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<u64>,
    mut session: Session,
) -> Result<Response, ApiError> {
    require_manager(&state.backend, &mut session).await?;
    let trip = state.backend.fetch_trip(&mut session, trip_id).await?;
    Ok(with_session(&session, Json(trip)))
}

async fn create_trip(
    State(state): State<AppState>,
    mut session: Session,
    AppJson(trip): AppJson<NewTrip>,
) -> Result<Response, ApiError> {
    let trip = prepare_new_trip(trip)?;
    let manager = require_manager(&state.backend, &mut session).await?;

    let created = state.backend.create_trip(&mut session, &trip).await?;
    info!(
        "Trip {} ({} -> {}) created by {}",
        created.id, created.origin, created.destination, manager.username
    );
    Ok(with_session(&session, (StatusCode::CREATED, Json(created))))
}

async fn update_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<u64>,
    mut session: Session,
    AppJson(trip): AppJson<NewTrip>,
) -> Result<Response, ApiError> {
    validate_trip(&trip)?;
    let manager = require_manager(&state.backend, &mut session).await?;

    let updated = state.backend.update_trip(&mut session, trip_id, &trip).await?;
    info!("Trip {} updated by {}", trip_id, manager.username);
    Ok(with_session(&session, Json(updated)))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<u64>,
    mut session: Session,
    request: Option<AppJson<CancelTripRequest>>,
) -> Result<Response, ApiError> {
    let manager = require_manager(&state.backend, &mut session).await?;

    let reason = request
        .and_then(|AppJson(request)| request.reason)
        .filter(|reason| !reason.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CANCELLATION_REASON.to_string());
    state.backend.cancel_trip(&mut session, trip_id, &reason).await?;
    info!("Trip {} cancelled by {}: {}", trip_id, manager.username, reason);
    Ok(with_session(&session, StatusCode::NO_CONTENT))
}

async fn send_contact(
    State(state): State<AppState>,
    AppJson(message): AppJson<ContactMessage>,
) -> Result<StatusCode, ApiError> {
    validate_contact(&message)?;
    state.backend.send_contact_message(&message).await?;
    info!("Contact message received from {}", message.email);
    Ok(StatusCode::CREATED)
}
