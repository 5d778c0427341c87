// http client for the remote booking api

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{get_api_timeout_seconds, get_booking_api_url};
use crate::models::{
    AccessToken, Booking, ContactMessage, Credentials, NewBooking, NewTrip, TokenPair, Trip,
    TripCancellation, UserProfile,
};
use crate::session::Session;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Booking API configuration error: {0}")]
    Config(String),
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Booking API rejected the session")]
    Unauthorized,
    #[error("Booking API returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
    #[error("Failed to parse JSON response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self, BackendError> {
        Self::new(
            get_booking_api_url()?,
            Duration::from_secs(get_api_timeout_seconds()),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // auth

    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, BackendError> {
        let request = self
            .http
            .post(self.url("/userManagement/login/"))
            .json(credentials);
        let response = send(request).await?;
        info!("Logged in as {}", credentials.username);
        parse_response(response).await
    }

    /// Exchanges the session's refresh token for a new access token.
    pub async fn refresh(&self, session: &Session) -> Result<String, BackendError> {
        let refresh = session.refresh_token().ok_or(BackendError::Unauthorized)?;
        let request = self
            .http
            .post(self.url("/token/refresh/"))
            .json(&json!({ "refresh": refresh }));
        let token: AccessToken = parse_response(send(request).await?).await?;
        Ok(token.access)
    }

    pub async fn fetch_profile(&self, session: &mut Session) -> Result<UserProfile, BackendError> {
        let url = self.url("/userManagement/user/");
        let response = self.authorized(session, |http| http.get(&url)).await?;
        parse_response(response).await
    }

    // trips

    /// Fetches the full trip snapshot used for searching.
    pub async fn fetch_trips(&self, session: &mut Session) -> Result<Vec<Trip>, BackendError> {
        let url = self.url("/trips/create/");
        let response = self.authorized(session, |http| http.get(&url)).await?;
        let trips: Vec<Trip> = parse_response(response).await?;
        debug!("Fetched trip snapshot with {} trips", trips.len());
        Ok(trips)
    }

    pub async fn fetch_trip(&self, session: &mut Session, trip_id: u64) -> Result<Trip, BackendError> {
        let url = self.url(&format!("/trips/detail/{}/", trip_id));
        let response = self.authorized(session, |http| http.get(&url)).await?;
        parse_response(response).await
    }

    pub async fn create_trip(&self, session: &mut Session, trip: &NewTrip) -> Result<Trip, BackendError> {
        let url = self.url("/trips/create/");
        let response = self
            .authorized(session, |http| http.post(&url).json(trip))
            .await?;
        parse_response(response).await
    }

    pub async fn update_trip(
        &self,
        session: &mut Session,
        trip_id: u64,
        trip: &NewTrip,
    ) -> Result<Trip, BackendError> {
        let url = self.url(&format!("/trips/detail/{}/", trip_id));
        let response = self
            .authorized(session, |http| http.put(&url).json(trip))
            .await?;
        parse_response(response).await
    }

    pub async fn cancel_trip(
        &self,
        session: &mut Session,
        trip_id: u64,
        reason: &str,
    ) -> Result<(), BackendError> {
        let url = self.url(&format!("/trips/cancel/{}/cancel/", trip_id));
        let body = TripCancellation {
            reason: reason.to_string(),
        };
        self.authorized(session, |http| http.post(&url).json(&body)).await?;
        Ok(())
    }

    // bookings

    pub async fn create_booking(
        &self,
        session: &mut Session,
        booking: &NewBooking,
    ) -> Result<Booking, BackendError> {
        let url = self.url("/booking/book/");
        let response = self
            .authorized(session, |http| http.post(&url).json(booking))
            .await?;
        parse_response(response).await
    }

    pub async fn my_bookings(&self, session: &mut Session) -> Result<Vec<Booking>, BackendError> {
        let url = self.url("/booking/me/");
        let response = self.authorized(session, |http| http.get(&url)).await?;
        parse_response(response).await
    }

    pub async fn cancel_booking(
        &self,
        session: &mut Session,
        booking_id: u64,
    ) -> Result<Booking, BackendError> {
        let url = self.url(&format!("/booking/book/{}/", booking_id));
        let body = json!({ "is_cancelled": true });
        let response = self
            .authorized(session, |http| http.patch(&url).json(&body))
            .await?;
        parse_response(response).await
    }

    pub async fn delete_booking(&self, session: &mut Session, booking_id: u64) -> Result<(), BackendError> {
        let url = self.url(&format!("/booking/book/{}/", booking_id));
        self.authorized(session, |http| http.delete(&url)).await?;
        Ok(())
    }

    // contact

    pub async fn send_contact_message(&self, message: &ContactMessage) -> Result<(), BackendError> {
        let request = self.http.post(self.url("/contact/contact/")).json(message);
        send(request).await?;
        Ok(())
    }

    // Sends with the session's bearer token. A 401 is retried once after an
    // explicit refresh when the session carries a refresh token.
    async fn authorized<F>(&self, session: &mut Session, build: F) -> Result<Response, BackendError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let first = send(build(&self.http).bearer_auth(session.access_token())).await;

        match first {
            Err(BackendError::Unauthorized) if session.can_refresh() => {
                warn!("Access token rejected, refreshing session");
                let access = self.refresh(session).await?;
                session.replace_access(access);
                send(build(&self.http).bearer_auth(session.access_token())).await
            }
            other => other,
        }
    }
}

// helper functions
async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(BackendError::Unauthorized);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Status {
            status,
            detail: describe_error_body(&body),
        });
    }

    Ok(response)
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    response
        .json()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

// turn a django rest framework error body into one line
fn describe_error_body(body: &str) -> String {
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => return body.trim().to_string(),
    };

    match value {
        Value::Object(fields) => {
            if let Some(detail) = fields.get("detail") {
                return plain_text(detail);
            }
            fields
                .iter()
                .map(|(key, value)| format!("{}: {}", key, plain_text(value)))
                .collect::<Vec<_>>()
                .join("; ")
        }
        other => plain_text(&other),
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(plain_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
