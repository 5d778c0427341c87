// bus trip search and booking api

use anyhow::{bail, Result};
use shuttle_axum::ShuttleAxum;
use shuttle_runtime::SecretStore;
use tracing::info;

mod backend;
mod booking;
mod config;
mod error;
mod forms;
mod matcher;
mod models;
mod routes;
mod session;

use backend::BackendClient;
use config::{get_service_offset, API_TIMEOUT_SECONDS, BOOKING_API_URL, SERVICE_UTC_OFFSET_HOURS};
use matcher::TripMatcher;
use routes::{build_router, AppState};

// shuttle entry point
#[shuttle_runtime::main]
async fn axum(#[shuttle_runtime::Secrets] secret_store: SecretStore) -> ShuttleAxum {
    info!("Starting busfinder API v{}", env!("CARGO_PKG_VERSION"));

    configure_from_secrets(&secret_store);

    if let Err(e) = validate_required_configuration() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }
    info!("All required configuration validated");

    let backend = BackendClient::from_env().map_err(anyhow::Error::from)?;
    let matcher = TripMatcher::new(get_service_offset());
    info!("Matching departure dates in UTC{}", matcher.offset());

    let router = build_router(AppState { backend, matcher });
    Ok(router.into())
}

// load secrets into env vars
fn configure_from_secrets(secret_store: &SecretStore) {
    if let Some(api_url) = secret_store.get(BOOKING_API_URL) {
        std::env::set_var(BOOKING_API_URL, api_url);
        info!("Booking API URL configured from secrets");
    } else {
        tracing::warn!("{} not found in secrets - API calls will fail", BOOKING_API_URL);
    }

    if let Some(timeout) = secret_store.get(API_TIMEOUT_SECONDS) {
        std::env::set_var(API_TIMEOUT_SECONDS, timeout);
        info!("API timeout configured from secrets");
    }

    if let Some(offset) = secret_store.get(SERVICE_UTC_OFFSET_HOURS) {
        std::env::set_var(SERVICE_UTC_OFFSET_HOURS, offset);
        info!("Service UTC offset configured from secrets");
    }
}

// check required env vars at startup
fn validate_required_configuration() -> Result<()> {
    match std::env::var(BOOKING_API_URL) {
        Ok(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
        Ok(url) => bail!("{} must be an http(s) URL, got {:?}", BOOKING_API_URL, url),
        Err(_) => bail!(
            "Missing required configuration: {}. Please set it in Secrets.toml",
            BOOKING_API_URL
        ),
    }
}
