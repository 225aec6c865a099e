pub mod accounts;
pub mod devices;
pub mod events;
pub mod topics;

use actix_web::web;

use crate::error::AppError;

async fn health() -> &'static str {
    "ok"
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/account/info", web::get().to(accounts::info))
        .route("/account/", web::post().to(accounts::create))
        .route("/devices/", web::get().to(devices::list))
        .route("/devices/", web::post().to(devices::create))
        .route("/devices/{device_id}", web::get().to(devices::get))
        .route("/devices/{device_id}", web::patch().to(devices::update))
        .route("/devices/{device_id}", web::delete().to(devices::delete))
        .route("/topics/", web::get().to(topics::list))
        .route("/topics/", web::post().to(topics::get))
        .route("/events/", web::post().to(events::get))
        .route("/graphql", web::post().to(crate::graphql::graphql_handler))
        .route("/graphql", web::get().to(crate::graphql::graphql_ws_handler));
}

/// Body deserialization failures render the platform error shape instead of
/// actix's default text body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "rejecting malformed request body");
        AppError::BadRequest("malformed JSON".into()).into()
    })
}

/// `since` filters are durations looking back from now ("15m", "2h");
/// empty means unbounded. Returns a unix-nanosecond lower bound.
pub(crate) fn parse_since(since: &str) -> Result<i64, AppError> {
    if since.is_empty() {
        return Ok(0);
    }
    let duration = humantime::parse_duration(since)
        .map_err(|_| AppError::BadRequest("malformed since request parameter".into()))?;
    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let lookback = duration.as_nanos().min(i64::MAX as u128) as i64;
    Ok(now.saturating_sub(lookback))
}
