use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::clients::PlatformEvent;
use crate::error::{AppError, AppResult};
use crate::middleware::Provisioned;
use crate::routes::parse_since;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EventView {
    pub timestamp: i64,
    pub kind: String,
    pub service: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl From<PlatformEvent> for EventView {
    fn from(event: PlatformEvent) -> Self {
        EventView {
            timestamp: event.timestamp,
            kind: event.kind,
            service: event.service,
            attributes: event.attributes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GetEventsRequest {
    #[serde(default)]
    pub since: String,
}

/// Audit events for the caller's account.
pub async fn get(
    identity: Provisioned,
    state: web::Data<AppState>,
    body: web::Json<GetEventsRequest>,
) -> AppResult<HttpResponse> {
    let from_timestamp = parse_since(&body.since)?;
    let mut stream = state
        .events
        .stream_events(&identity.account_id, from_timestamp)
        .await
        .map_err(|e| AppError::upstream("failed to fetch events", e))?;

    let mut out: Vec<EventView> = Vec::new();
    while let Some(event) = stream.next().await {
        let event = event.map_err(|e| AppError::upstream("failed to fetch events", e))?;
        out.push(event.into());
    }
    Ok(HttpResponse::Ok().json(out))
}
