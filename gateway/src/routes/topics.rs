use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::clients::{Record, TopicMetadata};
use crate::error::{AppError, AppResult};
use crate::middleware::Provisioned;
use crate::routes::parse_since;
use crate::scope::NamespaceScope;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: String,
    pub name: String,
    pub message_count: u64,
    pub size_in_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_record: Option<RecordView>,
    pub guessed_content_type: String,
}

#[derive(Debug, Serialize)]
pub struct RecordView {
    pub topic: String,
    pub payload: String,
    pub timestamp: i64,
    pub publisher: String,
}

fn record_view(scope: &NamespaceScope<'_>, record: Record) -> RecordView {
    RecordView {
        topic: scope.strip(&record.topic).to_string(),
        payload: String::from_utf8_lossy(&record.payload).into_owned(),
        timestamp: record.timestamp,
        publisher: record.sender,
    }
}

fn topic_view(scope: &NamespaceScope<'_>, topic: TopicMetadata) -> TopicView {
    let name = scope.strip(&topic.name).to_string();
    TopicView {
        id: STANDARD.encode(name.as_bytes()),
        name,
        message_count: topic.message_count,
        size_in_bytes: topic.size_in_bytes,
        last_record: topic.last_record.map(|record| record_view(scope, record)),
        guessed_content_type: topic.guessed_content_type,
    }
}

pub async fn list(identity: Provisioned, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let scope = NamespaceScope::of(&identity);
    let topics = state
        .messages
        .list_topics(&scope.all_topics())
        .await
        .map_err(|e| AppError::upstream("failed to fetch topic list", e))?;

    let out: Vec<TopicView> = topics
        .into_iter()
        .map(|topic| topic_view(&scope, topic))
        .collect();
    Ok(HttpResponse::Ok().json(out))
}

#[derive(Debug, Default, Deserialize)]
pub struct GetTopicsRequest {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub since: String,
}

/// Records matching the caller's pattern, always under the caller's own
/// namespace.
pub async fn get(
    identity: Provisioned,
    state: web::Data<AppState>,
    body: web::Json<GetTopicsRequest>,
) -> AppResult<HttpResponse> {
    let from_timestamp = parse_since(&body.since)?;
    let scope = NamespaceScope::of(&identity);
    let pattern = scope.topics(None, Some(&body.pattern));

    let mut stream = state
        .messages
        .fetch_records(&pattern, from_timestamp)
        .await
        .map_err(|e| AppError::upstream("failed to fetch topic messages", e))?;

    let mut out = Vec::new();
    while let Some(record) = stream.next().await {
        let record =
            record.map_err(|e| AppError::upstream("failed to fetch topic messages", e))?;
        out.push(record_view(&scope, record));
    }
    Ok(HttpResponse::Ok().json(out))
}
