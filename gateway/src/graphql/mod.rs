//! GraphQL surface and the `graphql-ws` subscription transport.

pub mod schema;

use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use async_graphql::{Data, EmptyMutation, Schema};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use auth_core::AuthProvider;

use crate::error::AppError;
use crate::middleware::auth::identity_of;
use crate::state::AppState;

pub type AppSchema = Schema<schema::QueryRoot, EmptyMutation, schema::SubscriptionRoot>;

pub fn build_schema(state: AppState) -> AppSchema {
    Schema::build(schema::QueryRoot, EmptyMutation, schema::SubscriptionRoot)
        .data(state)
        .finish()
}

/// HTTP POST endpoint. The request was authenticated by the middleware; the
/// resolved identity is handed to the resolvers through the request data.
pub async fn graphql_handler(
    schema: web::Data<AppSchema>,
    http_req: HttpRequest,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();
    if let Some(identity) = identity_of(&http_req) {
        request = request.data(identity);
    }
    schema.execute(request).await.into()
}

/// WebSocket endpoint (`graphql-ws`). Header auth was bypassed for this
/// upgrade; the connection authenticates through its init payload instead,
/// and the resulting identity is bound to the connection for its lifetime.
pub async fn graphql_ws_handler(
    schema: web::Data<AppSchema>,
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Payload,
) -> actix_web::Result<HttpResponse> {
    let provider = state.provider.clone();
    GraphQLSubscription::new(schema.as_ref().clone())
        .on_connection_init(move |payload| connection_init(provider, payload))
        .start(&req, payload)
}

/// Authenticate a `graphql-ws` connection from its init payload.
///
/// Validation happens exactly once, at connection open; messages on the
/// connection are not re-validated. A failed payload rejects the connection
/// before any subscription is established.
pub async fn connection_init(
    provider: Arc<dyn AuthProvider>,
    payload: serde_json::Value,
) -> async_graphql::Result<Data> {
    let token = payload
        .get("authorization")
        .or_else(|| payload.get("Authorization"))
        .and_then(|value| value.as_str())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| async_graphql::Error::new("missing or invalid credentials"))?;

    let identity = provider
        .validate(token)
        .await
        .map_err(|e| async_graphql::Error::new(AppError::from(e).to_string()))?;
    tracing::info!(account_id = %identity.account_id, "websocket authentication done");

    let mut data = Data::default();
    data.insert(identity);
    Ok(data)
}
