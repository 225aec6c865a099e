mod common;

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use auth_core::provider::OAuthProvider;

use apiary_gateway::clients::RegistryDirectory;
use apiary_gateway::graphql;
use apiary_gateway::middleware::AuthMiddleware;
use apiary_gateway::routes;

use common::{harness, harness_with, testkeys, MockRegistry, MEMBER_TOKEN};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

macro_rules! gateway_app {
    ($harness:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($harness.state.clone()))
                .app_data(web::Data::new(graphql::build_schema($harness.state.clone())))
                .app_data(routes::json_config())
                .wrap(AuthMiddleware::new($harness.state.provider.clone()))
                .configure(routes::configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn missing_authorization_header_is_rejected() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::get().uri("/topics/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status_code"], 401);
    assert_eq!(body["message"], "missing or invalid credentials");
    assert_eq!(body["reason"], "token is empty");
}

#[actix_web::test]
async fn invalid_token_is_rejected_with_reason() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::get()
        .uri("/account/info")
        .insert_header(("Authorization", "Bearer tok-bogus"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "missing or invalid credentials");
    assert_eq!(body["reason"], "invalid signature");
}

#[actix_web::test]
async fn valid_token_reaches_the_handler() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::get()
        .uri("/account/info")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], "acc-1");
    assert_eq!(body["usernames"][0], "user@example.net");
}

#[actix_web::test]
async fn health_bypasses_auth() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn graphql_ws_upgrade_bypasses_header_auth() {
    let harness = harness();
    let app = gateway_app!(harness);

    // No Authorization header at all; auth is deferred to the
    // connection_init payload, so the middleware must not reject this.
    let req = test::TestRequest::get()
        .uri("/graphql")
        .insert_header(("Connection", "Upgrade"))
        .insert_header(("Upgrade", "websocket"))
        .insert_header(("Sec-WebSocket-Version", "13"))
        .insert_header(("Sec-WebSocket-Key", "x3JJHMbDL1EzLkh9GBhXDw=="))
        .insert_header(("Sec-WebSocket-Protocol", "graphql-ws"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_ne!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn websocket_upgrade_without_graphql_ws_still_needs_header_auth() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::get()
        .uri("/graphql")
        .insert_header(("Connection", "Upgrade"))
        .insert_header(("Upgrade", "websocket"))
        .insert_header(("Sec-WebSocket-Version", "13"))
        .insert_header(("Sec-WebSocket-Key", "x3JJHMbDL1EzLkh9GBhXDw=="))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

/// Full pipeline against a mock issuer: JWKS fetch, signature check,
/// identity resolution through the registry.
#[actix_web::test]
async fn oauth_pipeline_resolves_accounts_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(testkeys::jwks_document("gateway-test-1")),
        )
        .mount(&server)
        .await;

    let issuer = format!("{}/", server.uri());
    let audience = "https://api.apiary.dev";
    let registry = Arc::new(MockRegistry::with_member_account());
    let provider = Arc::new(OAuthProvider::new(
        &issuer,
        audience,
        Duration::from_secs(300),
        Arc::new(RegistryDirectory::new(registry.clone())),
    ));
    let harness = harness_with(provider, registry);
    let app = gateway_app!(harness);

    // Known principal: fully resolved account.
    let token = testkeys::mint("gateway-test-1", "user-42", &issuer, audience);
    let req = test::TestRequest::get()
        .uri("/account/info")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], "acc-1");

    // Unknown principal: authenticated but unprovisioned, guarded routes
    // answer 401 "account not registered".
    let token = testkeys::mint("gateway-test-1", "user-unknown", &issuer, audience);
    let req = test::TestRequest::get()
        .uri("/account/info")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "account not registered");

    // A token signed by an unpublished key never reaches the handlers.
    let req = test::TestRequest::get()
        .uri("/account/info")
        .insert_header(("Authorization", "Bearer not.a.token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
