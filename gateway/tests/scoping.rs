//! The tenant-isolation invariant, observed from the outside: whatever a
//! caller sends, every collaborator call carries a filter rooted in the
//! caller's own account id.

mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};

use apiary_gateway::graphql;
use apiary_gateway::middleware::AuthMiddleware;
use apiary_gateway::routes;

use common::{harness, MEMBER_TOKEN};

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
async fn topic_list_is_tenant_scoped() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::get()
        .uri("/topics/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let patterns = harness.messages.patterns.lock().unwrap();
    assert_eq!(patterns.as_slice(), ["acc-1/#"]);
}

#[actix_web::test]
async fn caller_pattern_cannot_reach_another_tenant() {
    let harness = harness();
    let app = gateway_app!(harness);

    // A caller claiming another tenant's id in the pattern only narrows
    // their own namespace.
    let req = test::TestRequest::post()
        .uri("/topics/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .set_json(serde_json::json!({"pattern": "acc-2/#"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let patterns = harness.messages.patterns.lock().unwrap();
    assert_eq!(patterns.as_slice(), ["acc-1/+/acc-2/#"]);
    assert!(patterns[0].starts_with("acc-1/"));
}

#[actix_web::test]
async fn device_calls_carry_the_verified_owner() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::get()
        .uri("/devices/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/devices/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .set_json(serde_json::json!({"name": "sensor", "password": "pw", "active": true}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let owners = harness.registry.owners_queried.lock().unwrap();
    assert!(!owners.is_empty());
    assert!(owners.iter().all(|owner| owner == "acc-1"));
}

#[actix_web::test]
async fn device_validation_rejects_bad_manifests() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::post()
        .uri("/devices/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .set_json(serde_json::json!({"name": "", "password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/devices/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .set_json(serde_json::json!({"name": "sensor", "active": true}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "device password must be provided if active is set"
    );
}

#[actix_web::test]
async fn events_are_tenant_scoped() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::post()
        .uri("/events/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .set_json(serde_json::json!({"since": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let tenants = harness.events.tenants.lock().unwrap();
    assert_eq!(tenants.as_slice(), ["acc-1"]);
}

#[actix_web::test]
async fn graphql_topic_query_is_tenant_scoped() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::post()
        .uri("/graphql")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .set_json(serde_json::json!({"query": "{ topics { name } }"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let patterns = harness.messages.patterns.lock().unwrap();
    assert_eq!(patterns.as_slice(), ["acc-1/+/#"]);
}

#[actix_web::test]
async fn malformed_json_body_renders_the_platform_error_shape() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::post()
        .uri("/topics/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not-json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status_code"], 400);
    assert_eq!(body["message"], "malformed JSON");
}

#[actix_web::test]
async fn malformed_since_parameter_is_a_bad_request() {
    let harness = harness();
    let app = gateway_app!(harness);

    let req = test::TestRequest::post()
        .uri("/topics/")
        .insert_header(("Authorization", format!("Bearer {MEMBER_TOKEN}")))
        .set_json(serde_json::json!({"since": "not-a-duration"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "malformed since request parameter");
}
