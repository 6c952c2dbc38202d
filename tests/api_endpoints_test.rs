mod common;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use common::MockBackend;
use futures::future::join_all;
use grounded_search::llm::Role;
use grounded_search::server::{self, AppState};
use grounded_search::{MemorySessionStore, SessionStore};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;

macro_rules! test_app {
    ($state:expr) => {
        actix_test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(server::json_config(1024 * 1024))
                .app_data(server::query_config())
                .configure(server::routes)
                .default_service(web::route().to(server::not_found)),
        )
        .await
    };
}

fn state_with(backend: Arc<MockBackend>) -> (AppState, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    (AppState::with_backend(backend, store.clone()), store)
}

#[actix_web::test]
async fn test_health() {
    let (state, _) = state_with(Arc::new(MockBackend::grounded()));
    let app = test_app!(state);

    let req = actix_test::TestRequest::get().uri("/health").to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_search_requires_query() {
    let backend = Arc::new(MockBackend::grounded());
    let (state, store) = state_with(backend.clone());
    let app = test_app!(state);

    for uri in ["/api/search", "/api/search?q=", "/api/search?other=1"] {
        let req = actix_test::TestRequest::get().uri(uri).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {uri}");

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["message"], "Query parameter 'q' is required");
    }

    assert!(backend.calls().is_empty());
    assert!(store.is_empty());
}

#[actix_web::test]
async fn test_search_returns_summary_and_deduplicated_sources() {
    let backend = Arc::new(MockBackend::grounded());
    let (state, store) = state_with(backend.clone());
    let app = test_app!(state);

    let req = actix_test::TestRequest::get()
        .uri("/api/search?q=what%20is%20rust%3F")
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = actix_test::read_body_json(resp).await;
    let session_id = body["sessionId"].as_str().unwrap();
    assert!(!session_id.is_empty());

    let summary = body["summary"].as_str().unwrap();
    assert!(summary.contains("<h2>Summary answer to what is rust?</h2>"));
    assert!(summary.contains("<li>first point</li>"));
    assert!(summary.contains("<li>second point</li>"));

    assert_eq!(
        body["sources"],
        json!([
            {"title": "A", "url": "https://a.example", "snippet": "cited by a"},
            {"title": "B", "url": "https://b.example", "snippet": ""}
        ])
    );

    assert_eq!(store.len(), 1);
    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0].text, "what is rust?");
}

#[actix_web::test]
async fn test_follow_up_continues_conversation() {
    let backend = Arc::new(MockBackend::grounded());
    let (state, store) = state_with(backend.clone());
    let app = test_app!(state);

    let req = actix_test::TestRequest::get()
        .uri("/api/search?q=what%20is%20rust%3F")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, req).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let req = actix_test::TestRequest::post()
        .uri("/api/follow-up")
        .set_json(json!({"sessionId": session_id, "query": "and go?"}))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = actix_test::read_body_json(resp).await;
    assert!(body.get("sessionId").is_none());
    assert!(
        body["summary"]
            .as_str()
            .unwrap()
            .contains("<h2>Summary answer to and go?</h2>")
    );
    assert_eq!(body["sources"].as_array().unwrap().len(), 2);

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    let roles: Vec<Role> = calls[1].iter().map(|turn| turn.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Model, Role::User]);
    assert_eq!(calls[1][2].text, "and go?");
    assert_eq!(store.len(), 1);
}

#[actix_web::test]
async fn test_follow_up_unknown_session() {
    let (state, _) = state_with(Arc::new(MockBackend::grounded()));
    let app = test_app!(state);

    let req = actix_test::TestRequest::get()
        .uri("/api/search?q=what%20is%20rust%3F")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, req).await;
    let wrong_id = format!("{}x", body["sessionId"].as_str().unwrap());

    let req = actix_test::TestRequest::post()
        .uri("/api/follow-up")
        .set_json(json!({"sessionId": wrong_id, "query": "and go?"}))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = actix_test::read_body_json(resp).await;
    assert_eq!(body["message"], "Chat session not found");
}

#[actix_web::test]
async fn test_follow_up_requires_both_fields() {
    let (state, _) = state_with(Arc::new(MockBackend::grounded()));
    let app = test_app!(state);

    for payload in [
        json!({"query": "and go?"}),
        json!({"sessionId": "abc"}),
        json!({"sessionId": "", "query": "and go?"}),
        json!({}),
    ] {
        let req = actix_test::TestRequest::post()
            .uri("/api/follow-up")
            .set_json(&payload)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload: {payload}");

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["message"], "Both sessionId and query are required");
    }
}

#[actix_web::test]
async fn test_follow_up_rejects_malformed_json() {
    let (state, _) = state_with(Arc::new(MockBackend::grounded()));
    let app = test_app!(state);

    let req = actix_test::TestRequest::post()
        .uri("/api/follow-up")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = actix_test::read_body_json(resp).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON payload")
    );
}

#[actix_web::test]
async fn test_upstream_failure_surfaces_message() {
    let (state, store) = state_with(Arc::new(MockBackend::failing("quota exceeded")));
    let app = test_app!(state);

    let req = actix_test::TestRequest::get()
        .uri("/api/search?q=rust")
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = actix_test::read_body_json(resp).await;
    assert_eq!(body["message"], "quota exceeded");
    assert!(store.is_empty());
}

#[actix_web::test]
async fn test_upstream_failure_without_message_uses_fallback() {
    let (state, _) = state_with(Arc::new(MockBackend::failing("")));
    let app = test_app!(state);

    let req = actix_test::TestRequest::get()
        .uri("/api/search?q=rust")
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = actix_test::read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "An error occurred while processing your search"
    );
}

#[actix_web::test]
async fn test_follow_up_upstream_failure_keeps_session() {
    let backend = Arc::new(MockBackend::new(|history| {
        if history.len() > 1 {
            Err(grounded_search::UpstreamError::Request {
                message: String::new(),
            })
        } else {
            Ok(grounded_search::llm::ModelReply {
                text: "first answer".to_string(),
                grounding: None,
            })
        }
    }));
    let (state, store) = state_with(backend.clone());
    let app = test_app!(state);

    let req = actix_test::TestRequest::get()
        .uri("/api/search?q=rust")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["summary"], "<p>first answer</p>\n");
    assert_eq!(body["sources"], json!([]));
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let req = actix_test::TestRequest::post()
        .uri("/api/follow-up")
        .set_json(json!({"sessionId": session_id, "query": "more"}))
        .to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = actix_test::read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "An error occurred while processing your follow-up question"
    );
    assert_eq!(store.len(), 1);
}

#[actix_web::test]
async fn test_concurrent_searches_get_distinct_sessions() {
    let (state, store) = state_with(Arc::new(MockBackend::grounded()));
    let app = test_app!(state);

    let requests = (0..8).map(|i| {
        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/search?q=query{i}"))
            .to_request();
        actix_test::call_and_read_body_json::<_, _, Value>(&app, req)
    });
    let bodies = join_all(requests).await;

    let ids: HashSet<String> = bodies
        .iter()
        .map(|body| body["sessionId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 8);
    assert_eq!(store.len(), 8);
}

#[actix_web::test]
async fn test_unknown_route_returns_json_404() {
    let (state, _) = state_with(Arc::new(MockBackend::grounded()));
    let app = test_app!(state);

    let req = actix_test::TestRequest::get().uri("/api/nope").to_request();
    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = actix_test::read_body_json(resp).await;
    assert_eq!(body["message"], "Not found");
}
