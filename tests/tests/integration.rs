use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use coordinator_gateway::settings::GatewaySettings;
use coordinator_gateway::{AppState, build_router};
use coordinator_kernel::RoutedCandidate;
use coordinator_testing::{MockDownstream, MockReply, ScriptedDecisionEngine};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const DISPATCH: &str = "/api/fill-content-metrics/";

fn gateway_with(engine: &ScriptedDecisionEngine, settings: GatewaySettings) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::from_settings(&settings, Arc::new(engine.clone())).unwrap());
    (build_router(Arc::clone(&state)), state)
}

fn gateway(engine: &ScriptedDecisionEngine) -> (Router, Arc<AppState>) {
    gateway_with(engine, GatewaySettings::default())
}

async fn send(app: &Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn register_active(app: &Router, name: &str, url: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/register",
        json!({"name": name, "url": url, "grpc": 50051}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["serviceId"].as_str().unwrap().to_string()
}

fn payment_request(template: Value) -> Value {
    json!({
        "requester_service": "billing-ui",
        "payload": {"action": "payment", "amount": 99.99, "note": ""},
        "response": template
    })
}

#[tokio::test]
async fn test_dispatch_success_maps_case_insensitively() {
    let downstream = MockDownstream::start(MockReply::json(json!({
        "success": true,
        "data": {"Answer": "X", "transaction_id": "txn_12345"}
    })))
    .await
    .unwrap();
    let engine = ScriptedDecisionEngine::choosing("payments", 0.92);
    let (app, _) = gateway(&engine);
    register_active(&app, "payments", &downstream.url()).await;

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({"answer": ""}))).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!({"answer": "X"}));
    assert_eq!(body["metadata"]["routed_to"], "payments");
    assert_eq!(body["metadata"]["confidence"], 0.92);
    assert_eq!(body["metadata"]["requester"], "billing-ui");
    assert!(body["metadata"]["processing_time_ms"].is_u64());

    assert_eq!(engine.history().await, vec!["action: payment, amount: 99.99".to_string()]);
    coordinator_testing::assert_engine_called!(engine, 1);

    let received = downstream.requests().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].requester.as_deref(), Some("billing-ui"));
    assert_eq!(received[0].routed_by.as_deref(), Some("coordinator"));
    assert_eq!(received[0].body["requester_service"], "billing-ui");
    assert_eq!(received[0].body["response"], json!({"answer": ""}));
}

#[tokio::test]
async fn test_empty_template_returns_whole_payload() {
    let downstream = MockDownstream::start(MockReply::json(json!({"data": {"f1": "a", "f2": "b"}})))
        .await
        .unwrap();
    let engine = ScriptedDecisionEngine::choosing("svc", 0.8);
    let (app, _) = gateway(&engine);
    register_active(&app, "svc", &downstream.url()).await;

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"f1": "a", "f2": "b"}));
}

#[tokio::test]
async fn test_empty_default_takes_first_downstream_field() {
    let downstream = MockDownstream::start(MockReply::json(json!({
        "data": {"transaction_id": "txn_12345", "status": "completed"}
    })))
    .await
    .unwrap();
    let engine = ScriptedDecisionEngine::choosing("payments", 0.9);
    let (app, _) = gateway(&engine);
    register_active(&app, "payments", &downstream.url()).await;

    let (_, body) = send(
        &app,
        Method::POST,
        DISPATCH,
        payment_request(json!({"total": "", "currency": "INR", "status": ""})),
    )
    .await;
    assert_eq!(
        body["data"],
        json!({"total": "txn_12345", "currency": "INR", "status": "completed"})
    );
}

#[tokio::test]
async fn test_plain_text_downstream_is_wrapped() {
    let downstream = MockDownstream::start(MockReply::text("done")).await.unwrap();
    let engine = ScriptedDecisionEngine::choosing("svc", 0.8);
    let (app, _) = gateway(&engine);
    register_active(&app, "svc", &downstream.url()).await;

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({"raw": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"raw": "done"}));
}

#[tokio::test]
async fn test_empty_downstream_body() {
    let downstream = MockDownstream::start(MockReply::text("")).await.unwrap();
    let engine = ScriptedDecisionEngine::choosing("svc", 0.8);
    let (app, _) = gateway(&engine);
    register_active(&app, "svc", &downstream.url()).await;

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"raw": ""}));

    downstream
        .set_reply(MockReply {
            body: String::new(),
            ..MockReply::json(json!({}))
        })
        .await;
    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["routed_to"], "svc");
    assert_eq!(downstream.request_count().await, 2);
}

#[tokio::test]
async fn test_pending_service_is_never_called_until_migrated() {
    let downstream = MockDownstream::start(MockReply::json(json!({"data": {"answer": 42}})))
        .await
        .unwrap();
    let engine = ScriptedDecisionEngine::choosing("exercises-service", 0.9);
    let (app, _) = gateway(&engine);

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        json!({
            "serviceName": "exercises-service",
            "version": "1.0.0",
            "endpoint": downstream.url()
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["serviceId"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({"answer": 0}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "pending_migration");
    assert_eq!(
        body["message"],
        "Target service 'exercises-service' is not active (status: pending_migration)"
    );
    assert_eq!(downstream.request_count().await, 0);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/register/{id}/migration"),
        json!({"migrationFile": {"tables": ["exercises"]}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({"answer": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"answer": 42}));
    assert_eq!(downstream.request_count().await, 1);
}

#[tokio::test]
async fn test_deactivated_service_is_not_active() {
    let downstream = MockDownstream::start(MockReply::json(json!({}))).await.unwrap();
    let engine = ScriptedDecisionEngine::choosing("svc", 0.9);
    let (app, _) = gateway(&engine);
    let id = register_active(&app, "svc", &downstream.url()).await;

    let (status, _) = send(&app, Method::POST, &format!("/services/{id}/deactivate"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "inactive");
    assert_eq!(downstream.request_count().await, 0);
}

#[tokio::test]
async fn test_low_confidence_is_no_match() {
    let engine = ScriptedDecisionEngine::new();
    engine
        .set_ranking(vec![
            RoutedCandidate::new("payments", 0.3, "borderline"),
            RoutedCandidate::new("other", 0.05, "unlikely"),
        ])
        .await;
    let (app, _) = gateway(&engine);
    register_active(&app, "payments", "http://127.0.0.1:9").await;

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No suitable microservice found for this request");
    assert_eq!(body["requester"], "billing-ui");
    assert_eq!(body["available_services"], 1);
}

#[tokio::test]
async fn test_resolver_failure_is_502_not_404() {
    let engine = ScriptedDecisionEngine::choosing("payments", 0.9);
    engine.fail_with("model endpoint refused connection").await;
    let (app, _) = gateway(&engine);

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Failed to route request: AI routing service unavailable");
    assert!(body["error"].as_str().unwrap().contains("model endpoint refused connection"));

    engine.recover().await;
    let (status, _) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unregistered_target_is_404() {
    let engine = ScriptedDecisionEngine::choosing("ghost-service", 0.95);
    let (app, _) = gateway(&engine);

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Target service 'ghost-service' not found in registry");
}

#[tokio::test]
async fn test_slow_downstream_times_out_as_502() {
    let downstream = MockDownstream::start(
        MockReply::json(json!({"late": true})).with_delay(Duration::from_secs(3)),
    )
    .await
    .unwrap();
    let engine = ScriptedDecisionEngine::choosing("slow", 0.9);
    let mut settings = GatewaySettings::default();
    settings.dispatch.forward_timeout_ms = 200;
    let (app, state) = gateway_with(&engine, settings);
    register_active(&app, "slow", &downstream.url()).await;

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Failed to communicate with target service 'slow'");
    assert_eq!(body["routed_to"], "slow");
    assert!(body["error"].as_str().unwrap().contains("timed out"));
    assert_eq!(state.metrics.dispatch_count("forwarding_failed"), 1);
}

#[tokio::test]
async fn test_downstream_error_status_is_502_with_detail() {
    let downstream = MockDownstream::start(MockReply::status(500, "database unavailable"))
        .await
        .unwrap();
    let engine = ScriptedDecisionEngine::choosing("svc", 0.9);
    let (app, _) = gateway(&engine);
    register_active(&app, "svc", &downstream.url()).await;

    let (status, body) = send(&app, Method::POST, DISPATCH, payment_request(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Target service returned 500: database unavailable");
}

#[tokio::test]
async fn test_validation_failures_never_reach_the_engine() {
    let engine = ScriptedDecisionEngine::choosing("svc", 0.9);
    let (app, _) = gateway(&engine);

    for (body, message) in [
        (json!({"response": {}}), "Missing required field: requester_service"),
        (
            json!({"requester_service": "ui", "response": "x"}),
            "Missing or invalid required field: response (must be an object)",
        ),
    ] {
        let (status, response) = send(&app, Method::POST, DISPATCH, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], message);
    }
    coordinator_testing::assert_engine_called!(engine, 0);
}

#[tokio::test]
async fn test_missing_payload_queries_empty_request() {
    let engine = ScriptedDecisionEngine::new();
    let (app, _) = gateway(&engine);

    let (status, body) = send(
        &app,
        Method::POST,
        DISPATCH,
        json!({"requester_service": "ui", "response": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["query"], "empty request");
    assert_eq!(engine.history().await, vec!["empty request".to_string()]);
}

#[tokio::test]
async fn test_gateway_over_real_socket() {
    let downstream = MockDownstream::start(MockReply::json(json!({"data": {"Status": "ok"}})))
        .await
        .unwrap();
    let engine = ScriptedDecisionEngine::choosing("svc", 0.9);
    let (app, _) = gateway(&engine);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");
    let registered = client
        .post(format!("{base}/register"))
        .json(&json!({"name": "svc", "url": downstream.url(), "grpc": 9000}))
        .send()
        .await
        .unwrap();
    assert_eq!(registered.status().as_u16(), 201);

    let answer: Value = client
        .post(format!("{base}/api/fill-content-metrics"))
        .json(&json!({"requester_service": "ui", "payload": {"q": "status"}, "response": {"status": ""}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answer["data"], json!({"status": "ok"}));

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["registeredServices"], 1);
}
