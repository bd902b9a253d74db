use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::handler::{RETRY_NUM_HEADER, verify_request};
use super::*;
use crate::bot::{Bot, Dispatcher, MockTransport, Transport, responses};
use crate::cache::{Answer, AnswerError, CacheStatus, QuestionAnswerer};
use crate::embedding::MockEmbeddingStore;
use crate::generation::MockGenerator;
use crate::slack::{SIGNATURE_HEADER, SignatureError, TIMESTAMP_HEADER, sign};
use crate::vectordb::MockVectorTier;

const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

struct EchoAnswerer;

#[async_trait]
impl QuestionAnswerer for EchoAnswerer {
    async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        Ok(Answer {
            text: format!("answer to {}", question),
            source: CacheStatus::Miss,
        })
    }
}

fn bot(transport: Arc<MockTransport>) -> Bot {
    Bot::new(
        transport,
        Dispatcher::standard(Arc::new(EchoAnswerer), Arc::new(MockGenerator::new())),
    )
}

fn app(secret: Option<&str>) -> (Router, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let state = AppState::new(bot(transport.clone()), secret.map(str::to_string), Vec::new());
    (create_router_with_state(state), transport)
}

fn message_event() -> serde_json::Value {
    serde_json::json!({
        "type": "event_callback",
        "event_id": "Ev01",
        "event": {
            "type": "message",
            "channel": "C1",
            "user": "U1",
            "text": "What is Redis?",
            "ts": "1700000000.000100"
        }
    })
}

fn post_events(body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn signed_post(body: &serde_json::Value, secret: &str, timestamp: i64) -> Request<Body> {
    let raw = body.to_string();
    let ts = timestamp.to_string();
    Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header("content-type", "application/json")
        .header(TIMESTAMP_HEADER, &ts)
        .header(SIGNATURE_HEADER, sign(secret, &ts, raw.as_bytes()))
        .body(Body::from(raw))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn test_up_endpoint() {
    let (app, _) = app(None);

    let response = app
        .oneshot(Request::get("/api/up").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "status": "server is up" })
    );
}

#[tokio::test]
async fn test_url_verification_echoes_challenge() {
    let (app, _) = app(None);

    let response = app
        .oneshot(post_events(&serde_json::json!({
            "type": "url_verification",
            "token": "t",
            "challenge": "abc123"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["challenge"], "abc123");
}

#[tokio::test]
async fn test_message_event_is_acknowledged_and_handled() {
    let (app, transport) = app(None);

    let response = app.oneshot(post_events(&message_event())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(eventually(|| transport.sent().len() == 2).await);
    let texts = transport.texts();
    assert_eq!(texts[0], responses::WORKING);
    assert_eq!(texts[1], "answer to What is Redis?");
}

#[tokio::test]
async fn test_mention_event() {
    let (app, transport) = app(None);

    let response = app
        .oneshot(post_events(&serde_json::json!({
            "type": "event_callback",
            "event": {
                "type": "app_mention",
                "channel": "C1",
                "user": "U1",
                "text": "<@U0> hey",
                "ts": "1.0"
            }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(eventually(|| transport.texts() == vec![responses::MENTION.to_string()]).await);
}

#[tokio::test]
async fn test_retries_are_acknowledged_without_handling() {
    let (app, transport) = app(None);
    let mut request = post_events(&message_event());
    request
        .headers_mut()
        .insert(RETRY_NUM_HEADER, "1".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    let (app, _) = app(None);

    let response = app
        .oneshot(
            Request::post("/slack/events")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], 400);
}

#[tokio::test]
async fn test_signed_request_is_accepted() {
    let (app, transport) = app(Some(SECRET));
    let now = chrono::Utc::now().timestamp();

    let response = app
        .oneshot(signed_post(&message_event(), SECRET, now))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(eventually(|| transport.sent().len() == 2).await);
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let (app, transport) = app(Some(SECRET));
    let now = chrono::Utc::now().timestamp();

    let response = app
        .clone()
        .oneshot(signed_post(&message_event(), "other-secret", now))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(post_events(&message_event())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.sent().is_empty());
}

#[test]
fn test_verify_request_headers() {
    let body = b"payload";
    let mut headers = axum::http::HeaderMap::new();

    assert_eq!(
        verify_request(SECRET, &headers, body, 1_700_000_000),
        Err(SignatureError::MissingHeader(TIMESTAMP_HEADER))
    );

    headers.insert(TIMESTAMP_HEADER, "1700000000".parse().unwrap());
    assert_eq!(
        verify_request(SECRET, &headers, body, 1_700_000_000),
        Err(SignatureError::MissingHeader(SIGNATURE_HEADER))
    );

    headers.insert(
        SIGNATURE_HEADER,
        sign(SECRET, "1700000000", body).parse().unwrap(),
    );
    assert_eq!(verify_request(SECRET, &headers, body, 1_700_000_000), Ok(()));
    assert!(matches!(
        verify_request(SECRET, &headers, body, 1_700_000_000 + 301),
        Err(SignatureError::Stale { .. })
    ));
}

fn health_app(
    transport: Arc<MockTransport>,
    fast: Arc<MockVectorTier>,
    durable: Arc<MockVectorTier>,
    store: Arc<MockEmbeddingStore>,
) -> Router {
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(TransportProbe::new(
            "slack",
            transport.clone() as Arc<dyn Transport>,
        )),
        Arc::new(TierProbe::new("redis", fast)),
        Arc::new(TierProbe::new("qdrant", durable)),
        Arc::new(StoreProbe::optional("mongo", store)),
    ];
    let state = AppState::new(bot(transport), None, probes)
        .with_probe_timeout(Duration::from_millis(200));
    create_router_with_state(state)
}

#[tokio::test]
async fn test_health_all_connected() {
    let app = health_app(
        Arc::new(MockTransport::new()),
        Arc::new(MockVectorTier::fast(4)),
        Arc::new(MockVectorTier::durable(4)),
        Arc::new(MockEmbeddingStore::new()),
    );

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["server"], "up");
    assert_eq!(body["services"]["slack"], "connected");
    assert_eq!(body["services"]["redis"], "connected");
    assert_eq!(body["services"]["qdrant"], "connected");
    assert_eq!(body["services"]["mongo"], "connected");
    assert!(body["timestamp"].is_string());
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_health_required_service_down_is_503() {
    let durable = Arc::new(MockVectorTier::durable(4));
    durable.set_fail_knn(true);
    let app = health_app(
        Arc::new(MockTransport::new()),
        Arc::new(MockVectorTier::fast(4)),
        durable,
        Arc::new(MockEmbeddingStore::new()),
    );

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["services"]["qdrant"], "disconnected");
    assert_eq!(body["services"]["redis"], "connected");
}

#[tokio::test]
async fn test_health_optional_service_down_is_still_ok() {
    let store = Arc::new(MockEmbeddingStore::new());
    store.set_fail_get(true);
    let transport = Arc::new(MockTransport::new());
    let app = health_app(
        transport,
        Arc::new(MockVectorTier::fast(4)),
        Arc::new(MockVectorTier::durable(4)),
        store,
    );

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"]["mongo"], "disconnected");
}

#[tokio::test]
async fn test_health_slack_down() {
    let transport = Arc::new(MockTransport::new());
    transport.set_healthy(false);
    let app = health_app(
        transport,
        Arc::new(MockVectorTier::fast(4)),
        Arc::new(MockVectorTier::durable(4)),
        Arc::new(MockEmbeddingStore::new()),
    );

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["services"]["slack"], "disconnected");
}
