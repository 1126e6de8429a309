//! Integration tests for the HTTP API
//!
//! Drives the router with in-process stub classifiers, covering request
//! validation, the response document and partial/total model failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use consensus::{AdapterError, ModelId, ScoreFormat};
use sentiment_gateway::{router, Analyzer, Classifier, ClassifierSet};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Classifier returning a fixed outcome.
struct Fixed {
    model: ModelId,
    outcome: Result<Value, AdapterError>,
}

#[async_trait]
impl Classifier for Fixed {
    fn model(&self) -> ModelId {
        self.model
    }

    async fn classify(&self, _text: &str) -> Result<Value, AdapterError> {
        self.outcome.clone()
    }
}

fn label(model: ModelId, sentiment: &str, confidence: f64) -> (Arc<dyn Classifier>, ScoreFormat) {
    let rest = (1.0 - confidence) / 2.0;
    let mut payload = json!({ "positive": rest, "neutral": rest, "negative": rest, "sentiment": sentiment });
    payload[sentiment] = json!(confidence);
    (
        Arc::new(Fixed {
            model,
            outcome: Ok(payload),
        }),
        ScoreFormat::Canonical,
    )
}

fn broken(model: ModelId, err: AdapterError) -> (Arc<dyn Classifier>, ScoreFormat) {
    (
        Arc::new(Fixed {
            model,
            outcome: Err(err),
        }),
        ScoreFormat::Canonical,
    )
}

fn app(set: ClassifierSet) -> axum::Router {
    router(Analyzer::new(set, Duration::from_secs(5), 2048), 64 * 1024)
}

/// Helper to make a request and get status plus JSON body.
async fn request_json(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn all_positive() -> ClassifierSet {
    ClassifierSet::new(
        label(ModelId::Vader, "positive", 0.8),
        label(ModelId::NaiveBayes, "positive", 0.6),
        label(ModelId::Roberta, "positive", 0.9),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Request validation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_check() {
    let (status, body) = request_json(&app(all_positive()), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_invalid_json_is_rejected() {
    let (status, body) =
        request_json(&app(all_positive()), Method::POST, "/api/analyze", Some("{text:")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid JSON" }));
}

#[tokio::test]
async fn test_missing_text_is_rejected() {
    let app = app(all_positive());
    for body in [None, Some("{}"), Some(r#"{"text": "   "}"#), Some(r#"{"text": null}"#)] {
        let (status, json) = request_json(&app, Method::POST, "/api/analyze", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body:?}");
        assert_eq!(json, json!({ "error": "Missing 'text'" }));
    }
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let (status, body) =
        request_json(&app(all_positive()), Method::GET, "/api/analyze", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "GET not allowed" }));
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/analyze")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app(all_positive()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_other_methods_get_error_document() {
    let app = app(all_positive());
    for method in [Method::PUT, Method::DELETE, Method::PATCH] {
        let (status, body) = request_json(&app, method.clone(), "/api/analyze", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(body, json!({ "error": format!("{method} not allowed") }));
    }
}

#[tokio::test]
async fn test_oversized_body_is_rejected_with_error_document() {
    let app = router(Analyzer::new(all_positive(), Duration::from_secs(5), 2048), 32);
    let body = json!({ "text": "x".repeat(100) }).to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].is_string(), "{json}");

    // Streamed bodies without a declared length hit the same limit.
    let body = json!({ "text": "x".repeat(100) }).to_string();
    let (status, json) = request_json(&app, Method::POST, "/api/analyze", Some(&body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json["error"].is_string(), "{json}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis document
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unanimous_positive_document() {
    let (status, body) = request_json(
        &app(all_positive()),
        Method::POST,
        "/api/analyze",
        Some(r#"{"text": "Loved every minute of it"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vader"]["sentiment"], "positive");
    assert_eq!(body["roberta"]["positive"], json!(0.9));
    assert_eq!(
        body["conclusion"],
        json!({
            "positive": ["vader", "naive_bayes", "roberta"],
            "neutral": [],
            "negative": [],
            "final_sentiment": "positive",
            "agreement": 1.0
        })
    );
    assert_eq!(body["input_chars"], json!(24));
    assert_eq!(body["used_chars"], json!(24));
}

#[tokio::test]
async fn test_timeout_on_one_model_still_reaches_consensus() {
    let set = ClassifierSet::new(
        label(ModelId::Vader, "positive", 0.7),
        broken(ModelId::NaiveBayes, AdapterError::Timeout { after_ms: 5000 }),
        label(ModelId::Roberta, "positive", 0.95),
    );
    let (status, body) = request_json(
        &app(set),
        Method::POST,
        "/api/analyze",
        Some(r#"{"text": "Pretty good overall"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["naive_bayes"], json!({ "error": "timed out after 5000 ms" }));
    assert_eq!(body["conclusion"]["positive"], json!(["vader", "roberta"]));
    assert_eq!(body["conclusion"]["neutral"], json!([]));
    assert_eq!(body["conclusion"]["negative"], json!([]));
    assert_eq!(body["conclusion"]["final_sentiment"], "positive");
}

#[tokio::test]
async fn test_split_vote_resolves_to_negative() {
    let set = ClassifierSet::new(
        label(ModelId::Vader, "positive", 0.7),
        broken(
            ModelId::NaiveBayes,
            AdapterError::Transport("connection reset".into()),
        ),
        label(ModelId::Roberta, "negative", 0.55),
    );
    let (_, body) = request_json(
        &app(set),
        Method::POST,
        "/api/analyze",
        Some(r#"{"text": "Fast shipping, broken on arrival"}"#),
    )
    .await;

    assert_eq!(body["conclusion"]["final_sentiment"], "negative");
    assert_eq!(body["conclusion"]["agreement"], json!(0.5));
}

#[tokio::test]
async fn test_total_failure_is_still_a_valid_document() {
    let down = || AdapterError::Status {
        status: 503,
        body: "Service Unavailable".into(),
    };
    let set = ClassifierSet::new(
        broken(ModelId::Vader, down()),
        broken(ModelId::NaiveBayes, down()),
        broken(ModelId::Roberta, down()),
    );
    let (status, body) = request_json(
        &app(set),
        Method::POST,
        "/api/analyze",
        Some(r#"{"text": "Is anybody there?"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["roberta"],
        json!({ "error": "upstream returned HTTP 503: Service Unavailable" })
    );
    assert_eq!(
        body["conclusion"],
        json!({
            "positive": [],
            "neutral": [],
            "negative": [],
            "final_sentiment": "undetermined",
            "agreement": 0.0
        })
    );
}

#[tokio::test]
async fn test_malformed_payload_is_excluded_not_guessed() {
    let unlabelled = (
        Arc::new(Fixed {
            model: ModelId::NaiveBayes,
            outcome: Ok(json!({ "positive": 0.1, "neutral": 0.1, "negative": 0.8 })),
        }) as Arc<dyn Classifier>,
        ScoreFormat::Canonical,
    );
    let set = ClassifierSet::new(
        label(ModelId::Vader, "neutral", 0.6),
        unlabelled,
        label(ModelId::Roberta, "neutral", 0.5),
    );
    let (_, body) = request_json(
        &app(set),
        Method::POST,
        "/api/analyze",
        Some(r#"{"text": "The package arrived."}"#),
    )
    .await;

    assert_eq!(
        body["naive_bayes"],
        json!({ "error": "payload has no usable sentiment label" })
    );
    assert_eq!(body["conclusion"]["negative"], json!([]));
    assert_eq!(body["conclusion"]["neutral"], json!(["vader", "roberta"]));
    assert_eq!(body["conclusion"]["final_sentiment"], "neutral");
}
