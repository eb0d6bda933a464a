//! HTTP-level tests of the Ollama generator against an in-process mock.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use paperlift::config::GenerationConfig;
use paperlift::error::GenerationError;
use paperlift::generate::{call_with_retry, CallOutcome, Generator, OllamaGenerator, RetryPolicy};
use paperlift::parse::StrictThenBraces;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
}

/// Start a mock server whose `/api/generate` replies with `status` and `reply`.
async fn mock_ollama(status: StatusCode, reply: Value) -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route(
            "/api/generate",
            post(
                move |State(rec): State<Recorded>, Json(body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        rec.bodies.lock().unwrap().push(body);
                        (status, Json(reply))
                    }
                },
            ),
        )
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorded)
}

fn config(url: &str) -> GenerationConfig {
    GenerationConfig {
        url: url.to_string(),
        model: "llama3.2:3b".to_string(),
        timeout_secs: 5,
        max_retries: 1,
        retry_delay_ms: 0,
    }
}

#[tokio::test]
async fn sends_model_prompt_and_zero_temperature() {
    let (url, recorded) = mock_ollama(
        StatusCode::OK,
        json!({"model": "llama3.2:3b", "response": "  {\"title\": \"T\"}\n", "done": true}),
    )
    .await;
    let gen = OllamaGenerator::new(&config(&url)).unwrap();

    let text = gen.generate("describe this").await.unwrap();
    assert_eq!(text, "{\"title\": \"T\"}");

    let bodies = recorded.bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "model": "llama3.2:3b",
            "prompt": "describe this",
            "stream": false,
            "options": {"temperature": 0.0}
        })
    );
}

#[tokio::test]
async fn missing_response_field_is_empty_text() {
    let (url, _) = mock_ollama(StatusCode::OK, json!({"done": true})).await;
    let gen = OllamaGenerator::new(&config(&url)).unwrap();
    assert_eq!(gen.generate("p").await.unwrap(), "");
}

#[tokio::test]
async fn non_success_status_is_a_generation_error() {
    let (url, _) = mock_ollama(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "model not loaded"}),
    )
    .await;
    let gen = OllamaGenerator::new(&config(&url)).unwrap();

    match gen.generate("p").await.unwrap_err() {
        GenerationError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("model not loaded"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gen = OllamaGenerator::new(&config(&format!("http://{}", addr))).unwrap();
    let err = gen.generate("p").await.unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)));
}

#[tokio::test]
async fn retrying_unit_reports_status_after_ceiling() {
    let (url, recorded) =
        mock_ollama(StatusCode::SERVICE_UNAVAILABLE, json!({"error": "busy"})).await;
    let gen = OllamaGenerator::new(&config(&url)).unwrap();
    let policy = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
    };

    let outcome = call_with_retry(&gen, &StrictThenBraces, &policy, "p").await;
    assert_eq!(recorded.bodies.lock().unwrap().len(), 3);
    match outcome {
        CallOutcome::Failed { error, trace } => {
            assert!(error.contains("503"));
            assert_eq!(trace.attempt, 2);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn prose_wrapped_response_parses_end_to_end() {
    let (url, _) = mock_ollama(
        StatusCode::OK,
        json!({"response": "Here you go:\n```json\n{\"title\": \"Deep Nets\", \"year\": 2020}\n```"}),
    )
    .await;
    let gen = OllamaGenerator::new(&config(&url)).unwrap();
    let policy = RetryPolicy::from_config(&config(&url));

    match call_with_retry(&gen, &StrictThenBraces, &policy, "p").await {
        CallOutcome::Parsed { object, trace } => {
            assert_eq!(object["title"], "Deep Nets");
            assert_eq!(object["year"], 2020);
            assert!(trace.raw_response.unwrap().starts_with("Here you go"));
        }
        other => panic!("expected parsed, got {:?}", other),
    }
}

#[tokio::test]
async fn large_error_body_is_bounded_in_the_terminal_error() {
    let (url, _) = mock_ollama(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "x".repeat(10_000)}),
    )
    .await;
    let gen = OllamaGenerator::new(&config(&url)).unwrap();
    let policy = RetryPolicy {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    match call_with_retry(&gen, &StrictThenBraces, &policy, "p").await {
        CallOutcome::Failed { error, .. } => {
            assert!(error.contains("500"));
            assert!(error.chars().count() < 400, "error too long: {}", error.len());
        }
        other => panic!("expected failure, got {:?}", other),
    }
}
