//! Text generation backend and the retrying extraction call.
//!
//! [`Generator`] is the seam to the external model. [`OllamaGenerator`]
//! calls `POST {url}/api/generate` with streaming disabled and temperature
//! zero so repeated runs over the same excerpt tend to agree.
//!
//! [`call_with_retry`] wraps one generate-then-parse unit. A transport
//! failure, a non-success status and an unparseable response all consume
//! an attempt. Between attempts it sleeps `base_delay * n` for the n-th
//! retry (linear backoff). After `max_retries + 1` attempts it returns
//! [`CallOutcome::Failed`] with the last error instead of raising.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{bounded_prefix, CallError, GenerationError};
use crate::models::ExtractionAttempt;
use crate::parse::ResponseParser;

const ERROR_BODY_CHARS: usize = 250;

/// A text-generation service.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier sent with each request.
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`. The returned text is trimmed.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

// ============ Ollama ============

/// Generator backed by a local Ollama instance.
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.url)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: bounded_prefix(&body_text, ERROR_BODY_CHARS),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidBody(e.to_string()))?;

        Ok(parsed.response.unwrap_or_default().trim().to_string())
    }
}

impl OllamaGenerator {
    fn transport_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.timeout_secs)
        } else {
            GenerationError::Transport(format!(
                "{} (is Ollama running at {}?)",
                e, self.url
            ))
        }
    }
}

// ============ Retry ============

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_delay(),
        }
    }

    /// Total attempts allowed, first call included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }
}

/// Result of the retrying generate-then-parse unit.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Parsed {
        object: Map<String, Value>,
        trace: ExtractionAttempt,
    },
    Failed {
        error: String,
        trace: ExtractionAttempt,
    },
}

impl CallOutcome {
    pub fn trace(&self) -> &ExtractionAttempt {
        match self {
            CallOutcome::Parsed { trace, .. } | CallOutcome::Failed { trace, .. } => trace,
        }
    }

    /// The object handed to the normalizer: the parsed response, or an
    /// object carrying only the terminal error.
    pub fn into_candidate(self) -> Map<String, Value> {
        match self {
            CallOutcome::Parsed { object, .. } => object,
            CallOutcome::Failed { error, .. } => {
                let mut map = Map::new();
                map.insert("error".to_string(), Value::String(error));
                map
            }
        }
    }
}

/// Run generate-then-parse until it succeeds or the policy is exhausted.
pub async fn call_with_retry(
    generator: &dyn Generator,
    parser: &dyn ResponseParser,
    policy: &RetryPolicy,
    prompt: &str,
) -> CallOutcome {
    let mut last_raw: Option<String> = None;
    let mut last_err = String::new();

    for attempt in 0..policy.max_attempts() {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying generation");
            tokio::time::sleep(delay).await;
        }

        let result = match generator.generate(prompt).await {
            Ok(raw) => {
                let parsed = parser.parse(&raw).map_err(CallError::from);
                last_raw = Some(raw);
                parsed
            }
            Err(e) => Err(CallError::from(e)),
        };

        match result {
            Ok(object) => {
                return CallOutcome::Parsed {
                    object,
                    trace: ExtractionAttempt {
                        prompt: prompt.to_string(),
                        raw_response: last_raw,
                        attempt,
                        error: None,
                    },
                };
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts(),
                    model = generator.model_name(),
                    error = %e,
                    "extraction attempt failed"
                );
                last_err = e.to_string();
            }
        }
    }

    CallOutcome::Failed {
        error: last_err.clone(),
        trace: ExtractionAttempt {
            prompt: prompt.to_string(),
            raw_response: last_raw,
            attempt: policy.max_retries,
            error: Some(last_err),
        },
    }
}
