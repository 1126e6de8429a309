//! Sentiment classifier collaborators.
//!
//! The gateway treats every model as an opaque `classify(text)` call returning
//! its native JSON payload; decoding that payload is the adapter layer's job.

use std::sync::Arc;

use async_trait::async_trait;
use consensus::{AdapterError, ModelId, ScoreFormat};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{Endpoint, GatewayConfig};

/// Upstream error bodies are cut to this many characters in error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// A single sentiment model reachable through one call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    fn model(&self) -> ModelId;

    /// Classify `text`, returning the model's raw payload.
    async fn classify(&self, text: &str) -> Result<Value, AdapterError>;
}

/// Classifier backed by an HTTP endpoint.
pub struct HttpClassifier {
    model: ModelId,
    endpoint: Endpoint,
    http: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(model: ModelId, endpoint: Endpoint, http: reqwest::Client) -> Self {
        Self {
            model,
            endpoint,
            http,
        }
    }

    /// Request body in the shape the endpoint's format expects.
    fn request_body(&self, text: &str) -> Value {
        match self.endpoint.format {
            ScoreFormat::HfTextClassification => json!({ "inputs": text }),
            ScoreFormat::GradioClassifier => json!({ "data": [text] }),
            ScoreFormat::Canonical | ScoreFormat::VaderPolarity => json!({ "text": text }),
        }
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    fn model(&self) -> ModelId {
        self.model
    }

    async fn classify(&self, text: &str) -> Result<Value, AdapterError> {
        let mut request = self.http.post(&self.endpoint.url).json(&self.request_body(text));
        if let Some(ref token) = self.endpoint.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        debug!(
            model = %self.model,
            status = status.as_u16(),
            bytes = body.len(),
            "Classifier responded"
        );

        if !status.is_success() {
            return Err(AdapterError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| AdapterError::Decode(e.to_string()))
    }
}

/// One classifier per model, with the wire format its payload is decoded from.
#[derive(Clone)]
pub struct ClassifierSet {
    pub vader: (Arc<dyn Classifier>, ScoreFormat),
    pub naive_bayes: (Arc<dyn Classifier>, ScoreFormat),
    pub roberta: (Arc<dyn Classifier>, ScoreFormat),
}

impl ClassifierSet {
    pub fn new(
        vader: (Arc<dyn Classifier>, ScoreFormat),
        naive_bayes: (Arc<dyn Classifier>, ScoreFormat),
        roberta: (Arc<dyn Classifier>, ScoreFormat),
    ) -> Self {
        Self {
            vader,
            naive_bayes,
            roberta,
        }
    }

    /// HTTP classifiers for every configured endpoint, sharing one client.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sentiment-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let build = |model: ModelId| -> (Arc<dyn Classifier>, ScoreFormat) {
            let endpoint = config.endpoints.get(model).clone();
            let format = endpoint.format;
            (
                Arc::new(HttpClassifier::new(model, endpoint, http.clone())),
                format,
            )
        };

        Ok(Self::new(
            build(ModelId::Vader),
            build(ModelId::NaiveBayes),
            build(ModelId::Roberta),
        ))
    }

    pub fn get(&self, model: ModelId) -> &(Arc<dyn Classifier>, ScoreFormat) {
        match model {
            ModelId::Vader => &self.vader,
            ModelId::NaiveBayes => &self.naive_bayes,
            ModelId::Roberta => &self.roberta,
        }
    }
}
