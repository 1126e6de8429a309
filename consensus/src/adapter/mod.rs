//! Model adapter layer
//!
//! Turns whatever each classifier produced, a payload in its own wire format
//! or a failure, into exactly one [`ModelScore`] per [`ModelId`]. Nothing in
//! here returns an error to the caller: a failure is recorded on the affected
//! model only and the other two are normalized independently.
//!
//! ```text
//! Result<Value, AdapterError> ──decode(format)──► ModelScore ─┐
//! Result<Value, AdapterError> ──decode(format)──► ModelScore ─┼─► ConsensusInput
//! Result<Value, AdapterError> ──decode(format)──► ModelScore ─┘
//! ```

pub mod wire;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::ModelId;
use crate::score::{ModelScore, ScoreAnomaly};

pub use wire::{decode, ScoreFormat, UnknownFormat};

/// Why a single classifier produced no usable score.
///
/// The `Display` text becomes the `error` field of the failed record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not valid JSON: {0}")]
    Decode(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("payload has no usable sentiment label")]
    MissingSentiment,

    #[error("invalid {field} score: {value}")]
    InvalidScore { field: &'static str, value: String },

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("classifier task panicked")]
    Panicked,
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Normalize one classifier outcome into a [`ModelScore`]. Never fails.
pub fn normalize(model: ModelId, format: ScoreFormat, outcome: AdapterResult<Value>) -> ModelScore {
    match outcome.and_then(|payload| decode(format, &payload)) {
        Ok(score) => {
            for anomaly in score.anomalies() {
                warn!(model = %model, %anomaly, "Score anomaly");
            }
            debug!(model = %model, sentiment = ?score.sentiment, "Classifier scored");
            score
        }
        Err(e) => {
            warn!(model = %model, error = %e, "Classifier failed, excluding from vote");
            ModelScore::failed(e.to_string())
        }
    }
}

fn missing_result() -> ModelScore {
    ModelScore::failed("no result")
}

/// A per-model entry that is not a score object (a string, a number, `null`)
/// becomes a failed record instead of rejecting the whole document.
fn lenient_score<'de, D>(deserializer: D) -> Result<ModelScore, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    if !raw.is_object() {
        return Ok(ModelScore::failed("malformed score"));
    }
    Ok(serde_json::from_value(raw).unwrap_or_else(|_| ModelScore::failed("malformed score")))
}

/// One [`ModelScore`] per classifier.
///
/// The struct has a field per [`ModelId`] rather than a map, so a missing
/// model is unrepresentable. When read from JSON an absent key becomes a
/// failed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusInput {
    #[serde(default = "missing_result", deserialize_with = "lenient_score")]
    pub vader: ModelScore,
    #[serde(default = "missing_result", deserialize_with = "lenient_score")]
    pub naive_bayes: ModelScore,
    #[serde(default = "missing_result", deserialize_with = "lenient_score")]
    pub roberta: ModelScore,
}

impl ConsensusInput {
    pub fn new(vader: ModelScore, naive_bayes: ModelScore, roberta: ModelScore) -> Self {
        Self {
            vader,
            naive_bayes,
            roberta,
        }
    }

    /// Every model failed with the same message.
    pub fn unavailable(message: &str) -> Self {
        Self::new(
            ModelScore::failed(message),
            ModelScore::failed(message),
            ModelScore::failed(message),
        )
    }

    pub fn get(&self, model: ModelId) -> &ModelScore {
        match model {
            ModelId::Vader => &self.vader,
            ModelId::NaiveBayes => &self.naive_bayes,
            ModelId::Roberta => &self.roberta,
        }
    }

    pub fn set(&mut self, model: ModelId, score: ModelScore) {
        match model {
            ModelId::Vader => self.vader = score,
            ModelId::NaiveBayes => self.naive_bayes = score,
            ModelId::Roberta => self.roberta = score,
        }
    }

    /// Soft validation findings of every model that can vote.
    pub fn anomalies(&self) -> Vec<(ModelId, ScoreAnomaly)> {
        self.iter()
            .flat_map(|(model, score)| score.anomalies().into_iter().map(move |a| (model, a)))
            .collect()
    }

    /// Records in [`ModelId::all`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &ModelScore)> + '_ {
        ModelId::all().iter().map(move |m| (*m, self.get(*m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Sentiment;
    use serde_json::json;

    #[test]
    fn test_normalize_captures_failure_as_error_record() {
        let score = normalize(
            ModelId::NaiveBayes,
            ScoreFormat::Canonical,
            Err(AdapterError::Timeout { after_ms: 5000 }),
        );
        assert_eq!(score, ModelScore::failed("timed out after 5000 ms"));
    }

    #[test]
    fn test_normalize_defaults_missing_probabilities_to_zero() {
        let score = normalize(
            ModelId::Vader,
            ScoreFormat::Canonical,
            Ok(json!({ "positive": 0.9, "sentiment": "positive" })),
        );
        assert_eq!(score.positive, Some(0.9));
        assert_eq!(score.neutral, Some(0.0));
        assert_eq!(score.negative, Some(0.0));
        assert_eq!(score.ballot(), Some(Sentiment::Positive));
    }

    #[test]
    fn test_normalize_rejects_payload_without_label() {
        let score = normalize(
            ModelId::NaiveBayes,
            ScoreFormat::Canonical,
            Ok(json!({ "positive": 0.2, "neutral": 0.5, "negative": 0.3 })),
        );
        assert!(score.is_error());
        assert_eq!(score.ballot(), None);
    }

    #[test]
    fn test_missing_key_deserializes_as_failed() {
        let input: ConsensusInput = serde_json::from_value(json!({
            "vader": { "positive": 1.0, "neutral": 0.0, "negative": 0.0, "sentiment": "positive" },
            "roberta": { "error": "quota exceeded" }
        }))
        .unwrap();
        assert!(input.naive_bayes.is_error());
        assert_eq!(input.vader.ballot(), Some(Sentiment::Positive));
    }

    #[test]
    fn test_non_object_entry_is_excluded_not_fatal() {
        for garbage in [json!("garbage"), json!(null), json!(42), json!([1, 2])] {
            let input: ConsensusInput = serde_json::from_value(json!({
                "vader": { "positive": 0.9, "neutral": 0.1, "negative": 0.0, "sentiment": "positive" },
                "naive_bayes": garbage,
                "roberta": { "positive": 0.8, "neutral": 0.1, "negative": 0.1, "sentiment": "positive" }
            }))
            .unwrap();
            assert_eq!(input.naive_bayes, ModelScore::failed("malformed score"));
            assert_eq!(input.vader.ballot(), Some(Sentiment::Positive));
            assert_eq!(input.roberta.ballot(), Some(Sentiment::Positive));
        }
    }

    #[test]
    fn test_anomalies_are_tagged_with_model() {
        let input: ConsensusInput = serde_json::from_value(json!({
            "vader": { "positive": 0.3, "neutral": 0.7, "negative": 0.0, "sentiment": "positive" },
            "naive_bayes": { "positive": 0.5, "neutral": 0.2, "negative": 0.1, "sentiment": "positive" },
            "roberta": { "error": "timeout" }
        }))
        .unwrap();
        let anomalies = input.anomalies();
        assert_eq!(anomalies.len(), 2);
        assert!(matches!(
            anomalies[0],
            (ModelId::Vader, ScoreAnomaly::LabelNotArgmax { .. })
        ));
        assert!(matches!(
            anomalies[1],
            (ModelId::NaiveBayes, ScoreAnomaly::SumDrift { .. })
        ));
    }

    #[test]
    fn test_iter_follows_fixed_order() {
        let input = ConsensusInput::unavailable("down");
        let order: Vec<ModelId> = input.iter().map(|(m, _)| m).collect();
        assert_eq!(order, ModelId::all());
    }

    #[test]
    fn test_set_replaces_only_target_model() {
        let mut input = ConsensusInput::unavailable("down");
        input.set(ModelId::Roberta, ModelScore::failed("other"));
        assert_eq!(input.vader.error.as_deref(), Some("down"));
        assert_eq!(input.roberta.error.as_deref(), Some("other"));
    }
}
