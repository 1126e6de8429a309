//! Fan-out/fan-in analysis pipeline.
//!
//! ```text
//! text ─┬─ JoinSet::spawn(timeout(vader.classify))        ─┐
//!       ├─ JoinSet::spawn(timeout(naive_bayes.classify))  ─┼─ normalize ─► ConsensusInput ─► aggregate
//!       └─ JoinSet::spawn(timeout(roberta.classify))      ─┘
//! ```
//!
//! ## Partial failure policy
//!
//! Every classification settles into a [`ModelScore`]: a timeout, an
//! upstream error or even a panicking task only marks that one model as
//! failed. The aggregator always runs, on all three records, after every
//! task has settled. Dropping the `analyze` future drops the `JoinSet`,
//! which aborts any classification still in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use consensus::{
    aggregate, normalize, AdapterError, ConsensusHealth, ConsensusInput, ConsensusResult,
    ModelId, ModelScore,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classifier::ClassifierSet;
use crate::config::GatewayConfig;

/// Request-level failures. Aggregation never runs for these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Missing 'text'")]
    EmptyText,
}

/// Full response document: the three normalized scores plus the consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub scores: ConsensusInput,
    pub conclusion: ConsensusResult,
    /// Characters in the trimmed input
    pub input_chars: usize,
    /// Characters actually sent to the classifiers after truncation
    pub used_chars: usize,
}

impl AnalysisReport {
    pub fn health(&self) -> ConsensusHealth {
        ConsensusHealth::from_input(&self.scores)
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Aggregate a saved `{vader, naive_bayes, roberta}` document.
///
/// Unusable entries are excluded from the vote; only a body that is not a
/// JSON object at all is an error. Score anomalies are logged as on the
/// live path.
pub fn aggregate_document(raw: &str) -> Result<ConsensusResult, serde_json::Error> {
    let scores: ConsensusInput = serde_json::from_str(raw)?;
    for (model, anomaly) in scores.anomalies() {
        warn!(model = %model, %anomaly, "Score anomaly");
    }
    Ok(aggregate(&scores))
}

/// Runs the three classifiers concurrently and aggregates their votes.
#[derive(Clone)]
pub struct Analyzer {
    classifiers: ClassifierSet,
    model_timeout: Duration,
    max_chars: usize,
}

impl Analyzer {
    pub fn new(classifiers: ClassifierSet, model_timeout: Duration, max_chars: usize) -> Self {
        Self {
            classifiers,
            model_timeout,
            max_chars,
        }
    }

    /// Analyzer wired to the HTTP endpoints in `config`.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            ClassifierSet::from_config(config)?,
            config.model_timeout,
            config.max_chars,
        ))
    }

    /// Classify `text` with every model and return the consensus report.
    pub async fn analyze(&self, text: &str) -> Result<AnalysisReport, RequestError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RequestError::EmptyText);
        }

        let used = truncate_chars(trimmed, self.max_chars);
        let input_chars = trimmed.chars().count();
        let used_chars = used.chars().count();

        let span = info_span!("analyze", request_id = %Uuid::new_v4(), input_chars, used_chars);
        async move {
            let started = Instant::now();
            let scores = self.classify_all(used).await;
            let conclusion = aggregate(&scores);
            let health = ConsensusHealth::from_input(&scores);

            info!(
                final_sentiment = %conclusion.final_sentiment,
                degradation = %health.level,
                votes = conclusion.votes_cast(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Analysis complete"
            );

            Ok(AnalysisReport {
                scores,
                conclusion,
                input_chars,
                used_chars,
            })
        }
        .instrument(span)
        .await
    }

    /// Fan out to all classifiers and wait for every one to settle.
    async fn classify_all(&self, text: &str) -> ConsensusInput {
        let text: Arc<str> = Arc::from(text);
        let mut join_set: JoinSet<(ModelId, ModelScore)> = JoinSet::new();

        for &model in ModelId::all() {
            let (classifier, format) = self.classifiers.get(model).clone();
            let text = text.clone();
            let timeout = self.model_timeout;

            join_set.spawn(
                async move {
                    let outcome = match tokio::time::timeout(timeout, classifier.classify(&text))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(AdapterError::Timeout {
                            after_ms: timeout.as_millis() as u64,
                        }),
                    };
                    (model, normalize(model, format, outcome))
                }
                .in_current_span(),
            );
        }

        // A task that never reports back (panicked) leaves its model failed.
        let mut input = ConsensusInput::unavailable(&AdapterError::Panicked.to_string());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((model, score)) => input.set(model, score),
                Err(e) => warn!(error = %e, "Classifier task did not complete"),
            }
        }
        input
    }
}
