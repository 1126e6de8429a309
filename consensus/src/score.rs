//! Normalized per-model sentiment record.
//!
//! Every classifier, whatever its native output looks like, is reduced to a
//! [`ModelScore`]: three class probabilities, the model's own label, an
//! optional VADER-style compound score and an optional error marker.
//!
//! Fields are optional so that a document read back from JSON can carry any
//! shape. Deserialization is lenient: a value of the wrong type or an unknown
//! label is kept as "unusable" instead of failing the whole document, and
//! [`ModelScore::ballot`] later excludes such a record from voting.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Tolerance on `positive + neutral + negative` before it is reported as drift.
pub const SUM_TOLERANCE: f64 = 0.02;

/// One of the three sentiment categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn all() -> &'static [Sentiment] {
        &[Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a label is not one of the three categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sentiment label: {0}")]
pub struct UnknownSentiment(pub String);

impl FromStr for Sentiment {
    type Err = UnknownSentiment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            _ => Err(UnknownSentiment(s.to_string())),
        }
    }
}

/// Class probabilities of a successful classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl Probabilities {
    pub fn new(positive: f64, neutral: f64, negative: f64) -> Self {
        Self {
            positive,
            neutral,
            negative,
        }
    }

    pub fn get(&self, sentiment: Sentiment) -> f64 {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    pub fn set(&mut self, sentiment: Sentiment, value: f64) {
        match sentiment {
            Sentiment::Positive => self.positive = value,
            Sentiment::Neutral => self.neutral = value,
            Sentiment::Negative => self.negative = value,
        }
    }

    pub fn sum(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }

    /// Highest probability across the three categories.
    pub fn max(&self) -> f64 {
        self.positive.max(self.neutral).max(self.negative)
    }
}

/// Soft validation finding on a non-errored record.
///
/// Anomalies are reported, never used to drop a vote: the model's own label
/// stays authoritative.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreAnomaly {
    /// Probabilities do not sum to 1 within [`SUM_TOLERANCE`].
    SumDrift { sum: f64 },
    /// The label is not the highest-scoring category.
    LabelNotArgmax { label: Sentiment, label_score: f64, max_score: f64 },
}

impl std::fmt::Display for ScoreAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SumDrift { sum } => write!(f, "probabilities sum to {sum:.4}"),
            Self::LabelNotArgmax {
                label,
                label_score,
                max_score,
            } => write!(
                f,
                "label {label} scored {label_score:.4} below the maximum {max_score:.4}"
            ),
        }
    }
}

/// Normalized output of a single classifier, or an error marker.
///
/// When `error` is set the remaining fields are meaningless and are omitted
/// on serialization by [`ModelScore::failed`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_number"
    )]
    pub positive: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_number"
    )]
    pub neutral: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_number"
    )]
    pub negative: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_sentiment"
    )]
    pub sentiment: Option<Sentiment>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_number"
    )]
    pub compound: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_error"
    )]
    pub error: Option<String>,
}

impl ModelScore {
    /// A successful classification with every probability populated.
    pub fn scored(probabilities: Probabilities, sentiment: Sentiment) -> Self {
        Self {
            positive: Some(probabilities.positive),
            neutral: Some(probabilities.neutral),
            negative: Some(probabilities.negative),
            sentiment: Some(sentiment),
            compound: None,
            error: None,
        }
    }

    /// Attach a compound polarity score.
    pub fn with_compound(mut self, compound: f64) -> Self {
        self.compound = Some(compound);
        self
    }

    /// A failed classification carrying only the error message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Probabilities with absent fields read as zero.
    pub fn probabilities(&self) -> Probabilities {
        Probabilities::new(
            self.positive.unwrap_or(0.0),
            self.neutral.unwrap_or(0.0),
            self.negative.unwrap_or(0.0),
        )
    }

    /// The category this model votes for, if the record is usable.
    ///
    /// Errored records, records without a label and records with a
    /// non-finite or out-of-range probability return `None`.
    pub fn ballot(&self) -> Option<Sentiment> {
        if self.error.is_some() {
            return None;
        }
        let in_range = [self.positive, self.neutral, self.negative]
            .into_iter()
            .flatten()
            .all(|p| p.is_finite() && (0.0..=1.0).contains(&p));
        if !in_range {
            return None;
        }
        self.sentiment
    }

    /// Soft validation findings. Empty for records that cannot vote.
    pub fn anomalies(&self) -> Vec<ScoreAnomaly> {
        let Some(label) = self.ballot() else {
            return Vec::new();
        };
        let probs = self.probabilities();
        let mut found = Vec::new();

        let sum = probs.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            found.push(ScoreAnomaly::SumDrift { sum });
        }

        let label_score = probs.get(label);
        let max_score = probs.max();
        if label_score + f64::EPSILON < max_score {
            found.push(ScoreAnomaly::LabelNotArgmax {
                label,
                label_score,
                max_score,
            });
        }

        found
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        // Present but unusable: NaN keeps the field visible to `ballot()`.
        Some(value) => Some(value.as_f64().unwrap_or(f64::NAN)),
    })
}

fn lenient_sentiment<'de, D>(deserializer: D) -> Result<Option<Sentiment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok()))
}

fn lenient_error<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
