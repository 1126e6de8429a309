//! Decoders for the upstream classifiers' native response formats.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AdapterError, AdapterResult};
use crate::score::{ModelScore, Probabilities, Sentiment};

/// VADER's compound threshold for a non-neutral label.
pub const VADER_COMPOUND_THRESHOLD: f64 = 0.05;

/// Native response format of a classifier endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFormat {
    /// Already normalized: `{positive, neutral, negative, sentiment, compound?}`
    #[default]
    Canonical,
    /// VADER `polarity_scores`: `{neg, neu, pos, compound}`
    VaderPolarity,
    /// Gradio predict output: `{label, proba, classes, all_probabilities}`,
    /// optionally wrapped in `{data: [...]}` and/or JSON-encoded as a string
    GradioClassifier,
    /// Hugging Face inference API text classification: `[[{label, score}]]`
    HfTextClassification,
}

impl ScoreFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::VaderPolarity => "vader_polarity",
            Self::GradioClassifier => "gradio_classifier",
            Self::HfTextClassification => "hf_text_classification",
        }
    }
}

impl std::fmt::Display for ScoreFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown score format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for ScoreFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "canonical" => Ok(Self::Canonical),
            "vader_polarity" => Ok(Self::VaderPolarity),
            "gradio_classifier" => Ok(Self::GradioClassifier),
            "hf_text_classification" => Ok(Self::HfTextClassification),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Decode a raw payload into a fully-shaped [`ModelScore`].
///
/// On success all three probabilities are present (missing ones are an
/// explicit zero) and the label is set.
pub fn decode(format: ScoreFormat, payload: &Value) -> AdapterResult<ModelScore> {
    match format {
        ScoreFormat::Canonical => decode_canonical(payload),
        ScoreFormat::VaderPolarity => decode_vader(payload),
        ScoreFormat::GradioClassifier => decode_gradio(payload),
        ScoreFormat::HfTextClassification => decode_hf(payload),
    }
}

fn as_object<'a>(payload: &'a Value, what: &str) -> AdapterResult<&'a Map<String, Value>> {
    payload
        .as_object()
        .ok_or_else(|| AdapterError::UnexpectedShape(format!("expected {what} object")))
}

fn upstream_error(obj: &Map<String, Value>) -> Option<AdapterError> {
    match obj.get("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(msg)) => Some(AdapterError::Upstream(msg.clone())),
        Some(other) => Some(AdapterError::Upstream(other.to_string())),
    }
}

/// A probability in [0,1]. Absent or null reads as zero.
fn probability(field: &'static str, value: Option<&Value>) -> AdapterResult<f64> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(v) => match v.as_f64() {
            Some(p) if p.is_finite() && (0.0..=1.0).contains(&p) => Ok(p),
            _ => Err(AdapterError::InvalidScore {
                field,
                value: v.to_string(),
            }),
        },
    }
}

fn parse_compound(value: &Value) -> AdapterResult<f64> {
    match value.as_f64() {
        Some(c) if c.is_finite() && (-1.0..=1.0).contains(&c) => Ok(c),
        _ => Err(AdapterError::InvalidScore {
            field: "compound",
            value: value.to_string(),
        }),
    }
}

fn decode_canonical(payload: &Value) -> AdapterResult<ModelScore> {
    let obj = as_object(payload, "score")?;
    if let Some(err) = upstream_error(obj) {
        return Err(err);
    }

    let probs = Probabilities::new(
        probability("positive", obj.get("positive"))?,
        probability("neutral", obj.get("neutral"))?,
        probability("negative", obj.get("negative"))?,
    );
    let sentiment = obj
        .get("sentiment")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Sentiment>().ok())
        .ok_or(AdapterError::MissingSentiment)?;

    let score = ModelScore::scored(probs, sentiment);
    match obj.get("compound") {
        None | Some(Value::Null) => Ok(score),
        Some(c) => Ok(score.with_compound(parse_compound(c)?)),
    }
}

/// VADER labels by compound score, not by the largest share: most text is
/// dominated by `neu` even when clearly polar.
fn vader_label(compound: f64) -> Sentiment {
    if compound >= VADER_COMPOUND_THRESHOLD {
        Sentiment::Positive
    } else if compound <= -VADER_COMPOUND_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn decode_vader(payload: &Value) -> AdapterResult<ModelScore> {
    let obj = as_object(payload, "polarity")?;
    if let Some(err) = upstream_error(obj) {
        return Err(err);
    }

    let probs = Probabilities::new(
        probability("positive", obj.get("pos"))?,
        probability("neutral", obj.get("neu"))?,
        probability("negative", obj.get("neg"))?,
    );
    let compound = obj
        .get("compound")
        .ok_or(AdapterError::MissingSentiment)
        .and_then(parse_compound)?;

    Ok(ModelScore::scored(probs, vader_label(compound)).with_compound(compound))
}

fn decode_gradio(payload: &Value) -> AdapterResult<ModelScore> {
    // `{data: [result]}` envelope from the REST predict endpoint.
    let inner = match payload.get("data").and_then(Value::as_array) {
        Some(items) => items
            .first()
            .ok_or_else(|| AdapterError::UnexpectedShape("empty data array".to_string()))?,
        None => payload,
    };

    let parsed;
    let result = match inner {
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw).map_err(|_| {
                AdapterError::Decode("classifier returned a non-JSON string".to_string())
            })?;
            &parsed
        }
        other => other,
    };

    let obj = as_object(result, "classifier result")?;
    if let Some(err) = upstream_error(obj) {
        return Err(err);
    }

    let sentiment = obj
        .get("label")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Sentiment>().ok())
        .ok_or(AdapterError::MissingSentiment)?;

    let classes = obj.get("classes").and_then(Value::as_array);
    let all_probs = obj.get("all_probabilities").and_then(Value::as_array);

    let mut probs = Probabilities::default();
    match (classes, all_probs) {
        (Some(classes), Some(all_probs)) if !classes.is_empty() => {
            if classes.len() != all_probs.len() {
                return Err(AdapterError::UnexpectedShape(format!(
                    "{} classes but {} probabilities",
                    classes.len(),
                    all_probs.len()
                )));
            }
            for (class, p) in classes.iter().zip(all_probs) {
                // Classes outside the three categories carry no vote weight.
                let Some(category) = class.as_str().and_then(|c| c.parse::<Sentiment>().ok())
                else {
                    continue;
                };
                probs.set(category, probability(category.as_str(), Some(p))?);
            }
        }
        _ => {
            let proba = probability(sentiment.as_str(), obj.get("proba"))?;
            probs.set(sentiment, proba);
        }
    }

    Ok(ModelScore::scored(probs, sentiment))
}

/// `LABEL_n` ids of the cardiffnlp twitter-roberta sentiment head.
fn hf_label(label: &str) -> Option<Sentiment> {
    match label {
        "LABEL_0" => Some(Sentiment::Negative),
        "LABEL_1" => Some(Sentiment::Neutral),
        "LABEL_2" => Some(Sentiment::Positive),
        other => other.parse().ok(),
    }
}

fn decode_hf(payload: &Value) -> AdapterResult<ModelScore> {
    if let Some(obj) = payload.as_object() {
        if let Some(err) = upstream_error(obj) {
            return Err(err);
        }
    }

    let outer = payload.as_array().ok_or_else(|| {
        AdapterError::UnexpectedShape("expected an array of label scores".to_string())
    })?;
    // Batched responses wrap the candidates of each input in another array.
    let candidates = match outer.first() {
        Some(Value::Array(inner)) => inner,
        _ => outer,
    };

    let mut probs = Probabilities::default();
    let mut best: Option<(Sentiment, f64)> = None;
    for candidate in candidates {
        let Some(category) = candidate
            .get("label")
            .and_then(Value::as_str)
            .and_then(hf_label)
        else {
            continue;
        };
        let score = probability(category.as_str(), candidate.get("score"))?;
        probs.set(category, score);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((category, score));
        }
    }

    let (sentiment, _) = best.ok_or_else(|| {
        AdapterError::UnexpectedShape("no recognizable sentiment labels".to_string())
    })?;
    Ok(ModelScore::scored(probs, sentiment))
}
