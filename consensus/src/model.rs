//! Fixed set of sentiment classifiers taking part in the vote.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of one of the three sentiment classifiers.
///
/// The set is closed: adapter and aggregator match on it exhaustively, so a
/// new classifier cannot be added without the compiler pointing at every
/// place that needs to know about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    /// Lexicon/rule-based scorer
    Vader,
    /// Probabilistic bag-of-words classifier
    NaiveBayes,
    /// Transformer-based classifier
    Roberta,
}

impl ModelId {
    /// All model IDs in vote order. Buckets list their members in this order.
    pub fn all() -> &'static [ModelId] {
        &[ModelId::Vader, ModelId::NaiveBayes, ModelId::Roberta]
    }

    /// Key used in JSON documents and configuration.
    pub fn key(&self) -> &'static str {
        match self {
            ModelId::Vader => "vader",
            ModelId::NaiveBayes => "naive_bayes",
            ModelId::Roberta => "roberta",
        }
    }

    /// Human-readable name for summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelId::Vader => "VADER",
            ModelId::NaiveBayes => "Naive Bayes",
            ModelId::Roberta => "RoBERTa",
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when parsing an unknown model key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model id: {0}")]
pub struct UnknownModel(pub String);

impl FromStr for ModelId {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::all()
            .iter()
            .copied()
            .find(|m| m.key() == s)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}
