//! Majority vote across the three classifiers
//!
//! Each usable record votes for the category its own model labelled it with;
//! the aggregator never re-derives a label from the probabilities. Errored or
//! malformed records cast no vote. The category with the most votes wins and
//! ties are broken by [`TIE_BREAK_PRIORITY`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::ConsensusInput;
use crate::model::ModelId;
use crate::score::Sentiment;

/// Order in which tied categories win. A missed negative signal is costlier
/// than a false positive, and neutral carries the least information.
pub const TIE_BREAK_PRIORITY: [Sentiment; 3] =
    [Sentiment::Negative, Sentiment::Positive, Sentiment::Neutral];

/// Final consensus label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalSentiment {
    Positive,
    Neutral,
    Negative,
    /// No model produced a usable vote.
    Undetermined,
}

impl FinalSentiment {
    /// The winning category, or `None` when undetermined.
    pub fn sentiment(&self) -> Option<Sentiment> {
        match self {
            Self::Positive => Some(Sentiment::Positive),
            Self::Neutral => Some(Sentiment::Neutral),
            Self::Negative => Some(Sentiment::Negative),
            Self::Undetermined => None,
        }
    }
}

impl From<Sentiment> for FinalSentiment {
    fn from(sentiment: Sentiment) -> Self {
        match sentiment {
            Sentiment::Positive => Self::Positive,
            Sentiment::Neutral => Self::Neutral,
            Sentiment::Negative => Self::Negative,
        }
    }
}

impl std::fmt::Display for FinalSentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Neutral => write!(f, "neutral"),
            Self::Negative => write!(f, "negative"),
            Self::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Vote buckets plus the derived label.
///
/// The buckets partition the models that voted; each lists its members in
/// [`ModelId::all`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub positive: Vec<ModelId>,
    pub neutral: Vec<ModelId>,
    pub negative: Vec<ModelId>,
    pub final_sentiment: FinalSentiment,
    /// Share of voting models in the winning bucket (0.0 when undetermined)
    pub agreement: f64,
}

impl ConsensusResult {
    fn empty() -> Self {
        Self {
            positive: Vec::new(),
            neutral: Vec::new(),
            negative: Vec::new(),
            final_sentiment: FinalSentiment::Undetermined,
            agreement: 0.0,
        }
    }

    pub fn bucket(&self, sentiment: Sentiment) -> &[ModelId] {
        match sentiment {
            Sentiment::Positive => &self.positive,
            Sentiment::Neutral => &self.neutral,
            Sentiment::Negative => &self.negative,
        }
    }

    fn bucket_mut(&mut self, sentiment: Sentiment) -> &mut Vec<ModelId> {
        match sentiment {
            Sentiment::Positive => &mut self.positive,
            Sentiment::Neutral => &mut self.neutral,
            Sentiment::Negative => &mut self.negative,
        }
    }

    /// Number of votes for one category.
    pub fn tally(&self, sentiment: Sentiment) -> usize {
        self.bucket(sentiment).len()
    }

    /// Number of models that voted at all.
    pub fn votes_cast(&self) -> usize {
        self.positive.len() + self.neutral.len() + self.negative.len()
    }
}

/// Reduce per-model records to the consensus. Pure and infallible.
pub fn aggregate(input: &ConsensusInput) -> ConsensusResult {
    let mut result = ConsensusResult::empty();

    for (model, score) in input.iter() {
        match score.ballot() {
            Some(sentiment) => result.bucket_mut(sentiment).push(model),
            None => debug!(model = %model, "No usable vote"),
        }
    }

    if let Some(winner) = select_winner(&result) {
        result.final_sentiment = winner.into();
        result.agreement = result.tally(winner) as f64 / result.votes_cast() as f64;
    }

    debug!(
        positive = result.positive.len(),
        neutral = result.neutral.len(),
        negative = result.negative.len(),
        final_sentiment = %result.final_sentiment,
        "Consensus tallied"
    );

    result
}

/// Category with the most votes, tied categories resolved by priority.
fn select_winner(result: &ConsensusResult) -> Option<Sentiment> {
    let max = Sentiment::all()
        .iter()
        .map(|s| result.tally(*s))
        .max()
        .unwrap_or(0);
    if max == 0 {
        return None;
    }
    TIE_BREAK_PRIORITY
        .into_iter()
        .find(|s| result.tally(*s) == max)
}
