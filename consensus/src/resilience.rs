//! Degraded-mode summary of a consensus round
//!
//! The consensus document itself never changes shape when classifiers fail;
//! this module only describes *how much* of the ensemble took part so callers
//! can log or display it.
//!
//! ```text
//! 3 votes  → Full
//! 1–2      → Partial       (failed models listed with their errors)
//! 0        → Unavailable   (final_sentiment = undetermined)
//! ```

use serde::{Deserialize, Serialize};

use crate::adapter::ConsensusInput;
use crate::model::ModelId;

/// How much of the ensemble contributed a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationLevel {
    /// Every classifier voted.
    Full,
    /// At least one classifier voted, at least one did not.
    Partial,
    /// No classifier voted.
    Unavailable,
}

impl std::fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Partial => write!(f, "partial"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A classifier that cast no vote, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedModel {
    pub model: ModelId,
    pub reason: String,
}

/// Participation summary for one consensus round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusHealth {
    pub level: DegradationLevel,
    pub voted: Vec<ModelId>,
    pub excluded: Vec<ExcludedModel>,
}

impl ConsensusHealth {
    pub fn from_input(input: &ConsensusInput) -> Self {
        let mut voted = Vec::new();
        let mut excluded = Vec::new();

        for (model, score) in input.iter() {
            if score.ballot().is_some() {
                voted.push(model);
                continue;
            }
            let reason = score
                .error
                .clone()
                .unwrap_or_else(|| "malformed score".to_string());
            excluded.push(ExcludedModel { model, reason });
        }

        let level = if excluded.is_empty() {
            DegradationLevel::Full
        } else if voted.is_empty() {
            DegradationLevel::Unavailable
        } else {
            DegradationLevel::Partial
        };

        Self {
            level,
            voted,
            excluded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.level != DegradationLevel::Full
    }

    /// One-line human summary, e.g. `partial: 2/3 voted; Naive Bayes: timed out`.
    pub fn summary(&self) -> String {
        let total = self.voted.len() + self.excluded.len();
        let mut line = format!("{}: {}/{} voted", self.level, self.voted.len(), total);
        for excluded in &self.excluded {
            line.push_str(&format!(
                "; {}: {}",
                excluded.model.display_name(),
                excluded.reason
            ));
        }
        line
    }
}
