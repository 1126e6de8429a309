//! Multi-model sentiment consensus
//!
//! This library provides the two pure stages between three independent
//! sentiment classifiers and a single verdict:
//! - **Adapter layer**: decodes each classifier's native payload (or failure)
//!   into a normalized [`ModelScore`], isolating failures per model
//! - **Aggregator**: partitions the models into vote buckets and derives a
//!   final label with a deterministic tie-break
//!
//! # Usage
//!
//! ```
//! use consensus::{aggregate, normalize, ConsensusInput, FinalSentiment, ModelId, ScoreFormat};
//! use consensus::AdapterError;
//! use serde_json::json;
//!
//! let vader = normalize(
//!     ModelId::Vader,
//!     ScoreFormat::VaderPolarity,
//!     Ok(json!({ "neg": 0.0, "neu": 0.4, "pos": 0.6, "compound": 0.71 })),
//! );
//! let naive_bayes = normalize(
//!     ModelId::NaiveBayes,
//!     ScoreFormat::GradioClassifier,
//!     Err(AdapterError::Timeout { after_ms: 5000 }),
//! );
//! let roberta = normalize(
//!     ModelId::Roberta,
//!     ScoreFormat::HfTextClassification,
//!     Ok(json!([[{ "label": "LABEL_2", "score": 0.93 }]])),
//! );
//!
//! let result = aggregate(&ConsensusInput::new(vader, naive_bayes, roberta));
//! assert_eq!(result.positive, vec![ModelId::Vader, ModelId::Roberta]);
//! assert_eq!(result.final_sentiment, FinalSentiment::Positive);
//! ```

pub mod adapter;
pub mod model;
pub mod resilience;
pub mod score;
pub mod voting;

pub use adapter::{
    decode, normalize, AdapterError, AdapterResult, ConsensusInput, ScoreFormat, UnknownFormat,
};
pub use model::{ModelId, UnknownModel};
pub use resilience::{ConsensusHealth, DegradationLevel, ExcludedModel};
pub use score::{ModelScore, Probabilities, ScoreAnomaly, Sentiment, UnknownSentiment};
pub use voting::{aggregate, ConsensusResult, FinalSentiment, TIE_BREAK_PRIORITY};
