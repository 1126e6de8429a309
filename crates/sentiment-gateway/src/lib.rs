//! Sentiment consensus gateway
//!
//! Accepts a piece of text, classifies it with three independent sentiment
//! models concurrently and returns their normalized scores together with the
//! consensus computed by the [`consensus`] crate.
//!
//! # Usage
//!
//! ```bash
//! # Serve the HTTP API
//! sentiment-gateway serve --bind 0.0.0.0:8080
//!
//! # One-shot analysis
//! sentiment-gateway analyze "The support team was fantastic"
//!
//! # Aggregate a saved set of model scores
//! sentiment-gateway aggregate scores.json
//! ```

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod server;
pub mod telemetry;

pub use analysis::{aggregate_document, truncate_chars, AnalysisReport, Analyzer, RequestError};
pub use classifier::{Classifier, ClassifierSet, HttpClassifier};
pub use config::{ConfigError, Endpoint, GatewayConfig, ModelEndpoints};
pub use server::{router, serve, ApiError, ErrorBody};
