//! Gateway configuration.
//!
//! Layered lowest to highest priority: built-in defaults, environment
//! variables, an optional TOML file, command-line flags (applied by `main`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use consensus::{ModelId, ScoreFormat};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_CHARS: usize = 2048;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// One classifier endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(default)]
    pub format: ScoreFormat,
    /// Sent as `Authorization: Bearer <token>` when set.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,
}

/// Endpoints for all three classifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEndpoints {
    pub vader: Endpoint,
    pub naive_bayes: Endpoint,
    pub roberta: Endpoint,
}

impl ModelEndpoints {
    pub fn get(&self, model: ModelId) -> &Endpoint {
        match model {
            ModelId::Vader => &self.vader,
            ModelId::NaiveBayes => &self.naive_bayes,
            ModelId::Roberta => &self.roberta,
        }
    }

    pub fn get_mut(&mut self, model: ModelId) -> &mut Endpoint {
        match model {
            ModelId::Vader => &mut self.vader,
            ModelId::NaiveBayes => &mut self.naive_bayes,
            ModelId::Roberta => &mut self.roberta,
        }
    }
}

impl Default for ModelEndpoints {
    fn default() -> Self {
        Self {
            vader: Endpoint {
                url: "http://127.0.0.1:8101/polarity".into(),
                format: ScoreFormat::VaderPolarity,
                api_token: None,
            },
            naive_bayes: Endpoint {
                url: "https://maksimilijankatavic-nb-sentiment-classifier.hf.space/run/predict"
                    .into(),
                format: ScoreFormat::GradioClassifier,
                api_token: None,
            },
            roberta: Endpoint {
                url: "https://api-inference.huggingface.co/models/cardiffnlp/twitter-roberta-base-sentiment"
                    .into(),
                format: ScoreFormat::HfTextClassification,
                api_token: None,
            },
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,
    /// Input is truncated to this many characters before classification.
    pub max_chars: usize,
    /// Per-classifier deadline; a slow model becomes an error record.
    pub model_timeout: Duration,
    /// Maximum accepted request body.
    pub body_limit_bytes: usize,
    pub endpoints: ModelEndpoints,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_chars: DEFAULT_MAX_CHARS,
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            endpoints: ModelEndpoints::default(),
        }
    }
}

/// Environment variable prefix for a model, e.g. `SENTIMENT_NAIVE_BAYES`.
fn env_prefix(model: ModelId) -> String {
    format!("SENTIMENT_{}", model.key().to_ascii_uppercase())
}

fn parse_env<T: std::str::FromStr>(var: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            value,
        })
}

impl GatewayConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with variables from `lookup`. Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("SENTIMENT_BIND") {
            config.bind = parse_env("SENTIMENT_BIND", v)?;
        }
        if let Some(v) = get("SENTIMENT_MAX_CHARS") {
            config.max_chars = parse_env("SENTIMENT_MAX_CHARS", v)?;
        }
        if let Some(v) = get("SENTIMENT_MODEL_TIMEOUT_SECS") {
            config.model_timeout =
                Duration::from_secs(parse_env("SENTIMENT_MODEL_TIMEOUT_SECS", v)?);
        }
        if let Some(v) = get("SENTIMENT_BODY_LIMIT_BYTES") {
            config.body_limit_bytes = parse_env("SENTIMENT_BODY_LIMIT_BYTES", v)?;
        }

        for model in ModelId::all() {
            let prefix = env_prefix(*model);
            let endpoint = config.endpoints.get_mut(*model);
            if let Some(v) = get(&format!("{prefix}_URL")) {
                endpoint.url = v;
            }
            if let Some(v) = get(&format!("{prefix}_FORMAT")) {
                endpoint.format = parse_env(&format!("{prefix}_FORMAT"), v)?;
            }
            endpoint.api_token = get(&format!("{prefix}_TOKEN"));
        }
        // Conventional Hugging Face token variable.
        if config.endpoints.roberta.api_token.is_none() {
            config.endpoints.roberta.api_token = get("HF_TOKEN");
        }

        Ok(config)
    }

    /// Overlay a TOML file on top of this configuration.
    pub fn merge_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(bind) = file.bind {
            self.bind = bind
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("bind address {bind:?}")))?;
        }
        if let Some(max_chars) = file.max_chars {
            self.max_chars = max_chars;
        }
        if let Some(secs) = file.model_timeout_secs {
            self.model_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = file.body_limit_bytes {
            self.body_limit_bytes = limit;
        }

        let models = file.models.unwrap_or_default();
        for (model, overlay) in [
            (ModelId::Vader, models.vader),
            (ModelId::NaiveBayes, models.naive_bayes),
            (ModelId::Roberta, models.roberta),
        ] {
            let Some(overlay) = overlay else { continue };
            let endpoint = self.endpoints.get_mut(model);
            if let Some(url) = overlay.url {
                endpoint.url = url;
            }
            if let Some(format) = overlay.format {
                endpoint.format = format;
            }
            if overlay.api_token.is_some() {
                endpoint.api_token = overlay.api_token;
            }
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chars == 0 {
            return Err(ConfigError::Invalid("max_chars must be positive".into()));
        }
        if self.model_timeout.is_zero() {
            return Err(ConfigError::Invalid("model timeout must be positive".into()));
        }
        if self.body_limit_bytes == 0 {
            return Err(ConfigError::Invalid("body limit must be positive".into()));
        }
        for model in ModelId::all() {
            if self.endpoints.get(*model).url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{model} endpoint url is empty")));
            }
        }
        Ok(())
    }
}

/// On-disk TOML shape. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind: Option<String>,
    max_chars: Option<usize>,
    model_timeout_secs: Option<u64>,
    body_limit_bytes: Option<usize>,
    models: Option<FileModels>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileModels {
    vader: Option<FileEndpoint>,
    naive_bayes: Option<FileEndpoint>,
    roberta: Option<FileEndpoint>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileEndpoint {
    url: Option<String>,
    format: Option<ScoreFormat>,
    api_token: Option<String>,
}
