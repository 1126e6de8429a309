use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sentiment_gateway::config::GatewayConfig;
use sentiment_gateway::telemetry::{self, LogFormat};
use sentiment_gateway::{aggregate_document, Analyzer};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    /// TOML file layered over environment settings
    #[arg(long, env = "SENTIMENT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Settings shared by commands that call the classifiers
#[derive(clap::Args, Debug)]
struct Overrides {
    /// Truncate input to this many characters (overrides SENTIMENT_MAX_CHARS)
    #[arg(long)]
    max_chars: Option<usize>,

    /// Per-model timeout in seconds (overrides SENTIMENT_MODEL_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Listen address (overrides SENTIMENT_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Classify one text and print the report as JSON
    Analyze {
        /// Text to classify
        text: String,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Aggregate a saved `{vader, naive_bayes, roberta}` document ("-" reads stdin)
    Aggregate {
        input: PathBuf,
    },
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<GatewayConfig> {
    let mut config = GatewayConfig::from_env().context("Invalid environment configuration")?;
    if let Some(path) = path {
        config = config.merge_file(path)?;
    }
    if let Some(max_chars) = overrides.max_chars {
        config.max_chars = max_chars;
    }
    if let Some(secs) = overrides.timeout_secs {
        config.model_timeout = Duration::from_secs(secs);
    }
    config.validate()?;
    Ok(config)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(args.log_format);

    match args.command {
        Command::Serve { bind, overrides } => {
            let mut config = load_config(args.config.as_deref(), &overrides)?;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            info!(
                bind = %config.bind,
                vader = %config.endpoints.vader.url,
                naive_bayes = %config.endpoints.naive_bayes.url,
                roberta = %config.endpoints.roberta.url,
                timeout_ms = config.model_timeout.as_millis() as u64,
                "Sentiment gateway starting"
            );
            sentiment_gateway::serve(&config).await?;
        }
        Command::Analyze { text, overrides } => {
            let config = load_config(args.config.as_deref(), &overrides)?;
            let analyzer =
                Analyzer::from_config(&config).context("Failed to build classifier clients")?;
            let report = analyzer.analyze(&text).await?;
            eprintln!("{}", report.health().summary());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Aggregate { input } => {
            let raw = read_input(&input)?;
            let result =
                aggregate_document(&raw).context("Input is not a valid score document")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
