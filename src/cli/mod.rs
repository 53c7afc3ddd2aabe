// CLI Interface
//
// Command-line front end: run the HTTP server, score a questionnaire file,
// compute a BMI, and inspect the stored history.

use anyhow::{Context, Result as AnyhowResult};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::engine::{bmi, bmi_category, load_classifier, PredictionInput, Predictor, FEATURE_NAMES};
use crate::server::config::DEFAULT_HISTORY_LIMIT;
use crate::server::responses::PredictionResponse;
use crate::server::{ObesiTrackServer, ServerConfig};
use crate::storage::{Analytics, PredictionStore, Storage};

/// ObesiTrack - Obesity Risk Prediction
#[derive(Parser, Debug)]
#[command(name = "obesitrack")]
#[command(author = "ObesiTrack Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict obesity risk from a lifestyle questionnaire", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(global = true, long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(global = true, long = "db")]
    pub db: Option<PathBuf>,

    /// Linear model artifact (overrides config)
    #[arg(global = true, long = "model")]
    pub model: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(global = true, long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Host address to bind to
        #[arg(long = "host")]
        host: Option<String>,

        /// Port to listen on
        #[arg(long = "port")]
        port: Option<u16>,
    },

    /// Predict from a JSON questionnaire
    Predict {
        /// Questionnaire file, or `-` for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// User the prediction is recorded for
        #[arg(long = "user", default_value = "cli")]
        user: String,

        /// Store the prediction in the history database
        #[arg(long = "save")]
        save: bool,
    },

    /// Compute a BMI and its category
    Bmi {
        /// Weight in kilograms
        #[arg(long = "weight")]
        weight: f64,

        /// Height in centimetres
        #[arg(long = "height")]
        height: f64,
    },

    /// Show a user's recent predictions
    History {
        /// User whose history to show
        #[arg(long = "user")]
        user: String,

        /// Maximum entries (1-50)
        #[arg(long = "limit", default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Print dashboard statistics
    Stats,

    /// Show the classifier in use
    ModelStatus,
}

impl Cli {
    /// Run the CLI
    pub async fn run(self) -> AnyhowResult<()> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        if let Some(db) = self.db {
            config.db_path = db;
        }
        if let Some(model) = self.model {
            config.model_path = Some(model);
        }

        init_logging_impl(self.verbose, &config.log_level);
        debug!("Effective configuration: {:?}", config);

        match self.command {
            Commands::Serve { host, port } => cmd_serve_impl(config, host, port).await,
            Commands::Predict { file, user, save } => cmd_predict_impl(&config, &file, &user, save),
            Commands::Bmi { weight, height } => cmd_bmi_impl(weight, height),
            Commands::History { user, limit } => cmd_history_impl(&config, &user, limit),
            Commands::Stats => cmd_stats_impl(&config),
            Commands::ModelStatus => cmd_model_status_impl(&config),
        }
    }
}

/// Initialize logging implementation
///
/// `RUST_LOG` wins when set; otherwise `-v` selects debug and the
/// configured level applies.
fn init_logging_impl(verbose: bool, configured_level: &str) {
    let level = if verbose { "debug" } else { configured_level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("obesitrack={level},tower_http={level}")));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn open_storage(config: &ServerConfig) -> AnyhowResult<Storage> {
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
    }
    Storage::open(&config.db_path)
        .with_context(|| format!("Failed to open database: {:?}", config.db_path))
}

fn build_predictor(config: &ServerConfig) -> AnyhowResult<Predictor> {
    let classifier =
        load_classifier(config.model_path.as_deref()).context("Failed to load classifier")?;
    Ok(Predictor::new(classifier))
}

fn read_payload(file: &Path) -> AnyhowResult<String> {
    if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read questionnaire from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read questionnaire: {:?}", file))
    }
}

/// Serve command implementation
async fn cmd_serve_impl(
    mut config: ServerConfig,
    host: Option<String>,
    port: Option<u16>,
) -> AnyhowResult<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let server = ObesiTrackServer::new(config).context("Failed to create server")?;

    println!("\nObesiTrack API\n");
    println!("Server starting on {}\n", server.server_url());
    println!("Available endpoints:");
    println!("  POST   /api/predict                          - Predict from a questionnaire");
    println!("  GET    /api/predictions/history              - Caller's history (x-user-id)");
    println!("  GET    /api/admin/users/:user_id/predictions - A user's history");
    println!("  DELETE /api/admin/users/:user_id/predictions - Drop a user's history");
    println!("  GET    /api/admin/stats/dashboard            - Dashboard statistics");
    println!("  GET    /api/model/status                     - Classifier in use");
    println!("  GET    /api/model/health                     - Canned prediction check");
    println!("  GET    /api/health                           - Health check");
    println!("\nPress Ctrl+C to stop the server\n");

    server.start().await.context("Server error")?;
    Ok(())
}

/// Predict command implementation
fn cmd_predict_impl(
    config: &ServerConfig,
    file: &Path,
    user: &str,
    save: bool,
) -> AnyhowResult<()> {
    let raw = read_payload(file)?;
    let payload: serde_json::Value =
        serde_json::from_str(&raw).context("Questionnaire is not valid JSON")?;
    let input = PredictionInput::from_json(&payload).context("Invalid questionnaire")?;

    let predictor = build_predictor(config)?;
    let result = predictor.predict(&input).context("Prediction failed")?;

    if save {
        let storage = open_storage(config)?;
        let id = PredictionStore::new(&storage)
            .insert(user, &input, &result, Utc::now())
            .context("Failed to store prediction")?;
        info!("Stored prediction {} for {}", id, user);
    }

    let response = PredictionResponse::from(&result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// BMI command implementation
fn cmd_bmi_impl(weight: f64, height: f64) -> AnyhowResult<()> {
    let value = bmi(weight, height)?;
    println!("BMI: {:.2} ({})", value, bmi_category(value));
    Ok(())
}

/// History command implementation
fn cmd_history_impl(config: &ServerConfig, user: &str, limit: usize) -> AnyhowResult<()> {
    let storage = open_storage(config)?;
    let store = PredictionStore::new(&storage);
    let records = store
        .recent_for_user(user, limit)
        .context("Failed to load history")?;

    if records.is_empty() {
        println!("No predictions stored for: {}", user);
        return Ok(());
    }

    println!("\n{} prediction(s) for {}\n", records.len(), user);
    for record in &records {
        println!(
            "#{} {}  {}  (confidence {:.2}, BMI {:.2}, risk {})",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.result.label,
            record.result.confidence,
            record.result.bmi,
            record.result.risk_tier,
        );
    }

    Ok(())
}

/// Stats command implementation
fn cmd_stats_impl(config: &ServerConfig) -> AnyhowResult<()> {
    let storage = open_storage(config)?;
    let stats = Analytics::new(&storage)
        .dashboard(Utc::now())
        .context("Failed to compute dashboard statistics")?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Model status command implementation
fn cmd_model_status_impl(config: &ServerConfig) -> AnyhowResult<()> {
    let predictor = build_predictor(config)?;

    println!("Classifier: {}", predictor.classifier_name());
    if let Some(path) = &config.model_path {
        println!("Artifact: {}", path.display());
    }
    println!("Algorithm: {}", predictor.classifier().algorithm());
    println!("Features: {}", FEATURE_NAMES.join(", "));
    if let Some(ranking) = predictor.classifier().feature_importance() {
        println!("Feature importance:");
        for entry in ranking.iter().take(5) {
            println!("  {:<32} {:.4}", entry.feature, entry.importance);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_parsing() {
        let cli = Cli::try_parse_from(["obesitrack", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_predict_parsing_with_global_flags() {
        let cli = Cli::try_parse_from([
            "obesitrack",
            "predict",
            "-",
            "--save",
            "--db",
            "/tmp/o.db",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/o.db")));
        match cli.command {
            Commands::Predict { file, user, save } => {
                assert_eq!(file, PathBuf::from("-"));
                assert_eq!(user, "cli");
                assert!(save);
            }
            other => panic!("expected predict, got {:?}", other),
        }
    }

    #[test]
    fn test_history_default_limit() {
        let cli = Cli::try_parse_from(["obesitrack", "history", "--user", "alice"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History { limit: DEFAULT_HISTORY_LIMIT, .. }
        ));
    }

    #[test]
    fn test_bmi_requires_both_measurements() {
        assert!(Cli::try_parse_from(["obesitrack", "bmi", "--weight", "80"]).is_err());
        assert!(Cli::try_parse_from(["obesitrack", "model-status"]).is_ok());
    }
}
