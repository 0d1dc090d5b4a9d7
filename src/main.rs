use anyhow::Context;
use clap::Parser;
use linkscribe::{classifier::Classifier, config::Config, db, extract::Extractor, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "linkscribe", version, about = "Bookmark service with automatic categorization")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides [server].bind)
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database file (overrides [database].path)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Classifier model file (overrides [classifier].model_path)
    #[arg(long)]
    model: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("linkscribe=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    if let Some(path) = cli.model {
        config.classifier.model_path = path;
    }

    let classifier = Classifier::load(&config.classifier.model_path)
        .context("Failed to load classifier model")?;
    tracing::info!(
        path = %config.classifier.model_path.display(),
        labels = ?classifier.labels(),
        "classifier loaded"
    );

    let conn = db::establish_connection(&config.database.path)
        .context("Failed to establish database connection")?;

    let extractor = Extractor::new(&config.extractor.to_extractor_config())
        .context("Failed to build HTTP client")?;

    let state = AppState {
        db: conn,
        extractor,
        classifier: Arc::new(classifier),
        auth: config.auth,
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!("Server running on http://{}", config.server.bind);

    axum::serve(listener, linkscribe::app(state)).await?;

    Ok(())
}
