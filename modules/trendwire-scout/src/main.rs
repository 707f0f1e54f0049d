use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trendwire_common::{Config, PipelineConfig};
use trendwire_scout::enrichment::NewsApiEnrichment;
use trendwire_scout::{build_gateway, lifecycle, sources, JsonFileStore, Pipeline, RunLog};

#[derive(Parser)]
#[command(name = "trendwire", about = "Trend discovery and campaign ideation")]
#[command(version)]
struct Cli {
    /// Override DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, classify, enrich, score and generate ideas (default)
    Run,
    /// Decay scores of ageing active trends
    Decay,
    /// Archive trends past the retention window
    Archive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("trendwire=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    config.log_redacted();
    let pipeline_config = PipelineConfig::from_env()?;

    let store = Arc::new(JsonFileStore::open(config.data_dir.join("trendwire"))?);
    let now = Utc::now();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let pipeline = Pipeline::builder()
                .collectors(sources::live_collectors(&config)?)
                .store(store)
                .enrichment(Arc::new(NewsApiEnrichment::new(config.news_api_key.clone())?))
                .gateway(Arc::new(build_gateway(&config)))
                .config(pipeline_config)
                .build();

            let mut log = RunLog::new(uuid::Uuid::new_v4().to_string());
            let stats = pipeline.run(now, &mut log).await?;
            log.save(&config.data_dir, &stats)?;
            println!("{stats}");
        }
        Commands::Decay => {
            let decayed = lifecycle::apply_decay(store.as_ref(), &pipeline_config, now).await?;
            info!(decayed, "Decay complete");
        }
        Commands::Archive => {
            let archived = lifecycle::archive_expired(store.as_ref(), &pipeline_config, now).await?;
            info!(archived, "Archive complete");
        }
    }

    Ok(())
}
