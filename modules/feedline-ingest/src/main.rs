use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use feedline_common::config::load_config;
use feedline_common::telemetry::init_tracing;
use feedline_common::DedupConfig;
use feedline_ingest::{parse_feed, DuplicateResolver, IngestPipeline, PgContentStore};

#[derive(Parser)]
#[command(name = "feedline", about = "Normalize and deduplicate creator content")]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Optional TOML config; FEEDLINE_* env vars are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the embedded migrations
    Migrate,
    /// Ingest a JSON array of raw platform payloads
    Ingest {
        #[arg(long)]
        creator: String,
        #[arg(long)]
        platform: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        source_url: Option<String>,
    },
    /// Ingest every entry of an RSS, Atom or JSON feed document
    IngestFeed {
        #[arg(long)]
        creator: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        source_url: Option<String>,
    },
    /// List the members of a duplicate group
    Group { group_id: Uuid },
    /// Make a record the primary of its duplicate group
    SetPrimary {
        #[arg(long)]
        group: Uuid,
        #[arg(long)]
        record: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DedupConfig::from_env()?,
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections())
        .connect(&cli.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    let store = Arc::new(PgContentStore::new(pool));

    match cli.command {
        Command::Migrate => {
            store.migrate().await?;
            tracing::info!("Migrations complete");
        }
        Command::Ingest {
            creator,
            platform,
            file,
            source_url,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let items: Vec<serde_json::Value> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of items", file.display()))?;

            let pipeline = IngestPipeline::new(store, config);
            let summary = pipeline
                .run_batch(&creator, &platform, items, source_url.as_deref())
                .await;
            println!("{summary}");
        }
        Command::IngestFeed {
            creator,
            file,
            source_url,
        } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let items = parse_feed(&bytes)?
                .into_iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;

            let pipeline = IngestPipeline::new(store, config);
            let summary = pipeline
                .run_batch(&creator, "rss", items, source_url.as_deref())
                .await;
            println!("{summary}");
        }
        Command::Group { group_id } => {
            let resolver = DuplicateResolver::new(store, config);
            for record in resolver.group_members(group_id).await? {
                println!(
                    "{} {} {:<8} {} {}",
                    if record.is_primary { "*" } else { " " },
                    record.id,
                    record.platform().as_str(),
                    record.published_at().to_rfc3339(),
                    record.content.url.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::SetPrimary { group, record } => {
            let resolver = DuplicateResolver::new(store, config);
            resolver.override_primary(group, record).await?;
            println!("{record} is now primary of {group}");
        }
    }

    Ok(())
}
