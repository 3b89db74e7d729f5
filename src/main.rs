use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_monkey_lib::data_source::SqliteDataSource;
use event_monkey_lib::db::ConnectionPool;
use event_monkey_lib::{AppConfig, EventManager, SearchRequest, SourceKind};

#[derive(Parser)]
#[command(
    name = "event-monkey",
    about = "Search events across the local store and the remote catalog"
)]
struct Cli {
    /// Config file to read instead of the one in the data directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a search and print the matching events as JSON.
    Search(SearchArgs),
    /// Insert sample events into an empty local store.
    Seed,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long, default_value = "composite")]
    source: SourceKind,
    #[arg(long)]
    event_id: Option<String>,
    /// Comma-separated genre names.
    #[arg(long)]
    classification: Option<String>,
    /// Comma-separated genre names.
    #[arg(long)]
    segment: Option<String>,
    #[arg(long)]
    organizer_id: Option<i64>,
    #[arg(long)]
    keyword: Option<String>,
    #[arg(long)]
    limit: Option<usize>,
}

impl From<SearchArgs> for SearchRequest {
    fn from(args: SearchArgs) -> Self {
        SearchRequest {
            source: args.source,
            event_id: args.event_id,
            classification: args.classification,
            segment: args.segment,
            organizer_id: args.organizer_id,
            keyword: args.keyword,
            limit: args.limit,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,event_monkey_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("failed to load config")?;

    match cli.command {
        Command::Search(args) => {
            let manager = EventManager::from_config(&config).context("failed to set up sources")?;
            let request = SearchRequest::from(args);
            let events = manager.search(&request).await.context("search failed")?;
            tracing::info!(results = events.len(), source = %request.source, "search complete");
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Command::Seed => {
            let pool = ConnectionPool::open(&config.database_path(), config.pool_size)
                .context("failed to open event store")?;
            let inserted = SqliteDataSource::new(pool)
                .seed_if_empty()
                .await
                .context("failed to seed event store")?;
            if inserted == 0 {
                tracing::info!("event store already has events; nothing seeded");
            } else {
                tracing::info!(inserted, "seeded event store");
            }
        }
    }
    Ok(())
}
