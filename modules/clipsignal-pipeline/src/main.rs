use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clipsignal_common::Config;
use clipsignal_pipeline::workflows;
use clipsignal_pipeline::{PipelineRequest, RunSummary};
use clipsignal_store::RestStore;

#[derive(Parser)]
#[command(name = "clipsignal-pipeline", about = "Video deal and review ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search YouTube for tool review/tutorial videos and record mentions
    Discover(TaskArgs),
    /// Extract deals from descriptions of mentioned videos
    ExtractDeals(TaskArgs),
    /// Extract review snippets from video transcripts
    ExtractReviews(TaskArgs),
    /// Refresh per-tool aggregates and deactivate stale deals
    Maintenance(TaskArgs),
}

#[derive(Args)]
struct TaskArgs {
    /// Tool id or slug; repeat to scope multiple tools
    #[arg(long = "tool", value_name = "ID_OR_SLUG")]
    tools: Vec<String>,

    #[arg(long)]
    limit_tools: Option<u32>,

    #[arg(long)]
    limit_videos_per_tool: Option<u32>,

    /// Count what would be written without touching the store
    #[arg(long)]
    dry_run: bool,

    /// Deals older than this many days get deactivated (maintenance only)
    #[arg(long)]
    stale_days: Option<u32>,

    /// Revisit videos that already have a processed_at stamp
    #[arg(long)]
    reprocess_videos: bool,

    /// Never fetch transcripts; unseen videos are marked missing
    #[arg(long)]
    cache_only: bool,
}

impl From<&TaskArgs> for PipelineRequest {
    fn from(args: &TaskArgs) -> Self {
        PipelineRequest {
            tool_ids: args.tools.clone(),
            limit_tools: args.limit_tools,
            limit_videos_per_tool: args.limit_videos_per_tool,
            dry_run: args.dry_run,
            stale_days: args.stale_days,
            reprocess_videos: args.reprocess_videos,
            cache_only: args.cache_only,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("clipsignal=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = RestStore::new(&config.store_url, &config.store_service_key);

    let summary: RunSummary = match &cli.command {
        Command::Discover(args) => {
            workflows::discover::run(&config, &store, &args.into()).await
        }
        Command::ExtractDeals(args) => {
            workflows::extract_deals::run(&config, &store, &args.into()).await
        }
        Command::ExtractReviews(args) => {
            workflows::extract_reviews::run(&config, &store, &args.into()).await
        }
        Command::Maintenance(args) => {
            workflows::maintenance::run(&config, &store, &args.into()).await
        }
    };

    info!(
        task = %summary.task,
        ok = summary.ok,
        duration_ms = summary.duration_ms,
        "Run finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.ok {
        std::process::exit(1);
    }
    Ok(())
}
