use std::fs;
use std::path::PathBuf;

use ai_client::OpenAi;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use clipsignal_common::Config;
use clipsignal_eval::dataset::{build_dataset, Dataset, DatasetOptions};
use clipsignal_eval::experiment::{run_experiments, Experiment};
use clipsignal_eval::gold::{GoldLabeler, GoldLabels};
use clipsignal_eval::report;
use clipsignal_eval::variants::select_variants;
use clipsignal_store::RestStore;

#[derive(Parser)]
#[command(name = "clipsignal-eval", about = "Offline review-prompt evaluation harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the dataset, label gold, run variants, and score them
    Run(EvalArgs),
    /// Re-run variants against previously saved dataset and gold files
    EvalOnly(EvalArgs),
}

#[derive(Args)]
struct EvalArgs {
    /// Tool slug to evaluate
    #[arg(long, default_value = "invideo-ai")]
    tool: String,

    /// Maximum number of cached-transcript videos in the dataset
    #[arg(long, default_value_t = 20)]
    videos: usize,

    #[arg(long, default_value_t = 3)]
    windows_per_video: usize,

    /// Window text cap in characters (floor of 600)
    #[arg(long, default_value_t = 1400)]
    max_window_chars: usize,

    #[arg(long, default_value = "data/review-tuning")]
    out_dir: String,

    #[arg(long, default_value = "gpt-4.1")]
    gold_model: String,

    /// Critic model for the gold pass; defaults to the gold model
    #[arg(long)]
    critic_model: Option<String>,

    #[arg(long, default_value = "gpt-4o-mini")]
    mini_model: String,

    /// Comma-separated variant ids; empty runs all variants
    #[arg(long, value_delimiter = ',')]
    variants: Vec<String>,
}

impl EvalArgs {
    fn dataset_options(&self) -> DatasetOptions {
        DatasetOptions {
            tool_slug: self.tool.clone(),
            limit_videos: self.videos.max(1),
            windows_per_video: self.windows_per_video.max(1),
            max_window_chars: self.max_window_chars.max(600),
        }
    }

    fn out_dir(&self) -> PathBuf {
        PathBuf::from(&self.out_dir).join(&self.tool)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("Failed to parse {}", path.display()))
}

fn best_metrics(experiment: &Experiment) -> serde_json::Value {
    experiment
        .variants
        .iter()
        .find(|v| Some(v.variant_id.as_str()) == experiment.best_variant.as_deref())
        .map(|v| serde_json::to_value(&v.metrics).unwrap_or(serde_json::Value::Null))
        .unwrap_or(serde_json::Value::Null)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("clipsignal=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let llm = OpenAi::new(config.require_openai());

    let (args, eval_only) = match &cli.command {
        Command::Run(args) => (args, false),
        Command::EvalOnly(args) => (args, true),
    };
    let selected_variants = select_variants(&args.variants)?;
    let base_dir = args.out_dir();
    fs::create_dir_all(&base_dir)
        .with_context(|| format!("Failed to create {}", base_dir.display()))?;
    let critic_model = args.critic_model.as_deref().unwrap_or(&args.gold_model);

    let (dataset, gold): (Dataset, GoldLabels) = if eval_only {
        (
            read_json(&base_dir.join(report::DATASET_FILE))?,
            read_json(&base_dir.join(report::GOLD_FILE))?,
        )
    } else {
        let store = RestStore::new(&config.store_url, &config.store_service_key);
        let opts = args.dataset_options();
        let dataset = build_dataset(&store, &opts).await?;
        report::write_json(&base_dir.join(report::DATASET_FILE), &dataset)?;
        if dataset.selected_video_count < opts.limit_videos {
            warn!(
                requested = opts.limit_videos,
                selected = dataset.selected_video_count,
                "Fewer videos had cached transcripts than requested"
            );
        }

        let labeler = GoldLabeler::new(config.require_openai(), &args.gold_model, critic_model);
        let gold = labeler.label(&dataset).await;
        report::write_json(&base_dir.join(report::GOLD_FILE), &gold)?;
        (dataset, gold)
    };

    let experiment =
        run_experiments(&llm, &dataset, &gold, &args.mini_model, &selected_variants).await;
    report::write_json(&base_dir.join(report::EXPERIMENTS_FILE), &experiment)?;
    report::write_markdown(
        &base_dir.join(report::SUMMARY_FILE),
        &report::render_summary(&dataset, &gold, &experiment),
    )?;

    let gold_positive = gold.windows.iter().filter(|w| !w.reviews.is_empty()).count();
    let result = json!({
        "mode": if eval_only { "eval-only" } else { "run" },
        "tool": dataset.tool,
        "dataset_videos": dataset.selected_video_count,
        "dataset_windows": dataset.window_count,
        "gold_positive_windows": gold_positive,
        "best_variant": experiment.best_variant,
        "best_metrics": best_metrics(&experiment),
        "output_dir": base_dir.display().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
