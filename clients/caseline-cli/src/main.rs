//! CLI client for building case timelines from query-result batches.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use caseline_core::{QueryBatch, TimelineBuilder, TimelineConfig, TimelineEvent};

/// Caseline — ordered, deduplicated, citation-annotated security timelines.
#[derive(Parser, Debug)]
#[command(name = "caseline", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a timeline from query-result batches.
    Build {
        /// JSON file with an array of `{query_id, source_detections,
        /// events}` batches, or `-` for stdin.
        #[arg(short, long)]
        input: PathBuf,

        /// Case identifier recorded in every citation.
        #[arg(long)]
        case_id: String,

        /// Override the deduplication window, in seconds.
        #[arg(long)]
        window: Option<i64>,

        /// Emit only the summary, not the full timeline.
        #[arg(long)]
        summary_only: bool,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Recompute summary statistics for a previously built timeline.
    Summarize {
        /// JSON file with a timeline array, or `-` for stdin.
        #[arg(short, long)]
        input: PathBuf,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => TimelineConfig::load(path)?,
        None => TimelineConfig::default(),
    };

    match cli.command {
        Commands::Build {
            input,
            case_id,
            window,
            summary_only,
            pretty,
        } => {
            if let Some(window) = window {
                config.dedup_window_seconds = window;
            }
            let batches: Vec<QueryBatch> = serde_json::from_str(&read_input(&input)?)
                .context("parsing query-result batches")?;

            let builder = TimelineBuilder::new(config);
            let timeline = builder.build(&batches, &case_id, Vec::new());
            let summary = builder.summarize(&timeline);

            let output = if summary_only {
                serde_json::to_value(&summary)?
            } else {
                serde_json::json!({ "timeline": timeline, "summary": summary })
            };
            print_json(&output, pretty)
        }
        Commands::Summarize { input, pretty } => {
            let timeline: Vec<TimelineEvent> =
                serde_json::from_str(&read_input(&input)?).context("parsing timeline")?;

            let builder = TimelineBuilder::new(config);
            let summary = builder.summarize(&timeline);
            print_json(&serde_json::to_value(&summary)?, pretty)
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
