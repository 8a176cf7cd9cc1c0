//! Command-line runner for saved pipelines

mod config;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pipeline_engine::{models_for, BlockCategory, ModelScope, NodeStatus, OutputBundle};

use crate::config::{default_data_dir, RunnerConfig};
use crate::runner::{CliError, Runner};

/// Run and manage saved ad-production pipelines
#[derive(Parser)]
#[command(name = "pipeline")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory holding config.json (default: platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory of saved pipelines (overrides config)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Execute endpoint for remote dispatch (overrides config)
    #[arg(long, global = true)]
    dispatch_url: Option<String>,

    /// Maximum dispatches in flight (overrides config)
    #[arg(long, global = true)]
    max_concurrency: Option<usize>,

    /// Per-dispatch timeout in seconds, 0 for none (overrides config)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the block catalog
    Blocks,
    /// Show the model and provider pickers
    Models,
    /// List saved pipelines
    List,
    /// Check a saved pipeline for structural errors
    Validate { name: String },
    /// Run a saved pipeline once
    Run { name: String },
    /// Delete a saved pipeline
    Delete { name: String },
}

impl Cli {
    fn apply_overrides(&self, config: &mut RunnerConfig) {
        if let Some(dir) = &self.store_dir {
            config.store_dir = Some(dir.clone());
        }
        if let Some(url) = &self.dispatch_url {
            config.dispatch_url = Some(url.clone());
        }
        if let Some(max) = self.max_concurrency {
            config.max_concurrency = max;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode, CliError> {
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let mut config = RunnerConfig::load(&data_dir).await?;
    cli.apply_overrides(&mut config);
    let runner = Runner::new(&data_dir, config);

    match cli.command {
        Commands::Blocks => {
            for category in BlockCategory::ALL {
                println!("{}", category.label());
                for block in runner.catalog().by_category(category) {
                    println!(
                        "  {:<18} {:<20} {:<12} {}",
                        block.id, block.label, block.cost, block.description
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Models => {
            for (title, scope) in [
                ("Video models", ModelScope::Video),
                ("Text models", ModelScope::Llm),
                ("Scraper providers", ModelScope::Scraper),
            ] {
                println!("{}", title);
                for option in models_for(scope) {
                    println!(
                        "  {:<20} {:<18} {:<16} {:<6} {}",
                        option.id,
                        option.name,
                        option.provider,
                        option.stars(),
                        option.cost
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::List => {
            let summaries = runner.list()?;
            if summaries.is_empty() {
                println!("No saved pipelines");
            }
            for summary in summaries {
                println!(
                    "{:<24} {:>3} nodes {:>3} wires  updated {}",
                    summary.name,
                    summary.node_count,
                    summary.connection_count,
                    summary.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { name } => {
            let outcome = runner.validate(&name)?;
            println!(
                "'{}': {} nodes, {} wires, estimated cost ${:.3}",
                outcome.pipeline.name,
                outcome.pipeline.nodes.len(),
                outcome.pipeline.connections.len(),
                outcome.estimated_cost
            );
            if outcome.errors.is_empty() {
                println!("OK");
                return Ok(ExitCode::SUCCESS);
            }
            for error in &outcome.errors {
                println!("  {}", error);
            }
            Ok(ExitCode::FAILURE)
        }
        Commands::Run { name } => {
            let outcome = runner.run(&name).await?;
            for node in &outcome.pipeline.nodes {
                let detail = match outcome.report.result(&node.id) {
                    Some(output) => describe(output),
                    None if node.status == NodeStatus::Idle => "skipped".to_string(),
                    None => String::new(),
                };
                println!(
                    "{:<20} {:<18} {:<6} {}",
                    node.id,
                    node.block_id,
                    status_label(node.status),
                    detail
                );
            }
            println!(
                "{} succeeded, {} failed, {} skipped",
                outcome.report.succeeded(),
                outcome.report.failed(),
                outcome.report.skipped.len()
            );
            Ok(if outcome.report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Delete { name } => {
            if runner.delete(&name)? {
                println!("Deleted '{}'", name);
                Ok(ExitCode::SUCCESS)
            } else {
                println!("No saved pipeline named '{}'", name);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn status_label(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Idle => "idle",
        NodeStatus::Running => "run",
        NodeStatus::Done => "done",
        NodeStatus::Error => "error",
    }
}

/// One-line summary of a node's output
fn describe(output: &OutputBundle) -> String {
    if let Some(message) = output.error_message() {
        return message.to_string();
    }
    if let Some(media) = output.preview() {
        return media.url.unwrap_or_default();
    }
    let text = output
        .primary_text()
        .or_else(|| output.values.values().next().map(String::as_str))
        .unwrap_or_default();
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > 60 {
        format!("{}...", line.chars().take(60).collect::<String>())
    } else {
        line.to_string()
    }
}
