//! autopatch - replay a repository's history onto another repository
//!
//! Usage: `autopatch [--verbose] [--json] [--dry-run] [--show-graph] KEY=VALUE...`
//!
//! ## Parameters
//!
//! - `source=PATH`: repository to read history from (required)
//! - `dest=PATH`: repository to replay onto (required to replay)
//! - `branch=NAME`: replay every commit of a branch
//! - `commit=HASH` [`count=N`]: replay one commit, or N commits from it
//! - `startCommit=HASH endCommit=HASH`: replay a hash range
//! - `patchFile=PATH`: where each patch is staged
//!
//! Without a selection the discovered branch names are listed.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use autopatch_core::{
    gather_history, plan, replay, resolve_range, CommitGraph, GitCli, PatcherConfig,
};

#[derive(Parser)]
#[command(name = "autopatch")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay commits, branches and merges onto another repository", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Print the planned tasks as JSON instead of replaying them
    #[arg(long)]
    dry_run: bool,

    /// Print the reconstructed branches as JSON
    #[arg(long)]
    show_graph: bool,

    /// KEY=VALUE parameters
    #[arg(value_name = "KEY=VALUE")]
    params: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    autopatch_core::init_tracing(cli.json, level);

    let config = PatcherConfig::from_params(&cli.params).context("Invalid parameters")?;

    let source = GitCli::new(&config.source);
    let graph = gather_history(&source)
        .await
        .with_context(|| format!("Failed to read history of {}", config.source.display()))?;

    if cli.show_graph {
        println!("{}", serde_json::to_string_pretty(&graph.summary())?);
    }

    let Some(selection) = &config.selection else {
        print_branches(&graph);
        return Ok(());
    };

    let range = resolve_range(&graph, selection).context("Failed to resolve commit range")?;
    let tasks = plan(&graph, range).context("Failed to plan replay")?;
    autopatch_core::obs::emit_plan_built(range.start, range.end, tasks.len());

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    let dest_path = config.require_dest().context("Cannot replay")?;
    let dest = GitCli::new(dest_path);
    let summary = replay(&source, &dest, dest_path, &tasks, range, &config.patch_file)
        .await
        .with_context(|| format!("Replay onto {} failed", dest_path.display()))?;

    info!(
        tasks = summary.tasks_run,
        duration_ms = summary.duration_ms(),
        "replay complete"
    );
    println!("Done");
    Ok(())
}

fn print_branches(graph: &CommitGraph) {
    println!("No branch or commit selected. Branches found:");
    for name in graph.branch_names() {
        println!("  {name}");
    }
    println!("Select one with branch=NAME, commit=HASH [count=N] or startCommit=HASH endCommit=HASH");
}
