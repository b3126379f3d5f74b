mod script;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use sketch_history::{HistoryBuffer, HistoryConfig};

/// Replays undo/redo scripts against a checkpointed history of integer layers.
///
/// Layers are summed by the combiner. Each command prints one result line.
#[derive(Parser, Debug)]
#[command(name = "sketch-history", version, about)]
struct Cli {
    /// Layers between checkpoints. Overrides the config file.
    #[arg(long)]
    gap: Option<usize>,

    /// JSON file with `checkpoint_gap` and `max_count`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Script file with one command per line.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Commands to run after the script, e.g. `push 3` `undo` `reduce`.
    commands: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => HistoryConfig::load_or_default(path),
        None => HistoryConfig::default(),
    };
    if let Some(gap) = cli.gap {
        config.checkpoint_gap = gap;
    }
    config.validate().context("invalid history configuration")?;

    let mut commands = match &cli.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script: {}", path.display()))?;
            script::parse_script(&text)
                .with_context(|| format!("Failed to parse script: {}", path.display()))?
        }
        None => Vec::new(),
    };
    commands.extend(script::parse_args(&cli.commands)?);
    if commands.is_empty() {
        bail!("no commands given; pass a --script file or commands as arguments");
    }

    tracing::info!(
        gap = config.checkpoint_gap,
        commands = commands.len(),
        "Replaying history script"
    );

    let mut buffer = HistoryBuffer::with_config(config, script::sum_layers);
    for line in script::run(&mut buffer, &commands)? {
        println!("{line}");
    }

    tracing::debug!(?buffer, "Replay finished");
    Ok(())
}
