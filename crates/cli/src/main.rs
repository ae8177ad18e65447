//! `bootstrap` CLI — run the tiered bootstrap engine against a workspace and
//! print its final status.

use bootstrap_core::{BootstrapConfig, BootstrapEngine, InMemoryBackend, Tier};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bootstrap", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bootstrap engine over a workspace
    Run {
        /// Project root (default: current directory)
        root: Option<PathBuf>,

        /// Glob patterns to include (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Glob patterns to exclude (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Maximum file size in bytes considered for discovery
        #[arg(long)]
        max_file_size: Option<u64>,

        /// Tier 0 (discovery) deadline in milliseconds
        #[arg(long)]
        tier0_deadline_ms: Option<u64>,

        /// Tier 1 (extraction) deadline in milliseconds
        #[arg(long)]
        tier1_deadline_ms: Option<u64>,
    },
}

fn resolve_root(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| std::env::current_dir().expect("could not determine current directory"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("bootstrap_core=warn".parse().unwrap()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { root, include, exclude, max_file_size, tier0_deadline_ms, tier1_deadline_ms } => {
            let root = resolve_root(root);

            let mut config = match BootstrapConfig::load(&root) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("invalid config: {e}");
                    std::process::exit(1);
                }
            };
            if !include.is_empty() {
                config = config.with_include_patterns(include);
            }
            if !exclude.is_empty() {
                config = config.with_exclude_patterns(exclude);
            }
            if let Some(bytes) = max_file_size {
                config = config.with_max_file_size_bytes(bytes);
            }
            if let Some(ms) = tier0_deadline_ms {
                config = config.with_tier0_deadline_ms(ms);
            }
            if let Some(ms) = tier1_deadline_ms {
                config = config.with_tier1_deadline_ms(ms);
            }

            let json_mode = cli.json;
            config = config.with_on_tier_complete(Arc::new(move |tier, stats| {
                if !json_mode {
                    eprintln!("[{}] {} files in {}ms", tier.label(), stats.files_processed, stats.duration_ms);
                }
            }));

            let backend = Arc::new(InMemoryBackend::new());
            let engine = BootstrapEngine::new(config, backend.clone());

            if let Err(e) = engine.start().await {
                eprintln!("bootstrap failed: {e}");
                std::process::exit(1);
            }

            let status = engine.get_status().await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status).unwrap());
            } else {
                println!("Tier:        {}", status.current_tier.label());
                println!("Complete:    {}", status.is_complete);
                println!("Files:       {}", backend.file_count());
                println!("Directories: {}", backend.directory_count());
                println!("Features:");
                for feature in &status.enabled_features {
                    println!("  - {feature:?}");
                }
                if status.current_tier != Tier::Full {
                    eprintln!("\nbootstrap stopped before completion (deadline or abort)");
                }
            }
        }
    }
}
