mod seed;
mod serve;
mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lantern_core::EngineConfig;
use lantern_store::MessageStore;

#[derive(Parser)]
#[command(name = "lantern", about = "Message traversal engine CLI and HTTP/SSE server")]
struct Cli {
    /// Override the database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the traversal over HTTP/SSE for the exhibition renderer
    Serve {
        /// Listen address (port 0 picks a free port)
        #[arg(long, default_value = "127.0.0.1:7878")]
        listen: String,

        /// Override how long each cluster is shown
        #[arg(long)]
        cluster_duration_ms: Option<u64>,

        /// Override the new-submission polling interval
        #[arg(long)]
        polling_interval_ms: Option<u64>,
    },

    /// Populate the store with sample remembrance messages
    Seed {
        /// Number of messages to insert
        #[arg(long, default_value_t = 48)]
        count: usize,

        /// RNG seed for timestamp jitter
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Insert a message locally, or POST it to a running server
    Submit {
        /// Message text (1-280 chars after trimming)
        content: String,

        /// Server base URL; omit to write to the local store
        #[arg(long)]
        url: Option<String>,
    },

    /// Show store counts, or live engine stats with --url
    Stats {
        /// Server base URL; omit for local store counts
        #[arg(long)]
        url: Option<String>,
    },

    /// Stream and pretty-print traversal events from a running server
    Watch {
        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:7878")]
        url: String,
    },
}

fn db_path(cli: &Cli) -> PathBuf {
    cli.db
        .clone()
        .unwrap_or_else(|| lantern_store::default_base_dir().join("messages.db"))
}

fn open_store(cli: &Cli) -> Result<MessageStore> {
    let path = db_path(cli);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    MessageStore::open(&path)
        .map_err(|e| anyhow::anyhow!("failed to open store at {}: {e}", path.display()))
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve {
            listen,
            cluster_duration_ms,
            polling_interval_ms,
        } => cmd_serve(&cli, listen, *cluster_duration_ms, *polling_interval_ms).await,
        Commands::Seed { count, seed } => cmd_seed(&cli, *count, *seed),
        Commands::Submit { content, url } => match url {
            Some(url) => cmd_submit_remote(url, content).await,
            None => cmd_submit_local(&cli, content),
        },
        Commands::Stats { url } => match url {
            Some(url) => cmd_stats_remote(url).await,
            None => cmd_stats_local(&cli),
        },
        Commands::Watch { url } => watch::run(url).await,
    }
}

async fn cmd_serve(
    cli: &Cli,
    listen: &str,
    cluster_duration_ms: Option<u64>,
    polling_interval_ms: Option<u64>,
) -> Result<()> {
    let store = open_store(cli)?;
    let mut config = load_config(cli)?;
    if let Some(ms) = cluster_duration_ms {
        config.cluster_duration_ms = ms;
    }
    if let Some(ms) = polling_interval_ms {
        config.polling_interval_ms = ms;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    serve::run(store, config, listen).await
}

fn cmd_seed(cli: &Cli, count: usize, seed: u64) -> Result<()> {
    let store = open_store(cli)?;
    seed::run(&store, count, seed)
}

fn cmd_submit_local(cli: &Cli, content: &str) -> Result<()> {
    let store = open_store(cli)?;
    let message = store
        .insert(content)
        .map_err(|e| anyhow::anyhow!("submission rejected: {e}"))?;
    println!("submitted message {} ({} chars)", message.id, message.char_len());
    Ok(())
}

async fn cmd_submit_remote(url: &str, content: &str) -> Result<()> {
    let endpoint = format!("{}/submit", url.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&endpoint)
        .json(&serde_json::json!({ "content": content }))
        .send()
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?;

    if response.status() == reqwest::StatusCode::CREATED {
        let message: lantern_core::Message =
            response.json().await.context("invalid response body")?;
        println!("submitted message {}", message.id);
        Ok(())
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("server rejected submission ({status}): {body}")
    }
}

fn cmd_stats_local(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let visible = store
        .count_visible()
        .map_err(|e| anyhow::anyhow!("failed to count messages: {e}"))?;
    let max_id = store
        .max_id()
        .map_err(|e| anyhow::anyhow!("failed to read max id: {e}"))?;

    println!("db:       {}", db_path(cli).display());
    println!("visible:  {visible}");
    println!("max id:   {max_id}");
    Ok(())
}

async fn cmd_stats_remote(url: &str) -> Result<()> {
    let endpoint = format!("{}/stats", url.trim_end_matches('/'));
    let stats: serde_json::Value = reqwest::get(&endpoint)
        .await
        .with_context(|| format!("failed to reach {endpoint}"))?
        .error_for_status()
        .context("stats request failed")?
        .json()
        .await
        .context("invalid stats body")?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
