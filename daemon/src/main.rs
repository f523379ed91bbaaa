//! Agora daemon: entry point for running a node and maintaining its ledger.

mod feed;
mod outbox;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};

use agora_node::{AgoraNode, ChannelTxBuilder, NodeConfig};
use agora_rpc::{RpcServer, RpcState};
use agora_store_lmdb::LmdbEnvironment;
use agora_types::NetworkId;
use agora_utils::{format_duration, init_logging, LogFormat};

/// Named LMDB databases the ledger may open.
const MAX_DBS: u32 = 32;

#[derive(Parser)]
#[command(name = "agora-daemon", about = "Agora governance and token ledger daemon")]
struct Cli {
    /// Network to follow: "live", "test", or "dev".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "AGORA_NETWORK")]
    network: Option<NetworkId>,

    /// Data directory for the ledger database.
    #[arg(long, env = "AGORA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Do not start the RPC server.
    #[arg(long, env = "AGORA_DISABLE_RPC")]
    disable_rpc: bool,

    /// RPC server port (defaults to the network's port).
    #[arg(long, env = "AGORA_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Serve Prometheus metrics at /metrics.
    #[arg(long, env = "AGORA_ENABLE_METRICS")]
    metrics: bool,

    /// Seconds a submission may wait on the wallet.
    #[arg(long, env = "AGORA_SUBMISSION_TIMEOUT")]
    submission_timeout: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Inspect or rebuild the ledger database.
    #[command(name = "ledger")]
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
    /// Print the effective configuration as TOML.
    #[command(name = "config")]
    Config,
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Follow a chain feed and serve RPC until interrupted.
    Run {
        /// Chain feed file of JSON lines; "-" reads standard input.
        #[arg(long, default_value = "-")]
        feed: String,

        /// File that submitted payloads are appended to for the wallet.
        #[arg(long, env = "AGORA_OUTBOX")]
        outbox: Option<PathBuf>,
    },
}

#[derive(clap::Subcommand)]
enum LedgerAction {
    /// Check every database of the ledger.
    Verify,
    /// Print the digest of the committed ledger.
    Digest,
    /// Apply a chain feed to the ledger and exit.
    Replay {
        /// Chain feed file of JSON lines; "-" reads standard input.
        #[arg(long, default_value = "-")]
        feed: String,
    },
}

impl Cli {
    /// Start from the config file (or network defaults) and apply every
    /// flag that was given.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => NodeConfig::for_network(self.network.unwrap_or(NetworkId::Dev)),
        };
        if let Some(network) = self.network {
            config.set_network(network);
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if self.disable_rpc {
            config.enable_rpc = false;
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if self.metrics {
            config.enable_metrics = true;
        }
        if let Some(secs) = self.submission_timeout {
            config.submission_timeout_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

async fn open_feed(feed: &str) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if feed == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(Path::new(feed))
        .await
        .with_context(|| format!("opening chain feed {feed}"))?;
    Ok(Box::new(BufReader::new(file)))
}

async fn run_node(config: NodeConfig, feed: String, outbox_path: Option<PathBuf>) -> anyhow::Result<()> {
    let rpc_port = if config.enable_rpc {
        config.effective_rpc_port().to_string()
    } else {
        "off".to_string()
    };
    tracing::info!(
        network = config.network.as_str(),
        data_dir = %config.data_dir.display(),
        rpc = %rpc_port,
        "starting Agora node"
    );
    let mut node = AgoraNode::open(config.clone())?;

    let (builder, requests) = ChannelTxBuilder::channel(config.block_queue_capacity);
    let wallet = match outbox_path {
        Some(path) => tokio::spawn(outbox::run(path, requests, node.shutdown_signal())),
        None => {
            tracing::warn!("no outbox configured; write commands will be refused");
            let signal = node.shutdown_signal();
            tokio::spawn(async move {
                outbox::refuse(requests, signal).await;
                Ok::<(), anyhow::Error>(())
            })
        }
    };

    let rpc = if config.enable_rpc {
        let state = Arc::new(RpcState::new(&node, Arc::new(builder)));
        let server = RpcServer::new(config.effective_rpc_port());
        let signal = node.shutdown_signal();
        Some(tokio::spawn(async move { server.start(state, signal).await }))
    } else {
        None
    };

    let (blocks, mut sync) = node.start_sync();
    let reader = open_feed(&feed).await?;
    let pump = tokio::spawn(feed::pump(reader, blocks, node.shutdown_signal()));

    let started = Instant::now();
    let finished = tokio::select! {
        _ = node.shutdown_controller().wait_for_signal() => None,
        result = &mut sync => Some(result),
    };
    node.shutdown();
    let finished = match finished {
        Some(result) => result,
        None => sync.await,
    };
    match finished.context("chain sync task panicked")? {
        Ok(()) => tracing::info!("chain sync finished"),
        Err(e) => tracing::error!(error = %e, "chain sync halted"),
    }

    match pump.await.context("feed task panicked")? {
        Ok(delivered) => tracing::info!(delivered, "feed closed"),
        Err(e) => tracing::error!(error = %e, "feed failed"),
    }
    if let Some(rpc) = rpc {
        rpc.await.context("RPC task panicked")??;
    }
    wallet.await.context("outbox task panicked")??;

    let tip = node.tip().last_block();
    tracing::info!(
        height = tip.height,
        uptime = %format_duration(started.elapsed().as_secs()),
        "Agora daemon exited cleanly"
    );
    Ok(())
}

fn ledger_verify(config: &NodeConfig) -> anyhow::Result<()> {
    let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.lmdb_map_size)?;
    let report = env.integrity()?;
    println!(
        "checked {} databases, {} entries",
        report.databases_checked, report.total_entries
    );
    if !report.is_healthy() {
        for error in &report.errors {
            println!("  error: {error}");
        }
        bail!("ledger database is damaged");
    }
    println!("ledger database is healthy");
    Ok(())
}

fn ledger_digest(config: &NodeConfig) -> anyhow::Result<()> {
    let node = AgoraNode::open(config.clone())?;
    let digest = node.digest()?;
    println!("digest  {digest}");
    match digest.cursor {
        Some(cursor) => println!("cursor  height {} next tx {}", cursor.height, cursor.next_tx),
        None => println!("cursor  none (empty ledger)"),
    }
    println!("{}", serde_json::to_string_pretty(&digest.counts)?);
    Ok(())
}

async fn ledger_replay(config: NodeConfig, feed: &str) -> anyhow::Result<()> {
    let mut node = AgoraNode::open(config)?;
    let driver = node.sync_driver();
    let updates = feed::read_all(open_feed(feed).await?).await?;

    let started = Instant::now();
    let mut summary = agora_ledger::ReplaySummary::default();
    for update in updates {
        let report = driver.apply(update).await?;
        summary.record(&report);
    }
    println!(
        "replayed {} blocks ({} already applied): {} applied, {} rejected, {} malformed, {} unrecognized, {} bills finalized in {}",
        summary.blocks,
        summary.skipped_blocks,
        summary.applied,
        summary.rejected,
        summary.malformed,
        summary.unrecognized,
        summary.bills_finalized,
        format_duration(started.elapsed().as_secs()),
    );
    println!("digest  {}", node.digest()?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;
    init_logging(config.log_format, &config.log_level)?;

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run { feed, outbox } => run_node(config, feed, outbox).await,
        },
        Command::Ledger { action } => match action {
            LedgerAction::Verify => ledger_verify(&config),
            LedgerAction::Digest => ledger_digest(&config),
            LedgerAction::Replay { feed } => ledger_replay(config, &feed).await,
        },
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
