//! Bus Data Monitor - Main Entry Point
//!
//! Runs the acquisition pipeline from a channel table, decodes single frames
//! and lists the available protocol schemas.

use anyhow::{bail, Context};
use busdata_monitor::{
    backend::{ChannelManager, ManagerOptions},
    config::{self, ChannelTable, MonitorConfig},
    monitor::MonitorPoller,
    protocol::SchemaRegistry,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "busdata-monitor")]
#[command(version)]
#[command(about = "Schema-driven multi-channel bus frame monitor")]
struct Cli {
    /// Settings file (.toml or .json); defaults to the app data directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write daily rolling log files to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run producers for every configured channel and print incoming frames
    Monitor {
        /// Stop after this many seconds (runs until Ctrl-C otherwise)
        #[arg(long)]
        duration: Option<f64>,
        /// Decode each frame with its direction's schema
        #[arg(long)]
        decode: bool,
        /// Only print this channel
        #[arg(long)]
        channel: Option<String>,
    },
    /// Decode one hex frame and print it as JSON
    Decode {
        /// Schema name
        schema: String,
        /// Frame bytes as hex (separators allowed)
        hex: String,
    },
    /// List available schemas
    Schemas,
}

fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,busdata_monitor=debug"));
    let stdout_layer = fmt::layer().with_target(false);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let file_appender = tracing_appender::rolling::daily(dir, "busdata-monitor.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(Some(guard))
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(config::app_data_dir()
            .map(|dir| dir.join(config::CONFIG_FILE))
            .filter(|p| p.is_file())
            .map(|p| MonitorConfig::load_or_default(p))
            .unwrap_or_default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref())?;

    let settings = load_settings(cli.config.as_deref())?;
    let registry = Arc::new(SchemaRegistry::from_config(&settings).context("opening schemas")?);

    match cli.command {
        Commands::Schemas => {
            for name in registry.list()? {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Decode { schema, hex } => {
            let frame = registry
                .decode_hex(&schema, &hex)
                .with_context(|| format!("decoding with schema {}", schema))?;
            println!("{}", serde_json::to_string_pretty(&frame)?);
            Ok(())
        }
        Commands::Monitor {
            duration,
            decode,
            channel,
        } => run_monitor(&settings, &registry, duration, decode, channel),
    }
}

fn run_monitor(
    settings: &MonitorConfig,
    registry: &Arc<SchemaRegistry>,
    duration: Option<f64>,
    decode: bool,
    only: Option<String>,
) -> anyhow::Result<()> {
    let table_path = settings
        .channel_config_path()
        .context("no channel table path configured")?;
    let table = ChannelTable::load(&table_path)
        .with_context(|| format!("loading channel table {}", table_path.display()))?;
    if table.is_empty() {
        bail!("channel table {} has no channels", table_path.display());
    }

    let mut manager = ChannelManager::from_config(&table, registry, ManagerOptions::from(settings))?;
    let ids: Vec<String> = match &only {
        Some(id) if manager.config_for(id).is_none() => bail!("unknown channel {}", id),
        Some(id) => vec![id.clone()],
        None => manager.channel_ids(),
    };
    let mut pollers: Vec<MonitorPoller> = ids
        .iter()
        .filter_map(|id| MonitorPoller::for_channel(&manager, id))
        .map(|p| p.with_max_rows(settings.max_rows))
        .collect();

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    manager.start_all()?;
    tracing::info!("Starting bus data monitor");

    let deadline = duration.and_then(|secs| {
        let limit = Duration::try_from_secs_f64(secs.max(0.0)).ok();
        let deadline = limit.and_then(|limit| Instant::now().checked_add(limit));
        if deadline.is_none() {
            tracing::warn!(duration = secs, "Duration out of range, running until Ctrl-C");
        }
        deadline
    });
    while running.load(Ordering::SeqCst) && deadline.map_or(true, |d| Instant::now() < d) {
        std::thread::sleep(settings.refresh_interval());
        for poller in &mut pollers {
            let drained = poller.poll();
            let len = poller.rows().len();
            for index in len.saturating_sub(drained)..len {
                print_row(poller, index, decode, registry);
            }
        }
    }

    tracing::info!("Shutting down...");
    manager.stop_all();
    for id in manager.channel_ids() {
        for (direction, stats) in manager.stats_for(&id) {
            tracing::info!(
                channel = %id,
                direction = %direction,
                produced = stats.produced,
                dropped = stats.dropped,
                failed = stats.failed,
                "Channel summary"
            );
        }
    }
    Ok(())
}

fn print_row(poller: &MonitorPoller, index: usize, decode: bool, registry: &SchemaRegistry) {
    let Some(row) = poller.row(index) else {
        return;
    };
    if !decode {
        println!("[{}] {}", poller.channel_id(), row);
        return;
    }
    match poller.inspect(index, registry) {
        Ok(Some(frame)) => {
            let fields: Vec<String> = frame.iter().map(|(n, v)| format!("{}={}", n, v)).collect();
            println!("[{}] {}  {}", poller.channel_id(), row, fields.join(" "));
        }
        Ok(None) => {}
        Err(e) => println!("[{}] {}  <{}>", poller.channel_id(), row, e),
    }
}
