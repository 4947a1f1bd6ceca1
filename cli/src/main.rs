//! Command-line harness for the overlay engine: runs synchronization rounds
//! against the real feature services with a scripted viewport.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use roadlens_core::MapHost;
use roadlens_core::Orchestrator;
use roadlens_core::PartitionRegistry;
use roadlens_core::SCRIPT_VERSION;
use roadlens_core::query::SpatialQueryClient;
use roadlens_core::registry::Permission;
use roadlens_core::settings::SettingsStore;
use roadlens_protocol::Envelope;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roadlens", about = "Road-type overlay synchronization engine")]
struct Cli {
    /// Verbose logging (overrides RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in partition registry.
    Partitions,
    /// Run one synchronization round for a scripted viewport.
    Sync(SyncArgs),
}

#[derive(clap::Args)]
struct SyncArgs {
    /// Viewport zoom level.
    #[arg(long, default_value_t = 16)]
    zoom: u32,

    /// Viewport extent as `xmin,ymin,xmax,ymax` (Web Mercator).
    #[arg(long, value_parser = parse_extent)]
    extent: Envelope,

    /// Restrict to a single state abbreviation.
    #[arg(long)]
    state: Option<String>,

    /// Editor rank used for partition permission checks.
    #[arg(long, default_value_t = 6)]
    rank: u32,

    /// Directory holding the persisted settings blob.
    #[arg(long, default_value = ".")]
    settings_dir: PathBuf,
}

struct ScriptedHost {
    zoom: u32,
    extent: Envelope,
    rank: u32,
}

impl MapHost for ScriptedHost {
    fn zoom(&self) -> u32 {
        self.zoom
    }

    fn extent(&self) -> Envelope {
        self.extent
    }

    fn editor_rank(&self) -> u32 {
        self.rank
    }
}

fn parse_extent(raw: &str) -> Result<Envelope, String> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|err| format!("invalid extent: {err}"))?;
    match parts.as_slice() {
        [xmin, ymin, xmax, ymax] => Ok(Envelope::new(*xmin, *ymin, *xmax, *ymax)),
        _ => Err("extent needs exactly four comma-separated values".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Partitions => list_partitions(),
        Command::Sync(args) => run_sync(args).await,
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn list_partitions() -> Result<()> {
    let registry = PartitionRegistry::builtin();
    for partition in registry.partitions() {
        let rank = match partition.permission {
            Permission::Everyone => "any rank".to_string(),
            Permission::MinRank(min) => format!("rank {min}+"),
        };
        println!("{}  {} ({rank})", partition.code, partition.base_url);
        for layer in &partition.layers {
            println!(
                "    layer {}: type field {}, page size {}{}",
                layer.id,
                layer.road_type_field,
                layer.max_page_size,
                if layer.supports_pagination {
                    ""
                } else {
                    ", unpaged"
                }
            );
        }
    }
    Ok(())
}

async fn run_sync(args: SyncArgs) -> Result<()> {
    let store = SettingsStore::new(&args.settings_dir);
    let mut settings = store.load();
    settings.last_version = SCRIPT_VERSION.to_string();
    if args.state.is_some() {
        settings.active_state_abbr = args.state;
    }
    store.save(&settings)?;

    let host = Arc::new(ScriptedHost {
        zoom: args.zoom,
        extent: args.extent,
        rank: args.rank,
    });
    let orchestrator = Orchestrator::new(
        PartitionRegistry::builtin(),
        SpatialQueryClient::new(),
        host,
        settings,
    );

    info!(zoom = args.zoom, "starting sync round");
    orchestrator.trigger_sync().await;

    let overlay = orchestrator.overlay();
    let overlay = overlay.lock().await;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for vector in overlay.vectors() {
        *counts.entry(vector.partition.as_str()).or_default() += 1;
    }
    if counts.is_empty() {
        println!("no road-type vectors in extent");
    }
    for (partition, count) in counts {
        println!("{partition}: {count} vectors");
    }
    let status = orchestrator.status().text();
    if !status.is_empty() {
        println!("status: {status}");
    }
    Ok(())
}
