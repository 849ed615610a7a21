use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tagsync_compile::{CompilationBuilder, CompileOptions, FfmpegTranscoder};
use tagsync_core::{
    CacheMode, CatalogGateway, Endpoint, Phase, ReconcileEngine, RunContext, SyncConfig,
    SyncError, TagCache,
};
use tagsync_observability::{emit_event, init_process_logging, RunEvent};
use tagsync_stash::{
    fetch_compilation_markers, graphql_endpoint, GraphQlClient, StashAppClient, StashBoxClient,
    StashError,
};
use tagsync_types::RemoteTag;
use tracing::{error, info};

const LOG_RETENTION_DAYS: u64 = 14;
const EXIT_FAILURE: u8 = 1;
const EXIT_STARTUP: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "tagsync")]
#[command(about = "Keep a stash tag taxonomy in line with a stash-box instance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile local tags with the remote taxonomy.
    Sync {
        /// Refetch the remote tag list even if the cache looks current.
        #[arg(long, default_value_t = false)]
        refresh: bool,
        /// Use the cached remote tag list without contacting stash-box.
        #[arg(long, default_value_t = false, conflicts_with = "refresh")]
        offline: bool,
        #[arg(long)]
        state_dir: Option<String>,
        /// Run only these phases (still in create, alias, merge, update order).
        #[arg(long = "phase")]
        phases: Vec<Phase>,
    },
    /// Refresh the cached remote tag list.
    FetchTags {
        #[arg(long)]
        state_dir: Option<String>,
    },
    /// List local tags used by scene markers, most used first.
    Tags,
    /// Cut clips for markers with the given primary tags and join them.
    Compile {
        #[arg(long = "tag", required = true)]
        tags: Vec<String>,
        /// Clip length in seconds.
        #[arg(long, default_value_t = 20)]
        duration: u32,
        #[arg(long, default_value_t = false)]
        force_new: bool,
        #[arg(long, default_value_t = false)]
        shuffle: bool,
        #[arg(long, env = "TAGSYNC_CLIP_DIR")]
        clip_dir: PathBuf,
    },
}

impl Command {
    fn state_dir(&self) -> Option<&str> {
        match self {
            Command::Sync { state_dir, .. } | Command::FetchTags { state_dir } => {
                state_dir.as_deref()
            }
            Command::Tags | Command::Compile { .. } => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Sync { .. } => "sync",
            Command::FetchTags { .. } => "fetch-tags",
            Command::Tags => "tags",
            Command::Compile { .. } => "compile",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.command.state_dir()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("tagsync: {err:#}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };
    let (_log_guard, log_info) = match init_process_logging(&config.logs_dir(), LOG_RETENTION_DAYS)
    {
        Ok(logging) => logging,
        Err(err) => {
            eprintln!("tagsync: failed to initialize logging: {err:#}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };
    emit_event(
        tracing::Level::INFO,
        RunEvent {
            event: "logging.initialized",
            component: "tagsync.main",
            run_id: None,
            status: Some("ok"),
            detail: Some(cli.command.name()),
        },
    );
    info!("logging initialized: {:?}", log_info);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("tagsync failed: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn load_config(state_dir: Option<&str>) -> anyhow::Result<SyncConfig> {
    let mut config = SyncConfig::load()?;
    if let Some(dir) = state_dir.filter(|d| !d.trim().is_empty()) {
        config.state_dir = PathBuf::from(dir);
    }
    Ok(config)
}

/// Fatal catalog aborts and failed work exit with 1; anything that stops a
/// command before it can start exits with 2.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(sync) = err.downcast_ref::<SyncError>() {
        return match sync {
            SyncError::Config(_) => EXIT_STARTUP,
            _ => EXIT_FAILURE,
        };
    }
    match err.downcast_ref::<StashError>() {
        Some(StashError::InvalidEndpoint(_)) => EXIT_STARTUP,
        _ => EXIT_FAILURE,
    }
}

async fn run(command: Command, config: &SyncConfig) -> anyhow::Result<()> {
    match command {
        Command::Sync {
            refresh,
            offline,
            phases,
            ..
        } => {
            let mode = match (refresh, offline) {
                (true, _) => CacheMode::Refresh,
                (_, true) => CacheMode::Offline,
                _ => CacheMode::Auto,
            };
            sync(config, mode, phases).await
        }
        Command::FetchTags { .. } => {
            let tags = remote_tags(config, CacheMode::Refresh).await?;
            println!(
                "cached {} remote tags in {}",
                tags.len(),
                config.cache_path().display()
            );
            Ok(())
        }
        Command::Tags => {
            let catalog = stashapp_client(config)?;
            for usage in catalog.marker_tag_counts().await? {
                println!("{:>6}  {} ({})", usage.marker_count, usage.name, usage.id);
            }
            Ok(())
        }
        Command::Compile {
            tags,
            duration,
            force_new,
            shuffle,
            clip_dir,
        } => {
            let catalog = stashapp_client(config)?;
            let markers = fetch_compilation_markers(catalog.graphql(), &tags).await?;
            info!(markers = markers.len(), tags = ?tags, "building compilation");
            let builder = CompilationBuilder::new(FfmpegTranscoder::default());
            let options = CompileOptions {
                clip_duration: duration,
                force_new,
                shuffle,
                clip_dir,
            };
            let compilation = builder.build(markers, &options).await?;
            println!(
                "{} ({} clips, {} new)",
                compilation.output.display(),
                compilation.clips.len(),
                compilation.created
            );
            Ok(())
        }
    }
}

async fn sync(config: &SyncConfig, mode: CacheMode, phases: Vec<Phase>) -> anyhow::Result<()> {
    let stashapp = config.require_stashapp()?;
    let remote_tags = remote_tags(config, mode).await?;
    let catalog = Arc::new(StashAppClient::new(graphql_client(stashapp)?));
    let engine = ReconcileEngine::new(CatalogGateway::new(catalog, config.gateway));
    let phases = if phases.is_empty() {
        Phase::ALL.to_vec()
    } else {
        phases
    };

    let mut ctx = RunContext::new();
    info!(
        run_id = %ctx.run_id,
        remote_tags = remote_tags.len(),
        catalog = %stashapp.describe(),
        phases = ?phases,
        "starting reconciliation"
    );
    engine.run_phases(&mut ctx, &remote_tags, &phases).await?;
    info!(
        run_id = %ctx.run_id,
        mutations = ctx.stats.mutations(),
        elapsed_ms = ctx.elapsed_ms() as u64,
        "reconciliation finished"
    );
    Ok(())
}

async fn remote_tags(
    config: &SyncConfig,
    mode: CacheMode,
) -> anyhow::Result<Vec<RemoteTag>> {
    let cache = TagCache::new(config.cache_path());
    if mode == CacheMode::Offline {
        return Ok(cache.load_offline().await?);
    }
    let source = StashBoxClient::new(graphql_client(config.require_stashbox()?)?);
    let tags = cache
        .load_or_refresh(&source, mode, config.page_delay)
        .await?;
    Ok(tags)
}

fn stashapp_client(config: &SyncConfig) -> anyhow::Result<StashAppClient> {
    Ok(StashAppClient::new(graphql_client(config.require_stashapp()?)?))
}

fn graphql_client(endpoint: &Endpoint) -> anyhow::Result<GraphQlClient> {
    GraphQlClient::new(graphql_endpoint(&endpoint.url), endpoint.api_key.clone())
        .with_context(|| format!("invalid endpoint {}", endpoint.describe()))
}
