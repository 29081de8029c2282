use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stemcast_server::channels::{ChannelRegistry, MediaDirs};
use stemcast_server::config::{AppConfig, CliConfig, FileConfig};
use stemcast_server::dispatch::{BatchScheduler, FailureLog, TrackDispatcher};
use stemcast_server::media::{
    FfmpegPreparer, FfmpegStillRenderer, FfmpegTagger, HttpThumbnailFetcher, YtDlpFetcher,
};
use stemcast_server::progress::ProgressStore;
use stemcast_server::providers::{HttpTrackInfoProvider, TrackInfoProvider};
use stemcast_server::publish::{DryRunPublisher, PinQueue, PublishPipeline};
use stemcast_server::server::{run_server, ServerState};
use stemcast_server::stems::{DemucsTool, SeparationEngine, StemValidator, SymphoniaProbe};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Working directory for downloaded audio, stems, videos, and logs.
    #[clap(value_parser = parse_path)]
    pub work_dir: PathBuf,

    /// Path to an optional TOML config file; values there override CLI args.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3004)]
    pub port: u16,

    /// Base URL of the track metadata service.
    #[clap(long)]
    pub metadata_url: Option<String>,

    /// Timeout in seconds for metadata requests.
    #[clap(long, default_value_t = 300)]
    pub metadata_timeout_sec: u64,

    /// Default separation device ("cpu" or "cuda:0").
    #[clap(long, default_value = "cpu")]
    pub device: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        work_dir: Some(cli_args.work_dir),
        port: cli_args.port,
        metadata_url: cli_args.metadata_url,
        metadata_timeout_sec: cli_args.metadata_timeout_sec,
        device: cli_args.device,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    for dir in [
        config.audio_dir(),
        config.prep_dir(),
        config.stems_root(),
        config.fail_log_dir(),
        config.thumbs_dir(),
        config.video_dir(),
        config.library_dir(),
    ] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }

    let progress = Arc::new(ProgressStore::new());
    let fail_log = Arc::new(FailureLog::new(config.fail_log_dir()));

    let validator = Arc::new(StemValidator::new(
        config.separation.validator.clone(),
        Arc::new(SymphoniaProbe),
    ));
    let engine = Arc::new(SeparationEngine::new(
        config.separation.models.clone(),
        Arc::new(DemucsTool::new(config.stems_root())),
        validator,
        progress.clone(),
    ));

    let publish = Arc::new(PublishPipeline::new(
        Arc::new(DryRunPublisher),
        PinQueue::new(config.pin_queue_path()),
    ));
    let registry = Arc::new(ChannelRegistry::from_specs(
        config.channels.clone(),
        MediaDirs {
            library_root: config.library_dir(),
            video_root: config.video_dir(),
            thumbs_root: config.thumbs_dir(),
        },
        Arc::new(HttpThumbnailFetcher::new()),
        Arc::new(FfmpegTagger),
        Arc::new(FfmpegStillRenderer),
        publish,
        progress.clone(),
    ));

    let track_info: Arc<dyn TrackInfoProvider> = match &config.metadata_url {
        Some(url) => Arc::new(HttpTrackInfoProvider::new(
            url.clone(),
            config.metadata_timeout_sec,
        )),
        None => {
            anyhow::bail!("--metadata-url (or metadata_url in the config file) is required")
        }
    };

    let dispatcher = Arc::new(TrackDispatcher::new(
        progress.clone(),
        fail_log.clone(),
        track_info,
        Arc::new(YtDlpFetcher::new(config.audio_dir())),
        Arc::new(FfmpegPreparer::new(config.separation.min_prepared_bytes)),
        engine,
        registry.clone(),
        config.prep_dir(),
    ));
    let scheduler = Arc::new(BatchScheduler::new(
        dispatcher,
        progress.clone(),
        fail_log.clone(),
    ));

    let state = ServerState {
        scheduler,
        progress,
        fail_log,
        registry,
        default_max_concurrent: config.scheduler.default_max_concurrent,
        default_device: config.device.clone(),
    };

    let shutdown = CancellationToken::new();
    let shutdown_handle = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown_handle.cancel();
        }
    });

    run_server(state, config.port, shutdown).await
}
