//! Application wiring for the ingestion watcher.

use std::fs;
use std::sync::Arc;

use pictor_config::{PipelineConfig, load_config};
use pictor_events::EventBus;
use pictor_ingest::{AnalyzerCommand, FsCreationWatch, IngestService};
use pictor_telemetry::{GlobalContextGuard, LoggingConfig, Metrics};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Environment variable naming the configuration document.
const CONFIG_ENV: &str = "PICTOR_CONFIG";

/// Dependencies required to bootstrap the watcher process.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    config: PipelineConfig,
    events: EventBus,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let logging = LoggingConfig::default();

        let config_path =
            std::env::var(CONFIG_ENV).map_err(|_| AppError::MissingEnv { name: CONFIG_ENV })?;
        let config =
            load_config(&config_path).map_err(|err| AppError::config("config.load", err))?;

        let events = EventBus::new();
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

        Ok(Self {
            logging,
            config,
            events,
            telemetry,
        })
    }
}

/// Entry point for the watcher boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    Box::pin(run_app_with(dependencies, shutdown)).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send,
{
    pictor_telemetry::init_logging(&dependencies.logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("watch");

    info!("Pictor ingestion bootstrap starting");

    let BootstrapDependencies {
        logging: _,
        config,
        events,
        telemetry,
    } = dependencies;

    fs::create_dir_all(&config.watch_dir)
        .map_err(|err| AppError::io("bootstrap.create_watch_dir", &config.watch_dir, err))?;
    fs::create_dir_all(&config.result_dir)
        .map_err(|err| AppError::io("bootstrap.create_result_dir", &config.result_dir, err))?;

    let config = Arc::new(config);
    let runner = Arc::new(AnalyzerCommand::new(config.analyzer.clone()));
    let service = IngestService::new(Arc::clone(&config), runner, events, telemetry);

    let watch = FsCreationWatch::subscribe(&config.watch_dir)
        .map_err(|err| AppError::ingest("watch.subscribe", err))?;

    service.run(watch, shutdown).await;

    info!("Pictor ingestion stopped");
    Ok(())
}
