//! Telemetry primitives shared across the Pictor workspace.
//!
//! This crate centralises logging and metrics so the application binary and the
//! ingestion pipeline adopt a consistent observability story.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;
use tracing::{Span, span::Entered};
use tracing_subscriber::{EnvFilter, fmt};

/// Default logging target when `RUST_LOG` is not provided.
const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber cannot be installed (for example,
/// because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    BUILD_SHA
        .set(config.build_sha.to_string())
        .ok()
        .or(Some(()));

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level));

    let install = |format: LogFormat| {
        let builder = fmt::fmt()
            .with_env_filter(env_filter.clone())
            .with_target(false)
            .with_thread_ids(false);

        match format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        }
    };

    install(config.format).map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    Ok(())
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    pub level: &'a str,
    pub format: LogFormat,
    pub build_sha: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Access the build SHA recorded during logging initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Prometheus-backed metrics registry shared across the pipeline.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    events_emitted_total: IntCounterVec,
    ingest_steps_total: IntCounterVec,
    inflight_jobs: IntGauge,
    analyzer_duration_ms: IntGauge,
    stability_timeouts_total: IntCounter,
    analysis_failures_total: IntCounter,
    results_written_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub inflight_jobs: i64,
    pub analyzer_duration_ms: i64,
    pub stability_timeouts_total: u64,
    pub analysis_failures_total: u64,
    pub results_written_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Domain events emitted by type"),
            &["type"],
        )?;
        let ingest_steps_total = IntCounterVec::new(
            Opts::new(
                "ingest_steps_total",
                "Ingestion pipeline steps executed by status",
            ),
            &["step", "status"],
        )?;
        let inflight_jobs = IntGauge::with_opts(Opts::new(
            "inflight_jobs",
            "Files currently being stabilised or analysed",
        ))?;
        let analyzer_duration_ms = IntGauge::with_opts(Opts::new(
            "analyzer_duration_ms",
            "Wall-clock time of the most recent analyzer invocation (ms)",
        ))?;
        let stability_timeouts_total = IntCounter::with_opts(Opts::new(
            "stability_timeouts_total",
            "Files abandoned because their size never stabilised",
        ))?;
        let analysis_failures_total = IntCounter::with_opts(Opts::new(
            "analysis_failures_total",
            "Analyzer invocations that failed, timed out, or could not launch",
        ))?;
        let results_written_total = IntCounter::with_opts(Opts::new(
            "results_written_total",
            "Failure result artifacts written to the result directory",
        ))?;

        registry.register(Box::new(events_emitted_total.clone()))?;
        registry.register(Box::new(ingest_steps_total.clone()))?;
        registry.register(Box::new(inflight_jobs.clone()))?;
        registry.register(Box::new(analyzer_duration_ms.clone()))?;
        registry.register(Box::new(stability_timeouts_total.clone()))?;
        registry.register(Box::new(analysis_failures_total.clone()))?;
        registry.register(Box::new(results_written_total.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                events_emitted_total,
                ingest_steps_total,
                inflight_jobs,
                analyzer_duration_ms,
                stability_timeouts_total,
                analysis_failures_total,
                results_written_total,
            }),
        })
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Increment the ingestion pipeline step counter.
    pub fn inc_ingest_step(&self, step: &str, status: &str) {
        self.inner
            .ingest_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Record the start of a unit of work.
    pub fn job_started(&self) {
        self.inner.inflight_jobs.inc();
    }

    /// Record the end of a unit of work, whatever its outcome.
    pub fn job_finished(&self) {
        self.inner.inflight_jobs.dec();
    }

    /// Record the wall-clock time of the most recent analyzer invocation.
    pub fn observe_analyzer_duration(&self, duration: Duration) {
        self.inner
            .analyzer_duration_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Increment the stability timeout counter.
    pub fn inc_stability_timeout(&self) {
        self.inner.stability_timeouts_total.inc();
    }

    /// Increment the analysis failure counter.
    pub fn inc_analysis_failure(&self) {
        self.inner.analysis_failures_total.inc();
    }

    /// Increment the counter for failure artifacts written to disk.
    pub fn inc_result_written(&self) {
        self.inner.results_written_total.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inflight_jobs: self.inner.inflight_jobs.get(),
            analyzer_duration_ms: self.inner.analyzer_duration_ms.get(),
            stability_timeouts_total: self.inner.stability_timeouts_total.get(),
            analysis_failures_total: self.inner.analysis_failures_total.get(),
            results_written_total: self.inner.results_written_total.get(),
        }
    }

    fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}
