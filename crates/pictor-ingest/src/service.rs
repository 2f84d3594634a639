//! Ingestion pipeline orchestration.
//!
//! One watch loop accepts creation notices and fans each eligible file out
//! onto an independent unit of work: stabilise, analyse, record. Units of
//! work never share mutable state and their failures never reach the loop.

use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use pictor_config::PipelineConfig;
use pictor_events::{Event, EventBus};
use pictor_telemetry::Metrics;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::invoke::AnalyzerRunner;
use crate::model::{FileReadiness, WatchEvent};
use crate::results::{Recorded, ResultWriter, result_path};
use crate::stability;
use crate::watch::CreationWatch;

const HEALTH_COMPONENT: &str = "ingest";

/// Service that turns creation notices into analyzed result artifacts.
#[derive(Clone)]
pub struct IngestService {
    config: Arc<PipelineConfig>,
    runner: Arc<dyn AnalyzerRunner>,
    writer: ResultWriter,
    events: EventBus,
    metrics: Metrics,
    health_degraded: Arc<Mutex<bool>>,
}

impl IngestService {
    /// Construct the service around a configuration snapshot and a runner.
    #[must_use]
    pub fn new(
        config: Arc<PipelineConfig>,
        runner: Arc<dyn AnalyzerRunner>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let writer = ResultWriter::new(config.result_dir.clone());
        Self {
            config,
            runner,
            writer,
            events,
            metrics,
            health_degraded: Arc::new(Mutex::new(false)),
        }
    }

    /// Drive the watch loop until the stream ends or `shutdown` resolves.
    ///
    /// Units of work already dispatched keep running after the loop stops;
    /// there is no drain on shutdown.
    pub async fn run<W, F>(&self, mut watch: W, shutdown: F)
    where
        W: CreationWatch,
        F: Future<Output = ()> + Send,
    {
        info!(
            watch_dir = %self.config.watch_dir.display(),
            result_dir = %self.config.result_dir.display(),
            "ingestion watch loop started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown signal received; stopping watch loop");
                    break;
                }
                notice = watch.next() => {
                    match notice {
                        Some(event) => self.dispatch(event),
                        None => {
                            warn!("creation watch ended; stopping watch loop");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Filter one creation notice and, when eligible, spawn its unit of work.
    pub fn dispatch(&self, event: WatchEvent) {
        if event.is_directory {
            debug!(path = %event.path.display(), "ignoring created directory");
            return;
        }

        let job_id = Uuid::new_v4();
        let extension = event
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        if !self.config.is_supported_extension(extension) {
            info!(
                path = %event.path.display(),
                extension,
                "ignoring file with unsupported extension"
            );
            self.publish_event(Event::FileSkipped {
                job_id,
                path: event.path.display().to_string(),
                reason: "unsupported extension".to_string(),
            });
            self.metrics.inc_ingest_step("filter", "skipped");
            return;
        }

        let service = self.clone();
        let path = event.path;
        tokio::spawn(async move {
            service.process(job_id, path).await;
        });
    }

    async fn process(&self, job_id: Uuid, path: PathBuf) {
        self.metrics.job_started();
        self.publish_event(Event::FileObserved {
            job_id,
            path: path.display().to_string(),
        });

        self.run_unit_of_work(job_id, &path).await;
        self.metrics.job_finished();
    }

    async fn run_unit_of_work(&self, job_id: Uuid, path: &Path) {
        match stability::await_stable(path, &self.config.stability).await {
            FileReadiness::Stable { size_bytes } => {
                self.metrics.inc_ingest_step("stability", "completed");
                self.publish_event(Event::FileStable {
                    job_id,
                    path: path.display().to_string(),
                    size_bytes,
                });
            }
            FileReadiness::NotReady => {
                warn!(
                    job_id = %job_id,
                    path = %path.display(),
                    "file never stabilised; abandoning"
                );
                self.metrics.inc_ingest_step("stability", "failed");
                self.metrics.inc_stability_timeout();
                self.publish_event(Event::StabilityTimedOut {
                    job_id,
                    path: path.display().to_string(),
                });
                return;
            }
        }

        let output = result_path(&self.config.result_dir, path);
        let started = Instant::now();
        let invocation = self.runner.run(path, &output).await;
        self.metrics.observe_analyzer_duration(started.elapsed());

        match invocation {
            Ok(outcome) => {
                let recorded = self.writer.record(path, &outcome);
                if matches!(recorded, Recorded::FailureWritten(_)) {
                    self.metrics.inc_result_written();
                }
                if let Some(message) = recorded.failure_message() {
                    warn!(
                        job_id = %job_id,
                        path = %path.display(),
                        exit_code = ?outcome.exit_code,
                        timed_out = outcome.timed_out,
                        "analyzer invocation failed"
                    );
                    self.metrics.inc_ingest_step("analyze", "failed");
                    self.metrics.inc_analysis_failure();
                    self.publish_event(Event::AnalysisFailed {
                        job_id,
                        path: path.display().to_string(),
                        message,
                    });
                } else {
                    self.mark_recovered();
                    self.metrics.inc_ingest_step("analyze", "completed");
                    self.publish_event(Event::AnalysisSucceeded {
                        job_id,
                        path: path.display().to_string(),
                        result_path: output.display().to_string(),
                    });
                }
            }
            Err(err) => {
                warn!(
                    job_id = %job_id,
                    path = %path.display(),
                    error = %err,
                    "analyzer could not be launched"
                );
                let message = err.source().map_or_else(
                    || format!("error: {err}"),
                    |source| format!("error: {err}: {source}"),
                );
                if self.writer.record_failure_message(path, &message) {
                    self.metrics.inc_result_written();
                }
                self.mark_degraded(&message);
                self.metrics.inc_ingest_step("analyze", "failed");
                self.metrics.inc_analysis_failure();
                self.publish_event(Event::AnalysisFailed {
                    job_id,
                    path: path.display().to_string(),
                    message,
                });
            }
        }
    }

    fn publish_event(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _ = self.events.publish(event);
    }

    fn mark_degraded(&self, detail: &str) {
        let mut guard = self.lock_health_flag();
        if *guard {
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                detail = detail,
                "ingestion pipeline still degraded"
            );
        } else {
            *guard = true;
            drop(guard);
            warn!(
                component = HEALTH_COMPONENT,
                detail = detail,
                "ingestion pipeline degraded"
            );
            self.publish_event(Event::HealthChanged {
                degraded: vec![HEALTH_COMPONENT.to_string()],
            });
        }
    }

    fn mark_recovered(&self) {
        let mut guard = self.lock_health_flag();
        if std::mem::take(&mut *guard) {
            drop(guard);
            self.publish_event(Event::HealthChanged { degraded: vec![] });
            info!(component = HEALTH_COMPONENT, "ingestion pipeline recovered");
        }
    }

    fn lock_health_flag(&self) -> MutexGuard<'_, bool> {
        match self.health_degraded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("ingest health mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}
