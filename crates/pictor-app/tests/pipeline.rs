#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pictor_config::{AnalyzerProfile, PipelineConfig, StabilityPolicy};
use pictor_events::EventBus;
use pictor_ingest::{AnalyzerCommand, FsCreationWatch, IngestService, result_path};
use pictor_telemetry::Metrics;
use pictor_test_support::fixtures::{
    FAILING_ANALYZER, HANGING_ANALYZER, SUCCEEDING_ANALYZER, sh_available, write_analyzer_script,
};
use tokio::sync::oneshot;
use tokio::time::sleep;

const ARTIFACT_WAIT: Duration = Duration::from_secs(10);

struct Pipeline {
    watch_dir: tempfile::TempDir,
    result_dir: tempfile::TempDir,
    _script_dir: tempfile::TempDir,
    shutdown: oneshot::Sender<()>,
    worker: tokio::task::JoinHandle<()>,
}

fn pipeline(script_body: &str, analyzer_timeout_secs: u64) -> anyhow::Result<Pipeline> {
    let watch_dir = tempfile::tempdir()?;
    let result_dir = tempfile::tempdir()?;
    let script_dir = tempfile::tempdir()?;
    let script = write_analyzer_script(script_dir.path(), script_body)?;

    let config = Arc::new(PipelineConfig {
        watch_dir: watch_dir.path().to_path_buf(),
        result_dir: result_dir.path().to_path_buf(),
        extensions: vec!["jpg".into(), "jpeg".into(), "png".into(), "bmp".into()],
        stability: StabilityPolicy {
            timeout_secs: 5,
            poll_interval_ms: 50,
        },
        analyzer: AnalyzerProfile {
            interpreter: PathBuf::from("/bin/sh"),
            script,
            timeout_secs: analyzer_timeout_secs,
        },
    });

    let events = EventBus::new();
    let metrics = Metrics::new()?;
    let runner = Arc::new(AnalyzerCommand::new(config.analyzer.clone()));
    let service = IngestService::new(Arc::clone(&config), runner, events, metrics);
    let watch = FsCreationWatch::subscribe(&config.watch_dir)?;

    let (shutdown, stop) = oneshot::channel::<()>();
    let worker = tokio::spawn(async move {
        service
            .run(watch, async {
                let _ = stop.await;
            })
            .await;
    });

    Ok(Pipeline {
        watch_dir,
        result_dir,
        _script_dir: script_dir,
        shutdown,
        worker,
    })
}

async fn wait_for_artifact(path: &Path) -> Option<String> {
    let deadline = tokio::time::Instant::now() + ARTIFACT_WAIT;
    while tokio::time::Instant::now() < deadline {
        if let Ok(content) = std::fs::read_to_string(path)
            && !content.is_empty()
        {
            return Some(content);
        }
        sleep(Duration::from_millis(50)).await;
    }
    None
}

#[tokio::test]
async fn watched_upload_produces_analysis_artifact() -> anyhow::Result<()> {
    if !sh_available() {
        eprintln!("skipping watched_upload_produces_analysis_artifact: no posix shell");
        return Ok(());
    }

    let pipeline = pipeline(SUCCEEDING_ANALYZER, 10)?;
    let input = pipeline.watch_dir.path().join("shape1.png");
    std::fs::write(&input, vec![0u8; 1024])?;

    let artifact = result_path(pipeline.result_dir.path(), &input);
    let content = wait_for_artifact(&artifact)
        .await
        .expect("artifact written before timeout");
    assert_eq!(content, format!("analysed: {}", input.display()));

    let _ = pipeline.shutdown.send(());
    pipeline.worker.await?;
    Ok(())
}

#[tokio::test]
async fn failing_analyzer_produces_error_artifact() -> anyhow::Result<()> {
    if !sh_available() {
        eprintln!("skipping failing_analyzer_produces_error_artifact: no posix shell");
        return Ok(());
    }

    let pipeline = pipeline(FAILING_ANALYZER, 10)?;
    let input = pipeline.watch_dir.path().join("shape3.jpg");
    std::fs::write(&input, b"corrupt payload")?;

    let artifact = result_path(pipeline.result_dir.path(), &input);
    let content = wait_for_artifact(&artifact)
        .await
        .expect("artifact written before timeout");
    assert_eq!(content, "error: invalid image");

    let _ = pipeline.shutdown.send(());
    pipeline.worker.await?;
    Ok(())
}

#[tokio::test]
async fn hanging_analyzer_times_out_with_unknown_error() -> anyhow::Result<()> {
    if !sh_available() {
        eprintln!("skipping hanging_analyzer_times_out_with_unknown_error: no posix shell");
        return Ok(());
    }

    let pipeline = pipeline(HANGING_ANALYZER, 1)?;
    let input = pipeline.watch_dir.path().join("shape6.png");
    std::fs::write(&input, b"payload")?;

    let artifact = result_path(pipeline.result_dir.path(), &input);
    let content = wait_for_artifact(&artifact)
        .await
        .expect("artifact written before timeout");
    assert_eq!(content, "error: unknown error");

    let _ = pipeline.shutdown.send(());
    pipeline.worker.await?;
    Ok(())
}

#[tokio::test]
async fn non_image_files_are_left_alone() -> anyhow::Result<()> {
    if !sh_available() {
        eprintln!("skipping non_image_files_are_left_alone: no posix shell");
        return Ok(());
    }

    let pipeline = pipeline(SUCCEEDING_ANALYZER, 10)?;
    let input = pipeline.watch_dir.path().join("notes.txt");
    std::fs::write(&input, b"plain text")?;

    sleep(Duration::from_millis(500)).await;
    let artifact = result_path(pipeline.result_dir.path(), &input);
    assert!(!artifact.exists());

    let _ = pipeline.shutdown.send(());
    pipeline.worker.await?;
    Ok(())
}
