//! Write-completion detection via size polling.
//!
//! # Design
//! - A file counts as complete once two consecutive size readings match.
//! - The heuristic is intentionally simple and can misfire on slow writers
//!   that stall longer than one poll interval; the window and interval are
//!   both configurable to tune that risk per deployment.

use std::path::Path;
use std::time::Instant;

use pictor_config::StabilityPolicy;
use tokio::fs;
use tokio::time::sleep;

use crate::model::FileReadiness;

/// Poll the file's size until it stops changing or the window expires.
///
/// A metadata read failure at any point (typically because the file was
/// deleted mid-wait) yields [`FileReadiness::NotReady`] immediately.
#[must_use]
pub async fn await_stable(path: &Path, policy: &StabilityPolicy) -> FileReadiness {
    let started = Instant::now();
    let mut previous_size: Option<u64> = None;

    loop {
        if started.elapsed() >= policy.timeout() {
            return FileReadiness::NotReady;
        }

        let size_bytes = match fs::metadata(path).await {
            Ok(metadata) => metadata.len(),
            Err(_) => return FileReadiness::NotReady,
        };

        if previous_size == Some(size_bytes) {
            return FileReadiness::Stable { size_bytes };
        }
        previous_size = Some(size_bytes);

        sleep(policy.poll_interval()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn quick_policy() -> StabilityPolicy {
        StabilityPolicy {
            timeout_secs: 2,
            poll_interval_ms: 20,
        }
    }

    #[tokio::test]
    async fn completed_file_is_reported_stable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shape.png");
        std::fs::write(&path, b"finished payload").expect("write file");

        let readiness = await_stable(&path, &quick_policy()).await;
        assert_eq!(readiness, FileReadiness::Stable { size_bytes: 16 });
    }

    #[tokio::test]
    async fn missing_file_is_not_ready() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gone.png");

        let readiness = await_stable(&path, &quick_policy()).await;
        assert_eq!(readiness, FileReadiness::NotReady);
    }

    #[tokio::test]
    async fn growing_file_eventually_stabilises() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("upload.jpg");
        let mut file = std::fs::File::create(&path).expect("create file");
        file.write_all(b"chunk-one").expect("write chunk");
        file.flush().expect("flush");

        // Append faster than the poll interval until done, so no two polls
        // can observe equal sizes while the writer is still active.
        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&writer_path)
                .expect("reopen file");
            for _ in 0..5 {
                sleep(Duration::from_millis(10)).await;
                file.write_all(b"chunk-two").expect("write chunk");
                file.flush().expect("flush");
            }
        });

        let policy = StabilityPolicy {
            timeout_secs: 3,
            poll_interval_ms: 40,
        };
        let readiness = await_stable(&path, &policy).await;
        writer.await.expect("writer task");
        assert_eq!(readiness, FileReadiness::Stable { size_bytes: 54 });
    }

    #[tokio::test]
    async fn expired_window_reports_not_ready() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("slow.png");
        std::fs::write(&path, b"data").expect("write file");

        let policy = StabilityPolicy {
            timeout_secs: 0,
            poll_interval_ms: 20,
        };
        let readiness = await_stable(&path, &policy).await;
        assert_eq!(readiness, FileReadiness::NotReady);
    }
}
