//! Bounded external analyzer invocation.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use pictor_config::AnalyzerProfile;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::model::ProcessOutcome;

/// Capability seam for launching the analyzer, so tests can substitute a fake
/// without spawning real processes.
#[async_trait]
pub trait AnalyzerRunner: Send + Sync {
    /// Run the analyzer for one input file, writing its artifact to `output`.
    ///
    /// Non-zero exits and timeouts are captured in the returned outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only when the process cannot be launched or waited on.
    async fn run(&self, input: &Path, output: &Path) -> IngestResult<ProcessOutcome>;
}

/// Analyzer launched as `interpreter script --input <path> --output <path>`.
///
/// The command is built argument-by-argument with no shell involved, so paths
/// with spaces or metacharacters pass through untouched.
#[derive(Debug, Clone)]
pub struct AnalyzerCommand {
    profile: AnalyzerProfile,
}

impl AnalyzerCommand {
    /// Construct a runner from the configured analyzer profile.
    #[must_use]
    pub const fn new(profile: AnalyzerProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl AnalyzerRunner for AnalyzerCommand {
    async fn run(&self, input: &Path, output: &Path) -> IngestResult<ProcessOutcome> {
        let mut command = Command::new(&self.profile.interpreter);
        command
            .arg(&self.profile.script)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| IngestError::Spawn {
            program: self.profile.interpreter.clone(),
            source,
        })?;

        // Dropping the wait future on timeout kills the child via kill_on_drop.
        match timeout(self.profile.timeout(), child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProcessOutcome {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                timed_out: false,
            }),
            Ok(Err(source)) => Err(IngestError::io(
                "analyzer.wait",
                &self.profile.script,
                source,
            )),
            Err(_) => {
                debug!(
                    script = %self.profile.script.display(),
                    timeout_secs = self.profile.timeout_secs,
                    "analyzer exceeded its time limit"
                );
                Ok(ProcessOutcome {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                    timed_out: true,
                })
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn profile_for(script: &Path, timeout_secs: u64) -> AnalyzerProfile {
        AnalyzerProfile {
            interpreter: PathBuf::from("/bin/sh"),
            script: script.to_path_buf(),
            timeout_secs,
        }
    }

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("analyzer.sh");
        std::fs::write(&path, body).expect("write script");
        path
    }

    #[tokio::test]
    async fn successful_run_captures_exit_code_and_streams() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "echo analysed\n");

        let runner = AnalyzerCommand::new(profile_for(&script, 5));
        let outcome = runner
            .run(Path::new("/tmp/in.png"), Path::new("/tmp/out.txt"))
            .await
            .expect("launch succeeds");

        assert!(outcome.success());
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout.trim(), "analysed");
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn failing_run_captures_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "echo broken model >&2\nexit 3\n");

        let runner = AnalyzerCommand::new(profile_for(&script, 5));
        let outcome = runner
            .run(Path::new("/tmp/in.png"), Path::new("/tmp/out.txt"))
            .await
            .expect("launch succeeds");

        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stderr.trim(), "broken model");
    }

    #[tokio::test]
    async fn slow_run_is_terminated_and_flagged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "sleep 30\n");

        let runner = AnalyzerCommand::new(profile_for(&script, 1));
        let outcome = runner
            .run(Path::new("/tmp/in.png"), Path::new("/tmp/out.txt"))
            .await
            .expect("launch succeeds");

        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_spawn_error() {
        let profile = AnalyzerProfile {
            interpreter: PathBuf::from("/definitely/not/an/interpreter"),
            script: PathBuf::from("analyzer.py"),
            timeout_secs: 5,
        };
        let runner = AnalyzerCommand::new(profile);
        let err = runner
            .run(Path::new("/tmp/in.png"), Path::new("/tmp/out.txt"))
            .await
            .expect_err("spawn fails");
        assert!(matches!(err, IngestError::Spawn { .. }));
    }
}
