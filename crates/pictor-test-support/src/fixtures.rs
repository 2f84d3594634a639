//! Test fixtures and environment helpers.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

/// Shell script that parses `--input`/`--output` and writes an analysis artifact.
pub const SUCCEEDING_ANALYZER: &str = r#"input=""
output=""
while [ $# -gt 0 ]; do
  case "$1" in
    --input) input="$2"; shift 2 ;;
    --output) output="$2"; shift 2 ;;
    *) shift ;;
  esac
done
printf 'analysed: %s' "$input" > "$output"
"#;

/// Shell script that fails with a diagnostic on stderr and no artifact.
pub const FAILING_ANALYZER: &str = r#"echo "invalid image" >&2
exit 1
"#;

/// Shell script that sleeps far beyond any sensible invocation timeout.
pub const HANGING_ANALYZER: &str = "sleep 600\n";

/// Returns `true` if a POSIX shell is reachable for integration tests.
#[must_use]
pub fn sh_available() -> bool {
    Path::new("/bin/sh").exists()
        || Command::new("sh")
            .args(["-c", "exit 0"])
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
}

/// Write an analyzer stand-in script into `dir` and return its path.
///
/// The script is meant to be launched through `/bin/sh`, so no executable
/// bit is set.
///
/// # Errors
///
/// Returns an error when the script file cannot be written.
pub fn write_analyzer_script(dir: &Path, body: &str) -> Result<PathBuf> {
    let path = dir.join("analyzer.sh");
    std::fs::write(&path, body)
        .with_context(|| format!("failed to write analyzer script '{}'", path.display()))?;
    Ok(path)
}
