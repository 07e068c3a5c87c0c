//! Host runtime detection.
//!
//! Gradle runs on the JVM, and which Gradle versions can run depends on the Java
//! major version. The probe runs `java -version` from `JAVA_HOME` or `PATH`.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use crate::EnvLookup;

const JAVA_HOME_ENV: &str = "JAVA_HOME";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no java executable in JAVA_HOME or on PATH")]
    NotFound,
    #[error("failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unrecognized java version output: {output}")]
    Unrecognized { output: String },
}

/// Major version of the java executable found via `JAVA_HOME` or `PATH`.
pub fn detect_java_major(env: EnvLookup<'_>) -> Result<u32, ProbeError> {
    let java = java_executable(env).ok_or(ProbeError::NotFound)?;
    probe_java_major(&java)
}

pub fn probe_java_major(java: &Path) -> Result<u32, ProbeError> {
    let output = Command::new(java)
        .arg("-version")
        .output()
        .map_err(|source| ProbeError::Spawn {
            program: java.to_path_buf(),
            source,
        })?;
    // `java -version` prints to stderr; some wrappers use stdout.
    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));
    let major = parse_java_major(&text).ok_or_else(|| ProbeError::Unrecognized {
        output: text.lines().next().unwrap_or_default().to_string(),
    })?;
    tracing::debug!(java = %java.display(), major, "detected java runtime");
    Ok(major)
}

fn java_executable(env: EnvLookup<'_>) -> Option<PathBuf> {
    let name = if cfg!(windows) { "java.exe" } else { "java" };
    if let Some(home) = env(JAVA_HOME_ENV).filter(|value| !value.trim().is_empty()) {
        let candidate = PathBuf::from(home).join("bin").join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        tracing::debug!(path = %candidate.display(), "JAVA_HOME has no java executable");
    }
    which::which("java").ok()
}

/// Major version from `java -version` output.
///
/// Handles both `"1.8.0_292"` (major 8) and `"17.0.2"` / `"21-ea"` styles.
#[must_use]
pub fn parse_java_major(output: &str) -> Option<u32> {
    let line = output.lines().find(|line| line.contains("version"))?;
    let quoted = line.split('"').nth(1)?;
    let mut parts = quoted.split(['.', '-', '_', '+']);
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        return parts.next()?.parse().ok();
    }
    Some(first)
}
