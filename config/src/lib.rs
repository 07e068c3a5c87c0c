//! Configuration loading and parsing for toolmatrix.
//!
//! The configuration file is optional. When it is absent every value falls back
//! to the built-in Gradle defaults below.

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub mod runtime;

pub use runtime::{ProbeError, detect_java_major, parse_java_major, probe_java_major};

/// Path override for the configuration file.
pub const CONFIG_ENV: &str = "TOOLMATRIX_CONFIG";
/// Comma or whitespace separated version list; overrides every other source.
pub const VERSIONS_ENV: &str = "TOOLMATRIX_VERSIONS";
/// Major version of the host runtime the tool runs on (the JVM for Gradle).
pub const RUNTIME_MAJOR_ENV: &str = "TOOLMATRIX_RUNTIME_MAJOR";

pub const CONFIG_FILE_NAME: &str = "toolmatrix.toml";

/// Lowest tool version exercised by default.
pub const DEFAULT_MIN_VERSION: &str = "7.6.3";
/// Highest tool version exercised by default.
pub const DEFAULT_MAX_VERSION: &str = "9.1.0";
pub const DEFAULT_BINARY: &str = "gradle";

/// Environment lookup, injectable so callers and tests need not touch process state.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

#[must_use]
pub fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatrixConfig {
    pub tool: ToolConfig,
    pub versions: VersionsConfig,
    pub runtime: RuntimeConfig,
}

/// ```toml
/// [tool]
/// name = "Gradle"
/// binary = "gradle"
/// install_dirs = ["/opt/gradle/gradle-{version}"]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Name shown in invocation labels.
    pub name: Option<String>,
    /// Executable stem, without platform extension.
    pub binary: Option<String>,
    /// Installation roots; `{version}` is replaced with the version being resolved.
    pub install_dirs: Vec<String>,
}

impl ToolConfig {
    #[must_use]
    pub fn binary(&self) -> &str {
        self.binary.as_deref().unwrap_or(DEFAULT_BINARY)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersionsConfig {
    /// Explicit catalog. When set, bounds and runtime rules are ignored.
    pub list: Option<Vec<String>>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub additional: Vec<String>,
    pub runtime_rules: Vec<RuntimeRule>,
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            list: None,
            min: None,
            max: None,
            additional: Vec::new(),
            runtime_rules: default_runtime_rules(),
        }
    }
}

/// Adjusts the bounds depending on the host runtime major version.
///
/// A rule applies when every condition it sets holds. Rules are applied in order,
/// so later rules win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeRule {
    pub at_least: Option<u32>,
    pub below: Option<u32>,
    pub min: Option<String>,
    pub max: Option<String>,
}

impl RuntimeRule {
    #[must_use]
    pub fn applies_to(&self, runtime_major: u32) -> bool {
        if self.at_least.is_none() && self.below.is_none() {
            return false;
        }
        self.at_least.is_none_or(|floor| runtime_major >= floor)
            && self.below.is_none_or(|ceiling| runtime_major < ceiling)
    }
}

/// Gradle 9 needs Java 17, and Java 21 needs at least Gradle 8.5.
#[must_use]
pub fn default_runtime_rules() -> Vec<RuntimeRule> {
    vec![
        RuntimeRule {
            below: Some(17),
            max: Some("8.14.3".to_string()),
            ..RuntimeRule::default()
        },
        RuntimeRule {
            at_least: Some(21),
            min: Some("8.5".to_string()),
            ..RuntimeRule::default()
        },
    ]
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub major: Option<u32>,
    /// Run `java -version` when neither `major` nor `TOOLMATRIX_RUNTIME_MAJOR` is set.
    pub detect: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            major: None,
            detect: true,
        }
    }
}

/// Bounds after runtime rules were applied; still unvalidated strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBounds {
    pub min: String,
    pub max: String,
    pub additional: Vec<String>,
}

impl MatrixConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load(env: EnvLookup<'_>) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let Some(path) = config_path(env) else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file");
            return Ok(None);
        }
        let config = Self::load_from(&path, env)?;
        Ok(Some((path, config)))
    }

    pub fn load_from(path: &Path, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path, env)
    }

    pub fn parse(content: &str, path: &Path, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.expand(env);
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn expand(&mut self, env: EnvLookup<'_>) {
        if let Some(binary) = self.tool.binary.as_mut() {
            *binary = expand_env_vars(binary, env);
        }
        for dir in &mut self.tool.install_dirs {
            *dir = expand_env_vars(dir, env);
        }
    }

    /// Host runtime major version: config value, else `TOOLMATRIX_RUNTIME_MAJOR`.
    #[must_use]
    pub fn runtime_major(&self, env: EnvLookup<'_>) -> Option<u32> {
        if let Some(major) = self.runtime.major {
            return Some(major);
        }
        let raw = env(RUNTIME_MAJOR_ENV)?;
        match raw.trim().parse::<u32>() {
            Ok(major) => Some(major),
            Err(_) => {
                tracing::warn!("ignoring {RUNTIME_MAJOR_ENV}={raw:?}: not a number");
                None
            }
        }
    }

    /// Like [`Self::runtime_major`], falling back to asking the host JVM when
    /// `[runtime] detect` is on. A failed detection leaves the runtime unknown.
    #[must_use]
    pub fn detect_runtime_major(&self, env: EnvLookup<'_>) -> Option<u32> {
        if let Some(major) = self.runtime_major(env) {
            return Some(major);
        }
        if !self.runtime.detect {
            return None;
        }
        match detect_java_major(env) {
            Ok(major) => Some(major),
            Err(err) => {
                tracing::warn!("host runtime unknown, runtime rules skipped: {err}");
                None
            }
        }
    }

    #[must_use]
    pub fn bounds(&self, runtime_major: Option<u32>) -> RawBounds {
        let mut min = self
            .versions
            .min
            .clone()
            .unwrap_or_else(|| DEFAULT_MIN_VERSION.to_string());
        let mut max = self
            .versions
            .max
            .clone()
            .unwrap_or_else(|| DEFAULT_MAX_VERSION.to_string());

        if let Some(major) = runtime_major {
            for rule in self.versions.runtime_rules.iter().filter(|r| r.applies_to(major)) {
                if let Some(rule_min) = &rule.min {
                    min.clone_from(rule_min);
                }
                if let Some(rule_max) = &rule.max {
                    max.clone_from(rule_max);
                }
                tracing::debug!(runtime_major = major, %min, %max, "runtime rule applied");
            }
        }

        RawBounds {
            min,
            max,
            additional: self.versions.additional.clone(),
        }
    }
}

/// `TOOLMATRIX_CONFIG`, else `./toolmatrix.toml` if present, else `~/.toolmatrix/config.toml`.
#[must_use]
pub fn config_path(env: EnvLookup<'_>) -> Option<PathBuf> {
    if let Some(custom) = env(CONFIG_ENV).filter(|v| !v.trim().is_empty()) {
        return Some(PathBuf::from(custom));
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    dirs::home_dir().map(|home| home.join(".toolmatrix").join("config.toml"))
}

/// Replace `${VAR}` references. Unset variables expand to nothing.
#[must_use]
pub fn expand_env_vars(value: &str, env: EnvLookup<'_>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
