//! Locating an installed tool binary for a given version.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use toolmatrix_config::{DEFAULT_BINARY, EnvLookup, ToolConfig};
use toolmatrix_core::{FixtureResolutionError, FixtureResolver};
use toolmatrix_types::ToolVersion;

const GRADLE_USER_HOME_ENV: &str = "GRADLE_USER_HOME";
const PATH_ENV: &str = "PATH";
const VERSION_PLACEHOLDER: &str = "{version}";

/// An installation of one tool version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInstallation {
    version: ToolVersion,
    home: PathBuf,
    binary: PathBuf,
}

impl ToolInstallation {
    #[must_use]
    pub fn new(version: ToolVersion, home: PathBuf, binary: PathBuf) -> Self {
        Self {
            version,
            home,
            binary,
        }
    }

    #[must_use]
    pub fn version(&self) -> &ToolVersion {
        &self.version
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

/// Finds the binary for a version.
///
/// Search order:
/// 1. configured install dirs, with `{version}` substituted
/// 2. the Gradle wrapper cache under `$GRADLE_USER_HOME/wrapper/dists`
/// 3. `PATH`, accepted only when `<binary> --version` reports the version
///
/// A `PATH` binary is one installation of one version, so it never stands in
/// for the others.
#[derive(Debug, Clone)]
pub struct ToolBinaryResolver {
    binary: String,
    install_dirs: Vec<String>,
    wrapper_home: Option<PathBuf>,
    search_path: bool,
    /// `PATH` value to search; the process `PATH` when unset.
    path: Option<OsString>,
}

impl ToolBinaryResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            install_dirs: Vec::new(),
            wrapper_home: None,
            search_path: true,
            path: None,
        }
    }

    /// Resolver for the `[tool]` section of the config file.
    #[must_use]
    pub fn from_config(tool: &ToolConfig, env: EnvLookup<'_>) -> Self {
        Self {
            binary: tool.binary().to_string(),
            install_dirs: tool.install_dirs.clone(),
            wrapper_home: gradle_user_home(env),
            search_path: true,
            path: env(PATH_ENV).map(OsString::from),
        }
    }

    #[must_use]
    pub fn with_install_dir(mut self, template: impl Into<String>) -> Self {
        self.install_dirs.push(template.into());
        self
    }

    #[must_use]
    pub fn with_wrapper_home(mut self, home: Option<PathBuf>) -> Self {
        self.wrapper_home = home;
        self
    }

    #[must_use]
    pub fn search_path(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<OsString>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn binary_name(&self) -> &str {
        &self.binary
    }

    pub fn locate(&self, version: &ToolVersion) -> Result<ToolInstallation, FixtureResolutionError> {
        let mut searched = Vec::new();

        for template in &self.install_dirs {
            let home = PathBuf::from(template.replace(VERSION_PLACEHOLDER, version.as_str()));
            if let Some(binary) = self.binary_in(&home) {
                tracing::debug!(%version, binary = %binary.display(), "found binary in install dir");
                return Ok(ToolInstallation::new(version.clone(), home, binary));
            }
            searched.push(home);
        }

        if let Some(wrapper_home) = &self.wrapper_home {
            match self.wrapper_distribution(wrapper_home, version) {
                Some(installation) => return Ok(installation),
                None => searched.push(wrapper_home.join("wrapper").join("dists")),
            }
        }

        let mut locations: Vec<String> = searched
            .iter()
            .map(|path| path.display().to_string())
            .collect();

        if self.search_path {
            match self.which() {
                Ok(binary) => {
                    if reports_version(&binary, version) {
                        tracing::debug!(%version, binary = %binary.display(), "using binary from PATH");
                        let home = installation_home(&binary);
                        return Ok(ToolInstallation::new(version.clone(), home, binary));
                    }
                    tracing::debug!(%version, binary = %binary.display(), "binary on PATH reports another version");
                    locations.push(format!("{} (not {version})", binary.display()));
                }
                Err(err) => tracing::debug!("{} not on PATH: {err}", self.binary),
            }
        }

        let locations = locations.join(", ");
        Err(FixtureResolutionError::new(
            version.clone(),
            if locations.is_empty() {
                format!("no {} binary found", self.binary)
            } else {
                format!("no {} binary found; searched {locations}", self.binary)
            },
        ))
    }

    fn which(&self) -> which::Result<PathBuf> {
        match &self.path {
            Some(path) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(&self.binary, Some(path), cwd)
            }
            None => which::which(&self.binary),
        }
    }

    /// `<home>/bin/<binary>`, else `<home>/<binary>`.
    fn binary_in(&self, home: &Path) -> Option<PathBuf> {
        [home.join("bin"), home.to_path_buf()]
            .into_iter()
            .flat_map(|dir| {
                executable_names(&self.binary)
                    .into_iter()
                    .map(move |name| dir.join(name))
            })
            .find(|candidate| candidate.is_file())
    }

    fn wrapper_distribution(
        &self,
        wrapper_home: &Path,
        version: &ToolVersion,
    ) -> Option<ToolInstallation> {
        let dists = wrapper_home.join("wrapper").join("dists");
        let unpacked = format!("{}-{}", self.binary, version.as_str());
        for flavor in ["bin", "all"] {
            let dist = dists.join(format!("{unpacked}-{flavor}"));
            let Ok(entries) = fs::read_dir(&dist) else {
                continue;
            };
            // One directory per distribution URL hash; order them for a stable pick.
            let mut hashes: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            hashes.sort();
            for hash in hashes {
                let home = hash.join(&unpacked);
                if let Some(binary) = self.binary_in(&home) {
                    tracing::debug!(%version, binary = %binary.display(), "found wrapper distribution");
                    return Some(ToolInstallation::new(version.clone(), home, binary));
                }
            }
        }
        None
    }
}

impl Default for ToolBinaryResolver {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl FixtureResolver for ToolBinaryResolver {
    type Fixture = ToolInstallation;

    fn resolve(&self, version: &ToolVersion) -> Result<ToolInstallation, FixtureResolutionError> {
        self.locate(version)
    }
}

/// `$GRADLE_USER_HOME`, else `~/.gradle`.
#[must_use]
pub fn gradle_user_home(env: EnvLookup<'_>) -> Option<PathBuf> {
    env(GRADLE_USER_HOME_ENV)
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".gradle")))
}

#[cfg(windows)]
fn executable_names(binary: &str) -> Vec<String> {
    vec![
        format!("{binary}.bat"),
        format!("{binary}.exe"),
        binary.to_string(),
    ]
}

#[cfg(not(windows))]
fn executable_names(binary: &str) -> Vec<String> {
    vec![binary.to_string()]
}

fn installation_home(binary: &Path) -> PathBuf {
    let dir = binary.parent().unwrap_or(binary);
    if dir.file_name().is_some_and(|name| name == "bin") {
        dir.parent().unwrap_or(dir).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

fn reports_version(binary: &Path, version: &ToolVersion) -> bool {
    match Command::new(binary).arg("--version").output() {
        Ok(output) => {
            let text = String::from_utf8_lossy(&output.stdout);
            mentions_version(&text, version)
        }
        Err(err) => {
            tracing::debug!(binary = %binary.display(), "--version failed: {err}");
            false
        }
    }
}

/// True when some whitespace-separated token of `text` parses as `version`.
fn mentions_version(text: &str, version: &ToolVersion) -> bool {
    text.split_whitespace()
        .filter_map(|token| ToolVersion::parse(token.trim_matches(|c: char| c == '"' || c == ',')).ok())
        .any(|found| &found == version)
}
