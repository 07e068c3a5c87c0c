//! Throw-away projects driven by one tool installation.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;
use toolmatrix_core::{FixtureResolutionError, FixtureResolver};
use toolmatrix_types::ToolVersion;

use crate::binary::{ToolBinaryResolver, ToolInstallation};

pub const CLEAN_SOURCES_FILE: &str = "src/main/kotlin/CleanSource.kt";
pub const FAIL_SOURCE_FILE: &str = "src/main/kotlin/FailSource.kt";

const CLEAN_SOURCES: &str = "val foo = \"bar\"\n";
const FAILING_SOURCES: &str = "val  foo    =     \"bar\"\n";

const DEFAULT_BUILD_FILE: &str = "plugins {\n    id 'base'\n}\n\nrepositories {\n    mavenCentral()\n}\n";
const DEFAULT_SETTINGS_FILE: &str = "rootProject.name = 'matrix-project'\n";

/// Writes the initial files of a fresh project directory.
pub type ProjectSetup = Arc<dyn Fn(&Path) -> io::Result<()> + Send + Sync>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to prepare project file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to launch {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("expected the build to {expected} but it did not (exit code {exit_code:?})\n{output}")]
    UnexpectedOutcome {
        expected: &'static str,
        exit_code: Option<i32>,
        output: String,
    },
}

/// Exit status and combined stdout/stderr of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub output: String,
}

impl BuildResult {
    #[must_use]
    pub fn output_contains(&self, needle: &str) -> bool {
        self.output.contains(needle)
    }
}

/// A temporary project directory bound to one installation. Deleted on drop.
pub struct TestProject {
    dir: TempDir,
    installation: ToolInstallation,
}

impl TestProject {
    /// Fresh project with the default build and settings files.
    pub fn new(installation: ToolInstallation) -> Result<Self, BuildError> {
        Self::with_setup(installation, &default_project_setup())
    }

    pub fn with_setup(
        installation: ToolInstallation,
        setup: &ProjectSetup,
    ) -> Result<Self, BuildError> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("toolmatrix-{}-", installation.version()))
            .tempdir()
            .map_err(|source| BuildError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        setup(dir.path()).map_err(|source| BuildError::Io {
            path: dir.path().to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %dir.path().display(), version = %installation.version(), "created test project");
        Ok(Self { dir, installation })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn installation(&self) -> &ToolInstallation {
        &self.installation
    }

    #[must_use]
    pub fn version(&self) -> &ToolVersion {
        self.installation.version()
    }

    #[must_use]
    pub fn build_file(&self) -> PathBuf {
        self.path().join("build.gradle")
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.path().join("settings.gradle")
    }

    #[must_use]
    pub fn editorconfig(&self) -> PathBuf {
        self.path().join(".editorconfig")
    }

    /// Writes `contents` to `relative`, creating parent directories.
    pub fn create_source_file(&self, relative: &str, contents: &str) -> Result<PathBuf, BuildError> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| BuildError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, contents).map_err(|source| BuildError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    pub fn with_clean_sources(&self) -> Result<PathBuf, BuildError> {
        self.create_source_file(CLEAN_SOURCES_FILE, CLEAN_SOURCES)
    }

    pub fn with_failing_sources(&self) -> Result<PathBuf, BuildError> {
        self.create_source_file(FAIL_SOURCE_FILE, FAILING_SOURCES)
    }

    /// Missing files are not an error.
    pub fn remove_source_file(&self, relative: &str) -> Result<(), BuildError> {
        let path = self.path().join(relative);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BuildError::Io { path, source }),
        }
    }

    /// Runs the tool with `args` plus `--stacktrace`, whatever the outcome.
    pub fn run(&self, args: &[&str]) -> Result<BuildResult, BuildError> {
        let program = self.installation.binary();
        tracing::info!(version = %self.version(), ?args, "running build");
        let output = Command::new(program)
            .args(args)
            .arg("--stacktrace")
            .current_dir(self.path())
            .output()
            .map_err(|source| BuildError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(BuildResult {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: combined,
        })
    }

    /// Runs the build and requires it to succeed.
    pub fn build(&self, args: &[&str]) -> Result<BuildResult, BuildError> {
        let result = self.run(args)?;
        if result.success {
            Ok(result)
        } else {
            Err(BuildError::UnexpectedOutcome {
                expected: "succeed",
                exit_code: result.exit_code,
                output: result.output,
            })
        }
    }

    /// Runs the build and requires it to fail.
    pub fn build_and_fail(&self, args: &[&str]) -> Result<BuildResult, BuildError> {
        let result = self.run(args)?;
        if result.success {
            Err(BuildError::UnexpectedOutcome {
                expected: "fail",
                exit_code: result.exit_code,
                output: result.output,
            })
        } else {
            Ok(result)
        }
    }
}

impl fmt::Debug for TestProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestProject")
            .field("path", &self.path())
            .field("installation", &self.installation)
            .finish()
    }
}

/// Writes a minimal `build.gradle` and `settings.gradle`.
#[must_use]
pub fn default_project_setup() -> ProjectSetup {
    Arc::new(|dir: &Path| {
        fs::write(dir.join("build.gradle"), DEFAULT_BUILD_FILE)?;
        fs::write(dir.join("settings.gradle"), DEFAULT_SETTINGS_FILE)
    })
}

/// Resolves a fresh [`TestProject`] per version.
#[derive(Clone)]
pub struct ProjectResolver {
    binaries: ToolBinaryResolver,
    setup: ProjectSetup,
}

impl ProjectResolver {
    #[must_use]
    pub fn new(binaries: ToolBinaryResolver) -> Self {
        Self {
            binaries,
            setup: default_project_setup(),
        }
    }

    #[must_use]
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&Path) -> io::Result<()> + Send + Sync + 'static,
    {
        self.setup = Arc::new(setup);
        self
    }
}

impl fmt::Debug for ProjectResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectResolver")
            .field("binaries", &self.binaries)
            .finish_non_exhaustive()
    }
}

impl FixtureResolver for ProjectResolver {
    type Fixture = TestProject;

    fn resolve(&self, version: &ToolVersion) -> Result<TestProject, FixtureResolutionError> {
        let installation = self.binaries.locate(version)?;
        TestProject::with_setup(installation, &self.setup)
            .map_err(|err| FixtureResolutionError::new(version.clone(), err.to_string()))
    }
}
