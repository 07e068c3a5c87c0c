//! Process-wide matrix settings.
//!
//! Resolution order for the catalog: `TOOLMATRIX_VERSIONS`, then the config file,
//! then built-in Gradle bounds adjusted for the host runtime. The runtime is taken
//! from `[runtime] major`, `TOOLMATRIX_RUNTIME_MAJOR`, or `java -version`.
//! [`MatrixSettings::global`] resolves once per process and replays the result,
//! configuration errors included.

use std::sync::OnceLock;

use toolmatrix_config::{EnvLookup, MatrixConfig, VERSIONS_ENV, process_env};
use toolmatrix_types::ToolName;

use crate::catalog::{ConfiguredVersions, EnvVersions, VersionCatalog};
use crate::context::TestContext;
use crate::error::ConfigurationError;
use crate::provider::{ArgumentTuple, Arguments, ArgumentsProvider, VersionArgumentsProvider};

#[derive(Debug)]
pub struct MatrixSettings {
    tool: ToolName,
    config: MatrixConfig,
    runtime_major: Option<u32>,
    provider: VersionArgumentsProvider,
}

static GLOBAL: OnceLock<Result<MatrixSettings, ConfigurationError>> = OnceLock::new();

impl MatrixSettings {
    pub fn resolve(env: EnvLookup<'_>) -> Result<Self, ConfigurationError> {
        let (origin, config) = match MatrixConfig::load(env) {
            Ok(Some((path, config))) => (format!("config file {}", path.display()), config),
            Ok(None) => ("built-in defaults".to_string(), MatrixConfig::default()),
            Err(err) => return Err(ConfigurationError::Invalid(err.to_string())),
        };
        Self::from_config(origin, config, env)
    }

    pub fn from_config(
        origin: impl Into<String>,
        config: MatrixConfig,
        env: EnvLookup<'_>,
    ) -> Result<Self, ConfigurationError> {
        let tool = match config.tool.name.as_deref() {
            Some(name) => {
                ToolName::new(name).map_err(|err| ConfigurationError::Invalid(err.to_string()))?
            }
            None => ToolName::gradle(),
        };
        let env_list = env(VERSIONS_ENV).filter(|value| !value.trim().is_empty());
        // The host JVM is only asked when runtime rules can shape the catalog.
        let runtime_major = if env_list.is_none() && config.versions.list.is_none() {
            config.detect_runtime_major(env)
        } else {
            config.runtime_major(env)
        };

        let catalog = match env_list {
            Some(value) => VersionCatalog::resolve(&EnvVersions::with_value(VERSIONS_ENV, Some(value)))?,
            None => VersionCatalog::resolve(&ConfiguredVersions::new(origin, &config, runtime_major))?,
        };
        tracing::info!(
            tool = %tool,
            origin = catalog.origin(),
            versions = ?catalog.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "matrix settings resolved"
        );

        Ok(Self {
            tool,
            config,
            runtime_major,
            provider: VersionArgumentsProvider::new(catalog),
        })
    }

    /// Settings for this process, resolved from the real environment on first use.
    pub fn global() -> Result<&'static MatrixSettings, ConfigurationError> {
        match GLOBAL.get_or_init(|| Self::resolve(&process_env)) {
            Ok(settings) => Ok(settings),
            Err(err) => Err(err.clone()),
        }
    }

    #[must_use]
    pub fn tool(&self) -> &ToolName {
        &self.tool
    }

    #[must_use]
    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    #[must_use]
    pub fn runtime_major(&self) -> Option<u32> {
        self.runtime_major
    }

    #[must_use]
    pub fn catalog(&self) -> &VersionCatalog {
        self.provider.catalog()
    }

    #[must_use]
    pub fn provider(&self) -> &VersionArgumentsProvider {
        &self.provider
    }
}

/// Catalog from the global settings.
pub fn default_catalog() -> Result<VersionCatalog, ConfigurationError> {
    MatrixSettings::global().map(|settings| settings.catalog().clone())
}

/// Tool name from the global settings; `Gradle` when they failed to resolve.
#[must_use]
pub fn default_tool_name() -> ToolName {
    MatrixSettings::global().map_or_else(|_| ToolName::gradle(), |settings| settings.tool().clone())
}

/// Version-only provider over the global catalog.
///
/// Settings are looked up when arguments are requested, so a configuration
/// problem becomes a setup failure of the test rather than a panic at registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultArgumentsProvider;

impl ArgumentsProvider for DefaultArgumentsProvider {
    type Item = ArgumentTuple;

    fn provide_arguments(
        &self,
        context: &TestContext,
    ) -> Result<Arguments<'_, Self::Item>, ConfigurationError> {
        MatrixSettings::global()?.provider().provide_arguments(context)
    }
}
