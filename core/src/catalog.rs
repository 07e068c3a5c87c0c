//! Version catalog resolution.
//!
//! A catalog is resolved once from a [`VersionSource`] and is read-only afterwards.
//! The versions live behind an `Arc<[ToolVersion]>` so providers on many threads
//! can share one catalog without locking.

use std::collections::HashSet;
use std::sync::Arc;

use toolmatrix_config::{MatrixConfig, RawBounds};
use toolmatrix_types::ToolVersion;

use crate::error::ConfigurationError;

/// Where the raw version strings of a catalog come from.
pub trait VersionSource: Send + Sync {
    /// Human-readable origin, used in error messages and logs.
    fn describe(&self) -> String;

    fn raw_versions(&self) -> Result<Vec<String>, ConfigurationError>;
}

// ============================================================================
// Sources
// ============================================================================

/// A compiled-in list.
#[derive(Debug, Clone, Default)]
pub struct StaticVersions {
    versions: Vec<String>,
}

impl StaticVersions {
    pub fn new<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            versions: versions.into_iter().map(Into::into).collect(),
        }
    }
}

impl VersionSource for StaticVersions {
    fn describe(&self) -> String {
        "static version list".to_string()
    }

    fn raw_versions(&self) -> Result<Vec<String>, ConfigurationError> {
        Ok(self.versions.clone())
    }
}

/// A comma or whitespace separated list held in an environment variable.
///
/// The value is captured when the source is built, so resolution stays
/// deterministic for the rest of the run.
#[derive(Debug, Clone)]
pub struct EnvVersions {
    var: String,
    value: Option<String>,
}

impl EnvVersions {
    #[must_use]
    pub fn from_process(var: &str) -> Self {
        Self::with_value(var, std::env::var(var).ok())
    }

    #[must_use]
    pub fn with_value(var: &str, value: Option<String>) -> Self {
        Self {
            var: var.to_string(),
            value,
        }
    }
}

impl VersionSource for EnvVersions {
    fn describe(&self) -> String {
        match self.value {
            Some(_) => format!("environment variable {}", self.var),
            None => format!("environment variable {} (unset)", self.var),
        }
    }

    fn raw_versions(&self) -> Result<Vec<String>, ConfigurationError> {
        Ok(self
            .value
            .as_deref()
            .unwrap_or_default()
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}

/// The lowest and highest supported versions plus extra versions in between.
///
/// Produces `[min, additional..., max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBounds {
    pub min: String,
    pub max: String,
    pub additional: Vec<String>,
}

impl VersionBounds {
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
            additional: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_additional<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional.extend(versions.into_iter().map(Into::into));
        self
    }

    fn parse(&self, raw: &str) -> Result<ToolVersion, ConfigurationError> {
        ToolVersion::parse(raw).map_err(|reason| ConfigurationError::MalformedVersion {
            raw: raw.to_string(),
            origin: self.describe(),
            reason,
        })
    }
}

impl From<RawBounds> for VersionBounds {
    fn from(raw: RawBounds) -> Self {
        Self {
            min: raw.min,
            max: raw.max,
            additional: raw.additional,
        }
    }
}

impl VersionSource for VersionBounds {
    fn describe(&self) -> String {
        format!("version bounds {}..={}", self.min, self.max)
    }

    fn raw_versions(&self) -> Result<Vec<String>, ConfigurationError> {
        let min = self.parse(&self.min)?;
        let max = self.parse(&self.max)?;
        if min > max {
            return Err(ConfigurationError::InvertedBounds {
                min: min.to_string(),
                max: max.to_string(),
            });
        }

        let mut versions = Vec::with_capacity(self.additional.len() + 2);
        versions.push(self.min.clone());
        for raw in &self.additional {
            let version = self.parse(raw)?;
            if version < min || version > max {
                return Err(ConfigurationError::OutOfBounds {
                    version: version.to_string(),
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
            versions.push(raw.clone());
        }
        versions.push(self.max.clone());
        Ok(versions)
    }
}

/// Versions declared in a [`MatrixConfig`]: the explicit `list` when present,
/// otherwise the bounds adjusted for the host runtime.
#[derive(Debug, Clone)]
pub struct ConfiguredVersions {
    origin: String,
    list: Option<Vec<String>>,
    bounds: VersionBounds,
}

impl ConfiguredVersions {
    #[must_use]
    pub fn new(origin: impl Into<String>, config: &MatrixConfig, runtime_major: Option<u32>) -> Self {
        Self {
            origin: origin.into(),
            list: config.versions.list.clone(),
            bounds: config.bounds(runtime_major).into(),
        }
    }
}

impl VersionSource for ConfiguredVersions {
    fn describe(&self) -> String {
        self.origin.clone()
    }

    fn raw_versions(&self) -> Result<Vec<String>, ConfigurationError> {
        match &self.list {
            Some(list) => Ok(list.clone()),
            None => self.bounds.raw_versions(),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Ordered, deduplicated, non-empty set of versions under test.
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    versions: Arc<[ToolVersion]>,
    origin: String,
}

impl VersionCatalog {
    pub fn resolve(source: &dyn VersionSource) -> Result<Self, ConfigurationError> {
        let origin = source.describe();
        let mut versions = Vec::new();
        for raw in source.raw_versions()? {
            let version =
                ToolVersion::parse(&raw).map_err(|reason| ConfigurationError::MalformedVersion {
                    raw: raw.clone(),
                    origin: origin.clone(),
                    reason,
                })?;
            versions.push(version);
        }
        Self::from_versions(origin, versions)
    }

    /// Builds a catalog from parsed versions, keeping the first occurrence of each.
    pub fn from_versions(
        origin: impl Into<String>,
        versions: impl IntoIterator<Item = ToolVersion>,
    ) -> Result<Self, ConfigurationError> {
        let origin = origin.into();
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for version in versions {
            if seen.insert(version.clone()) {
                unique.push(version);
            } else {
                tracing::debug!(%version, %origin, "dropping duplicate version");
            }
        }
        if unique.is_empty() {
            return Err(ConfigurationError::EmptyCatalog { origin });
        }
        tracing::debug!(%origin, count = unique.len(), "resolved version catalog");
        Ok(Self {
            versions: unique.into(),
            origin,
        })
    }

    #[must_use]
    pub fn versions(&self) -> &[ToolVersion] {
        &self.versions
    }

    #[must_use]
    pub fn shared(&self) -> Arc<[ToolVersion]> {
        Arc::clone(&self.versions)
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Always false for a resolved catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    #[must_use]
    pub fn min(&self) -> Option<&ToolVersion> {
        self.versions.iter().min()
    }

    #[must_use]
    pub fn max(&self) -> Option<&ToolVersion> {
        self.versions.iter().max()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ToolVersion> {
        self.versions.iter()
    }
}

impl<'a> IntoIterator for &'a VersionCatalog {
    type Item = &'a ToolVersion;
    type IntoIter = std::slice::Iter<'a, ToolVersion>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
