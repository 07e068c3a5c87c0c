//! Error taxonomy for matrix runs.
//!
//! Configuration errors abort a test before any invocation runs. Fixture errors
//! belong to exactly one invocation. Format errors never abort anything; the label
//! falls back to a raw identifier.

use thiserror::Error;

use toolmatrix_types::{ToolVersion, VersionParseError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no versions resolved from {origin}")]
    EmptyCatalog { origin: String },
    #[error("malformed version '{raw}' from {origin}: {reason}")]
    MalformedVersion {
        raw: String,
        origin: String,
        #[source]
        reason: VersionParseError,
    },
    #[error("additional version {version} must be between {min} and {max}")]
    OutOfBounds {
        version: String,
        min: String,
        max: String,
    },
    #[error("minimum version {min} is above maximum version {max}")]
    InvertedBounds { min: String, max: String },
    #[error("version selection ({selection}) for '{test}' excludes every catalog version")]
    SelectionExcludesAll { test: String, selection: String },
    #[error("companion values for {label} must not be empty")]
    EmptyCompanions { label: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A per-version fixture (tool binary, project directory, ...) could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fixture for version {version} unavailable: {message}")]
pub struct FixtureResolutionError {
    version: ToolVersion,
    message: String,
}

impl FixtureResolutionError {
    pub fn new(version: ToolVersion, message: impl Into<String>) -> Self {
        Self {
            version,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn version(&self) -> &ToolVersion {
        &self.version
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("display name must not be blank")]
    MissingDisplayName,
    #[error("unknown placeholder '{{{0}}}' in label template")]
    UnknownPlaceholder(String),
    #[error("unclosed '{{' at byte {0} in label template")]
    Unclosed(usize),
    #[error("unmatched '}}' at byte {0} in label template")]
    UnmatchedClose(usize),
    #[error("label template must reference {{0}}, {{version}} or {{index}}")]
    NoDistinguishingToken,
    #[error("label template references argument {index} but only {available} are available")]
    ArgumentOutOfRange { index: usize, available: usize },
}
