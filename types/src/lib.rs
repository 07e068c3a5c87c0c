//! Core domain types for toolmatrix.
//!
//! This crate contains pure domain types with no IO and minimal dependencies.
//! Everything here can be used from any layer of the workspace.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod version;
pub use version::{Stage, ToolVersion, VersionParseError};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Tool Name
// ============================================================================

/// Display name of the external tool, e.g. `Gradle`. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tool name must not be empty")]
pub struct EmptyToolNameError;

impl ToolName {
    pub const DEFAULT: &'static str = "Gradle";

    pub fn new(value: impl Into<String>) -> Result<Self, EmptyToolNameError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Err(EmptyToolNameError)
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn gradle() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ToolName {
    fn default() -> Self {
        Self::gradle()
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ToolName {
    type Error = EmptyToolNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ToolName> for String {
    fn from(value: ToolName) -> Self {
        value.0
    }
}

// ============================================================================
// Display Label
// ============================================================================

/// Label shown in reports for one parameterized invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayLabel(String);

impl DisplayLabel {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DisplayLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
