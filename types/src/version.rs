//! Tool version identifiers.
//!
//! Versions follow the scheme used by Gradle distributions:
//! `MAJOR.MINOR[.PATCH][-rc-N|-milestone-N]`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("version string is empty")]
    Empty,
    #[error("version '{raw}' must have at least MAJOR.MINOR components")]
    MissingMinor { raw: String },
    #[error("version '{raw}' has a non-numeric component '{component}'")]
    NonNumeric { raw: String, component: String },
    #[error("version '{raw}' has too many numeric components")]
    TooManyComponents { raw: String },
    #[error("version '{raw}' has an unsupported qualifier '{qualifier}'")]
    UnsupportedQualifier { raw: String, qualifier: String },
}

/// Pre-release stage. Declaration order is the sort order; `Final` sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Milestone(u32),
    ReleaseCandidate(u32),
    Final,
}

impl Stage {
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, Stage::Final)
    }
}

/// One version of the external tool under test.
///
/// Comparison and hashing use the numeric components only, so `7.6` and `7.6.0`
/// are the same version. The original spelling is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolVersion {
    raw: String,
    major: u32,
    minor: u32,
    patch: Option<u32>,
    stage: Stage,
}

impl ToolVersion {
    pub fn parse(raw: &str) -> Result<Self, VersionParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let (numbers, qualifier) = match raw.split_once('-') {
            Some((numbers, qualifier)) => (numbers, Some(qualifier)),
            None => (raw, None),
        };

        let mut components = numbers.split('.');
        let major = parse_component(raw, components.next())?;
        let minor = match components.next() {
            Some(component) => parse_component(raw, Some(component))?,
            None => {
                return Err(VersionParseError::MissingMinor {
                    raw: raw.to_string(),
                });
            }
        };
        let patch = components
            .next()
            .map(|component| parse_component(raw, Some(component)))
            .transpose()?;
        if components.next().is_some() {
            return Err(VersionParseError::TooManyComponents {
                raw: raw.to_string(),
            });
        }

        let stage = match qualifier {
            None => Stage::Final,
            Some(qualifier) => parse_stage(raw, qualifier)?,
        };

        Ok(Self {
            raw: raw.to_string(),
            major,
            minor,
            patch,
            stage,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn major(&self) -> u32 {
        self.major
    }

    #[must_use]
    pub fn minor(&self) -> u32 {
        self.minor
    }

    #[must_use]
    pub fn patch(&self) -> u32 {
        self.patch.unwrap_or(0)
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn key(&self) -> (u32, u32, u32, Stage) {
        (self.major, self.minor, self.patch(), self.stage)
    }
}

fn parse_component(raw: &str, component: Option<&str>) -> Result<u32, VersionParseError> {
    let component = component.unwrap_or_default();
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionParseError::NonNumeric {
            raw: raw.to_string(),
            component: component.to_string(),
        });
    }
    component
        .parse::<u32>()
        .map_err(|_| VersionParseError::NonNumeric {
            raw: raw.to_string(),
            component: component.to_string(),
        })
}

fn parse_stage(raw: &str, qualifier: &str) -> Result<Stage, VersionParseError> {
    let unsupported = || VersionParseError::UnsupportedQualifier {
        raw: raw.to_string(),
        qualifier: qualifier.to_string(),
    };
    let (kind, number) = qualifier.split_once('-').ok_or_else(unsupported)?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unsupported());
    }
    let number = number.parse::<u32>().map_err(|_| unsupported())?;
    match kind {
        "rc" => Ok(Stage::ReleaseCandidate(number)),
        "milestone" => Ok(Stage::Milestone(number)),
        _ => Err(unsupported()),
    }
}

impl PartialEq for ToolVersion {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ToolVersion {}

impl Hash for ToolVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ToolVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ToolVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for ToolVersion {
    type Error = VersionParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ToolVersion> for String {
    fn from(value: ToolVersion) -> Self {
        value.raw
    }
}
