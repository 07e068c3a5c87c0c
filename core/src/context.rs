//! What a provider knows about the test it is producing arguments for.

use std::fmt;

use toolmatrix_types::ToolVersion;

/// Narrows the catalog for one test or one suite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSelection {
    at_least: Option<ToolVersion>,
    at_most: Option<ToolVersion>,
}

impl VersionSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at_least(mut self, version: ToolVersion) -> Self {
        self.at_least = Some(version);
        self
    }

    #[must_use]
    pub fn at_most(mut self, version: ToolVersion) -> Self {
        self.at_most = Some(version);
        self
    }

    /// Exactly one version.
    #[must_use]
    pub fn only(version: ToolVersion) -> Self {
        Self {
            at_least: Some(version.clone()),
            at_most: Some(version),
        }
    }

    #[must_use]
    pub fn contains(&self, version: &ToolVersion) -> bool {
        self.at_least.as_ref().is_none_or(|min| version >= min)
            && self.at_most.as_ref().is_none_or(|max| version <= max)
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.at_least.is_none() && self.at_most.is_none()
    }
}

impl fmt::Display for VersionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.at_least, &self.at_most) {
            (None, None) => f.write_str("any version"),
            (Some(min), None) => write!(f, ">= {min}"),
            (None, Some(max)) => write!(f, "<= {max}"),
            (Some(min), Some(max)) => write!(f, ">= {min}, <= {max}"),
        }
    }
}

/// Identity of the test being parameterized.
///
/// Method-level selection takes precedence over the suite-level one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    test_name: String,
    display_name: String,
    suite: Option<String>,
    selection: Option<VersionSelection>,
    suite_selection: Option<VersionSelection>,
}

impl TestContext {
    pub fn new(test_name: impl Into<String>) -> Self {
        let test_name = test_name.into();
        Self {
            display_name: test_name.clone(),
            test_name,
            suite: None,
            selection: None,
            suite_selection: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: Option<VersionSelection>) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn in_suite(mut self, suite: impl Into<String>, selection: Option<VersionSelection>) -> Self {
        self.suite = Some(suite.into());
        self.suite_selection = selection;
        self
    }

    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn suite(&self) -> Option<&str> {
        self.suite.as_deref()
    }

    /// `suite::test` when the test belongs to a suite.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.suite {
            Some(suite) => format!("{suite}::{}", self.test_name),
            None => self.test_name.clone(),
        }
    }

    #[must_use]
    pub fn effective_selection(&self) -> Option<&VersionSelection> {
        self.selection.as_ref().or(self.suite_selection.as_ref())
    }
}
