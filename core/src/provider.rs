//! Argument providers: the bridge between a catalog and a driver.
//!
//! A provider hands out a fresh, lazy sequence per request. Nothing per-version is
//! built while the sequence is being created; a fixture is only resolved when the
//! driver calls [`InvocationArguments::resolve`] for that one invocation.

use std::fmt;

use toolmatrix_types::ToolVersion;

use crate::catalog::VersionCatalog;
use crate::context::TestContext;
use crate::error::{ConfigurationError, FixtureResolutionError};

/// Lazy, finite sequence of invocation arguments.
pub type Arguments<'a, T> = Box<dyn Iterator<Item = InvocationArguments<'a, T>> + Send + 'a>;

type PendingFixture<'a, T> = Box<dyn FnOnce() -> Result<T, FixtureResolutionError> + Send + 'a>;

/// Payload for one invocation: a version and whatever was built for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentTuple<F = ()> {
    pub version: ToolVersion,
    pub fixture: F,
}

/// One element of an [`Arguments`] sequence.
///
/// `label_args` feed the `{0}`, `{1}`, ... placeholders of the label template. The
/// first entry is always the tool version.
pub struct InvocationArguments<'a, T> {
    index: usize,
    label_args: Vec<String>,
    pending: PendingFixture<'a, T>,
}

impl<'a, T> InvocationArguments<'a, T> {
    pub fn new<F>(index: usize, label_args: Vec<String>, pending: F) -> Self
    where
        F: FnOnce() -> Result<T, FixtureResolutionError> + Send + 'a,
    {
        Self {
            index,
            label_args,
            pending: Box::new(pending),
        }
    }

    /// 1-based position in the sequence.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn label_args(&self) -> &[String] {
        &self.label_args
    }

    /// Build the payload. Fixture resolution happens here and nowhere earlier.
    pub fn resolve(self) -> Result<T, FixtureResolutionError> {
        (self.pending)()
    }
}

impl<T> fmt::Debug for InvocationArguments<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationArguments")
            .field("index", &self.index)
            .field("label_args", &self.label_args)
            .finish_non_exhaustive()
    }
}

/// Builds the per-version fixture of an [`ArgumentTuple`].
pub trait FixtureResolver: Send + Sync {
    type Fixture: Send;

    fn resolve(&self, version: &ToolVersion) -> Result<Self::Fixture, FixtureResolutionError>;
}

/// Version-only tuples.
impl FixtureResolver for () {
    type Fixture = ();

    fn resolve(&self, _version: &ToolVersion) -> Result<(), FixtureResolutionError> {
        Ok(())
    }
}

/// Adapter turning a closure into a [`FixtureResolver`]; see [`resolver_fn`].
pub struct FnResolver<F>(F);

impl<F> fmt::Debug for FnResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnResolver")
    }
}

impl<F, T> FixtureResolver for FnResolver<F>
where
    F: Fn(&ToolVersion) -> Result<T, FixtureResolutionError> + Send + Sync,
    T: Send,
{
    type Fixture = T;

    fn resolve(&self, version: &ToolVersion) -> Result<T, FixtureResolutionError> {
        (self.0)(version)
    }
}

pub fn resolver_fn<F, T>(resolve: F) -> FnResolver<F>
where
    F: Fn(&ToolVersion) -> Result<T, FixtureResolutionError> + Send + Sync,
    T: Send,
{
    FnResolver(resolve)
}

/// Source of arguments for a parameterized test.
pub trait ArgumentsProvider: Send + Sync {
    type Item: Send;

    /// Fresh sequence starting at the first catalog version. Configuration problems
    /// are reported here, before anything is yielded.
    fn provide_arguments(
        &self,
        context: &TestContext,
    ) -> Result<Arguments<'_, Self::Item>, ConfigurationError>;
}

// ============================================================================
// Version provider
// ============================================================================

/// One invocation per catalog version, in catalog order.
#[derive(Debug, Clone)]
pub struct VersionArgumentsProvider<R = ()> {
    catalog: VersionCatalog,
    resolver: R,
}

impl VersionArgumentsProvider<()> {
    #[must_use]
    pub fn new(catalog: VersionCatalog) -> Self {
        Self {
            catalog,
            resolver: (),
        }
    }
}

impl<R: FixtureResolver> VersionArgumentsProvider<R> {
    #[must_use]
    pub fn with_resolver<R2: FixtureResolver>(self, resolver: R2) -> VersionArgumentsProvider<R2> {
        VersionArgumentsProvider {
            catalog: self.catalog,
            resolver,
        }
    }

    /// Cross every version with `values` (e.g. versions of a second tool).
    pub fn with_companions<I, S>(self, label: impl Into<String>, values: I) -> CompanionArgumentsProvider<R>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CompanionArgumentsProvider {
            inner: self,
            label: label.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    /// Catalog versions allowed by the context's selection, in catalog order.
    pub fn selected_versions(
        &self,
        context: &TestContext,
    ) -> Result<Vec<ToolVersion>, ConfigurationError> {
        let Some(selection) = context.effective_selection() else {
            return Ok(self.catalog.versions().to_vec());
        };
        let versions: Vec<ToolVersion> = self
            .catalog
            .iter()
            .filter(|version| selection.contains(version))
            .cloned()
            .collect();
        if versions.is_empty() {
            return Err(ConfigurationError::SelectionExcludesAll {
                test: context.qualified_name(),
                selection: selection.to_string(),
            });
        }
        tracing::debug!(
            test = %context.qualified_name(),
            %selection,
            selected = versions.len(),
            total = self.catalog.len(),
            "applied version selection"
        );
        Ok(versions)
    }
}

impl<R: FixtureResolver> ArgumentsProvider for VersionArgumentsProvider<R> {
    type Item = ArgumentTuple<R::Fixture>;

    fn provide_arguments(
        &self,
        context: &TestContext,
    ) -> Result<Arguments<'_, Self::Item>, ConfigurationError> {
        let versions = self.selected_versions(context)?;
        let resolver = &self.resolver;
        Ok(Box::new(versions.into_iter().enumerate().map(
            move |(position, version)| {
                InvocationArguments::new(position + 1, vec![version.to_string()], move || {
                    let fixture = resolver.resolve(&version)?;
                    Ok(ArgumentTuple { version, fixture })
                })
            },
        )))
    }
}

// ============================================================================
// Companion provider
// ============================================================================

/// Cartesian product of catalog versions and a list of companion values.
///
/// Ordered version-major: every companion for the first version, then every
/// companion for the second, and so on.
#[derive(Debug, Clone)]
pub struct CompanionArgumentsProvider<R = ()> {
    inner: VersionArgumentsProvider<R>,
    label: String,
    values: Vec<String>,
}

impl<R> CompanionArgumentsProvider<R> {
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl<R: FixtureResolver> ArgumentsProvider for CompanionArgumentsProvider<R> {
    type Item = (ArgumentTuple<R::Fixture>, String);

    fn provide_arguments(
        &self,
        context: &TestContext,
    ) -> Result<Arguments<'_, Self::Item>, ConfigurationError> {
        if self.values.is_empty() {
            return Err(ConfigurationError::EmptyCompanions {
                label: self.label.clone(),
            });
        }
        let versions = self.inner.selected_versions(context)?;
        let resolver = &self.inner.resolver;
        let values = &self.values;
        let pairs = versions.into_iter().flat_map(move |version| {
            values
                .iter()
                .map(move |value| (version.clone(), value.clone()))
        });
        Ok(Box::new(pairs.enumerate().map(
            move |(position, (version, value))| {
                let label_args = vec![version.to_string(), value.clone()];
                InvocationArguments::new(position + 1, label_args, move || {
                    let fixture = resolver.resolve(&version)?;
                    Ok((ArgumentTuple { version, fixture }, value))
                })
            },
        )))
    }
}
