//! Version-matrix test parameterization.
//!
//! A test registered through [`MatrixTest`] (or the [`version_matrix_test!`] macro)
//! runs once per version in a [`VersionCatalog`]. Each invocation gets its own
//! label, its own fixture and its own outcome:
//!
//! ```text
//! VersionSource -> VersionCatalog -> ArgumentsProvider -> InvocationDriver -> TestReport
//!                                          |                     |
//!                                   FixtureResolver      DisplayNameFormatter
//! ```
//!
//! Catalog sources, fixture resolvers and drivers are traits so tests can inject
//! fixed versions and fakes instead of reading the environment.

mod catalog;
mod context;
mod display;
mod driver;
mod error;
mod marker;
mod provider;
mod report;
mod settings;

pub use catalog::{
    ConfiguredVersions, EnvVersions, StaticVersions, VersionBounds, VersionCatalog, VersionSource,
};
pub use context::{TestContext, VersionSelection};
pub use display::{DisplayNameFormatter, LabelTemplate, fallback_label};
pub use driver::{InvocationDriver, InvocationPlan, ParallelDriver, SequentialDriver};
pub use error::{ConfigurationError, FixtureResolutionError, FormatError};
pub use marker::{MatrixSuite, MatrixTest};
pub use provider::{
    ArgumentTuple, Arguments, ArgumentsProvider, CompanionArgumentsProvider, FixtureResolver,
    FnResolver, InvocationArguments, VersionArgumentsProvider, resolver_fn,
};
pub use report::{InvocationRecord, Outcome, TestReport};
pub use settings::{DefaultArgumentsProvider, MatrixSettings, default_catalog, default_tool_name};

pub use toolmatrix_types::{DisplayLabel, Stage, ToolName, ToolVersion, VersionParseError};
