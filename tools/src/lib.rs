//! Per-version fixtures for matrix tests.
//!
//! - [`ToolBinaryResolver`] finds the installed binary of a tool version.
//! - [`ProjectResolver`] gives every invocation its own [`TestProject`].

pub mod binary;
pub mod project;

pub use binary::{ToolBinaryResolver, ToolInstallation, gradle_user_home};
pub use project::{
    BuildError, BuildResult, CLEAN_SOURCES_FILE, FAIL_SOURCE_FILE, ProjectResolver, ProjectSetup,
    TestProject, default_project_setup,
};
