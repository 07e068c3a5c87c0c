//! Registration of version-matrix tests.
//!
//! A [`MatrixTest`] binds a test body to an [`ArgumentsProvider`] and to a label
//! template. Everything about the binding is decided when the test is built; the
//! driver only asks for arguments, labels and invocations.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use toolmatrix_types::{DisplayLabel, ToolName};

use crate::context::{TestContext, VersionSelection};
use crate::display::{DisplayNameFormatter, LabelTemplate, fallback_label};
use crate::driver::{InvocationDriver, InvocationPlan, SequentialDriver, panic_message};
use crate::error::{ConfigurationError, FormatError};
use crate::provider::{Arguments, ArgumentsProvider};
use crate::report::{Outcome, TestReport};

/// Suite-level defaults shared by several matrix tests. Not a test itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixSuite {
    name: String,
    selection: Option<VersionSelection>,
}

impl MatrixSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selection: None,
        }
    }

    #[must_use]
    pub fn with_selection(mut self, selection: VersionSelection) -> Self {
        self.selection = Some(selection);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn selection(&self) -> Option<&VersionSelection> {
        self.selection.as_ref()
    }
}

/// A test body run once per item of its provider.
pub struct MatrixTest<P, B> {
    name: String,
    display_name: Option<String>,
    suite: Option<MatrixSuite>,
    selection: Option<VersionSelection>,
    formatter: DisplayNameFormatter,
    template_error: Option<FormatError>,
    provider: P,
    body: B,
}

impl<P, B> MatrixTest<P, B>
where
    P: ArgumentsProvider,
    B: Fn(P::Item) -> anyhow::Result<()> + Sync,
{
    pub fn new(name: impl Into<String>, provider: P, body: B) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            suite: None,
            selection: None,
            formatter: DisplayNameFormatter::for_tool(&ToolName::gradle()),
            template_error: None,
            provider,
            body,
        }
    }

    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Use the default `"<Tool> {0}: {displayName}"` template for `tool`.
    #[must_use]
    pub fn tool(mut self, tool: &ToolName) -> Self {
        self.formatter = DisplayNameFormatter::for_tool(tool);
        self.template_error = None;
        self
    }

    /// Custom label template. An invalid template is kept as an error and every
    /// label of this test falls back to its raw identifier.
    #[must_use]
    pub fn template(mut self, template: &str) -> Self {
        match LabelTemplate::parse(template) {
            Ok(parsed) => {
                self.formatter = DisplayNameFormatter::new(parsed);
                self.template_error = None;
            }
            Err(err) => {
                tracing::warn!(test = %self.name, template, "invalid label template: {err}");
                self.template_error = Some(err);
            }
        }
        self
    }

    #[must_use]
    pub fn select(mut self, selection: VersionSelection) -> Self {
        self.selection = Some(selection);
        self
    }

    #[must_use]
    pub fn in_suite(mut self, suite: &MatrixSuite) -> Self {
        self.suite = Some(suite.clone());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn template_error(&self) -> Option<&FormatError> {
        self.template_error.as_ref()
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run with a [`SequentialDriver`].
    pub fn run(&self) -> TestReport {
        self.run_with(&SequentialDriver::default())
    }

    pub fn run_with<D: InvocationDriver>(&self, driver: &D) -> TestReport {
        driver.drive(self)
    }

    fn display_name_or_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

impl<P, B> InvocationPlan for MatrixTest<P, B>
where
    P: ArgumentsProvider,
    B: Fn(P::Item) -> anyhow::Result<()> + Sync,
{
    type Item = P::Item;

    fn context(&self) -> TestContext {
        let mut context = TestContext::new(self.name.clone())
            .with_display_name(self.display_name_or_name())
            .with_selection(self.selection.clone());
        if let Some(suite) = &self.suite {
            context = context.in_suite(suite.name(), suite.selection().cloned());
        }
        context
    }

    fn arguments(
        &self,
        context: &TestContext,
    ) -> Result<Arguments<'_, Self::Item>, ConfigurationError> {
        self.provider.provide_arguments(context)
    }

    fn label(&self, index: usize, label_args: &[String]) -> DisplayLabel {
        if self.template_error.is_some() {
            return fallback_label(index, label_args, self.display_name_or_name());
        }
        self.formatter
            .label_or_fallback(index, label_args, self.display_name_or_name())
    }

    fn invoke(&self, item: Self::Item) -> Outcome {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.body)(item))) {
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err(err)) => Outcome::Failed {
                message: format!("{err:#}"),
            },
            Err(payload) => Outcome::Failed {
                message: panic_message(&*payload),
            },
        }
    }
}

impl<P, B> fmt::Debug for MatrixTest<P, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixTest")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("suite", &self.suite)
            .field("selection", &self.selection)
            .field("template", &self.formatter.template().as_str())
            .finish_non_exhaustive()
    }
}

/// Declares a `#[test]` function that runs once per catalog version.
///
/// ```ignore
/// version_matrix_test! {
///     fn builds_successfully(args: ArgumentTuple) -> anyhow::Result<()> {
///         assert!(args.version.major() >= 7);
///         Ok(())
///     }
/// }
/// ```
///
/// Without `using`, versions and the tool name come from [`crate::MatrixSettings::global`]
/// and a configuration error fails the test before any invocation runs. With
/// `using`, only the given provider is consulted and labels use the default tool name.
#[macro_export]
macro_rules! version_matrix_test {
    (
        $(#[$meta:meta])*
        fn $name:ident($arg:ident : $ty:ty) -> $ret:ty $body:block using $provider:expr
    ) => {
        $(#[$meta])*
        #[test]
        fn $name() {
            let test = $crate::MatrixTest::new(stringify!($name), $provider, |$arg: $ty| -> $ret {
                $body
            });
            test.run().assert_success();
        }
    };
    (
        $(#[$meta:meta])*
        fn $name:ident($arg:ident : $ty:ty) -> $ret:ty $body:block
    ) => {
        $(#[$meta])*
        #[test]
        fn $name() {
            let test = $crate::MatrixTest::new(
                stringify!($name),
                $crate::DefaultArgumentsProvider,
                |$arg: $ty| -> $ret { $body },
            )
            .tool(&$crate::default_tool_name());
            test.run().assert_success();
        }
    };
}
