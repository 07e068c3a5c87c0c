//! Invocation drivers.
//!
//! A driver pulls arguments from a plan, invokes the body once per item and
//! records the outcome. Drivers own scheduling; plans own everything else.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use toolmatrix_types::DisplayLabel;

use crate::context::TestContext;
use crate::error::ConfigurationError;
use crate::provider::{Arguments, InvocationArguments};
use crate::report::{InvocationRecord, Outcome, TestReport};

/// A registered test as seen by a driver.
pub trait InvocationPlan: Sync {
    type Item: Send;

    fn context(&self) -> TestContext;

    fn arguments(
        &self,
        context: &TestContext,
    ) -> Result<Arguments<'_, Self::Item>, ConfigurationError>;

    fn label(&self, index: usize, label_args: &[String]) -> DisplayLabel;

    fn invoke(&self, item: Self::Item) -> Outcome;
}

pub trait InvocationDriver {
    fn drive<P: InvocationPlan>(&self, plan: &P) -> TestReport;
}

/// Runs invocations one after another, in sequence order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialDriver {
    /// Stop pulling arguments after the first failed invocation.
    pub stop_on_failure: bool,
}

impl SequentialDriver {
    #[must_use]
    pub fn stop_on_failure() -> Self {
        Self {
            stop_on_failure: true,
        }
    }
}

impl InvocationDriver for SequentialDriver {
    fn drive<P: InvocationPlan>(&self, plan: &P) -> TestReport {
        let context = plan.context();
        let arguments = match start(plan, &context) {
            Ok(arguments) => arguments,
            Err(report) => return report,
        };

        let mut report = TestReport::new(context.qualified_name());
        for args in arguments {
            let record = run_one(plan, &context, args);
            let failed = !record.outcome.is_passed();
            report.invocations.push(record);
            if failed && self.stop_on_failure {
                tracing::debug!(test = %context.qualified_name(), "stopping after first failure");
                break;
            }
        }
        report.finish()
    }
}

/// Runs invocations on scoped worker threads.
///
/// Workers share the lazy argument sequence; each resolves its own fixture after
/// taking an item, so one slow version never holds up the others.
#[derive(Debug, Clone, Copy)]
pub struct ParallelDriver {
    pub workers: usize,
}

impl ParallelDriver {
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for ParallelDriver {
    fn default() -> Self {
        let workers = thread::available_parallelism().map_or(1, usize::from);
        Self::new(workers)
    }
}

impl InvocationDriver for ParallelDriver {
    fn drive<P: InvocationPlan>(&self, plan: &P) -> TestReport {
        let context = plan.context();
        let arguments = match start(plan, &context) {
            Ok(arguments) => arguments,
            Err(report) => return report,
        };

        let queue = Mutex::new(arguments);
        let records = Mutex::new(Vec::new());
        thread::scope(|scope| {
            for _ in 0..self.workers.max(1) {
                scope.spawn(|| {
                    loop {
                        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                        let Some(args) = next else {
                            break;
                        };
                        let record = run_one(plan, &context, args);
                        records
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(record);
                    }
                });
            }
        });

        let mut report = TestReport::new(context.qualified_name());
        report.invocations = records.into_inner().unwrap_or_else(PoisonError::into_inner);
        report.finish()
    }
}

fn start<'p, P: InvocationPlan>(
    plan: &'p P,
    context: &TestContext,
) -> Result<Arguments<'p, P::Item>, TestReport> {
    plan.arguments(context).map_err(|err| {
        tracing::warn!(test = %context.qualified_name(), "matrix setup failed: {err}");
        TestReport::setup_failed(context.qualified_name(), err)
    })
}

fn run_one<P: InvocationPlan>(
    plan: &P,
    context: &TestContext,
    args: InvocationArguments<'_, P::Item>,
) -> InvocationRecord {
    let index = args.index();
    let label_args = args.label_args().to_vec();
    let label = plan.label(index, &label_args);
    let span = tracing::info_span!("invocation", test = %context.qualified_name(), %label);
    let _entered = span.enter();

    let started = Instant::now();
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| args.resolve())) {
        Ok(Ok(item)) => plan.invoke(item),
        Ok(Err(err)) => {
            tracing::warn!(version = %err.version(), "{err}");
            Outcome::FixtureUnavailable {
                version: err.version().to_string(),
                message: err.message().to_string(),
            }
        }
        Err(payload) => Outcome::FixtureUnavailable {
            version: label_args.first().cloned().unwrap_or_default(),
            message: format!("fixture resolution panicked: {}", panic_message(&*payload)),
        },
    };
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &outcome {
        Outcome::Passed => tracing::info!(duration_ms, "passed"),
        Outcome::Failed { message } => tracing::info!(duration_ms, "failed: {message}"),
        Outcome::FixtureUnavailable { .. } => {}
    }

    InvocationRecord {
        index,
        label,
        args: label_args,
        outcome,
        duration_ms,
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
