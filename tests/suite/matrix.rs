//! End-to-end matrix runs through the public API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::ensure;
use toolmatrix_core::{
    ArgumentTuple, ArgumentsProvider, ConfigurationError, MatrixSuite, MatrixTest, Outcome,
    ParallelDriver, SequentialDriver, StaticVersions, TestContext, VersionArgumentsProvider,
    VersionCatalog, VersionSelection,
};

use crate::common::{RecordingResolver, catalog, provider, v};

#[test]
fn two_versions_yield_two_labelled_invocations() {
    let test = MatrixTest::new(
        "buildsSuccessfully",
        provider(&["7.6", "8.1"]),
        |args: ArgumentTuple| {
            ensure!(args.version.major() >= 7, "unsupported version {}", args.version);
            Ok(())
        },
    );
    let report = test.run();
    report.assert_success();
    let labels: Vec<&str> = report.invocations.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        ["Gradle 7.6: buildsSuccessfully", "Gradle 8.1: buildsSuccessfully"]
    );
}

#[test]
fn empty_catalog_is_a_configuration_error() {
    let err = VersionCatalog::resolve(&StaticVersions::new(Vec::<String>::new())).unwrap_err();
    assert!(matches!(err, ConfigurationError::EmptyCatalog { .. }));

    let calls = AtomicUsize::new(0);
    let test = MatrixTest::new(
        "t",
        provider(&["7.6"]),
        |_: ArgumentTuple| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    )
    .select(VersionSelection::only(v("9.0")));
    let report = test.run();
    assert!(report.invocations.is_empty());
    assert!(report.setup_error.is_some());
    assert!(!report.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn failing_fixture_is_isolated_to_its_version() {
    let resolver = RecordingResolver::failing_for(&["8.1"]);
    let seen = Mutex::new(Vec::new());
    let test = MatrixTest::new(
        "buildsSuccessfully",
        provider(&["7.6", "8.1"]).with_resolver(&resolver),
        |args: ArgumentTuple<String>| {
            seen.lock().expect("lock").push(args.fixture);
            Ok(())
        },
    );
    let report = test.run();

    assert_eq!(report.invocations.len(), 2);
    assert_eq!(report.invocations[0].outcome, Outcome::Passed);
    assert_eq!(
        report.invocations[1].outcome,
        Outcome::FixtureUnavailable {
            version: "8.1".into(),
            message: "no distribution for 8.1".into(),
        }
    );
    assert_eq!(report.invocations[1].label.as_str(), "Gradle 8.1: buildsSuccessfully");
    assert_eq!(*seen.lock().expect("lock"), vec!["fixture-7.6".to_string()]);
}

#[test]
fn consuming_first_element_resolves_only_first_fixture() {
    let resolver = RecordingResolver::default();
    let provider = provider(&["7.6", "8.1", "8.5"]).with_resolver(&resolver);
    let mut arguments = provider
        .provide_arguments(&TestContext::new("t"))
        .expect("arguments");
    let first = arguments.next().expect("first");
    assert!(resolver.resolved().is_empty());
    let tuple = first.resolve().expect("fixture");
    assert_eq!(tuple.version, v("7.6"));
    assert_eq!(resolver.resolved(), vec!["7.6"]);
}

#[test]
fn stop_on_failure_leaves_later_fixtures_unresolved() {
    let resolver = RecordingResolver::default();
    let test = MatrixTest::new(
        "t",
        provider(&["7.6", "8.1", "8.5"]).with_resolver(&resolver),
        |args: ArgumentTuple<String>| {
            ensure!(args.version != v("8.1"), "check failed on {}", args.version);
            Ok(())
        },
    );
    let report = test.run_with(&SequentialDriver::stop_on_failure());
    assert_eq!(report.invocations.len(), 2);
    assert_eq!(resolver.resolved(), vec!["7.6", "8.1"]);
    insta::assert_snapshot!(report.summary(), @r"
    t: 1 passed, 1 failed
      PASS Gradle 7.6: t
      FAIL Gradle 8.1: t - check failed on 8.1
    ");
}

#[test]
fn parallel_driver_reports_in_catalog_order() {
    let versions = ["7.6.3", "8.0", "8.1", "8.5", "8.14.3", "9.1.0"];
    let calls = AtomicUsize::new(0);
    let test = MatrixTest::new("t", provider(&versions), |_: ArgumentTuple| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let report = test.run_with(&ParallelDriver::new(4));
    report.assert_success();
    assert_eq!(calls.load(Ordering::SeqCst), versions.len());
    let args: Vec<&str> = report
        .invocations
        .iter()
        .map(|r| r.args[0].as_str())
        .collect();
    assert_eq!(args, versions);
    let indexes: Vec<usize> = report.invocations.iter().map(|r| r.index).collect();
    assert_eq!(indexes, (1..=versions.len()).collect::<Vec<_>>());
}

#[test]
fn companion_versions_cross_every_catalog_version() {
    let test = MatrixTest::new(
        "lintsCleanSources",
        provider(&["8.14.3", "9.1.0"]).with_companions("KtLint", ["1.0.1", "1.3.0"]),
        |(args, ktlint): (ArgumentTuple, String)| {
            ensure!(!ktlint.is_empty(), "missing ktlint version for {}", args.version);
            Ok(())
        },
    )
    .template("{0} with KtLint {1}: {displayName}");
    let report = test.run();
    report.assert_success();
    let labels: Vec<&str> = report.invocations.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        [
            "8.14.3 with KtLint 1.0.1: lintsCleanSources",
            "8.14.3 with KtLint 1.3.0: lintsCleanSources",
            "9.1.0 with KtLint 1.0.1: lintsCleanSources",
            "9.1.0 with KtLint 1.3.0: lintsCleanSources",
        ]
    );
}

#[test]
fn method_selection_overrides_suite_selection() {
    let suite = MatrixSuite::new("KtlintPluginTest")
        .with_selection(VersionSelection::new().at_least(v("8.0")));
    let versions = ["7.6.3", "8.1", "9.1.0"];

    let from_suite = MatrixTest::new("t", provider(&versions), |_: ArgumentTuple| Ok(()))
        .in_suite(&suite)
        .run();
    let args: Vec<&str> = from_suite.invocations.iter().map(|r| r.args[0].as_str()).collect();
    assert_eq!(args, ["8.1", "9.1.0"]);

    let from_method = MatrixTest::new("t", provider(&versions), |_: ArgumentTuple| Ok(()))
        .in_suite(&suite)
        .select(VersionSelection::new().at_most(v("8.1")))
        .run();
    let args: Vec<&str> = from_method.invocations.iter().map(|r| r.args[0].as_str()).collect();
    assert_eq!(args, ["7.6.3", "8.1"]);
}

#[test]
fn report_serializes_to_json() {
    let report = MatrixTest::new("t", provider(&["8.1"]), |_: ArgumentTuple| Ok(())).run();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().expect("json")).expect("parse");
    assert_eq!(json["test"], "t");
    assert_eq!(json["invocations"][0]["label"], "Gradle 8.1: t");
    assert_eq!(json["invocations"][0]["outcome"]["status"], "passed");
    assert!(json["started_at"].is_string());
}

#[test]
fn catalog_is_shared_across_requests() {
    let catalog = catalog(&["7.6", "8.1"]);
    let provider = VersionArgumentsProvider::new(catalog.clone());
    for _ in 0..2 {
        let indexes: Vec<usize> = provider
            .provide_arguments(&TestContext::new("t"))
            .expect("arguments")
            .map(|args| args.index())
            .collect();
        assert_eq!(indexes, [1, 2]);
    }
    assert_eq!(provider.catalog().versions(), catalog.versions());
}
