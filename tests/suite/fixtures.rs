//! Matrix runs backed by real per-version fixtures

use std::fs;
use std::path::Path;

use anyhow::{Context, ensure};
use toolmatrix_core::{ArgumentTuple, MatrixTest, Outcome, ParallelDriver};
use toolmatrix_tools::{
    FAIL_SOURCE_FILE, ProjectResolver, TestProject, ToolBinaryResolver, ToolInstallation,
};

use crate::common::{fake_installations, provider};

fn binaries(root: &Path) -> ToolBinaryResolver {
    ToolBinaryResolver::new("gradle")
        .with_install_dir(root.join("gradle-{version}").display().to_string())
        .with_wrapper_home(None)
        .search_path(false)
}

#[test]
fn installations_resolve_per_version() {
    let root = tempfile::tempdir().expect("tempdir");
    fake_installations(root.path(), &["7.6.3", "9.1.0"]);

    let test = MatrixTest::new(
        "locatesBinary",
        provider(&["7.6.3", "8.5", "9.1.0"]).with_resolver(binaries(root.path())),
        |args: ArgumentTuple<ToolInstallation>| {
            ensure!(args.fixture.version() == &args.version, "installation for another version");
            ensure!(args.fixture.binary().is_file(), "binary missing");
            Ok(())
        },
    );
    let report = test.run();

    let statuses: Vec<(&str, bool)> = report
        .invocations
        .iter()
        .map(|r| (r.args[0].as_str(), r.outcome.is_passed()))
        .collect();
    assert_eq!(statuses, [("7.6.3", true), ("8.5", false), ("9.1.0", true)]);
    assert!(matches!(
        &report.invocations[1].outcome,
        Outcome::FixtureUnavailable { version, message }
            if version == "8.5" && message.starts_with("no gradle binary found")
    ));
}

#[test]
fn every_invocation_gets_its_own_project() {
    let root = tempfile::tempdir().expect("tempdir");
    fake_installations(root.path(), &["8.1", "8.5"]);
    let resolver = ProjectResolver::new(binaries(root.path()))
        .with_setup(|dir| fs::write(dir.join("settings.gradle"), "rootProject.name = 'lint'\n"));

    let test = MatrixTest::new(
        "writesSources",
        provider(&["8.1", "8.5"]).with_resolver(resolver),
        |args: ArgumentTuple<TestProject>| {
            let project = args.fixture;
            ensure!(!project.build_file().exists(), "custom setup replaces the default");
            let settings = fs::read_to_string(project.settings_file()).context("settings")?;
            ensure!(settings.contains("'lint'"), "unexpected settings: {settings}");
            ensure!(
                !project.path().join(FAIL_SOURCE_FILE).exists(),
                "sources leaked from another invocation"
            );
            project.with_failing_sources()?;
            Ok(())
        },
    );
    test.run_with(&ParallelDriver::new(2)).assert_success();
}

#[cfg(unix)]
#[test]
fn path_binary_of_another_version_fails_only_other_invocations() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().expect("tempdir");
    let bin = root.path().join("bin");
    fs::create_dir_all(&bin).expect("mkdir");
    let gradle = bin.join("gradle");
    fs::write(&gradle, "#!/bin/sh\necho 'Gradle 9.1.0'\n").expect("write");
    fs::set_permissions(&gradle, fs::Permissions::from_mode(0o755)).expect("chmod");

    let resolver = ToolBinaryResolver::new("gradle").with_path(bin.as_os_str());
    let test = MatrixTest::new(
        "locatesBinary",
        provider(&["7.6.3", "8.1", "9.1.0"]).with_resolver(resolver),
        |args: ArgumentTuple<ToolInstallation>| {
            ensure!(args.fixture.version() == &args.version, "installation for another version");
            Ok(())
        },
    );
    let report = test.run();

    let statuses: Vec<(&str, bool)> = report
        .invocations
        .iter()
        .map(|r| (r.label.as_str(), r.outcome.is_passed()))
        .collect();
    assert_eq!(
        statuses,
        [
            ("Gradle 7.6.3: locatesBinary", false),
            ("Gradle 8.1: locatesBinary", false),
            ("Gradle 9.1.0: locatesBinary", true),
        ]
    );
    assert!(matches!(
        &report.invocations[0].outcome,
        Outcome::FixtureUnavailable { version, .. } if version == "7.6.3"
    ));
}

#[cfg(unix)]
#[test]
fn builds_run_against_the_resolved_binary() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().expect("tempdir");
    for binary in fake_installations(root.path(), &["8.1", "8.5"]) {
        let version = binary
            .parent()
            .and_then(|bin| bin.parent())
            .and_then(|home| home.file_name())
            .map(|name| name.to_string_lossy().trim_start_matches("gradle-").to_string())
            .expect("version dir");
        let script = format!(
            "#!/bin/sh\nif [ -f src/main/kotlin/FailSource.kt ]; then echo 'lint errors'; exit 1; fi\necho 'Gradle {version} BUILD SUCCESSFUL'\n"
        );
        fs::write(&binary, script).expect("write");
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    let test = MatrixTest::new(
        "lintsSources",
        provider(&["8.1", "8.5"]).with_resolver(ProjectResolver::new(binaries(root.path()))),
        |args: ArgumentTuple<TestProject>| {
            let project = args.fixture;
            project.with_clean_sources()?;
            let result = project.build(&["ktlintCheck"])?;
            ensure!(
                result.output_contains(&format!("Gradle {} BUILD SUCCESSFUL", args.version)),
                "wrong binary: {}",
                result.output
            );
            project.with_failing_sources()?;
            let failed = project.build_and_fail(&["ktlintCheck"])?;
            ensure!(failed.output_contains("lint errors"), "{}", failed.output);
            Ok(())
        },
    );
    test.run().assert_success();
}
