//! Catalog resolution from config files and the environment

use std::fs;

use toolmatrix_core::{ConfigurationError, MatrixSettings};

use crate::common::env_of;

fn versions(settings: &MatrixSettings) -> Vec<String> {
    settings.catalog().iter().map(ToString::to_string).collect()
}

#[test]
fn config_file_drives_tool_and_bounds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("toolmatrix.toml");
    fs::write(
        &path,
        r#"
[tool]
name = "Gradle"
install_dirs = ["${GRADLE_DISTS}/gradle-{version}"]

[versions]
min = "8.0"
max = "9.1.0"
additional = ["8.5", "8.14.3"]

[runtime]
major = 17
"#,
    )
    .expect("write");

    let path_str = path.display().to_string();
    let env = env_of(&[("TOOLMATRIX_CONFIG", path_str.as_str()), ("GRADLE_DISTS", "/dists")]);
    let settings = MatrixSettings::resolve(&env).expect("settings");
    assert_eq!(versions(&settings), ["8.0", "8.5", "8.14.3", "9.1.0"]);
    assert_eq!(settings.runtime_major(), Some(17));
    assert_eq!(settings.config().tool.install_dirs, ["/dists/gradle-{version}"]);
    assert!(settings.catalog().origin().contains("toolmatrix.toml"));
}

#[test]
fn old_runtime_caps_the_default_maximum() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[runtime]\nmajor = 11\n").expect("write");

    let path_str = path.display().to_string();
    let settings = MatrixSettings::resolve(&env_of(&[("TOOLMATRIX_CONFIG", path_str.as_str())]))
        .expect("settings");
    assert_eq!(versions(&settings), ["7.6.3", "8.14.3"]);
}

#[test]
fn additional_version_outside_bounds_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[versions]\nmin = \"8.0\"\nmax = \"8.5\"\nadditional = [\"9.0\"]\n[runtime]\ndetect = false\n",
    )
    .expect("write");

    let path_str = path.display().to_string();
    let err = MatrixSettings::resolve(&env_of(&[("TOOLMATRIX_CONFIG", path_str.as_str())])).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::OutOfBounds {
            version: "9.0".into(),
            min: "8.0".into(),
            max: "8.5".into(),
        }
    );
}

#[test]
fn malformed_env_version_names_its_source() {
    let env = env_of(&[("TOOLMATRIX_VERSIONS", "8.1 eight")]);
    let err = MatrixSettings::resolve(&env).unwrap_err();
    match err {
        ConfigurationError::MalformedVersion { raw, origin, .. } => {
            assert_eq!(raw, "eight");
            assert!(origin.contains("TOOLMATRIX_VERSIONS"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[versions]\nmaximum = \"9.1.0\"\n").expect("write");

    let path_str = path.display().to_string();
    let err = MatrixSettings::resolve(&env_of(&[("TOOLMATRIX_CONFIG", path_str.as_str())])).unwrap_err();
    assert!(matches!(err, ConfigurationError::Invalid(ref message) if message.contains("maximum")));
}
