//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use toolmatrix_core::{
    FixtureResolutionError, FixtureResolver, StaticVersions, VersionArgumentsProvider,
    VersionCatalog,
};
use toolmatrix_types::ToolVersion;

pub fn v(raw: &str) -> ToolVersion {
    ToolVersion::parse(raw).expect("version")
}

pub fn catalog(versions: &[&str]) -> VersionCatalog {
    VersionCatalog::resolve(&StaticVersions::new(versions.iter().copied())).expect("catalog")
}

pub fn provider(versions: &[&str]) -> VersionArgumentsProvider {
    VersionArgumentsProvider::new(catalog(versions))
}

/// Environment lookup backed by a fixed map.
pub fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

/// Resolver that records every version it was asked for and fails for some.
#[derive(Debug, Default)]
pub struct RecordingResolver {
    failing: HashSet<String>,
    resolved: Mutex<Vec<String>>,
}

impl RecordingResolver {
    pub fn failing_for(versions: &[&str]) -> Self {
        Self {
            failing: versions.iter().map(ToString::to_string).collect(),
            resolved: Mutex::new(Vec::new()),
        }
    }

    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().expect("lock").clone()
    }
}

impl FixtureResolver for &RecordingResolver {
    type Fixture = String;

    fn resolve(&self, version: &ToolVersion) -> Result<String, FixtureResolutionError> {
        self.resolved.lock().expect("lock").push(version.to_string());
        if self.failing.contains(version.as_str()) {
            return Err(FixtureResolutionError::new(
                version.clone(),
                format!("no distribution for {version}"),
            ));
        }
        Ok(format!("fixture-{version}"))
    }
}

/// Creates `<root>/gradle-<version>/bin/gradle` for each version.
pub fn fake_installations(root: &Path, versions: &[&str]) -> Vec<PathBuf> {
    versions
        .iter()
        .map(|version| {
            let bin = root.join(format!("gradle-{version}")).join("bin");
            fs::create_dir_all(&bin).expect("mkdir");
            let binary = bin.join("gradle");
            fs::write(&binary, "#!/bin/sh\n").expect("write");
            binary
        })
        .collect()
}
