//! toolmatrix CLI - inspect the version matrix a test run would use.
//!
//! ```text
//! toolmatrix versions            catalog and where it came from
//! toolmatrix labels <test>       invocation labels for one test
//! toolmatrix check               exit 1 on configuration errors
//! toolmatrix resolve             which versions have an installed binary
//! ```
//!
//! Logging goes to stderr and honors `RUST_LOG`.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use toolmatrix_config::{CONFIG_ENV, RUNTIME_MAJOR_ENV, process_env};
use toolmatrix_core::{DisplayNameFormatter, MatrixSettings};
use toolmatrix_tools::ToolBinaryResolver;

#[derive(Debug, Parser)]
#[command(name = "toolmatrix", version)]
#[command(about = "Inspect the tool versions a matrix test run would use")]
struct Cli {
    /// Config file to use instead of the default search
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Host Java major version; skips running `java -version`
    #[arg(long, global = true, value_name = "MAJOR")]
    runtime_major: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the resolved version catalog and its source
    Versions {
        /// Print a JSON array instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the label of every invocation of a test
    Labels {
        /// Test display name
        test: String,
        /// Label template, e.g. "Gradle {0}: {displayName}"
        #[arg(long)]
        template: Option<String>,
    },
    /// Validate the configuration (exit 1 on error)
    Check,
    /// Report which versions have a locatable binary
    Resolve {
        /// Exit 1 when any version has no binary
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let env = environment(&cli);
    let mut out = io::stdout().lock();

    match &cli.command {
        Commands::Versions { json } => {
            let settings = MatrixSettings::resolve(&env)?;
            print_versions(&settings, *json, &mut out)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Labels { test, template } => {
            let settings = MatrixSettings::resolve(&env)?;
            print_labels(&settings, test, template.as_deref(), &mut out)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => match MatrixSettings::resolve(&env) {
            Ok(settings) => {
                writeln!(
                    out,
                    "ok: {} {} version(s) from {}",
                    settings.catalog().len(),
                    settings.tool(),
                    settings.catalog().origin()
                )?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                eprintln!("configuration error: {err}");
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::Resolve { strict } => {
            let settings = MatrixSettings::resolve(&env)?;
            let resolver = ToolBinaryResolver::from_config(&settings.config().tool, &env);
            let missing = print_resolution(&settings, &resolver, &mut out)?;
            if *strict && missing > 0 {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("error"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

/// Process environment with the command-line overrides applied.
fn environment(cli: &Cli) -> impl Fn(&str) -> Option<String> + use<> {
    let config = cli.config.as_ref().map(|path| path.display().to_string());
    let runtime = cli.runtime_major.map(|major| major.to_string());

    move |key: &str| match key {
        CONFIG_ENV if config.is_some() => config.clone(),
        RUNTIME_MAJOR_ENV if runtime.is_some() => runtime.clone(),
        _ => process_env(key),
    }
}

fn print_versions(settings: &MatrixSettings, json: bool, out: &mut impl Write) -> Result<()> {
    let catalog = settings.catalog();
    if json {
        let versions: Vec<&str> = catalog.iter().map(|version| version.as_str()).collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&versions)?)?;
        return Ok(());
    }
    writeln!(out, "{} versions from {}:", settings.tool(), catalog.origin())?;
    for version in catalog {
        writeln!(out, "  {version}")?;
    }
    Ok(())
}

fn print_labels(
    settings: &MatrixSettings,
    test: &str,
    template: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let formatter = match template {
        Some(template) => DisplayNameFormatter::with_template(template)
            .with_context(|| format!("invalid label template {template:?}"))?,
        None => DisplayNameFormatter::for_tool(settings.tool()),
    };
    for (position, version) in settings.catalog().iter().enumerate() {
        let label = formatter.render(position + 1, &[version.to_string()], test)?;
        writeln!(out, "{label}")?;
    }
    Ok(())
}

/// Prints one line per version and returns how many had no binary.
fn print_resolution(
    settings: &MatrixSettings,
    resolver: &ToolBinaryResolver,
    out: &mut impl Write,
) -> Result<usize> {
    let mut missing = 0;
    for version in settings.catalog() {
        match resolver.locate(version) {
            Ok(installation) => writeln!(out, "{version}\t{}", installation.binary().display())?,
            Err(err) => {
                missing += 1;
                writeln!(out, "{version}\tmissing: {}", err.message())?;
            }
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use clap::{CommandFactory, Parser};
    use toolmatrix_config::MatrixConfig;
    use toolmatrix_core::MatrixSettings;
    use toolmatrix_tools::ToolBinaryResolver;

    use super::{Cli, Commands, environment, print_labels, print_resolution, print_versions};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn settings(versions: &[&str]) -> MatrixSettings {
        let list = versions
            .iter()
            .map(|v| format!("\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let content = format!("[versions]\nlist = [{list}]");
        let config = MatrixConfig::parse(&content, &PathBuf::from("toolmatrix.toml"), &no_env)
            .expect("config");
        MatrixSettings::from_config("toolmatrix.toml", config, &no_env).expect("settings")
    }

    fn output(write: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer);
        String::from_utf8(buffer).expect("utf8")
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands_and_global_flags() {
        let cli = Cli::try_parse_from([
            "toolmatrix",
            "labels",
            "buildsSuccessfully",
            "--template",
            "{0} with KtLint",
            "--config",
            "custom.toml",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(
            cli.command,
            Commands::Labels { ref test, template: Some(ref template) }
                if test == "buildsSuccessfully" && template == "{0} with KtLint"
        ));

        let cli = Cli::try_parse_from(["toolmatrix", "resolve", "--strict"]).expect("parse");
        assert!(matches!(cli.command, Commands::Resolve { strict: true }));
        assert!(Cli::try_parse_from(["toolmatrix", "labels"]).is_err());
    }

    #[test]
    fn config_flag_overrides_environment() {
        let cli = Cli::try_parse_from(["toolmatrix", "--config", "matrix.toml", "check"]).expect("parse");
        let env = environment(&cli);
        assert_eq!(env("TOOLMATRIX_CONFIG").as_deref(), Some("matrix.toml"));

        let cli = Cli::try_parse_from(["toolmatrix", "versions", "--runtime-major", "11"]).expect("parse");
        let env = environment(&cli);
        assert_eq!(env("TOOLMATRIX_RUNTIME_MAJOR").as_deref(), Some("11"));
    }

    #[test]
    fn prints_versions_as_text_and_json() {
        let settings = settings(&["7.6", "8.1"]);
        let text = output(|out| print_versions(&settings, false, out).expect("print"));
        assert_eq!(text, "Gradle versions from toolmatrix.toml:\n  7.6\n  8.1\n");
        let json = output(|out| print_versions(&settings, true, out).expect("print"));
        let parsed: Vec<String> = serde_json::from_str(&json).expect("json");
        assert_eq!(parsed, vec!["7.6", "8.1"]);
    }

    #[test]
    fn prints_default_and_custom_labels() {
        let settings = settings(&["7.6", "8.1"]);
        let labels = output(|out| print_labels(&settings, "buildsSuccessfully", None, out).expect("labels"));
        assert_eq!(
            labels,
            "Gradle 7.6: buildsSuccessfully\nGradle 8.1: buildsSuccessfully\n"
        );
        let custom = output(|out| {
            print_labels(&settings, "t", Some("[{index}] {version}"), out).expect("labels");
        });
        assert_eq!(custom, "[1] 7.6\n[2] 8.1\n");
        let mut sink = Vec::new();
        assert!(print_labels(&settings, "t", Some("{nope}"), &mut sink).is_err());
    }

    #[test]
    fn resolution_counts_missing_versions() {
        let root = tempfile::tempdir().expect("tempdir");
        let bin = root.path().join("gradle-8.1").join("bin");
        fs::create_dir_all(&bin).expect("mkdir");
        fs::write(bin.join("gradle"), "").expect("write");
        let resolver = ToolBinaryResolver::new("gradle")
            .with_install_dir(root.path().join("gradle-{version}").display().to_string())
            .search_path(false);

        let settings = settings(&["7.6", "8.1"]);
        let mut buffer = Vec::new();
        let missing = print_resolution(&settings, &resolver, &mut buffer).expect("resolve");
        assert_eq!(missing, 1);
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.starts_with("7.6\tmissing: no gradle binary found"));
        assert!(text.contains("8.1\t"));
    }

    #[cfg(unix)]
    #[test]
    fn resolution_rejects_path_binary_of_another_version() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().expect("tempdir");
        let gradle = root.path().join("gradle");
        fs::write(&gradle, "#!/bin/sh\necho 'Gradle 9.1.0'\n").expect("write");
        fs::set_permissions(&gradle, fs::Permissions::from_mode(0o755)).expect("chmod");

        let path = root.path().display().to_string();
        let settings = settings(&["7.6.3", "8.1"]);
        let env = |key: &str| -> Option<String> { (key == "PATH").then(|| path.clone()) };
        let resolver =
            ToolBinaryResolver::from_config(&settings.config().tool, &env).with_wrapper_home(None);

        let mut buffer = Vec::new();
        let missing = print_resolution(&settings, &resolver, &mut buffer).expect("resolve");
        assert_eq!(missing, 2);
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("7.6.3\tmissing: "), "{text}");
        assert!(text.contains("8.1\tmissing: "), "{text}");
    }
}
