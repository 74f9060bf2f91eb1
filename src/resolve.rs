//! End-to-end command resolution
//!
//! A single invocation flows through fixed phases:
//!
//! 1. hard-coded defaults (the options tree's `Default` impls);
//! 2. a peek parse of the root scope only, so the config-file location,
//!    a credentials override, `--help` and `--version` work before any
//!    file or network access;
//! 3. full resolution: config file over defaults, CLI globals back on
//!    top, then logging, credentials, the API client, the materialized
//!    command tree, and the dispatch walk that parses every scope on the
//!    requested path;
//! 4. leaf validation and execution.
//!
//! Exit codes: 0 for success (dry runs, help and version included), 2
//! for usage errors, and 1 via `main` for everything else.

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::error::ErrorKind;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::commands::{self, Context, Dispatch};
use crate::forge::auth::Credentials;
use crate::forge::ForgeClient;
use crate::options::{GlobalOptions, OptionSet, Options};

const USAGE_EXIT: u8 = 2;

/// Run one invocation. `argv` excludes the binary name. The returned
/// code is the process exit code; hard failures come back as `Err` and
/// exit 1.
pub async fn run(argv: Vec<String>) -> Result<u8> {
    let mut root = commands::root();

    // Root-scope peek.
    let root_matches = match root.clap_command().try_get_matches_from(&argv) {
        Ok(matches) => matches,
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            err.print().ok();
            return Ok(0);
        }
        Err(err) => {
            err.print().ok();
            return Ok(USAGE_EXIT);
        }
    };
    let mut peek = GlobalOptions::default();
    peek.apply(&root_matches);

    if peek.version {
        println!("forgectl {}", crate::VERSION);
        return Ok(0);
    }
    if root_matches.subcommand().is_none() && !peek.show_config {
        eprintln!("{}", root.render_usage());
        return Ok(USAGE_EXIT);
    }

    // Defaults, then the config file, then the CLI again on top. The
    // config-file location itself only ever comes from the peek.
    let mut options = Options::load(peek.config.as_deref())?;
    options.global.config = peek.config.clone();
    options.global.apply(&root_matches);

    let _log_guard = setup_logging(&options.global)?;

    if root_matches.subcommand().is_none() {
        // --show-config without a command prints the resolved tree and
        // stops before credentials are required.
        print!("{}", options.to_yaml()?);
        return Ok(0);
    }

    let credentials_path = options.global.credentials_path()?;
    let credentials = Credentials::load(&credentials_path)?;
    tracing::debug!(
        "using {} credentials from {}",
        credentials.scheme(),
        credentials_path.display()
    );
    let client = ForgeClient::new(&options.global.base_url, credentials)?;
    let ctx = Context { client };

    root.materialize();

    let leaf = match root.dispatch(&mut options, &argv) {
        Ok(Dispatch::Command(leaf)) => leaf,
        Ok(Dispatch::HelpShown) => return Ok(0),
        Err(err) => {
            eprintln!("{err}");
            return Ok(USAGE_EXIT);
        }
    };

    if options.global.show_config {
        print!("{}", options.to_yaml()?);
    }

    leaf.validate(&options)
        .with_context(|| format!("invalid arguments for {:?}", leaf.path()))?;
    leaf.run(&ctx, &options).await?;
    Ok(0)
}

/// Convert `run`'s result into a process exit code, reporting hard
/// failures on stderr.
pub fn exit_code(result: Result<u8>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Install the tracing subscriber per the resolved global options.
///
/// `--log-level off` (the default) keeps logging silent unless RUST_LOG
/// asks for it; a set flag wins over the environment. With `--log-file`
/// output goes through a non-blocking appender whose guard must stay
/// alive for the process, otherwise to stderr so logs never mix with
/// command output on stdout.
fn setup_logging(global: &GlobalOptions) -> Result<Option<WorkerGuard>> {
    let filter = match global.log_level.to_tracing_level() {
        Some(level) => EnvFilter::new(level.to_string()),
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => return Ok(None),
        },
    };

    let guard = match &global.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("unable to create log directory {}", parent.display())
                    })?;
                }
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("unable to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .try_init()
                .ok();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .try_init()
                .ok();
            None
        }
    };

    tracing::info!("forgectl {} started", crate::VERSION);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    fn args(argv: &[&str]) -> Vec<String> {
        argv.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn version_flag_short_circuits() {
        let code = block_on(run(args(&["--version"]))).unwrap();
        assert_eq!(code, 0);
        let code = block_on(run(args(&["-v"]))).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn bare_invocation_is_a_usage_error() {
        let code = block_on(run(Vec::new())).unwrap();
        assert_eq!(code, USAGE_EXIT);
    }

    #[test]
    fn unknown_root_flag_is_a_usage_error() {
        let code = block_on(run(args(&["--no-such-flag"]))).unwrap();
        assert_eq!(code, USAGE_EXIT);
    }

    #[test]
    fn root_help_exits_cleanly() {
        let code = block_on(run(args(&["--help"]))).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn version_beats_missing_credentials() {
        // No credentials file anywhere near this path; version must not
        // care.
        let code = block_on(run(args(&[
            "--credentials",
            "/nonexistent/creds.yaml",
            "--version",
        ])))
        .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn explicit_missing_config_file_is_fatal() {
        let err = block_on(run(args(&[
            "--config",
            "/nonexistent/forgectl.yaml",
            "--show-config",
        ])))
        .unwrap_err();
        assert!(err.to_string().contains("unable to read config file"));
    }
}
