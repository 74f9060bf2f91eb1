//! Options tree and configuration loading
//!
//! One nested, strictly-typed tree mirrors the command hierarchy; every
//! leaf command's parameters are a named substruct. The tree is filled in
//! exactly three ordered passes: hard-coded defaults at construction, the
//! YAML config file overlaying every field it names, and finally the
//! command line overwriting every flag the user actually supplied
//! (detected through clap's `ValueSource`). Nothing mutates it after
//! dispatch resolution.
//!
//! The config-file location itself is CLI-only: its field is
//! `#[serde(skip)]`, so a file that tries to set it is ignored by
//! construction.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::commands::approval_rules::{RulesListOptions, RulesUpdateOptions};
use crate::commands::projects::{CreateRandomOptions, DeleteOptions, ProjectsListOptions};
use crate::commands::users::UsersListOptions;

/// Base URL used when neither the config file nor the CLI names one.
pub const DEFAULT_BASE_URL: &str = "https://forge.example.com";

/// One options substruct: registers its flags on a clap command and copies
/// CLI-supplied values (only those) back onto itself.
pub trait OptionSet {
    fn register(cmd: Command) -> Command;
    fn apply(&mut self, matches: &ArgMatches);
}

/// True when the user supplied this flag on the command line, as opposed
/// to clap filling in a default.
pub fn from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// A boolean flag accepting `--name` and `--name=false`.
///
/// The `=false` form lets the CLI override a `true` from the config file;
/// `require_equals` keeps `--name value` from swallowing a following
/// subcommand name.
pub fn bool_flag(name: &'static str, short: Option<char>, help: &'static str) -> Arg {
    let mut arg = Arg::new(name)
        .long(name)
        .help(help)
        .num_args(0..=1)
        .require_equals(true)
        .default_missing_value("true")
        .value_parser(value_parser!(bool));
    if let Some(short) = short {
        arg = arg.short(short);
    }
    arg
}

/// Copy a CLI-supplied bool flag onto `field`, leaving it alone otherwise.
pub fn apply_bool(matches: &ArgMatches, id: &str, field: &mut bool) {
    if from_cli(matches, id) {
        if let Some(value) = matches.get_one::<bool>(id) {
            *field = *value;
        }
    }
}

/// Copy a CLI-supplied string flag onto `field`, leaving it alone otherwise.
pub fn apply_string(matches: &ArgMatches, id: &str, field: &mut String) {
    if from_cli(matches, id) {
        if let Some(value) = matches.get_one::<String>(id) {
            *field = value.clone();
        }
    }
}

/// Fail with a consistent message when a required flag is still unset
/// after full resolution.
pub fn require_set(value: &str, flag: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{flag} must be set (flag or config file)");
    }
    Ok(())
}

/// Log verbosity for the --log-level flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Option<tracing::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Trace => Some(tracing::Level::TRACE),
        }
    }
}

/// Root-scope options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GlobalOptions {
    /// Where the config file itself lives. CLI-only by construction.
    #[serde(skip)]
    pub config: Option<PathBuf>,
    /// Credentials file; defaults next to the config file.
    pub credentials: Option<PathBuf>,
    pub base_url: String,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    #[serde(skip)]
    pub show_config: bool,
    #[serde(skip)]
    pub version: bool,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            config: None,
            credentials: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            log_level: LogLevel::default(),
            log_file: None,
            show_config: false,
            version: false,
        }
    }
}

impl GlobalOptions {
    /// Credentials path after defaulting.
    pub fn credentials_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.credentials {
            return Ok(path.clone());
        }
        default_credentials_path()
            .context("no credentials file given and no user config directory to look in")
    }
}

impl OptionSet for GlobalOptions {
    fn register(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("config file with defaults for any flag")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("credentials")
                .long("credentials")
                .value_name("FILE")
                .help("credentials file for the Forge API")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .value_name("URL")
                .help("base URL of the Forge instance"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("log verbosity")
                .value_parser(value_parser!(LogLevel)),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("append logs to this file instead of stderr")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("show-config")
                .long("show-config")
                .help("print the resolved configuration")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .help("print version and exit")
                .action(ArgAction::SetTrue),
        )
    }

    fn apply(&mut self, matches: &ArgMatches) {
        if from_cli(matches, "config") {
            self.config = matches.get_one::<PathBuf>("config").cloned();
        }
        if from_cli(matches, "credentials") {
            self.credentials = matches.get_one::<PathBuf>("credentials").cloned();
        }
        apply_string(matches, "base-url", &mut self.base_url);
        if from_cli(matches, "log-level") {
            if let Some(level) = matches.get_one::<LogLevel>("log-level") {
                self.log_level = *level;
            }
        }
        if from_cli(matches, "log-file") {
            self.log_file = matches.get_one::<PathBuf>("log-file").cloned();
        }
        if from_cli(matches, "show-config") {
            self.show_config = true;
        }
        if from_cli(matches, "version") {
            self.version = true;
        }
    }
}

/// Options for the `projects` subtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectsOptions {
    pub list: ProjectsListOptions,
    pub create_random: CreateRandomOptions,
    pub delete: DeleteOptions,
    pub approval_rules: ApprovalRulesOptions,
}

/// Options for the `projects approval-rules` subtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApprovalRulesOptions {
    pub list: RulesListOptions,
    pub update: RulesUpdateOptions,
}

/// Options for the `users` subtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UsersOptions {
    pub list: UsersListOptions,
}

/// The whole options tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Options {
    pub global: GlobalOptions,
    pub projects: ProjectsOptions,
    pub users: UsersOptions,
}

impl Options {
    /// Build the tree from defaults overlaid with the config file.
    ///
    /// With an explicit path the file must exist and parse. With no
    /// override, a missing file at the default location just yields the
    /// defaults; anything present must parse.
    pub fn load(config_override: Option<&Path>) -> Result<Options> {
        let path = match config_override {
            Some(path) => path.to_path_buf(),
            None => {
                let Some(path) = default_config_path() else {
                    return Ok(Options::default());
                };
                if !path.exists() {
                    tracing::debug!("no config file at {}", path.display());
                    return Ok(Options::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let options: Options = serde_yaml::from_str(&content)
            .with_context(|| format!("malformed config file {}", path.display()))?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(options)
    }

    /// Render the resolved tree in the config-file format.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("unable to render configuration")
    }
}

fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("forgectl"))
}

/// `<config_dir>/forgectl/config.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.yaml"))
}

/// `<config_dir>/forgectl/credentials.yaml`, if the platform has one.
pub fn default_credentials_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("credentials.yaml"))
}
