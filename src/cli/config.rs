use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::manifest::{self, MANIFEST_FILE};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "seriorch",
    version,
    about = "Splits scenario data files into editable parts and puts them back together"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: $XDG_CONFIG_HOME/seriorch/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project in the current directory
    Init,

    /// Decompose a data file into the manifest and side-car files
    Unravel {
        /// Data file to decompose
        file: PathBuf,

        /// Run again whenever a project file changes
        #[arg(long)]
        watch: bool,
    },

    /// Compose the data file from the manifest and deliver it
    Build {
        /// Run again whenever a project file changes
        #[arg(long)]
        watch: bool,
    },

    /// Render the SQL script updating the records in the database
    Inject {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Log level for the number of `-v` flags.
pub fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Installs the process-wide logger. Fails when one is already set.
pub fn init_logging(verbose: u8) -> Result<()> {
    simplelog::SimpleLogger::init(log_level(verbose), simplelog::Config::default())?;
    Ok(())
}

// ============================================================================
// Config File Model (YAML)
// ============================================================================

/// Resolved configuration, passed by reference to every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// File written by `build` before delivery
    #[serde(default = "default_build_name")]
    pub build_name: String,

    /// Copy the build to its destination instead of moving it
    #[serde(default)]
    pub keep_build: bool,

    #[serde(default = "default_surrounding_tag")]
    pub surrounding_tag: String,

    /// Initial target of the `location` link
    #[serde(default = "default_destination")]
    pub default_destination: String,

    /// Commit the project after each unravel
    #[serde(default)]
    pub unravel_commit: bool,

    /// Create a git repository on init
    #[serde(default = "default_true")]
    pub git: bool,

    #[serde(default)]
    pub watch: bool,

    #[serde(default)]
    pub db: DbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_name: default_build_name(),
            keep_build: false,
            surrounding_tag: default_surrounding_tag(),
            default_destination: default_destination(),
            unravel_commit: false,
            git: true,
            watch: false,
            db: DbConfig::default(),
        }
    }
}

/// Connection settings used by `inject`. The database name itself comes
/// from the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DbConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
}

// Serde default helpers
fn default_build_name() -> String { "build.xml".to_string() }
fn default_surrounding_tag() -> String { "odoo".to_string() }
fn default_destination() -> String { ".".to_string() }
fn default_true() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

/// `$XDG_CONFIG_HOME/seriorch/config.yaml`, else `~/.config/seriorch/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("seriorch").join("config.yaml"))
}

fn parse_config(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    match serde_yaml::from_str::<Value>(content)? {
        Value::Null => Ok(Config::default()),
        value => Ok(serde_yaml::from_value(value)?),
    }
}

/// Loads the user config. An explicit `path` must exist; the default
/// location may be missing, in which case defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let (config_path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(Config::default()),
        },
    };

    match std::fs::read_to_string(&config_path) {
        Ok(content) => parse_config(&content),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(Error::io(config_path, e)),
    }
}

impl Config {
    /// Applies the manifest's `config:` mapping on top of this config.
    pub fn with_overrides(self, overrides: &Mapping) -> Result<Config> {
        let Value::Mapping(mut merged) = serde_yaml::to_value(&self)? else {
            return Ok(self);
        };
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        Ok(serde_yaml::from_value(Value::Mapping(merged))?)
    }

    /// Applies the `config:` mapping of the project's manifest, if any.
    pub fn with_manifest_overrides(self, project: &Path) -> Result<Config> {
        let manifest_path = project.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Ok(self);
        }
        match manifest::read_manifest(&manifest_path)?.get("config") {
            None | Some(Value::Null) => Ok(self),
            Some(Value::Mapping(overrides)) => self.with_overrides(overrides),
            Some(_) => Err(Error::ManifestShape {
                reason: "\"config\" should be a mapping".into(),
            }),
        }
    }
}

/// User config, then project overrides.
pub fn resolve_config(path: Option<&Path>, project: &Path) -> Result<Config> {
    load_config(path)?.with_manifest_overrides(project)
}
