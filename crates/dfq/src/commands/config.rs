//! Config command implementation.
//!
//! View and initialize configuration settings.
//! Config file is located at ~/.config/dfq/config.toml.

use std::env;
use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use dynfilter::options::FilterOptions;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

use super::{CommandContext, CommandError, Result};

/// Current config file version. Increment when making breaking changes to schema.
const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "DFQ_CONFIG";

/// Default config file contents.
const DEFAULT_CONFIG: &str = r#"# dfq - dynamic filter CLI configuration

# Config schema version (do not modify)
version = 1

# Compilation limits and policies
[filter]
# max_depth = 20                    # Deepest allowed advanced filter tree
# max_filter_bytes = 65536          # Largest allowed `filter` parameter
# range_policy = "ignore"           # "ignore" or "reject" _min/_max on fields without range support
# unknown_type_policy = "fail"      # "fail" or "degrade_to_text"
# default_ordering = "-id"          # Used when a query has no `ordering`

# Soft-delete scoping
[soft_delete]
# flag = "is_deleted"

# Output preferences
[output]
# color = true                      # Enable colors (respects NO_COLOR env)
"#;

/// Configuration file structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Config schema version for migrations.
    /// Defaults to current version when not present in file.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Filter compilation options.
    #[serde(default)]
    pub filter: FilterOptions,

    /// Soft-delete settings.
    #[serde(default)]
    pub soft_delete: SoftDeleteConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Returns the current config version (used by serde default).
fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            filter: FilterOptions::default(),
            soft_delete: SoftDeleteConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Soft-delete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftDeleteConfig {
    /// Field marking a row as deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

/// Output configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Enable colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

/// Gets the config directory path.
/// Uses XDG-style paths: ~/.config/dfq/ on all platforms.
fn get_config_dir() -> Result<PathBuf> {
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join("dfq"));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("dfq"))
        .ok_or_else(|| CommandError::Config("Could not determine config directory".to_string()))
}

/// Gets the config file path.
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let config_dir = get_config_dir()?;
    Ok(config_dir.join("config.toml"))
}

/// Loads the configuration from disk. A missing file yields the defaults.
pub fn load_config() -> Result<Config> {
    let path = get_config_path()?;

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| CommandError::Config(format!("Failed to read config: {}", e)))?;

    parse_config(&content)
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| CommandError::Config(format!("Failed to parse config: {}", e)))?;
    migrate_config(config)
}

/// Migrates config to current version if needed.
fn migrate_config(mut config: Config) -> Result<Config> {
    if config.version > CONFIG_VERSION {
        tracing::warn!(
            version = config.version,
            supported = CONFIG_VERSION,
            "config file is newer than this dfq, reading it as the current version"
        );
    }
    config.version = CONFIG_VERSION;
    Ok(config)
}

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;
    let config = &ctx.config;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    if ctx.quiet {
        return Ok(());
    }

    let header = "Configuration";
    if ctx.use_colors {
        println!("{}\n", header.green().bold());
    } else {
        println!("{}\n", header);
    }

    println!("File: {}", path.display());
    println!("Exists: {}\n", path.exists());

    let filter = &config.filter;
    println!("[filter]");
    println!("  max_depth: {}", filter.max_depth);
    println!("  max_filter_bytes: {}", filter.max_filter_bytes);
    println!("  range_policy: {:?}", filter.range_policy);
    println!("  unknown_type_policy: {:?}", filter.unknown_type_policy);
    if let Some(ref ordering) = filter.default_ordering {
        println!("  default_ordering: {}", ordering);
    }

    println!("\n[soft_delete]");
    if let Some(ref flag) = config.soft_delete.flag {
        println!("  flag: {}", flag);
    }

    println!("\n[output]");
    if let Some(color) = config.output.color {
        println!("  color: {}", color);
    }

    if !path.exists() {
        println!("\n(No config file exists. Run 'dfq config init' to create one.)");
    }

    Ok(())
}

/// Executes the config init command.
pub fn execute_init(ctx: &CommandContext, force: bool) -> Result<()> {
    let path = get_config_path()?;

    if path.exists() && !force {
        return Err(CommandError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            CommandError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .map_err(|e| CommandError::Config(format!("Failed to write config: {}", e)))?;

    if ctx.json_output {
        let output = serde_json::json!({
            "status": "success",
            "path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("Wrote {}", path.display());
    }

    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynfilter::options::RangePolicy;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_file_parses_to_defaults() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_deserialization_empty() {
        let config = parse_config("").unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.filter, FilterOptions::default());
    }

    #[test]
    fn test_config_deserialization_partial() {
        let config = parse_config(
            r#"
[filter]
max_depth = 4
range_policy = "reject"

[soft_delete]
flag = "archived"
"#,
        )
        .unwrap();
        assert_eq!(config.filter.max_depth, 4);
        assert_eq!(config.filter.range_policy, RangePolicy::Reject);
        assert_eq!(config.filter.max_filter_bytes, 65536);
        assert_eq!(config.soft_delete.flag.as_deref(), Some("archived"));
    }

    #[test]
    fn test_config_rejects_unknown_filter_option() {
        let err = parse_config("[filter]\nmax_dept = 4\n").unwrap_err();
        assert!(matches!(err, CommandError::Config(_)));
    }

    #[test]
    fn test_config_with_future_version() {
        let config = parse_config("version = 99\n").unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let mut config = Config::default();
        config.output.color = Some(false);
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(parse_config(&text).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        env::set_var(CONFIG_ENV, &path);
        let resolved = get_config_path();
        env::remove_var(CONFIG_ENV);
        assert_eq!(resolved.unwrap(), path);
    }

    #[test]
    #[serial]
    fn test_config_path_xdg() {
        let dir = TempDir::new().unwrap();
        env::remove_var(CONFIG_ENV);
        env::set_var("XDG_CONFIG_HOME", dir.path());
        let resolved = get_config_path();
        env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(resolved.unwrap(), dir.path().join("dfq").join("config.toml"));
    }

    #[test]
    #[serial]
    fn test_load_missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        env::set_var(CONFIG_ENV, dir.path().join("absent.toml"));
        let config = load_config();
        env::remove_var(CONFIG_ENV);
        assert_eq!(config.unwrap(), Config::default());
    }
}
