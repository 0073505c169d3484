//! Configuration for libris.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (LIBRIS_HOME, LIBRIS_BACKUPS, LIBRIS_QUOTA_BYTES)
//! 2. Config file (.libris/config.yaml)
//! 3. Defaults (~/.libris, backups in the current directory, 5 MiB quota)
//!
//! Config file discovery:
//! - Searches current directory and parents for .libris/config.yaml
//! - Paths in config file are relative to the config file's parent directory

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Default storage quota, roughly what a browser gives local storage
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Name of the root category created for an empty library
pub const DEFAULT_CATEGORY_NAME: &str = "Default Library";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub library: Option<LibraryConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .libris/)
    pub home: Option<String>,
    /// Where exports are written (relative to the project root)
    pub backups: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub quota_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    pub default_category: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory holding categories.json / items.json
    pub home: PathBuf,
    /// Directory receiving backup exports
    pub backups: PathBuf,
    /// Maximum bytes the persisted state may occupy
    pub quota_bytes: u64,
    /// Name for the root category of a fresh library
    pub default_category_name: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".libris").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Parse the quota override, ignoring junk
fn env_quota() -> Option<u64> {
    std::env::var("LIBRIS_QUOTA_BYTES")
        .ok()
        .and_then(|v| v.trim().parse().ok())
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".libris");
    let default_backups = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let config_file = find_config_file();

    let (home, backups, quota_bytes, default_category_name) =
        if let Some(ref config_path) = config_file {
            let config = load_config_file(config_path)?;

            // .libris/ and the project root that contains it
            let libris_dir = config_path.parent().unwrap_or(Path::new("."));
            let base_dir = libris_dir.parent().unwrap_or(Path::new("."));

            let home = if let Ok(env_home) = std::env::var("LIBRIS_HOME") {
                PathBuf::from(env_home)
            } else if let Some(ref home_path) = config.paths.home {
                resolve_path(libris_dir, home_path)
            } else {
                default_home.clone()
            };

            let backups = if let Ok(env_backups) = std::env::var("LIBRIS_BACKUPS") {
                PathBuf::from(env_backups)
            } else if let Some(ref backups_path) = config.paths.backups {
                resolve_path(base_dir, backups_path)
            } else {
                default_backups.clone()
            };

            let quota_bytes = env_quota()
                .or_else(|| config.storage.as_ref().and_then(|s| s.quota_bytes))
                .unwrap_or(DEFAULT_QUOTA_BYTES);

            let default_category_name = config
                .library
                .as_ref()
                .and_then(|l| l.default_category.clone())
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY_NAME.to_string());

            (home, backups, quota_bytes, default_category_name)
        } else {
            let home = std::env::var("LIBRIS_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_home.clone());

            let backups = std::env::var("LIBRIS_BACKUPS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_backups.clone());

            (
                home,
                backups,
                env_quota().unwrap_or(DEFAULT_QUOTA_BYTES),
                DEFAULT_CATEGORY_NAME.to_string(),
            )
        };

    Ok(ResolvedConfig {
        home,
        backups,
        quota_bytes,
        default_category_name,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the libris home directory (persisted state)
pub fn libris_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the directory backups are exported to
pub fn backups_dir() -> Result<PathBuf> {
    Ok(config()?.backups.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let libris_dir = temp.path().join(".libris");
        std::fs::create_dir_all(&libris_dir).unwrap();

        let config_path = libris_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./state
  backups: ../backups
storage:
  quota_bytes: 1024
library:
  default_category: Inbox
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./state".to_string()));
        assert_eq!(config.paths.backups, Some("../backups".to_string()));
        assert_eq!(config.storage.unwrap().quota_bytes, Some(1024));
        assert_eq!(
            config.library.unwrap().default_category,
            Some("Inbox".to_string())
        );
    }

    #[test]
    fn test_minimal_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(&config_path, "version: \"1.0\"\n").unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert!(config.paths.home.is_none());
        assert!(config.storage.is_none());
        assert!(config.library.is_none());
    }

    #[test]
    fn test_invalid_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(&config_path, "paths: [unclosed").unwrap();

        assert!(load_config_file(&config_path).is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
