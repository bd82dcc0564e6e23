//! Configuration for podvault.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variable (PODVAULT_HOME)
//! 2. Config file (.podvault/config.yaml)
//! 3. Defaults (~/.podvault)
//!
//! Config file discovery:
//! - Searches current directory and parents for .podvault/config.yaml
//! - `paths.data` is relative to the project root (the parent of .podvault/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::DownloaderConfig;

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "PODVAULT_HOME";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub downloads: Option<DownloadsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Data directory (relative to the project root)
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    pub concurrency: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub overwrite: Option<bool>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Root of the podcast library
    pub data_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Download settings
    pub downloads: DownloadSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub concurrency: usize,
    pub timeout_seconds: u64,
    pub overwrite: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout_seconds: 300,
            overwrite: false,
        }
    }
}

impl DownloadSettings {
    fn from_file(config: Option<&DownloadsConfig>) -> Self {
        let defaults = Self::default();
        let Some(config) = config else {
            return defaults;
        };

        Self {
            concurrency: config.concurrency.unwrap_or(defaults.concurrency).max(1),
            timeout_seconds: config.timeout_seconds.unwrap_or(defaults.timeout_seconds),
            overwrite: config.overwrite.unwrap_or(defaults.overwrite),
        }
    }
}

impl ResolvedConfig {
    /// Settings for the HTTP downloader
    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            concurrency: self.downloads.concurrency,
            timeout: Duration::from_secs(self.downloads.timeout_seconds),
            overwrite: self.downloads.overwrite,
        }
    }
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".podvault").join("config.yaml");
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

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Resolve configuration from an explicit env value and config file
fn resolve(env_home: Option<String>, config_file: Option<PathBuf>) -> Result<ResolvedConfig> {
    let file = config_file.as_deref().map(load_config_file).transpose()?;

    let data_dir = if let Some(home) = env_home {
        PathBuf::from(home)
    } else if let (Some(path), Some(data)) = (
        config_file.as_deref(),
        file.as_ref().and_then(|f| f.paths.data.as_deref()),
    ) {
        // Base directory is the parent of .podvault/
        let base_dir = path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));
        resolve_path(base_dir, data)
    } else {
        dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".podvault")
    };

    let downloads = DownloadSettings::from_file(file.as_ref().and_then(|f| f.downloads.as_ref()));

    Ok(ResolvedConfig {
        data_dir,
        config_file,
        downloads,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let env_home = std::env::var(HOME_ENV).ok().filter(|v| !v.is_empty());
    let config_file = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_file(&cwd));

    resolve(env_home, config_file)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the data directory
pub fn data_dir() -> Result<PathBuf> {
    Ok(config()?.data_dir.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(root: &Path, body: &str) -> PathBuf {
        let dir = root.join(".podvault");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", body).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = resolve(None, None).unwrap();

        let expected = dirs::home_dir().unwrap().join(".podvault");
        assert_eq!(config.data_dir, expected);
        assert!(config.config_file.is_none());
        assert_eq!(config.downloads, DownloadSettings::default());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
version: "1.0"
paths:
  data: ./library
downloads:
  concurrency: 8
  overwrite: true
"#,
        );

        let file = load_config_file(&path).unwrap();
        assert_eq!(file.version, "1.0");
        assert_eq!(file.paths.data, Some("./library".to_string()));

        let config = resolve(None, Some(path.clone())).unwrap();
        assert_eq!(config.data_dir, temp.path().join("./library"));
        assert_eq!(config.downloads.concurrency, 8);
        assert_eq!(config.downloads.timeout_seconds, 300);
        assert!(config.downloads.overwrite);
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "version: \"1.0\"\npaths:\n  data: ./library\n");

        let config = resolve(Some("/srv/podcasts".to_string()), Some(path)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/podcasts"));
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "version: \"1.0\"");
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested), Some(path));
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let settings = DownloadSettings::from_file(Some(&DownloadsConfig {
            concurrency: Some(0),
            timeout_seconds: Some(10),
            overwrite: None,
        }));

        assert_eq!(settings.concurrency, 1);
        assert_eq!(settings.timeout_seconds, 10);
        assert!(!settings.overwrite);
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/./subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
