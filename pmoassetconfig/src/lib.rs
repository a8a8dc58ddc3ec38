//! # PMOAssets Configuration Module
//!
//! Configuration management for the asset cache engine:
//! - Loading configuration from a YAML file
//! - Merging with the embedded default configuration
//! - Environment variable overrides (`PMOASSETS_CONFIG__SECTION__KEY=value`)
//! - Typed getters and setters for the cache settings
//!
//! ## Usage
//!
//! ```no_run
//! use pmoassetconfig::Config;
//!
//! let config = Config::load("")?;
//! let root = config.get_cache_root()?;
//! let timeout = config.get_download_timeout();
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! There is no global singleton: the loaded [`Config`] is passed explicitly
//! to whoever opens the caches.

use anyhow::{anyhow, Result};
use dirs::home_dir;
use parking_lot::Mutex;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

pub mod logging;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmoassets.yaml");

const ENV_CONFIG_DIR: &str = "PMOASSETS_CONFIG";
const ENV_PREFIX: &str = "PMOASSETS_CONFIG__";

const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Configuration manager for the asset caches
///
/// Holds the merged YAML tree. When the configuration was loaded from a
/// directory, every setter writes the tree back to `config.yaml`.
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: Option<PathBuf>,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        if Path::new(".pmoassets").exists() {
            return PathBuf::from(".pmoassets");
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(".pmoassets");
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(".pmoassets")
    }

    /// Loads the configuration from the specified directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMOASSETS_CONFIG` environment variable
    /// 3. `.pmoassets` in the current directory
    /// 4. `.pmoassets` in the user's home directory
    ///
    /// The embedded defaults are merged with `config.yaml` (if present),
    /// environment overrides are applied and the result is saved back.
    pub fn load(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        fs::create_dir_all(&config_dir)?;
        if !config_dir.is_dir() {
            return Err(anyhow!("{} is not a directory", config_dir.display()));
        }
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join("config.yaml");
        let external = match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                Some(serde_yaml::from_slice::<Value>(&data)?)
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using defaults");
                None
            }
        };

        let mut value = Self::merged_defaults(external.as_ref())?;
        Self::apply_overrides(&mut value, env::vars());

        let config = Config {
            config_dir,
            path: Some(path),
            data: Mutex::new(value),
        };
        config.save()?;
        Ok(config)
    }

    /// Builds an in-memory configuration from a YAML document merged over
    /// the defaults. Nothing is read from or written to disk; relative
    /// directories resolve against `config_dir`.
    pub fn from_yaml_str(yaml: &str, config_dir: impl Into<PathBuf>) -> Result<Self> {
        let external: Value = serde_yaml::from_str(yaml)?;
        Ok(Config {
            config_dir: config_dir.into(),
            path: None,
            data: Mutex::new(Self::merged_defaults(Some(&external))?),
        })
    }

    fn merged_defaults(external: Option<&Value>) -> Result<Value> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if let Some(external) = external {
            merge_yaml(&mut value, &lower_keys_value(external.clone()));
        }
        Ok(lower_keys_value(value))
    }

    /// Applies `PMOASSETS_CONFIG__A__B=value` style overrides.
    pub fn apply_overrides<I>(config: &mut Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = serde_yaml::from_str::<Value>(&value)
                    .unwrap_or_else(|_| Value::String(value.clone()));
                let _ = set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    /// Saves the current configuration to `config.yaml` (no-op for
    /// in-memory configurations)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let yaml = serde_yaml::to_string(&*self.data.lock())?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Directory the relative paths of the configuration resolve against
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Sets a configuration value at the specified path and saves it
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        set_value_internal(&mut self.data.lock(), path, value)?;
        self.save()
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock();
        let mut current = &*data;
        for (i, key) in path.iter().enumerate() {
            let Value::Mapping(map) = current else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            };
            current = map
                .get(Value::String(key.to_lowercase()))
                .ok_or_else(|| anyhow!("Path {} does not exist", path[..=i].join(".")))?;
        }
        Ok(current.clone())
    }

    fn resolve_dir(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Root directory of every cache namespace, created if missing
    pub fn get_cache_root(&self) -> Result<PathBuf> {
        let dir = match self.get_value(&["cache", "root"])? {
            Value::String(s) => s,
            other => return Err(anyhow!("cache.root is not a string (found {other:?})")),
        };
        let root = self.resolve_dir(&dir);
        if !root.exists() {
            fs::create_dir_all(&root)?;
            info!(directory = %root.display(), "Created cache root directory");
        }
        Ok(root)
    }

    pub fn set_cache_root(&self, directory: &str) -> Result<()> {
        self.set_value(&["cache", "root"], Value::String(directory.to_string()))
    }

    /// Sub-directory name of a namespace (`images`, `fonts`, ...), falling
    /// back to the namespace key itself
    pub fn get_namespace_dir(&self, namespace: &str) -> String {
        match self.get_value(&["cache", "namespaces", namespace]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => namespace.to_string(),
        }
    }

    pub fn set_namespace_dir(&self, namespace: &str, directory: &str) -> Result<()> {
        self.set_value(
            &["cache", "namespaces", namespace],
            Value::String(directory.to_string()),
        )
    }

    /// File name of the preferences database, inside the cache root
    pub fn get_preferences_file(&self) -> String {
        match self.get_value(&["cache", "preferences"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => "preferences.db".to_string(),
        }
    }

    /// Bounded timeout applied to every resource download
    pub fn get_download_timeout(&self) -> Duration {
        match self.get_value(&["cache", "download_timeout_secs"]) {
            Ok(Value::Number(n)) => match n.as_u64() {
                Some(secs) if secs > 0 => Duration::from_secs(secs),
                _ => Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            },
            _ => Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }

    pub fn set_download_timeout(&self, timeout: Duration) -> Result<()> {
        self.set_value(
            &["cache", "download_timeout_secs"],
            Value::Number(Number::from(timeout.as_secs())),
        )
    }

    pub fn get_log_min_level(&self) -> String {
        match self.get_value(&["log", "min_level"]) {
            Ok(Value::String(s)) => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }

    pub fn set_log_min_level(&self, level: &str) -> Result<()> {
        self.set_value(&["log", "min_level"], Value::String(level.to_string()))
    }

    pub fn get_log_enable_console(&self) -> bool {
        match self.get_value(&["log", "enable_console"]) {
            Ok(Value::Bool(b)) => b,
            _ => DEFAULT_LOG_ENABLE_CONSOLE,
        }
    }
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    let Value::Mapping(map) = data else {
        return Err(anyhow!("Current node is not a mapping"));
    };
    let key = Value::String(path[0].to_lowercase());
    if path.len() == 1 {
        map.insert(key, value);
        Ok(())
    } else {
        let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        set_value_internal(entry, &path[1..], value)
    }
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys_value(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        other => other,
    }
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        // scalaires et séquences : on remplace
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("{}", "/tmp/pmoassets").unwrap();
        assert_eq!(config.get_download_timeout(), Duration::from_secs(10));
        assert_eq!(config.get_namespace_dir("images"), "images");
        assert_eq!(config.get_namespace_dir("unknown"), "unknown");
        assert_eq!(config.get_log_min_level(), "INFO");
        assert!(config.get_log_enable_console());
    }

    #[test]
    fn test_merge_keeps_unrelated_defaults() {
        let config = Config::from_yaml_str(
            "Cache:\n  Download_Timeout_Secs: 3\n  namespaces:\n    fonts: typefaces\n",
            "/tmp/pmoassets",
        )
        .unwrap();
        assert_eq!(config.get_download_timeout(), Duration::from_secs(3));
        assert_eq!(config.get_namespace_dir("fonts"), "typefaces");
        assert_eq!(config.get_namespace_dir("images"), "images");
    }

    #[test]
    fn test_env_overrides() {
        let mut value = Config::merged_defaults(None).unwrap();
        Config::apply_overrides(
            &mut value,
            vec![
                ("PMOASSETS_CONFIG__CACHE__DOWNLOAD_TIMEOUT_SECS".to_string(), "42".to_string()),
                ("PMOASSETS_CONFIG__LOG__MIN_LEVEL".to_string(), "debug".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );
        let config = Config {
            config_dir: PathBuf::from("/tmp"),
            path: None,
            data: Mutex::new(value),
        };
        assert_eq!(config.get_download_timeout(), Duration::from_secs(42));
        assert_eq!(config.get_log_min_level(), "debug");
    }

    #[test]
    fn test_zero_timeout_falls_back() {
        let config =
            Config::from_yaml_str("cache:\n  download_timeout_secs: 0\n", "/tmp").unwrap();
        assert_eq!(config.get_download_timeout(), Duration::from_secs(10));
    }
}
