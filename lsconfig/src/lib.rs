//! # LiveStream configuration
//!
//! Configuration management for the LiveStream monitor:
//! - Embedded default configuration (`livestream.yaml`)
//! - Merging with an optional `config.yaml` from the configuration directory
//! - Environment variable overrides (`LIVESTREAM_CONFIG__SECTION__KEY=value`)
//! - Typed snapshot of the whole tree through [`Config::settings`]
//!
//! ## Usage
//!
//! ```no_run
//! use lsconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let settings = config.settings()?;
//! println!("API: {}", settings.api.base_url);
//! println!("HLS: {}", settings.hls_url());
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{info, warn};

mod settings;

pub use settings::{
    ApiSettings, Endpoints, HlsSettings, LoggerSettings, MediaSettings, PlayerSettings,
    PollingSettings, RetrySettings, Settings, UiSettings,
};

const DEFAULT_CONFIG: &str = include_str!("livestream.yaml");

const ENV_CONFIG_DIR: &str = "LIVESTREAM_CONFIG";
const ENV_PREFIX: &str = "LIVESTREAM_CONFIG__";
const CONFIG_DIR_NAME: &str = ".livestream";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration manager for LiveStream
///
/// Holds the merged YAML tree. Values can be read by path, updated (and
/// persisted to `config.yaml`) or converted into a typed [`Settings`].
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
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

        if Path::new(CONFIG_DIR_NAME).exists() {
            return PathBuf::from(CONFIG_DIR_NAME);
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(CONFIG_DIR_NAME)
    }

    /// Loads the configuration using the process environment for overrides
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `LIVESTREAM_CONFIG` environment variable
    /// 3. `.livestream` in the current directory
    /// 4. `.livestream` in the user's home directory
    ///
    /// A missing directory or `config.yaml` is not an error: the embedded
    /// defaults are used.
    pub fn load_config(directory: &str) -> Result<Self> {
        Self::load_config_with_env(directory, env::vars())
    }

    /// Same as [`Config::load_config`] with an explicit set of variables.
    pub fn load_config_with_env<I>(directory: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config_dir = Self::find_config_dir(directory);
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join(CONFIG_FILE_NAME);

        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                let external: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut value, &external);
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using default embedded config");
            }
        }

        let mut value = lower_keys_value(value);
        apply_env_overrides(&mut value, vars);

        Ok(Config {
            config_dir,
            path,
            data: Mutex::new(value),
        })
    }

    /// Directory holding `config.yaml`
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Saves the current configuration to `config.yaml`, creating the
    /// configuration directory when needed
    pub fn save(&self) -> Result<()> {
        let yaml = {
            let data = self.lock()?;
            serde_yaml::to_string(&*data)?
        };
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir)?;
        }
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["api", "base_url"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock()?;
            set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock()?;
        get_value_internal(&data, path)
    }

    /// Typed snapshot of the whole configuration.
    ///
    /// Fields whose value has the wrong type fall back to their default
    /// when the tree cannot be deserialized as a whole.
    pub fn settings(&self) -> Result<Settings> {
        let data = self.lock()?.clone();
        match serde_yaml::from_value::<Settings>(data.clone()) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!("Invalid configuration ({}), falling back section by section", err);
                Ok(settings_by_section(&data))
            }
        }
    }

    /// Gets the API base URL
    pub fn get_api_base_url(&self) -> String {
        match self.get_value(&["api", "base_url"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                warn!("API base URL is not configured, using default");
                ApiSettings::default().base_url
            }
        }
    }

    /// Sets the API base URL
    pub fn set_api_base_url(&self, url: String) -> Result<()> {
        self.set_value(&["api", "base_url"], Value::String(url))
    }

    /// Gets the stream key
    pub fn get_stream_key(&self) -> String {
        match self.get_value(&["media", "stream_key"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => MediaSettings::default().stream_key,
        }
    }

    /// Gets the minimum log level
    pub fn get_log_min_level(&self) -> String {
        match self.get_value(&["logger", "min_level"]) {
            Ok(Value::String(s)) => s,
            _ => LoggerSettings::default().min_level,
        }
    }

    /// Whether debug mode is enabled
    pub fn get_debug(&self) -> bool {
        matches!(self.get_value(&["debug"]), Ok(Value::Bool(true)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }
}

fn settings_by_section(data: &Value) -> Settings {
    fn section<T: serde::de::DeserializeOwned + Default>(data: &Value, key: &str) -> T {
        match get_value_internal(data, &[key]) {
            Ok(value) => serde_yaml::from_value(value).unwrap_or_else(|err| {
                warn!(section = key, "Invalid section: {}, using defaults", err);
                T::default()
            }),
            Err(_) => T::default(),
        }
    }

    Settings {
        debug: matches!(get_value_internal(data, &["debug"]), Ok(Value::Bool(true))),
        api: section(data, "api"),
        media: section(data, "media"),
        polling: section(data, "polling"),
        player: section(data, "player"),
        ui: section(data, "ui"),
        logger: section(data, "logger"),
    }
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if let Value::Mapping(map) = data {
        let key = Value::String(path[0].to_lowercase());
        if path.len() == 1 {
            map.insert(key, value);
        } else {
            let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        if let Value::Mapping(map) = current {
            match map.get(&Value::String(key.to_lowercase())) {
                Some(next) => current = next,
                None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
            }
        } else {
            return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
        }
    }
    Ok(current.clone())
}

fn apply_env_overrides<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let key_path = stripped.split("__").collect::<Vec<_>>();
            if let Err(err) = set_value_internal(config, &key_path, convert_env_value(&value)) {
                warn!(variable = %key, "Ignoring environment override: {}", err);
            }
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(key, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default ones.
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
        (d, e) => *d = e.clone(),
    }
}
