//! Configuration sources.
//!
//! A [`ConfigSource`] hands out raw typed values by key. [`StackConfig`] is
//! the file-backed implementation: a YAML stack file with a flat `config:`
//! mapping, optionally overridden from the environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ConfigError, DeployError, Result};

use super::cluster::keys;

/// Prefix of environment variables that override stack file values.
pub const ENV_PREFIX: &str = "EKSDEPLOY_";

/// Default stack file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["eksdeploy.yaml", "eksdeploy.yml", "Eksdeploy.yaml"];

/// Supplies raw configuration values keyed by name.
///
/// Every lookup is fatal when the key is absent.
pub trait ConfigSource {
    /// Returns the value of `key` as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent.
    fn require_string(&self, key: &str) -> Result<String>;

    /// Returns the value of `key` as an integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent or not an integer.
    fn require_number(&self, key: &str) -> Result<i64>;

    /// Returns the value of `key` as a boolean.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is absent or not a boolean.
    fn require_boolean(&self, key: &str) -> Result<bool>;
}

/// On-disk layout of a stack file.
#[derive(Debug, Default, Deserialize)]
struct StackFile {
    #[serde(default)]
    config: BTreeMap<String, serde_yaml::Value>,
}

/// Configuration values loaded from a stack file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackConfig {
    /// Raw values keyed by bare key name.
    values: BTreeMap<String, String>,
}

impl StackConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Builds a configuration from key/value pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (bare_key(&k.into()).to_string(), v.into()))
                .collect(),
        }
    }

    /// Sets a single value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.values.insert(bare_key(&key).to_string(), value.into());
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(bare_key(key))
    }

    /// Returns the number of values held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no values are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Loads a stack file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(DeployError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        Self::parse_yaml(&content, Some(path))
    }

    /// Parses a stack file from a YAML string.
    ///
    /// Keys may be namespaced (`eks-cluster:vpc-name`); the namespace is
    /// dropped. Sequences of scalars are joined with commas.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or a value is not a scalar.
    pub fn parse_yaml(content: &str, source: Option<&Path>) -> Result<Self> {
        debug!("Parsing YAML stack configuration");
        let location = || source.map(|p| p.display().to_string());

        let file: StackFile = serde_yaml::from_str(content).map_err(|e| {
            DeployError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: location(),
            })
        })?;

        let mut config = Self::new();
        for (key, value) in file.config {
            let text = scalar_text(&value).ok_or_else(|| {
                DeployError::Config(ConfigError::ParseError {
                    message: format!("Value of '{key}' must be a scalar or a list of scalars"),
                    location: location(),
                })
            })?;
            config.set(key, text);
        }

        debug!("Parsed {} configuration values", config.len());
        Ok(config)
    }

    /// Applies `EKSDEPLOY_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::vars())
    }

    /// Applies overrides from an arbitrary set of environment-style pairs.
    ///
    /// Only variables that name a known key are taken into account.
    #[must_use]
    pub fn with_overrides(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();

        for key in keys::ALL {
            if let Some(value) = vars.get(&env_var_name(key)) {
                debug!("Overriding {key} from environment");
                self.set(*key, value.clone());
            }
        }

        self
    }

    fn lookup(&self, key: &str) -> Result<&str> {
        self.values
            .get(bare_key(key))
            .map(String::as_str)
            .ok_or_else(|| DeployError::Config(ConfigError::missing(key)))
    }
}

impl ConfigSource for StackConfig {
    fn require_string(&self, key: &str) -> Result<String> {
        self.lookup(key).map(str::to_string)
    }

    fn require_number(&self, key: &str) -> Result<i64> {
        let raw = self.lookup(key)?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| DeployError::Config(ConfigError::invalid(key, "an integer", raw)))
    }

    fn require_boolean(&self, key: &str) -> Result<bool> {
        let raw = self.lookup(key)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(DeployError::Config(ConfigError::invalid(key, "a boolean", raw))),
        }
    }
}

/// Returns the environment variable that overrides `key`.
#[must_use]
pub fn env_var_name(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.to_ascii_uppercase().replace('-', "_"))
}

/// Loads the `.env` file next to the stack file if present.
///
/// # Errors
///
/// Returns an error if the .env file exists but cannot be loaded.
pub fn load_dotenv(base_dir: &Path) -> Result<()> {
    let env_path = base_dir.join(".env");

    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| {
            DeployError::Config(ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })
        })?;
    } else {
        debug!(".env file not found at: {}", env_path.display());
    }

    Ok(())
}

/// Finds the stack file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no stack file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(DeployError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

/// Strips a `namespace:` prefix from a key.
fn bare_key(key: &str) -> &str {
    key.rsplit_once(':').map_or(key, |(_, bare)| bare)
}

/// Renders a YAML scalar (or a list of scalars) as configuration text.
fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => None,
                other => scalar_text(other),
            })
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
        serde_yaml::Value::Mapping(_) | serde_yaml::Value::Tagged(_) => None,
    }
}
