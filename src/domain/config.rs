use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::Environment;

/// The name of the environment used when none is requested explicitly.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// The configuration file looked up when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "owl.json";

/// Configuration for parsing request files.
///
/// Holds the named environments whose variables are substituted into request
/// files. The configuration is built once at startup and passed down by
/// reference.
///
/// ```json
/// {
///   "environments": {
///     "default": { "host": "localhost:3000" },
///     "staging": { "host": "staging.example.com" }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Named environments.
    ///
    /// A configuration always contains the [`DEFAULT_ENVIRONMENT`].
    #[serde(default)]
    environments: HashMap<String, Environment>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environments: HashMap::from([(DEFAULT_ENVIRONMENT.to_string(), Environment::new())]),
        }
    }
}

impl Config {
    /// Loads the configuration from a JSON file at the given path.
    ///
    /// Environments missing from the file keep their built-in values, so the
    /// default environment is always present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the JSON content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config
            .environments
            .entry(DEFAULT_ENVIRONMENT.to_string())
            .or_default();

        tracing::debug!(
            "Loaded {} environments from {}",
            config.environments.len(),
            path.display()
        );
        Ok(config)
    }

    /// Loads the configuration, falling back to the built-in one when the
    /// implicit default file does not exist.
    ///
    /// Omitting the configuration file is only allowed when no path was
    /// specified, that is when `path` is [`DEFAULT_CONFIG_FILE`].
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path == Path::new(DEFAULT_CONFIG_FILE) && !path.exists() {
            tracing::debug!("No configuration file found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Returns the environment with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] if no environment has that
    /// name.
    pub fn environment(&self, name: &str) -> Result<&Environment, ConfigError> {
        self.environments
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEnvironment(name.to_string()))
    }

    /// Iterates over the environment names, sorted.
    pub fn environment_names(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<_> = self.environments.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.into_iter()
    }

    /// Adds or replaces a named environment.
    pub fn insert_environment(&mut self, name: impl Into<String>, environment: Environment) {
        self.environments.insert(name.into(), environment);
    }
}

/// Errors that can occur when loading or querying the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}", .path.display())]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The configuration file is not valid JSON for a configuration.
    #[error("failed to parse config file {}", .path.display())]
    Parse {
        /// The file that was parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The requested environment is not defined.
    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"environments": {
                "default": {"token": "default-token"},
                "test": {"token": "test-token"}
            }}"#,
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(
            config.environment("default").unwrap().get("token"),
            Some("default-token")
        );
        assert_eq!(
            config.environment("test").unwrap().get("token"),
            Some("test-token")
        );
        assert_eq!(config.environment_names().collect::<Vec<_>>(), ["default", "test"]);
    }

    #[test]
    fn load_keeps_default_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"environments": {"custom": {"foo": "baz"}}}"#)
            .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert!(config.environment(DEFAULT_ENVIRONMENT).unwrap().is_empty());
        assert_eq!(config.environment("custom").unwrap().get("foo"), Some("baz"));
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.json");

        let error = Config::load(&missing).unwrap_err();
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn load_or_default_requires_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("owl.json");

        assert!(Config::load_or_default(&missing).is_err());
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"environments": {"default": {"token": 3}}}"#)
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn empty_object_returns_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{}").unwrap();

        assert_eq!(Config::load(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let config = Config::default();

        let error = config.environment("production").unwrap_err();
        assert!(matches!(error, ConfigError::UnknownEnvironment(name) if name == "production"));
    }

    #[test]
    fn selects_named_environment() {
        let mut config = Config::default();
        config.insert_environment("custom", Environment::from([("foo", "baz")]));

        let env = config.environment("custom").unwrap();
        assert_eq!(env.get("foo"), Some("baz"));
    }
}
