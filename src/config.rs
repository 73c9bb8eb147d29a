//! Configuration loaded once at startup.

use crate::Result;
use crate::logging::LogLevel;
use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../default_config.toml");

/// File looked up in a directory when no explicit configuration path is given.
pub const CONFIG_FILE_NAME: &str = "metric-library.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directory for cached upstream snapshots
    #[serde(default)]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Depth used for shallow clones
    #[serde(default = "default_shallow_depth")]
    pub shallow_depth: u32,

    /// Fallback log level when `RUST_LOG` is not set
    #[serde(default)]
    pub log_level: LogLevel,

    /// Local semantic-conventions model directory for the enrichment registry
    #[serde(default)]
    pub semconv_model_dir: Option<Utf8PathBuf>,

    /// JSON snapshot file backing the in-memory store
    #[serde(default)]
    pub store_path: Option<Utf8PathBuf>,

    /// Adapters to run; empty means all
    #[serde(default)]
    pub adapters: Vec<String>,

    /// Maximum number of extraction runs in flight
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
}

const fn default_shallow_depth() -> u32 {
    1
}

const fn default_max_concurrent_runs() -> usize {
    4
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// An explicit `config_path` must exist. Otherwise `metric-library.toml` is looked up in `dir` and
    /// defaults are used when it is absent.
    pub fn load(dir: &Utf8Path, config_path: Option<&Utf8Path>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.to_path_buf(), text)
        } else {
            let path = dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// The snapshot cache root, falling back to the platform cache directory.
    pub fn resolved_cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.as_std_path().to_path_buf());
        }

        Ok(BaseDirs::new()
            .into_app_err("could not determine cache directory")?
            .cache_dir()
            .join("metric-library"))
    }

    /// Whether the named adapter is selected by this configuration.
    #[must_use]
    pub fn is_adapter_enabled(&self, name: &str) -> bool {
        self.adapters.is_empty() || self.adapters.iter().any(|a| a == name)
    }

    fn validate(&self) -> Result<()> {
        if self.shallow_depth == 0 {
            return Err(app_err!("shallow_depth must be at least 1"));
        }

        if self.max_concurrent_runs == 0 {
            return Err(app_err!("max_concurrent_runs must be at least 1"));
        }

        if let Some(dup) = self.adapters.iter().enumerate().find_map(|(i, a)| self.adapters[..i].contains(a).then_some(a)) {
            return Err(app_err!("adapter '{dup}' is listed more than once"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            shallow_depth: default_shallow_depth(),
            log_level: LogLevel::default(),
            semconv_model_dir: None,
            store_path: None,
            adapters: Vec::new(),
            max_concurrent_runs: default_max_concurrent_runs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_matches_default() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, Config::default());
        parsed.validate().unwrap();
    }

    #[test]
    fn test_validate_zero_depth() {
        let config = Config { shallow_depth: 0, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let config = Config { max_concurrent_runs: 0, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_adapter() {
        let config = Config { adapters: vec!["otel-go".into(), "otel-go".into()], ..Config::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("otel-go"));
    }

    #[test]
    fn test_adapter_selection() {
        let all = Config::default();
        assert!(all.is_adapter_enabled("anything"));

        let some = Config { adapters: vec!["otel-js".into()], ..Config::default() };
        assert!(some.is_adapter_enabled("otel-js"));
        assert!(!some.is_adapter_enabled("otel-go"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Config, _> = toml::from_str("colour = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_cache_dir() {
        let config = Config { cache_dir: Some(Utf8PathBuf::from("/tmp/snapshots")), ..Config::default() };
        assert_eq!(config.resolved_cache_dir().unwrap(), PathBuf::from("/tmp/snapshots"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let config = Config::load(dir, None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let missing = dir.join("nope.toml");
        assert!(Config::load(dir, Some(missing.as_path())).is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(
            dir.join(CONFIG_FILE_NAME),
            "shallow_depth = 5\nlog_level = \"debug\"\nadapters = [\"otel-go\"]\n",
        )
        .unwrap();

        let config = Config::load(dir, None).unwrap();
        assert_eq!(config.shallow_depth, 5);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.adapters, vec!["otel-go".to_string()]);
        assert_eq!(config.max_concurrent_runs, 4);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let path = dir.join("pipeline.toml");
        fs::write(&path, "store_path = \"metrics.json\"\nmax_concurrent_runs = 2\n").unwrap();

        let config = Config::load(dir, Some(path.as_path())).unwrap();
        assert_eq!(config.store_path, Some(Utf8PathBuf::from("metrics.json")));
        assert_eq!(config.max_concurrent_runs, 2);
        assert_eq!(config.shallow_depth, 1);
    }
}
