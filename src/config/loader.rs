use crate::config::schema::{self, FetchConfig};
use crate::error::{Error, Result};
use config::Environment;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Prefix of the environment variables that override file settings,
/// e.g. `P2P_TRADING_PAIR`, `P2P_TARGET_DIRECTORY`.
pub const ENV_PREFIX: &str = "P2P";

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<FetchConfig> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    /// Like [`ConfigLoader::load`], with `overrides` (keyed like the
    /// environment, e.g. `P2P_TRADING_PAIR`) taking precedence over both the
    /// file and the process environment.
    pub fn load_with_overrides<P: AsRef<Path>>(
        path: P,
        overrides: HashMap<String, String>,
    ) -> Result<FetchConfig> {
        let prefix = format!("{}_", ENV_PREFIX);
        let mut vars: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.to_ascii_uppercase().starts_with(&prefix))
            .collect();
        vars.extend(overrides);
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    /// Loads `path` and applies overrides from `env` before validating.
    pub fn load_with_env<P: AsRef<Path>>(path: P, env: Environment) -> Result<FetchConfig> {
        let mut visited = HashSet::new();
        let mut config = Self::load_with_inheritance(path.as_ref(), &mut visited)?;
        Self::apply_env(&mut config, env)?;
        config.validate()?;
        Ok(config)
    }

    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<FetchConfig> {
        let path = fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let config = Self::load_file(&path)?;

        match &config.extends {
            Some(parent_path_str) => {
                let parent_path = path.parent()
                    .ok_or_else(|| Error::Config(format!(
                        "Cannot determine parent directory for {}",
                        path.display()
                    )))?
                    .join(parent_path_str);

                let parent_config = Self::load_with_inheritance(&parent_path, visited)?;
                Ok(Self::merge_configs(parent_config, config))
            }
            None => Ok(config),
        }
    }

    fn load_file(path: &Path) -> Result<FetchConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    /// Child values win unless they are still at their defaults.
    fn merge_configs(mut parent: FetchConfig, child: FetchConfig) -> FetchConfig {
        let defaults = FetchConfig::default();

        if child.name != schema::default_name() {
            parent.name = child.name;
        }
        if child.trading_pair != schema::default_trading_pair() {
            parent.trading_pair = child.trading_pair;
        }
        if !child.target_directory.is_empty() {
            parent.target_directory = child.target_directory;
        }
        if child.record_format != defaults.record_format {
            parent.record_format = child.record_format;
        }
        if child.marketplace != defaults.marketplace {
            parent.marketplace = child.marketplace;
        }
        if child.selectors != defaults.selectors {
            parent.selectors = child.selectors;
        }

        parent.extends = None;
        parent
    }

    fn apply_env(config: &mut FetchConfig, env: Environment) -> Result<()> {
        let settings = config::Config::builder().add_source(env).build()?;

        if let Ok(pair) = settings.get_string("trading_pair") {
            log::debug!("trading_pair overridden from environment: {}", pair);
            config.trading_pair = pair;
        }
        if let Ok(dir) = settings.get_string("target_directory") {
            log::debug!("target_directory overridden from environment: {}", dir);
            config.target_directory = dir;
        }
        Ok(())
    }
}
