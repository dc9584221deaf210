// Configuration source loading.
//
// Priority order:
// 1. Environment variables (TAGGED2ROWBINARY_* prefix)
// 2. Config file path from TAGGED2ROWBINARY_CONFIG
// 3. Inline config content from TAGGED2ROWBINARY_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.tagged2rowbinary.toml)
// 5. Built-in defaults

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RuntimeConfig;

const DEFAULT_FILES: [&str; 2] = ["config.toml", ".tagged2rowbinary.toml"];

pub fn load_config() -> Result<RuntimeConfig> {
    load_with(&StdEnvSource, Path::new("."))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = read_file(path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_with<E: EnvSource>(env: &E, dir: &Path) -> Result<RuntimeConfig> {
    let mut config = load_from_file(env, dir)?.unwrap_or_default();
    env_overrides::apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file<E: EnvSource>(env: &E, dir: &Path) -> Result<Option<RuntimeConfig>> {
    if let Some(path) = env.get("CONFIG") {
        return read_file(Path::new(&path)).map(Some);
    }

    if let Some(content) = env.get("CONFIG_CONTENT") {
        let config = toml::from_str(&content).with_context(|| {
            format!("Failed to parse inline config from {}CONFIG_CONTENT", ENV_PREFIX)
        })?;
        return Ok(Some(config));
    }

    for name in DEFAULT_FILES {
        let path = dir.join(name);
        if path.exists() {
            return read_file(&path).map(Some);
        }
    }

    Ok(None)
}

fn read_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}
