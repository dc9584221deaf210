use anyhow::{anyhow, bail, Context, Result};

use super::{DedicatedTagConfig, LogFormat, RuntimeConfig};

pub const ENV_PREFIX: &str = "TAGGED2ROWBINARY_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    /// Get `TAGGED2ROWBINARY_<key>`.
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Tagged table layout
    if let Some(table) = get_env_string(env, "TABLE")? {
        config.tagged.table = table;
    }
    if let Some(list) = get_env_string(env, "IGNORED_TAGGED_METRICS")? {
        config.tagged.ignored_tagged_metrics = split_list(&list).map(str::to_string).collect();
    }
    if let Some(list) = get_env_string(env, "DEDICATED_TAGS")? {
        config.tagged.dedicated_tags = parse_dedicated_tags(&list)?;
    }

    // Existence cache
    if let Some(val) = get_env_u64(env, "CACHE_TTL_SECS")? {
        config.cache.ttl_secs = val;
    }
    if let Some(val) = get_env_bool(env, "CACHE_ENABLED")? {
        config.cache.enabled = val;
    }

    // Output
    if let Some(path) = get_env_string(env, "OUTPUT_PATH")? {
        config.output.path = path.into();
    }

    // Logging; RUST_LOG is honoured by the subscriber itself
    if let Some(level) = get_env_string(env, "LOG_LEVEL")? {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT")? {
        config.logging.format = format
            .parse::<LogFormat>()
            .with_context(|| format!("Invalid {}LOG_FORMAT value", ENV_PREFIX))?;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get(key))
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val.parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// `env=Env,dc=Dc`
fn parse_dedicated_tags(list: &str) -> Result<Vec<DedicatedTagConfig>> {
    split_list(list)
        .map(|item| match item.split_once('=') {
            Some((tag, column)) => Ok(DedicatedTagConfig {
                tag: tag.trim().to_string(),
                column: column.trim().to_string(),
            }),
            None => bail!(
                "Failed to parse {}DEDICATED_TAGS: expected tag=Column, got '{}'",
                ENV_PREFIX,
                item
            ),
        })
        .collect()
}
