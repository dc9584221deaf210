// Configuration validation
//
// Validates that required fields are present and values are sensible

use std::collections::HashSet;

use anyhow::{bail, Result};
use tagged2rowbinary_core::tagged::BASE_COLUMNS;
use tracing::warn;

use crate::*;

/// Longest accepted `cache.ttl_secs`: one year.
pub const MAX_CACHE_TTL_SECS: u64 = 366 * 24 * 60 * 60;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_tagged_config(&config.tagged)?;
    validate_cache_config(&config.cache)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_tagged_config(config: &TaggedConfig) -> Result<()> {
    if config.table.trim().is_empty() {
        bail!("tagged.table must not be empty");
    }

    let mut tags = HashSet::new();
    let mut columns = HashSet::new();
    for dedicated in &config.dedicated_tags {
        if dedicated.tag.is_empty() {
            bail!("tagged.dedicated_tags: tag must not be empty");
        }
        if dedicated.column.is_empty() {
            bail!(
                "tagged.dedicated_tags: column for tag '{}' must not be empty",
                dedicated.tag
            );
        }
        if !tags.insert(dedicated.tag.as_str()) {
            bail!(
                "tagged.dedicated_tags: tag '{}' is listed more than once",
                dedicated.tag
            );
        }
        if BASE_COLUMNS
            .iter()
            .any(|base| base.eq_ignore_ascii_case(&dedicated.column))
        {
            bail!(
                "tagged.dedicated_tags: column '{}' collides with a base column",
                dedicated.column
            );
        }
        if !columns.insert(dedicated.column.as_str()) {
            bail!(
                "tagged.dedicated_tags: column '{}' is used more than once",
                dedicated.column
            );
        }
    }

    let ignored = &config.ignored_tagged_metrics;
    if ignored.len() > 1 && ignored.iter().any(|m| m == "*") {
        warn!("tagged.ignored_tagged_metrics contains '*'; other entries are redundant");
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<()> {
    if config.enabled && config.ttl_secs == 0 {
        bail!("cache.ttl_secs must be greater than 0 when the cache is enabled");
    }

    if config.ttl_secs > MAX_CACHE_TTL_SECS {
        bail!(
            "cache.ttl_secs must be at most {} (one year), got {}",
            MAX_CACHE_TTL_SECS,
            config.ttl_secs
        );
    }

    // Warn about very long TTLs
    if config.ttl_secs > 7 * 24 * 60 * 60 {
        warn!(
            ttl_secs = config.ttl_secs,
            "cache.ttl_secs is very large; cache memory grows with every distinct day"
        );
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<()> {
    if config.path.as_os_str().is_empty() {
        bail!("output.path must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(dedicated: &[(&str, &str)]) -> TaggedConfig {
        TaggedConfig {
            dedicated_tags: dedicated
                .iter()
                .map(|(tag, column)| DedicatedTagConfig {
                    tag: tag.to_string(),
                    column: column.to_string(),
                })
                .collect(),
            ..TaggedConfig::default()
        }
    }

    #[test]
    fn test_validate_tagged_config() {
        assert!(validate_tagged_config(&TaggedConfig::default()).is_ok());
        assert!(validate_tagged_config(&tagged(&[("env", "Env"), ("dc", "Dc")])).is_ok());

        let empty_table = TaggedConfig {
            table: " ".to_string(),
            ..TaggedConfig::default()
        };
        assert!(validate_tagged_config(&empty_table).is_err());

        assert!(validate_tagged_config(&tagged(&[("", "Env")])).is_err());
        assert!(validate_tagged_config(&tagged(&[("env", "")])).is_err());
        assert!(validate_tagged_config(&tagged(&[("env", "Env"), ("env", "Env2")])).is_err());
        assert!(validate_tagged_config(&tagged(&[("env", "Env"), ("dc", "Env")])).is_err());
        assert!(validate_tagged_config(&tagged(&[("env", "Tags")])).is_err());
        assert!(validate_tagged_config(&tagged(&[("env", "version")])).is_err());
    }

    #[test]
    fn test_validate_cache_config() {
        assert!(validate_cache_config(&CacheConfig::default()).is_ok());

        let zero_ttl = CacheConfig {
            ttl_secs: 0,
            enabled: true,
        };
        assert!(validate_cache_config(&zero_ttl).is_err());

        let disabled = CacheConfig {
            ttl_secs: 0,
            enabled: false,
        };
        assert!(validate_cache_config(&disabled).is_ok());

        let ceiling = CacheConfig {
            ttl_secs: MAX_CACHE_TTL_SECS,
            enabled: true,
        };
        assert!(validate_cache_config(&ceiling).is_ok());

        let huge = CacheConfig {
            ttl_secs: i64::MAX as u64,
            enabled: true,
        };
        let err = validate_cache_config(&huge).unwrap_err();
        assert!(err.to_string().contains("cache.ttl_secs must be at most"));
    }

    #[test]
    fn test_validate_output_config() {
        assert!(validate_output_config(&OutputConfig::default()).is_ok());
        let empty = OutputConfig {
            path: std::path::PathBuf::new(),
        };
        assert!(validate_output_config(&empty).is_err());
    }
}
