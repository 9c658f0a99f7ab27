//! Runtime settings read from `ORGGUARD_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use orgguard_hierarchy::HierarchyConfig;
use orgguard_hierarchy::service::DEFAULT_MAX_DEPTH;

use crate::cache::CacheConfig;

pub const HIERARCHY_MAX_DEPTH: &str = "ORGGUARD_HIERARCHY_MAX_DEPTH";
pub const ROLE_CACHE_TTL_SECS: &str = "ORGGUARD_ROLE_CACHE_TTL_SECS";
pub const ROLE_CACHE_CAPACITY: &str = "ORGGUARD_ROLE_CACHE_CAPACITY";
pub const OU_CACHE_TTL_SECS: &str = "ORGGUARD_OU_CACHE_TTL_SECS";
pub const OU_CACHE_CAPACITY: &str = "ORGGUARD_OU_CACHE_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub hierarchy_max_depth: usize,
    pub role_cache: CacheConfig,
    pub ou_cache: CacheConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hierarchy_max_depth: DEFAULT_MAX_DEPTH,
            role_cache: CacheConfig {
                max_capacity: 10_000,
                ttl: Duration::from_secs(30),
            },
            ou_cache: CacheConfig {
                max_capacity: 50_000,
                ttl: Duration::from_secs(30),
            },
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset keys keep their
    /// defaults; set-but-invalid keys are an error naming the key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let hierarchy_max_depth =
            parse_or(&lookup, HIERARCHY_MAX_DEPTH, defaults.hierarchy_max_depth)?;
        if hierarchy_max_depth == 0 {
            bail!("{HIERARCHY_MAX_DEPTH} must be at least 1");
        }

        let role_cache = CacheConfig {
            max_capacity: parse_or(&lookup, ROLE_CACHE_CAPACITY, defaults.role_cache.max_capacity)?,
            ttl: Duration::from_secs(parse_or(
                &lookup,
                ROLE_CACHE_TTL_SECS,
                defaults.role_cache.ttl.as_secs(),
            )?),
        };
        let ou_cache = CacheConfig {
            max_capacity: parse_or(&lookup, OU_CACHE_CAPACITY, defaults.ou_cache.max_capacity)?,
            ttl: Duration::from_secs(parse_or(
                &lookup,
                OU_CACHE_TTL_SECS,
                defaults.ou_cache.ttl.as_secs(),
            )?),
        };

        let settings = Self {
            hierarchy_max_depth,
            role_cache,
            ou_cache,
        };
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }

    pub fn hierarchy_config(&self) -> HierarchyConfig {
        HierarchyConfig {
            max_depth: self.hierarchy_max_depth,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value {raw:?} for {key}")),
        _ => Ok(default),
    }
}
