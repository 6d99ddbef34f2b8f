/*!
 * Configuration
 *
 * Runtime configuration for the thread registry and the instrumented
 * allocator. Backend selection is a build-time decision (cargo features)
 * and is not configurable here.
 */

use crate::core::limits::DEFAULT_FOREIGN_THREAD_LIMIT;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Environment variable overriding [`IdentityConfig::foreign_thread_limit`]
pub const ENV_FOREIGN_THREAD_LIMIT: &str = "SYSPORT_FOREIGN_THREAD_LIMIT";

/// Environment variable overriding [`AllocatorConfig::trace`]
pub const ENV_TRACE_ALLOCATIONS: &str = "SYSPORT_TRACE_ALLOCATIONS";

/// Thread identity settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Foreign-thread registrations tolerated before a warning is logged
    ///
    /// Registration never fails; exceeding the bound is reported once.
    pub foreign_thread_limit: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            foreign_thread_limit: DEFAULT_FOREIGN_THREAD_LIMIT,
        }
    }
}

/// Instrumented allocator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Emit one trace record per allocation event
    pub trace: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            trace: cfg!(feature = "memory-debugging"),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub identity: IdentityConfig,
    pub allocator: AllocatorConfig,
}

impl Config {
    /// Defaults overlaid with the `SYSPORT_*` environment variables
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var(ENV_FOREIGN_THREAD_LIMIT) {
            match raw.trim().parse::<usize>() {
                Ok(limit) => config.identity.foreign_thread_limit = limit,
                Err(e) => warn!(
                    var = ENV_FOREIGN_THREAD_LIMIT,
                    value = %raw,
                    error = %e,
                    "Ignoring invalid foreign thread limit"
                ),
            }
        }

        if let Ok(raw) = env::var(ENV_TRACE_ALLOCATIONS) {
            match parse_flag(&raw) {
                Some(flag) => config.allocator.trace = flag,
                None => warn!(
                    var = ENV_TRACE_ALLOCATIONS,
                    value = %raw,
                    "Ignoring invalid allocation trace flag"
                ),
            }
        }

        config
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builder-style override of the allocation trace switch
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.allocator.trace = trace;
        self
    }

    /// Builder-style override of the foreign thread limit
    pub fn with_foreign_thread_limit(mut self, limit: usize) -> Self {
        self.identity.foreign_thread_limit = limit;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.identity.foreign_thread_limit,
            DEFAULT_FOREIGN_THREAD_LIMIT
        );
        assert_eq!(config.allocator.trace, cfg!(feature = "memory-debugging"));
    }

    #[test]
    fn test_from_json_partial() {
        let config = Config::from_json(r#"{"allocator": {"trace": true}}"#).unwrap();
        assert!(config.allocator.trace);
        assert_eq!(config.identity, IdentityConfig::default());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" ON "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        env::set_var(ENV_FOREIGN_THREAD_LIMIT, "7");
        env::set_var(ENV_TRACE_ALLOCATIONS, "true");
        let config = Config::from_env();
        env::remove_var(ENV_FOREIGN_THREAD_LIMIT);
        env::remove_var(ENV_TRACE_ALLOCATIONS);

        assert_eq!(config.identity.foreign_thread_limit, 7);
        assert!(config.allocator.trace);
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_garbage() {
        env::set_var(ENV_FOREIGN_THREAD_LIMIT, "lots");
        let config = Config::from_env();
        env::remove_var(ENV_FOREIGN_THREAD_LIMIT);

        assert_eq!(
            config.identity.foreign_thread_limit,
            DEFAULT_FOREIGN_THREAD_LIMIT
        );
    }
}
