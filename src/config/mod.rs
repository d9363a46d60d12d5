//! Configuration management for circuit breakers
//!
//! This module provides utilities for loading and validating circuit breaker
//! configuration, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{ResilienceError, Result};
use crate::util;

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<u32> {
        let value = self.get_string(key)?;
        value.parse::<u32>().map_err(|e| {
            ResilienceError::configuration(format!("Invalid integer for key {}: {}", key, e))
        })
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ResilienceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a duration configuration value (e.g., "500ms", "30s", "5m")
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        util::parse_duration(&value).ok_or_else(|| {
            ResilienceError::configuration(format!("Invalid duration for key {}: {}", key, value))
        })
    }

    /// Get an integer configuration value with a default
    fn get_int_or(&self, key: &str, default: u32) -> u32 {
        self.get_int(key).unwrap_or(default)
    }

    /// Get a boolean configuration value with a default
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Get a duration configuration value with a default
    fn get_duration_or(&self, key: &str, default: Duration) -> Duration {
        self.get_duration(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., a circuit name)
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        env_key.push_str(
            &key.to_uppercase()
                .replace(|c: char| !c.is_ascii_alphanumeric(), "_"),
        );

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => ResilienceError::configuration(format!(
                "Environment variable not set: {}",
                env_key
            )),
            env::VarError::NotUnicode(_) => ResilienceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    /// Configuration values
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| {
                ResilienceError::configuration(format!("Configuration key not found: {}", key))
            })
    }
}

/// Global default configuration provider
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("RESILIENCE")));

/// Configuration for a single circuit breaker
///
/// All values are validated once at circuit construction and immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Failure count that trips the circuit to Open
    pub failure_threshold: u32,

    /// Minimum time the circuit stays Open before probing recovery
    pub recovery_timeout: Duration,

    /// Consecutive half-open successes required to fully close the circuit
    pub success_threshold: u32,

    /// Time budget for a single guarded call
    pub call_timeout: Duration,

    /// Maximum number of simultaneous in-flight calls
    pub max_concurrent_calls: u32,

    /// When true, a half-open circuit reopens only once the cumulative
    /// failure count reaches `failure_threshold` again, instead of on the
    /// first half-open failure
    pub cumulative_half_open_reopen: bool,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            call_timeout: Duration::from_secs(10),
            max_concurrent_calls: 10,
            cumulative_half_open_reopen: false,
        }
    }
}

impl CircuitConfig {
    /// Validate this configuration
    ///
    /// Every threshold, cap, and timeout must be strictly positive.
    pub fn validate(&self) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(ResilienceError::configuration(
                "failure_threshold must be positive",
            ));
        }
        if self.recovery_timeout.is_zero() {
            return Err(ResilienceError::configuration(
                "recovery_timeout must be positive",
            ));
        }
        if self.success_threshold == 0 {
            return Err(ResilienceError::configuration(
                "success_threshold must be positive",
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(ResilienceError::configuration(
                "call_timeout must be positive",
            ));
        }
        if self.max_concurrent_calls == 0 {
            return Err(ResilienceError::configuration(
                "max_concurrent_calls must be positive",
            ));
        }
        Ok(())
    }

    /// Load a circuit configuration from a provider, falling back to the
    /// defaults for keys the provider does not carry
    ///
    /// Recognized keys: `failure_threshold`, `recovery_timeout`,
    /// `success_threshold`, `call_timeout`, `max_concurrent_calls`,
    /// `cumulative_half_open_reopen`.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            failure_threshold: provider
                .get_int_or("failure_threshold", defaults.failure_threshold),
            recovery_timeout: provider
                .get_duration_or("recovery_timeout", defaults.recovery_timeout),
            success_threshold: provider
                .get_int_or("success_threshold", defaults.success_threshold),
            call_timeout: provider.get_duration_or("call_timeout", defaults.call_timeout),
            max_concurrent_calls: provider
                .get_int_or("max_concurrent_calls", defaults.max_concurrent_calls),
            cumulative_half_open_reopen: provider.get_bool_or(
                "cumulative_half_open_reopen",
                defaults.cumulative_half_open_reopen,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load a circuit configuration from the process environment through
    /// the default `RESILIENCE`-prefixed provider
    pub fn from_env() -> Result<Self> {
        Self::from_provider(DEFAULT_PROVIDER.as_ref())
    }
}
