//! # Resilience SDK
//!
//! Circuit breaker primitives for guarding calls to external dependencies.
//!
//! This crate provides:
//!
//! - A per-dependency circuit breaker with state-gated, concurrency-limited,
//!   timeout-bounded call execution and predictive failure scoring
//! - A manager that owns a named registry of breakers and aggregates them
//!   into a global health signal
//! - An auditor that evaluates whether breaker configurations are behaving
//!   as intended
//! - A comprehensive error handling system
//! - Configuration management utilities
//!
//! ## Architecture
//!
//! The SDK is designed around the following key abstractions:
//!
//! - `CircuitBreaker`: gates, time-boxes, and concurrency-limits calls to
//!   one dependency, tracking outcomes in a bounded history
//! - `CircuitBreakerManager`: explicitly owned registry of breakers with
//!   call delegation and a global health aggregate
//! - `CircuitAuditor`: read-only, advisory analysis of a manager's breakers
//! - `FailurePredictor`: swappable strategy for the advisory
//!   failure-probability estimate
//! - `ResilienceError`: unified error system separating breaker rejections
//!   from pass-through operation failures
//!
//! The breaker does not know what the guarded operation does; it only
//! observes success, failure, and duration.

// Re-export the circuit breaker subsystem
pub mod breaker;
pub use breaker::{
    AuditReport, CircuitAuditor, CircuitBreaker, CircuitBreakerManager, CircuitFinding,
    CircuitState, CircuitStatus, FailurePredictor, GlobalStatus, HeuristicPredictor,
};

// Re-export error handling
pub mod error;
pub use error::{ResilienceError, Result};

// Re-export configuration management
pub mod config;
pub use config::{CircuitConfig, ConfigProvider, ConfigProviderExt};

// Utility module for common functionality
mod util;

#[cfg(test)]
mod tests;

/// Create a new manager with the default global failure threshold
pub fn manager() -> CircuitBreakerManager {
    CircuitBreakerManager::new()
}

/// Create a standalone circuit with the default prediction heuristic
pub fn circuit(name: impl Into<String>, config: CircuitConfig) -> Result<CircuitBreaker> {
    CircuitBreaker::new(name, config)
}
