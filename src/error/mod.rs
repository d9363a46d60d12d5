//! Error handling for the resilience SDK
//!
//! This module provides a unified error system that:
//! - Separates breaker-issued rejections from failures of the guarded
//!   operation itself
//! - Categorizes operation failures by kind (network, service, etc.)
//! - Classifies errors as retryable or permanent
//! - Provides a convenient Result type alias

use std::time::Duration;
use thiserror::Error;

/// Result type for resilience SDK operations
pub type Result<T> = std::result::Result<T, ResilienceError>;

/// Main error type for the resilience SDK
///
/// The first four variants are issued by the breaker machinery itself.
/// The remaining variants describe failures of the guarded operation and
/// pass through the breaker unchanged after bookkeeping.
#[derive(Error, Debug)]
pub enum ResilienceError {
    /// Admission rejected: the circuit is open and still cooling down
    #[error("Circuit '{circuit}' is open, rejecting calls for {remaining_ms} more ms")]
    CircuitOpen {
        /// Name of the rejecting circuit
        circuit: String,
        /// Milliseconds left before the circuit will probe recovery
        remaining_ms: u64,
    },

    /// Admission rejected: the circuit's concurrency cap is reached
    #[error("Circuit '{circuit}' is at its concurrency limit of {limit} in-flight calls")]
    Overloaded {
        /// Name of the rejecting circuit
        circuit: String,
        /// Configured maximum number of concurrent calls
        limit: u32,
    },

    /// The guarded operation did not complete within its time budget
    #[error("Call through circuit '{circuit}' timed out after {budget_ms} ms")]
    Timeout {
        /// Name of the circuit that abandoned the call
        circuit: String,
        /// The call timeout budget in milliseconds
        budget_ms: u64,
    },

    /// Configuration errors (invalid settings, unknown circuit names)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or connection errors from the guarded operation
    #[error("Network error: {0}")]
    Network(String),

    /// Errors reported by the dependency the operation talked to
    #[error("Service error: {0}")]
    Service(String),

    /// Request validation errors from the guarded operation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResilienceError {
    /// Create an open-circuit rejection
    pub fn circuit_open(circuit: impl Into<String>, remaining: Duration) -> Self {
        ResilienceError::CircuitOpen {
            circuit: circuit.into(),
            remaining_ms: remaining.as_millis() as u64,
        }
    }

    /// Create an overload rejection
    pub fn overloaded(circuit: impl Into<String>, limit: u32) -> Self {
        ResilienceError::Overloaded {
            circuit: circuit.into(),
            limit,
        }
    }

    /// Create a timeout error
    pub fn timeout(circuit: impl Into<String>, budget: Duration) -> Self {
        ResilienceError::Timeout {
            circuit: circuit.into(),
            budget_ms: budget.as_millis() as u64,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ResilienceError::Configuration(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ResilienceError::Network(message.into())
    }

    /// Create a service error
    pub fn service(message: impl Into<String>) -> Self {
        ResilienceError::Service(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ResilienceError::Validation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ResilienceError::Internal(message.into())
    }

    /// Short stable identifier for this error kind, used to bucket
    /// failure patterns in circuit history
    pub fn kind(&self) -> &'static str {
        match self {
            ResilienceError::CircuitOpen { .. } => "circuit_open",
            ResilienceError::Overloaded { .. } => "overload",
            ResilienceError::Timeout { .. } => "timeout",
            ResilienceError::Configuration(_) => "configuration",
            ResilienceError::Network(_) => "network",
            ResilienceError::Service(_) => "service",
            ResilienceError::Validation(_) => "validation",
            ResilienceError::Internal(_) => "internal",
        }
    }

    /// Check if this error was issued by the breaker at admission time,
    /// before the guarded operation ran
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ResilienceError::CircuitOpen { .. }
                | ResilienceError::Overloaded { .. }
                | ResilienceError::Configuration(_)
        )
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            ResilienceError::CircuitOpen { .. } => true,
            ResilienceError::Overloaded { .. } => true,
            ResilienceError::Timeout { .. } => true,
            ResilienceError::Network(_) => true,
            _ => false,
        }
    }

    /// Check if this is a permanent error (not retryable)
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }
}
