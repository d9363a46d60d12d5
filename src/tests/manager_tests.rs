//! Tests for the circuit breaker manager

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::breaker::{CircuitBreakerManager, CircuitState};
    use crate::config::CircuitConfig;
    use crate::error::ResilienceError;

    fn config() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(30),
            ..CircuitConfig::default()
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let manager = CircuitBreakerManager::new();
        manager.create_circuit("exchange", config()).unwrap();

        assert!(manager.get_circuit("exchange").is_some());
        assert!(manager.get_circuit("unknown").is_none());
        assert_eq!(manager.circuit_names(), vec!["exchange".to_string()]);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let manager = CircuitBreakerManager::new();
        manager.create_circuit("exchange", config()).unwrap();

        let result = manager.create_circuit("exchange", config());
        assert!(matches!(result, Err(ResilienceError::Configuration(_))));
        // The original registration is untouched.
        assert_eq!(manager.circuits().len(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected_at_registration() {
        let manager = CircuitBreakerManager::new();
        let bad = CircuitConfig {
            max_concurrent_calls: 0,
            ..CircuitConfig::default()
        };
        assert!(manager.create_circuit("exchange", bad).is_err());
        assert!(manager.get_circuit("exchange").is_none());
    }

    #[test]
    fn test_remove_circuit() {
        let manager = CircuitBreakerManager::new();
        manager.create_circuit("exchange", config()).unwrap();

        assert!(manager.remove_circuit("exchange").is_some());
        assert!(manager.remove_circuit("exchange").is_none());
        assert!(manager.get_circuit("exchange").is_none());
    }

    #[tokio::test]
    async fn test_call_with_circuit_delegates() {
        let manager = CircuitBreakerManager::new();
        manager.create_circuit("exchange", config()).unwrap();

        let value = manager
            .call_with_circuit("exchange", || async { Ok::<_, ResilienceError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let status = manager.get_circuit("exchange").unwrap().status();
        assert_eq!(status.total_successes, 1);
    }

    #[tokio::test]
    async fn test_call_with_unknown_circuit_is_configuration_error() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let manager = CircuitBreakerManager::new();
        let invocations = AtomicUsize::new(0);

        let result = manager
            .call_with_circuit("ghost", || async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ResilienceError>(())
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::Configuration(_))));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_global_status_counts_states() {
        let manager = CircuitBreakerManager::new();
        let a = manager.create_circuit("a", config()).unwrap();
        let b = manager.create_circuit("b", config()).unwrap();
        manager.create_circuit("c", config()).unwrap();

        a.force_state(CircuitState::Open);
        b.force_state(CircuitState::HalfOpen);

        let status = manager.global_status();
        assert_eq!(status.total, 3);
        assert_eq!(status.open, 1);
        assert_eq!(status.half_open, 1);
        assert_eq!(status.closed, 1);
        assert_eq!(status.circuits.len(), 3);
    }

    #[test]
    fn test_global_status_serializes() {
        let manager = CircuitBreakerManager::new();
        manager.create_circuit("a", config()).unwrap();

        let json = serde_json::to_value(manager.global_status()).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["circuits"][0]["name"], "a");
        assert_eq!(json["circuits"][0]["state"], "Closed");
    }

    #[test]
    fn test_empty_manager_is_healthy() {
        assert!(CircuitBreakerManager::new().check_global_health());
    }

    #[test]
    fn test_health_threshold_boundary() {
        // With a 0.5 threshold, one open circuit out of two is exactly at
        // the boundary and counts as unhealthy.
        let manager = CircuitBreakerManager::with_global_threshold(0.5);
        let a = manager.create_circuit("a", config()).unwrap();
        manager.create_circuit("b", config()).unwrap();

        assert!(manager.check_global_health());
        a.force_state(CircuitState::Open);
        assert!(!manager.check_global_health());
    }
}
