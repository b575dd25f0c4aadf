use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failure detected, failing fast
    HalfOpen, // Probing whether the upstream is back
}

/// Failure counter guarding an outbound dependency.
pub struct CircuitBreaker {
    pub name: String,
    state: RwLock<CircuitState>,
    failure_count: AtomicUsize,
    failure_threshold: usize,
    reset_timeout: Duration,
    last_failure: RwLock<Option<Instant>>,
}

/// Outcome of a guarded call.
#[derive(Debug, PartialEq)]
pub enum Guarded<T, E> {
    Completed(Result<T, E>),
    Rejected,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold.max(1),
            reset_timeout: timeout,
            last_failure: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    /// Whether a call may go through right now.
    pub async fn check(&self) -> bool {
        let state = *self.state.read().await;
        if state != CircuitState::Open {
            return true;
        }

        let last_fail = *self.last_failure.read().await;
        match last_fail {
            Some(instant) if instant.elapsed() >= self.reset_timeout => {
                let mut s = self.state.write().await;
                *s = CircuitState::HalfOpen;
                tracing::info!("Circuit Breaker [{}] moving to Half-Open", self.name);
                true
            }
            _ => false,
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        if *state == CircuitState::HalfOpen {
            *state = CircuitState::Closed;
            tracing::info!("Circuit Breaker [{}] recovered to Closed", self.name);
        }
        self.failure_count.store(0, Ordering::SeqCst);
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        if count >= self.failure_threshold || *state == CircuitState::HalfOpen {
            *state = CircuitState::Open;
            let mut last = self.last_failure.write().await;
            *last = Some(Instant::now());
            tracing::warn!(
                "Circuit Breaker [{}] TRIPPED to Open. Failures: {}",
                self.name,
                count
            );
        }
    }

    /// Runs `call` unless the circuit is open, recording the outcome.
    pub async fn call<T, E, F, Fut>(&self, call: F) -> Guarded<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.check().await {
            return Guarded::Rejected;
        }

        let result = call().await;
        match &result {
            Ok(_) => self.record_success().await,
            Err(_) => self.record_failure().await,
        }
        Guarded::Completed(result)
    }
}
