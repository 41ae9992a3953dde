//! Resource controller trait definition

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Resource controller abstraction trait
///
/// Every managed resource type (Tableau projects, ...) implements this trait
/// so that a declarative host can converge desired state without knowing
/// anything about the remote API behind it. `State` is the declarative
/// attribute shape the host records between runs.
///
/// Errors follow the host contract: `read` reports a resource that vanished
/// remotely as [`CloudError::ResourceNotFound`](crate::CloudError), and the
/// host decides whether to stop tracking it.
#[async_trait]
pub trait ResourceController: Send + Sync {
    /// Declarative attribute shape for this resource type
    type State: Send + Sync;

    /// Returns the resource type name (e.g., "project")
    fn resource_type(&self) -> &str;

    /// Create the resource described by `desired` and return the observed state
    async fn create(&self, desired: &Self::State) -> Result<Self::State>;

    /// Refresh `current` from the remote service
    async fn read(&self, current: &Self::State) -> Result<Self::State>;

    /// Converge the resource recorded as `prior` toward `desired`
    async fn update(&self, prior: &Self::State, desired: &Self::State) -> Result<Self::State>;

    /// Remove the resource
    async fn delete(&self, current: &Self::State) -> Result<()>;

    /// Start tracking an existing resource known only by its identifier
    async fn import(&self, id: &str) -> Result<Self::State>;
}

/// Retry configuration for controller operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (0 disables the operation being retried)
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Policy that never attempts the operation
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Policy with `max_attempts` attempts and no waiting in between
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay to wait after the `retry`-th failed attempt (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(retry.min(64) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay)
    }

    /// Upper bound of the total time spent waiting between attempts
    pub fn total_budget(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|retry| self.delay_for(retry))
            .sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_exponentially() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(0), Duration::from_secs(1));
        assert_eq!(config.delay_for(1), Duration::from_secs(2));
        assert_eq!(config.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(10), Duration::from_secs(30));
        assert_eq!(config.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_total_budget() {
        // 3 attempts wait twice: 1s + 2s
        assert_eq!(RetryConfig::default().total_budget(), Duration::from_secs(3));
        assert_eq!(RetryConfig::immediate(5).total_budget(), Duration::ZERO);
        assert_eq!(RetryConfig::disabled().total_budget(), Duration::ZERO);
    }

    #[test]
    fn test_multiplier_below_one_does_not_shrink() {
        let config = RetryConfig {
            backoff_multiplier: 0.5,
            ..RetryConfig::default()
        };
        assert_eq!(config.delay_for(3), Duration::from_secs(1));
    }
}
