//! Transport retry with exponential backoff.

use async_trait::async_trait;

use super::Oracle;
use crate::config::RetryConfig;
use crate::error::OracleError;
use crate::retry::RetryPolicy;

/// Wraps an oracle and retries transient failures with backoff.
///
/// This sits below the engine: a call that still fails after the policy
/// gives up reaches the engine as a single non-response.
#[derive(Debug, Clone)]
pub struct RetryingOracle<O> {
    inner: O,
    policy: RetryPolicy,
}

impl<O: Oracle> RetryingOracle<O> {
    /// Wrap `inner` with the default policy.
    #[must_use]
    pub fn new(inner: O) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    /// Wrap `inner` with an explicit policy.
    #[must_use]
    pub const fn with_policy(inner: O, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Wrap `inner` with a policy built from `config`.
    #[must_use]
    pub const fn from_config(inner: O, config: RetryConfig) -> Self {
        Self::with_policy(inner, RetryPolicy::new(config))
    }

    /// The wrapped oracle.
    pub const fn inner(&self) -> &O {
        &self.inner
    }

    /// The retry policy.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<O: Oracle> Oracle for RetryingOracle<O> {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        self.policy.retry(|| self.inner.generate(prompt)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;

    fn fast_config(max_retries: usize) -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(max_retries)
            .with_initial_delay_ms(1)
            .with_max_delay_ms(2)
            .with_jitter(false)
    }

    #[tokio::test]
    async fn test_rides_out_transient_failures() {
        let inner = ScriptedOracle::new()
            .then_error(OracleError::Unavailable("rate limited".to_string()))
            .then_error(OracleError::Timeout(100))
            .then_text("answer");
        let oracle = RetryingOracle::from_config(inner, fast_config(3));

        assert_eq!(oracle.generate("p").await.unwrap(), "answer");
        assert_eq!(oracle.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_policy_ceiling() {
        let inner = ScriptedOracle::new().failing_with(OracleError::Backend("down".to_string()));
        let oracle = RetryingOracle::from_config(inner, fast_config(2));

        assert!(oracle.generate("p").await.is_err());
        assert_eq!(oracle.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_response_is_not_retried() {
        let inner = ScriptedOracle::new().failing_with(OracleError::EmptyResponse);
        let oracle = RetryingOracle::from_config(inner, fast_config(5));

        assert_eq!(oracle.generate("p").await, Err(OracleError::EmptyResponse));
        assert_eq!(oracle.inner().call_count(), 1);
    }

    #[test]
    fn test_default_policy_follows_hosted_limits() {
        let oracle = RetryingOracle::new(ScriptedOracle::new());
        let config = oracle.policy().config();
        assert_eq!(config.max_retries, 6);
        assert_eq!(config.initial_delay_ms, 3000);
        assert_eq!(config.max_delay_ms, 65_000);
    }
}
