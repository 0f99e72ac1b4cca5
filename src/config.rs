//! Configuration management for `OxiProof`.

use serde::{Deserialize, Serialize};

use crate::error::OxiProofError;

/// Global configuration for `OxiProof`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OxiProofConfig {
    /// Verification engine configuration.
    pub verifier: VerifierConfig,
    /// Transport retry configuration for [`RetryingOracle`](crate::oracle::RetryingOracle).
    pub transport: RetryConfig,
}

/// Which acceptance policy the mistake locator applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorPolicy {
    /// Every solution sentence is verified with up to `step_attempts`
    /// justification/audit rounds. A `neither` relation or a false rule
    /// verdict triggers another round; exhausting the rounds flags the step.
    #[default]
    RetryUntilResolved,
    /// Only sentences the categorizer labels as derivations are verified,
    /// with a single round each. Anything short of all-true plus `restate`
    /// is flagged.
    CategoryGated,
}

/// Ceilings and policy for the verification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Maximum number of solution sentences examined.
    pub max_steps: usize,
    /// Oracle tries for the justification sub-step.
    pub justification_retries: usize,
    /// Oracle tries for the audit sub-step.
    pub audit_retries: usize,
    /// Justification/audit rounds per sentence under
    /// [`LocatorPolicy::RetryUntilResolved`].
    pub step_attempts: usize,
    /// Independent categorization samples to vote over.
    pub categorization_samples: usize,
    /// Acceptance policy.
    pub policy: LocatorPolicy,
    /// Stop after the first flagged sentence instead of reporting all.
    pub stop_at_first_mistake: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            justification_retries: 5,
            audit_retries: 5,
            step_attempts: 10,
            categorization_samples: 7,
            policy: LocatorPolicy::RetryUntilResolved,
            stop_at_first_mistake: false,
        }
    }
}

impl VerifierConfig {
    /// Create a new `VerifierConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the step cap.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the justification retry ceiling.
    #[must_use]
    pub const fn with_justification_retries(mut self, retries: usize) -> Self {
        self.justification_retries = retries;
        self
    }

    /// Set the audit retry ceiling.
    #[must_use]
    pub const fn with_audit_retries(mut self, retries: usize) -> Self {
        self.audit_retries = retries;
        self
    }

    /// Set the number of outer rounds per sentence.
    #[must_use]
    pub const fn with_step_attempts(mut self, attempts: usize) -> Self {
        self.step_attempts = attempts;
        self
    }

    /// Set the number of categorization samples.
    #[must_use]
    pub const fn with_categorization_samples(mut self, samples: usize) -> Self {
        self.categorization_samples = samples;
        self
    }

    /// Set the acceptance policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: LocatorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop at the first flagged sentence.
    #[must_use]
    pub const fn with_stop_at_first_mistake(mut self, stop: bool) -> Self {
        self.stop_at_first_mistake = stop;
        self
    }

    /// Check that every ceiling allows at least one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`OxiProofError::Config`] naming the first zero ceiling.
    pub fn validate(&self) -> Result<(), OxiProofError> {
        let ceilings = [
            ("max_steps", self.max_steps),
            ("justification_retries", self.justification_retries),
            ("audit_retries", self.audit_retries),
            ("step_attempts", self.step_attempts),
            ("categorization_samples", self.categorization_samples),
        ];
        match ceilings.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(OxiProofError::Config(format!("{name} must be at least 1"))),
            None => Ok(()),
        }
    }
}

/// Configuration for retry logic with exponential backoff.
///
/// The default makes six retries waiting 3, 6, 12, 24, 48 and 65 seconds:
/// plain doubling from 3 s up to a 65 s cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add random jitter to delay.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_delay_ms: 3000,
            max_delay_ms: 65_000,
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }
}

impl RetryConfig {
    /// Create a new `RetryConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial delay in milliseconds.
    #[must_use]
    pub const fn with_initial_delay_ms(mut self, initial_delay_ms: u64) -> Self {
        self.initial_delay_ms = initial_delay_ms;
        self
    }

    /// Set the maximum delay in milliseconds.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Set the backoff multiplier.
    #[must_use]
    pub const fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Set whether to add jitter.
    #[must_use]
    pub const fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }
}

impl OxiProofConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file (native only).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    #[cfg(feature = "native")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to a file (native only).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    #[cfg(feature = "native")]
    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or a ceiling is zero.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        let content = serde_json::to_string_pretty(self)?;
        Ok(content)
    }

    /// Validate all sections.
    ///
    /// # Errors
    ///
    /// Returns [`OxiProofError::Config`] when a section is unusable.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.verifier.validate()
    }

    /// Set verifier configuration.
    #[must_use]
    pub fn with_verifier(mut self, verifier: VerifierConfig) -> Self {
        self.verifier = verifier;
        self
    }

    /// Set transport retry configuration.
    #[must_use]
    pub fn with_transport(mut self, transport: RetryConfig) -> Self {
        self.transport = transport;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OxiProofConfig::default();
        assert_eq!(config.verifier.max_steps, 100);
        assert_eq!(config.verifier.justification_retries, 5);
        assert_eq!(config.verifier.audit_retries, 5);
        assert_eq!(config.verifier.step_attempts, 10);
        assert_eq!(config.verifier.categorization_samples, 7);
        assert_eq!(config.verifier.policy, LocatorPolicy::RetryUntilResolved);
        assert_eq!(config.transport.max_retries, 6);
    }

    #[test]
    fn test_config_builder() {
        let config = OxiProofConfig::new().with_verifier(
            VerifierConfig::new()
                .with_step_attempts(3)
                .with_policy(LocatorPolicy::CategoryGated)
                .with_stop_at_first_mistake(true),
        );

        assert_eq!(config.verifier.step_attempts, 3);
        assert_eq!(config.verifier.policy, LocatorPolicy::CategoryGated);
        assert!(config.verifier.stop_at_first_mistake);
    }

    #[test]
    fn test_config_serialization() {
        let config = OxiProofConfig::default();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"retry_until_resolved\""));

        let parsed = OxiProofConfig::from_json(&json).unwrap();
        assert_eq!(parsed.verifier.step_attempts, config.verifier.step_attempts);
    }

    #[test]
    fn test_validate_rejects_zero_ceiling() {
        let config = VerifierConfig::new().with_audit_retries(0);
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: audit_retries must be at least 1"
        );
    }

    #[test]
    fn test_from_json_rejects_zero_ceiling() {
        let mut config = OxiProofConfig::default();
        config.verifier.max_steps = 0;
        let json = serde_json::to_string(&config).unwrap();
        assert!(OxiProofConfig::from_json(&json).is_err());
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oxiproof.json");

        let config = OxiProofConfig::new().with_transport(RetryConfig::new().with_max_retries(2));
        config.to_file(&path).unwrap();

        let loaded = OxiProofConfig::from_file(&path).unwrap();
        assert_eq!(loaded.transport.max_retries, 2);
    }
}
