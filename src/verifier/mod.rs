//! Step verification: justification, audit and mistake location.
//!
//! The verifier checks one solution sentence at a time:
//! - [`StepVerifier::name_theorem`] asks the oracle to justify or refute the
//!   sentence through explicit rule applications
//! - [`StepVerifier::check_application`] asks the oracle to audit that
//!   justification against the literal sentence
//! - [`MistakeLocator`] drives both over the whole solution
//!
//! Both sub-steps borrow the session immutably and return their artifact.
//! Recording artifacts into the session is left to the caller.

pub mod audit;
pub mod justification;
pub mod locator;
pub mod prompts;

pub use audit::parse_audit;
pub use justification::parse_justification;
pub use locator::MistakeLocator;

use crate::config::VerifierConfig;
use crate::error::{ParseError, ResponseError};
use crate::metrics::MetricsCollector;
use crate::oracle::{Oracle, ask};

/// Runs the per-sentence sub-steps against an oracle.
pub struct StepVerifier<'a, O: ?Sized> {
    oracle: &'a O,
    config: &'a VerifierConfig,
    metrics: Option<&'a MetricsCollector>,
}

impl<'a, O: Oracle + ?Sized> StepVerifier<'a, O> {
    /// Create a verifier over `oracle`.
    pub const fn new(oracle: &'a O, config: &'a VerifierConfig) -> Self {
        Self {
            oracle,
            config,
            metrics: None,
        }
    }

    /// Report rejected responses and phase timings into `metrics`.
    #[must_use]
    pub const fn with_metrics(mut self, metrics: &'a MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The oracle being queried.
    pub const fn oracle(&self) -> &'a O {
        self.oracle
    }

    /// Retry ceilings and policy.
    pub const fn config(&self) -> &'a VerifierConfig {
        self.config
    }

    /// The collector, when attached.
    pub const fn metrics(&self) -> Option<&'a MetricsCollector> {
        self.metrics
    }

    /// One oracle round-trip decoded by `parse`.
    async fn exchange<T, P>(
        &self,
        operation: &'static str,
        prompt: &str,
        parse: P,
    ) -> Result<T, ResponseError>
    where
        P: Fn(&str) -> Result<T, ParseError>,
    {
        let text = ask(self.oracle, prompt).await?;
        parse(&text).map_err(|e| {
            if let Some(metrics) = self.metrics {
                metrics.record_malformed();
            }
            tracing::warn!(operation, "Malformed oracle response: {}", e);
            ResponseError::from(e)
        })
    }
}
