//! Call accounting around an oracle.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::Oracle;
use crate::error::OracleError;
use crate::metrics::{MetricsCollector, Phase};

/// Records every round-trip of the wrapped oracle in a [`MetricsCollector`].
#[derive(Debug, Clone)]
pub struct MeteredOracle<O> {
    inner: O,
    metrics: Arc<MetricsCollector>,
}

impl<O: Oracle> MeteredOracle<O> {
    /// Wrap `inner`, reporting into `metrics`.
    #[must_use]
    pub const fn new(inner: O, metrics: Arc<MetricsCollector>) -> Self {
        Self { inner, metrics }
    }

    /// The wrapped oracle.
    pub const fn inner(&self) -> &O {
        &self.inner
    }

    /// The shared collector.
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}

#[async_trait]
impl<O: Oracle> Oracle for MeteredOracle<O> {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let start = Instant::now();
        let result = self.inner.generate(prompt).await;
        self.metrics
            .record_phase_timing(Phase::Oracle, start.elapsed());

        let produced_text = result.as_ref().is_ok_and(|text| !text.trim().is_empty());
        self.metrics.record_oracle_call(produced_text);
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
