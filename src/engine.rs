//! The verification engine facade.

use std::sync::Arc;

use futures::future::join_all;

use crate::categorizer;
use crate::config::{OxiProofConfig, VerifierConfig};
use crate::error::{OxiProofError, Result, StepError};
use crate::metrics::{MetricsCollector, Phase, VerificationMetrics};
use crate::oracle::{MeteredOracle, Oracle, RetryingOracle};
use crate::segmenter;
use crate::session::VerificationSession;
use crate::types::{AuditVerdict, Category, Justification, MistakeReport};
use crate::verifier::{MistakeLocator, StepVerifier};

/// A segmented and located problem/solution pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// The session after location, with every artifact recorded.
    pub session: VerificationSession,
    /// Per-step outcomes and flagged indices.
    pub report: MistakeReport,
}

impl Verification {
    /// Flagged global indices.
    #[must_use]
    pub fn mistakes(&self) -> &[usize] {
        &self.report.mistakes
    }
}

/// Verifies step-by-step solutions against an oracle.
///
/// Sessions share nothing but the oracle and the metrics collector, so
/// independent problems can be verified concurrently with
/// [`verify_batch`](Self::verify_batch).
pub struct ProofVerifier<O> {
    oracle: MeteredOracle<O>,
    config: VerifierConfig,
    metrics: Arc<MetricsCollector>,
}

impl<O: Oracle> ProofVerifier<O> {
    /// Create a verifier with its own metrics collector.
    pub fn new(oracle: O, config: VerifierConfig) -> Self {
        Self::with_metrics(oracle, config, Arc::new(MetricsCollector::new()))
    }

    fn with_metrics(oracle: O, config: VerifierConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            oracle: MeteredOracle::new(oracle, Arc::clone(&metrics)),
            config,
            metrics,
        }
    }

    /// Start building a verifier.
    #[must_use]
    pub fn builder() -> ProofVerifierBuilder<O> {
        ProofVerifierBuilder::new()
    }

    /// The engine configuration.
    pub const fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The underlying oracle.
    pub const fn oracle(&self) -> &O {
        self.oracle.inner()
    }

    /// A snapshot of collected metrics.
    #[must_use]
    pub fn metrics(&self) -> VerificationMetrics {
        self.metrics.snapshot()
    }

    /// The shared collector.
    #[must_use]
    pub fn metrics_collector(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    fn steps(&self) -> StepVerifier<'_, MeteredOracle<O>> {
        StepVerifier::new(&self.oracle, &self.config).with_metrics(&self.metrics)
    }

    /// Split `text` into sentences.
    ///
    /// # Errors
    ///
    /// See [`segmenter::segment`].
    pub async fn segment(&self, text: &str) -> Result<Vec<String>> {
        let _timer = self.metrics.time_phase(Phase::Segment);
        Ok(segmenter::segment(&self.oracle, text).await?)
    }

    /// Rewrite and segment a problem and its solution.
    ///
    /// # Errors
    ///
    /// See [`segmenter::cleanup_and_segment`].
    pub async fn cleanup_and_segment(
        &self,
        problem: &str,
        solution: &str,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let _timer = self.metrics.time_phase(Phase::Segment);
        Ok(segmenter::cleanup_and_segment(&self.oracle, problem, solution).await?)
    }

    /// Segment a problem/solution pair into a fresh session.
    ///
    /// # Errors
    ///
    /// Fails when any segmentation stage fails.
    pub async fn open_session(&self, problem: &str, solution: &str) -> Result<VerificationSession> {
        let (problem_sentences, solution_sentences) =
            self.cleanup_and_segment(problem, solution).await?;
        Ok(VerificationSession::from_sentences(
            problem_sentences,
            solution_sentences,
        ))
    }

    /// Label the session's solution sentences and store the labels.
    ///
    /// # Errors
    ///
    /// Fails on an unsegmented session or when every sample was invalid.
    pub async fn categorize(&self, session: &mut VerificationSession) -> Result<Vec<Category>> {
        session.ensure_segmented()?;
        let _timer = self.metrics.time_phase(Phase::Categorize);
        let labels = categorizer::categorize(
            &self.oracle,
            session.solution_sentences(),
            self.config.categorization_samples,
        )
        .await?;
        session.set_categories(&labels);
        Ok(labels)
    }

    /// Run the justification sub-step for solution sentence `index` and
    /// store its artifact. `None` means every attempt was rejected.
    ///
    /// # Errors
    ///
    /// Fails only on an unsegmented session or an out-of-range index.
    pub async fn justify(
        &self,
        session: &mut VerificationSession,
        index: usize,
    ) -> Result<Option<Justification>> {
        let justification = settle(self.steps().name_theorem(session, index).await)?;
        session.record_justification(index, justification.clone())?;
        Ok(justification)
    }

    /// Audit the stored justification of solution sentence `index` and store
    /// the verdict. Without a justification the sentence has no verdict.
    ///
    /// # Errors
    ///
    /// Fails only on an unsegmented session or an out-of-range index.
    pub async fn audit(
        &self,
        session: &mut VerificationSession,
        index: usize,
    ) -> Result<Option<AuditVerdict>> {
        session.check_index(index)?;
        let verdict = match session.justification(index) {
            Some(justification) => settle(
                self.steps()
                    .check_application(session, index, justification)
                    .await,
            )?,
            None => None,
        };
        session.record_audit(index, verdict.clone())?;
        Ok(verdict)
    }

    /// Global indices of flagged sentences.
    ///
    /// # Errors
    ///
    /// Fails only on an unsegmented session.
    pub async fn find_first_mistake(&self, session: &mut VerificationSession) -> Result<Vec<usize>> {
        Ok(MistakeLocator::new(self.steps())
            .find_first_mistake(session)
            .await?)
    }

    /// Locate mistakes and return the per-step report.
    ///
    /// # Errors
    ///
    /// Fails only on an unsegmented session.
    pub async fn locate(&self, session: &mut VerificationSession) -> Result<MistakeReport> {
        Ok(MistakeLocator::new(self.steps()).locate(session).await?)
    }

    /// Segment a raw problem/solution pair, then locate its mistakes.
    ///
    /// # Errors
    ///
    /// Fails when segmentation fails.
    pub async fn verify_solution(&self, problem: &str, solution: &str) -> Result<Verification> {
        let mut session = self.open_session(problem, solution).await?;
        let report = self.locate(&mut session).await?;
        tracing::info!(
            sentences = session.all_sentences().len(),
            mistakes = ?report.mistakes,
            "Verified solution"
        );
        Ok(Verification { session, report })
    }

    /// Verify independent pairs concurrently. Results keep input order.
    pub async fn verify_batch<P, S>(&self, pairs: &[(P, S)]) -> Vec<Result<Verification>>
    where
        P: AsRef<str>,
        S: AsRef<str>,
    {
        let futures: Vec<_> = pairs
            .iter()
            .map(|(problem, solution)| self.verify_solution(problem.as_ref(), solution.as_ref()))
            .collect();
        join_all(futures).await
    }

    /// Locate mistakes in already segmented sessions concurrently.
    pub async fn locate_batch(
        &self,
        sessions: &mut [VerificationSession],
    ) -> Vec<Result<MistakeReport>> {
        let futures: Vec<_> = sessions
            .iter_mut()
            .map(|session| self.locate(session))
            .collect();
        join_all(futures).await
    }
}

impl<O: Oracle> ProofVerifier<RetryingOracle<O>> {
    /// Build a verifier whose oracle retries transport failures as
    /// `config.transport` prescribes.
    ///
    /// # Errors
    ///
    /// Fails when `config` is invalid.
    pub fn from_config(oracle: O, config: &OxiProofConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            RetryingOracle::from_config(oracle, config.transport.clone()),
            config.verifier.clone(),
        ))
    }
}

/// Turn retry exhaustion into "no artifact" and keep contract violations.
fn settle<T>(result: std::result::Result<T, StepError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StepError::Exhausted(e)) => {
            tracing::warn!("{}", e);
            Ok(None)
        }
        Err(StepError::Session(e)) => Err(e.into()),
    }
}

/// Builder for [`ProofVerifier`].
pub struct ProofVerifierBuilder<O> {
    oracle: Option<O>,
    config: VerifierConfig,
    metrics: Option<Arc<MetricsCollector>>,
}

impl<O> Default for ProofVerifierBuilder<O> {
    fn default() -> Self {
        Self {
            oracle: None,
            config: VerifierConfig::default(),
            metrics: None,
        }
    }
}

impl<O: Oracle> ProofVerifierBuilder<O> {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: O) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Set the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing metrics collector.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if no oracle is set or the configuration is invalid.
    pub fn build(self) -> Result<ProofVerifier<O>> {
        let oracle = self
            .oracle
            .ok_or_else(|| OxiProofError::Config("Oracle not configured".to_string()))?;
        self.config.validate()?;
        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(MetricsCollector::new()));
        Ok(ProofVerifier::with_metrics(oracle, self.config, metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocatorPolicy;
    use crate::error::{OracleError, SegmentError, SessionError};
    use crate::oracle::{FnOracle, ScriptedOracle};
    use crate::types::{Relation, StepOutcome};

    const JUSTIFY: &str = "```json{\"rule 1\": \"Arithmetic.\", \"sentence numbers 1\": [1], \
        \"conclusion numbers 1\": [], \"conclusion 1\": \"1 + 1 = 2.\"}```";

    /// An oracle that segments one fixed problem and grades sentences by
    /// whether they contain `wrong`.
    fn grading_oracle() -> FnOracle<impl Fn(&str) -> std::result::Result<String, OracleError> + Send + Sync> {
        FnOracle::new(|prompt: &str| {
            let reply = if prompt.starts_with("Rewrite the solution") {
                if prompt.contains("wrong") {
                    "```So 1 + 1 = 3 (wrong). The answer is 3.```"
                } else {
                    "```So 1 + 1 = 2. The answer is 2.```"
                }
            } else if prompt.starts_with("Place each sentence") {
                if prompt.contains("What is 1 + 1?") {
                    "```\nWhat is 1 + 1?\n```"
                } else if prompt.contains("wrong") {
                    "```\nSo 1 + 1 = 3 (wrong).\nThe answer is 3.\n```"
                } else {
                    "```\nSo 1 + 1 = 2.\nThe answer is 2.\n```"
                }
            } else if prompt.contains("Check applications") {
                // The audited sentence is quoted right before "(the last conclusion".
                if prompt.contains("(wrong).\" (the last") {
                    "```json{\"verdict 1\": true, \"relation\": \"contradict\"}```"
                } else {
                    "```json{\"verdict 1\": true, \"relation\": \"restate\"}```"
                }
            } else {
                JUSTIFY
            };
            Ok(reply.to_string())
        })
    }

    #[tokio::test]
    async fn test_verify_solution_clean() {
        let verifier = ProofVerifier::new(grading_oracle(), VerifierConfig::default());
        let verification = verifier
            .verify_solution("What is 1 + 1?", "1+1=2, answer 2")
            .await
            .unwrap();

        assert!(verification.mistakes().is_empty());
        assert_eq!(verification.session.problem_sentences().len(), 1);
        assert_eq!(verification.session.solution_sentences().len(), 2);

        let metrics = verifier.metrics();
        assert_eq!(metrics.accepted, 2);
        assert_eq!(metrics.phase_timings["segment"].invocations, 1);
        // Rewrite, two segmentations, then a justification and audit per sentence.
        assert_eq!(metrics.oracle_calls, 7);
    }

    #[tokio::test]
    async fn test_verify_batch_keeps_order() {
        let verifier = ProofVerifier::new(grading_oracle(), VerifierConfig::default());
        let pairs = [
            ("What is 1 + 1?", "1+1=3 wrong"),
            ("What is 1 + 1?", "1+1=2"),
        ];

        let results = verifier.verify_batch(&pairs).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().mistakes(), &[2]);
        assert!(results[1].as_ref().unwrap().mistakes().is_empty());
    }

    #[tokio::test]
    async fn test_segmentation_failure_surfaces() {
        let verifier = ProofVerifier::new(
            ScriptedOracle::new().repeating("no fences"),
            VerifierConfig::default(),
        );
        let err = verifier.verify_solution("P", "S").await.unwrap_err();
        assert!(matches!(
            err,
            OxiProofError::Segment(SegmentError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_manual_justify_and_audit() {
        let oracle = ScriptedOracle::new()
            .then_text(JUSTIFY)
            .then_text("```json{\"rule 1\": true, \"relation\": \"restate\"}```");
        let verifier = ProofVerifier::new(oracle, VerifierConfig::default());
        let mut session = VerificationSession::from_sentences(
            vec!["What is 1 + 1?".to_string()],
            vec!["1 + 1 = 2.".to_string()],
        );

        let justification = verifier.justify(&mut session, 0).await.unwrap();
        assert!(justification.is_some());
        assert!(session.justification(0).is_some());

        let verdict = verifier.audit(&mut session, 0).await.unwrap().unwrap();
        assert_eq!(verdict.relation, Relation::Restate);
        assert_eq!(session.rule_verdicts(0), &[true]);

        let prompts = verifier.oracle().prompts();
        assert!(prompts[1].contains("\"rule 1\": \"Arithmetic.\""));
    }

    #[tokio::test]
    async fn test_audit_without_justification_has_no_verdict() {
        let verifier = ProofVerifier::new(ScriptedOracle::new(), VerifierConfig::default());
        let mut session = VerificationSession::from_sentences(vec![], vec!["A.".to_string()]);

        assert_eq!(verifier.audit(&mut session, 0).await.unwrap(), None);
        assert_eq!(verifier.oracle().call_count(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_justification_is_none() {
        let verifier = ProofVerifier::new(
            ScriptedOracle::new().repeating("prose only"),
            VerifierConfig::default().with_justification_retries(2),
        );
        let mut session = VerificationSession::from_sentences(vec![], vec!["A.".to_string()]);

        assert_eq!(verifier.justify(&mut session, 0).await.unwrap(), None);
        assert_eq!(verifier.metrics().malformed_responses, 2);
    }

    #[tokio::test]
    async fn test_contract_violations_are_errors() {
        let verifier = ProofVerifier::new(ScriptedOracle::new(), VerifierConfig::default());
        let mut empty = VerificationSession::new();

        assert!(matches!(
            verifier.find_first_mistake(&mut empty).await,
            Err(OxiProofError::Session(SessionError::NotSegmented))
        ));
        assert!(matches!(
            verifier.categorize(&mut empty).await,
            Err(OxiProofError::Session(SessionError::NotSegmented))
        ));

        let mut session = VerificationSession::from_sentences(vec![], vec!["A.".to_string()]);
        assert!(matches!(
            verifier.justify(&mut session, 3).await,
            Err(OxiProofError::Session(SessionError::IndexOutOfRange { .. }))
        ));
    }

    #[tokio::test]
    async fn test_categorize_stores_labels() {
        let oracle = ScriptedOracle::new().repeating(
            "```json{\"sentence 1\": \"others\", \"sentence 2\": \"derivation\"}```",
        );
        let verifier = ProofVerifier::new(oracle, VerifierConfig::default());
        let mut session = VerificationSession::from_sentences(
            vec!["P.".to_string()],
            vec!["Plan.".to_string(), "Result.".to_string()],
        );

        let labels = verifier.categorize(&mut session).await.unwrap();
        assert_eq!(labels, vec![Category::Other, Category::Derivation]);
        assert_eq!(session.category(1), Some(Category::Derivation));
        assert_eq!(verifier.oracle().call_count(), 7);
    }

    #[tokio::test]
    async fn test_locate_batch() {
        let oracle = ScriptedOracle::new()
            .repeating("```json{\"verdict 1\": true, \"relation\": \"restate\"}```");
        let config = VerifierConfig::default()
            .with_policy(LocatorPolicy::RetryUntilResolved)
            .with_step_attempts(1);
        let verifier = ProofVerifier::new(oracle, config);
        let mut sessions = vec![
            VerificationSession::from_sentences(vec!["P.".to_string()], vec!["A.".to_string()]),
            VerificationSession::new(),
        ];

        let reports = verifier.locate_batch(&mut sessions).await;
        // The scripted reply doubles as a justification object and a valid audit.
        assert_eq!(reports[0].as_ref().unwrap().steps[0].outcome, StepOutcome::Accepted);
        assert!(reports[1].is_err());
    }

    #[test]
    fn test_builder_requires_oracle() {
        let result = ProofVerifier::<ScriptedOracle>::builder().build();
        assert!(matches!(result, Err(OxiProofError::Config(_))));
    }

    #[test]
    fn test_builder_validates_config() {
        let result = ProofVerifier::builder()
            .with_oracle(ScriptedOracle::new())
            .with_config(VerifierConfig::default().with_step_attempts(0))
            .build();
        assert!(matches!(result, Err(OxiProofError::Config(_))));
    }

    #[test]
    fn test_builder_shares_metrics() {
        let metrics = Arc::new(MetricsCollector::new());
        let verifier = ProofVerifier::builder()
            .with_oracle(ScriptedOracle::new())
            .with_metrics(Arc::clone(&metrics))
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(verifier.metrics_collector(), &metrics));
    }

    #[test]
    fn test_from_config_wraps_transport_retry() {
        let config = OxiProofConfig::default();
        let verifier = ProofVerifier::from_config(ScriptedOracle::new(), &config).unwrap();
        assert_eq!(verifier.oracle().policy().config().max_retries, 6);
        assert_eq!(verifier.config().step_attempts, 10);
    }
}
