//! The mistake locator.

use thiserror::Error;

use super::StepVerifier;
use crate::categorizer::categorize;
use crate::config::LocatorPolicy;
use crate::error::{SessionError, StepError};
use crate::metrics::Phase;
use crate::oracle::Oracle;
use crate::retry::{BoundedRetry, Retryable};
use crate::session::VerificationSession;
use crate::types::{
    AuditVerdict, Category, Justification, MistakeReport, Relation, StepOutcome, StepRecord,
};

/// Artifacts of one justification/audit round.
#[derive(Debug, Clone, Default)]
struct Round {
    number: usize,
    justification: Option<Justification>,
    audit: Option<AuditVerdict>,
}

impl Round {
    /// Terminal outcome, or `None` when another round is needed.
    fn outcome(&self) -> Option<StepOutcome> {
        let audit = self.audit.as_ref()?;
        if !audit.all_correct() {
            return None;
        }
        match audit.relation {
            Relation::Restate => Some(StepOutcome::Accepted),
            Relation::Contradict => Some(StepOutcome::Refuted),
            Relation::Neither => None,
        }
    }
}

/// Why a round did not settle the sentence.
#[derive(Debug, Error)]
enum RoundError {
    #[error("no audit verdict in round {}", .0.number)]
    NoVerdict(Round),

    #[error("inconclusive audit in round {}", .0.number)]
    Unresolved(Round),

    #[error(transparent)]
    Session(SessionError),
}

impl Retryable for RoundError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Session(_))
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

/// Walks the solution in order and flags sentences the oracle cannot
/// confirm.
///
/// Steps run strictly one after another; each oracle reply is awaited
/// before the next prompt is built.
pub struct MistakeLocator<'a, O: ?Sized> {
    steps: StepVerifier<'a, O>,
}

impl<'a, O: Oracle + ?Sized> MistakeLocator<'a, O> {
    /// Create a locator driving `steps`.
    pub const fn new(steps: StepVerifier<'a, O>) -> Self {
        Self { steps }
    }

    /// Global indices of flagged sentences, in ascending order.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotSegmented`] when the session has no solution.
    pub async fn find_first_mistake(
        &self,
        session: &mut VerificationSession,
    ) -> Result<Vec<usize>, SessionError> {
        Ok(self.locate(session).await?.mistakes)
    }

    /// Run the configured policy and return a per-step report.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotSegmented`] when the session has no solution.
    pub async fn locate(
        &self,
        session: &mut VerificationSession,
    ) -> Result<MistakeReport, SessionError> {
        session.ensure_segmented()?;
        let config = self.steps.config();

        let gated = match config.policy {
            LocatorPolicy::RetryUntilResolved => false,
            LocatorPolicy::CategoryGated => self.ensure_categories(session).await,
        };

        let limit = session.solution_sentences().len().min(config.max_steps);
        let mut report = MistakeReport::default();

        for index in 0..limit {
            let global_index = session.global_index(index);

            let record = if gated && session.category(index) == Some(Category::Other) {
                StepRecord {
                    global_index,
                    outcome: StepOutcome::Skipped,
                    attempts: 0,
                }
            } else {
                tracing::info!(index = global_index, "Checking sentence");
                match config.policy {
                    LocatorPolicy::RetryUntilResolved => {
                        self.retry_until_resolved(session, index).await?
                    }
                    LocatorPolicy::CategoryGated => self.single_round(session, index).await?,
                }
            };

            if let Some(metrics) = self.steps.metrics() {
                metrics.record_outcome(record.outcome);
            }
            let flagged = record.outcome.is_mistake();
            if flagged {
                tracing::info!(index = global_index, outcome = ?record.outcome, "Found mistake");
            }
            report.push(record);

            if flagged && config.stop_at_first_mistake {
                break;
            }
        }

        Ok(report)
    }

    /// Make sure every solution sentence has a category. Returns `false`
    /// when categorization failed and every sentence must be verified.
    async fn ensure_categories(&self, session: &mut VerificationSession) -> bool {
        if session.categories().iter().all(Option::is_some) {
            return true;
        }

        let _timer = self.steps.metrics().map(|m| m.time_phase(Phase::Categorize));
        let labels = categorize(
            self.steps.oracle(),
            session.solution_sentences(),
            self.steps.config().categorization_samples,
        )
        .await;

        match labels {
            Ok(labels) => {
                session.set_categories(&labels);
                true
            }
            Err(e) => {
                tracing::warn!("Categorization failed, verifying every sentence: {}", e);
                false
            }
        }
    }

    /// One justification followed by one audit, without recording.
    async fn verify_once(
        &self,
        session: &VerificationSession,
        index: usize,
        number: usize,
    ) -> Result<Round, SessionError> {
        let mut round = Round {
            number,
            ..Round::default()
        };

        let justification = match self.steps.name_theorem(session, index).await {
            Ok(justification) => justification,
            Err(StepError::Session(e)) => return Err(e),
            Err(StepError::Exhausted(e)) => {
                tracing::info!(index = session.global_index(index), "No justification: {}", e);
                return Ok(round);
            }
        };

        match self
            .steps
            .check_application(session, index, &justification)
            .await
        {
            Ok(audit) => round.audit = Some(audit),
            Err(StepError::Session(e)) => return Err(e),
            Err(StepError::Exhausted(e)) => {
                tracing::info!(index = session.global_index(index), "No audit verdict: {}", e);
            }
        }
        round.justification = Some(justification);
        Ok(round)
    }

    async fn round(
        &self,
        session: &VerificationSession,
        index: usize,
        number: usize,
    ) -> Result<(StepOutcome, Round), RoundError> {
        let round = self
            .verify_once(session, index, number)
            .await
            .map_err(RoundError::Session)?;

        match round.outcome() {
            Some(outcome) => Ok((outcome, round)),
            None if round.audit.is_none() => Err(RoundError::NoVerdict(round)),
            None => Err(RoundError::Unresolved(round)),
        }
    }

    /// Repeat rounds until the sentence is accepted or refuted. Running out of
    /// rounds flags the sentence.
    async fn retry_until_resolved(
        &self,
        session: &mut VerificationSession,
        index: usize,
    ) -> Result<StepRecord, SessionError> {
        let global_index = session.global_index(index);
        let retry = BoundedRetry::new("step", self.steps.config().step_attempts);

        let view: &VerificationSession = session;
        let result = retry
            .run(|number| self.round(view, index, number))
            .await;

        let (outcome, round) = match result {
            Ok(settled) => settled,
            Err(exhausted) => match exhausted.last {
                Some(RoundError::Session(e)) => return Err(e),
                Some(RoundError::NoVerdict(round) | RoundError::Unresolved(round)) => {
                    (StepOutcome::Unresolved, round)
                }
                None => (StepOutcome::Unresolved, Round::default()),
            },
        };

        if outcome == StepOutcome::Unresolved {
            tracing::warn!(
                index = global_index,
                attempts = retry.max_attempts(),
                "Sentence unresolved, flagging"
            );
        }

        let attempts = round.number;
        record(session, index, round)?;
        Ok(StepRecord {
            global_index,
            outcome,
            attempts,
        })
    }

    /// A single round: anything short of all-true plus `restate` or
    /// `contradict` is flagged as unresolved.
    async fn single_round(
        &self,
        session: &mut VerificationSession,
        index: usize,
    ) -> Result<StepRecord, SessionError> {
        let round = self.verify_once(session, index, 1).await?;
        let outcome = round.outcome().unwrap_or(StepOutcome::Unresolved);
        record(session, index, round)?;
        Ok(StepRecord {
            global_index: session.global_index(index),
            outcome,
            attempts: 1,
        })
    }
}

/// Store the artifacts of the final round.
fn record(session: &mut VerificationSession, index: usize, round: Round) -> Result<(), SessionError> {
    session.record_justification(index, round.justification)?;
    session.record_audit(index, round.audit)
}
