//! The audit sub-step.

use serde_json::Value;

use super::StepVerifier;
use super::prompts::audit_prompt;
use crate::error::{ParseError, StepError};
use crate::metrics::Phase;
use crate::oracle::Oracle;
use crate::parser::{last_json_object, numbered};
use crate::retry::BoundedRetry;
use crate::session::VerificationSession;
use crate::types::{AuditVerdict, Justification, Relation};

/// Key prefixes accepted for per-rule verdicts.
const VERDICT_PREFIXES: &[&str] = &["verdict", "rule"];

/// Decode an audit reply.
///
/// The reply is accepted only when its last fenced JSON object has at least
/// one boolean verdict numbered contiguously from 1 and a `relation` that is
/// exactly `restate`, `contradict` or `neither`.
///
/// # Errors
///
/// Returns the first violated expectation.
pub fn parse_audit(text: &str) -> Result<AuditVerdict, ParseError> {
    let (_, object) = last_json_object(text)?;

    let values = numbered(&object, VERDICT_PREFIXES);
    if values.is_empty() {
        return Err(ParseError::NoVerdicts);
    }
    let verdicts = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .as_bool()
                .ok_or_else(|| ParseError::NonBooleanVerdict(format!("verdict {}", i + 1)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let value = object
        .get("relation")
        .ok_or_else(|| ParseError::MissingKey("relation".to_string()))?;
    let relation = value
        .as_str()
        .and_then(Relation::from_label)
        .ok_or_else(|| ParseError::InvalidLabel {
            key: "relation".to_string(),
            value: Value::to_string(value),
        })?;

    Ok(AuditVerdict { verdicts, relation })
}

impl<O: Oracle + ?Sized> StepVerifier<'_, O> {
    /// Ask the oracle to audit `justification` for solution sentence `index`.
    ///
    /// # Errors
    ///
    /// [`StepError::Session`] for an unsegmented session or bad index, and
    /// [`StepError::Exhausted`] when no attempt passed validation.
    pub async fn check_application(
        &self,
        session: &VerificationSession,
        index: usize,
        justification: &Justification,
    ) -> Result<AuditVerdict, StepError> {
        let context = session.context_for(index)?;
        let prompt = audit_prompt(context, justification.body());
        let _timer = self.metrics.map(|m| m.time_phase(Phase::Audit));

        let retry = BoundedRetry::new("audit", self.config.audit_retries);
        let verdict = retry
            .run(|_| self.exchange(retry.operation(), &prompt, parse_audit))
            .await?;

        tracing::info!(
            index = session.global_index(index),
            verdicts = ?verdict.verdicts,
            relation = %verdict.relation,
            "Audit received"
        );
        Ok(verdict)
    }
}
