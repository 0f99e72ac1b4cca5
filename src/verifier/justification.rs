//! The justification sub-step.

use super::StepVerifier;
use super::prompts::justification_prompt;
use crate::error::{ParseError, StepError};
use crate::metrics::Phase;
use crate::oracle::Oracle;
use crate::parser::{JsonObject, index_list, last_json_object, numbered, str_field};
use crate::retry::BoundedRetry;
use crate::session::VerificationSession;
use crate::types::{Justification, RuleApplication};

/// Accept any reply whose last fenced JSON block is an object.
///
/// Rule applications are read leniently from the contiguous `rule k`
/// entries. Missing companion keys leave empty fields.
///
/// # Errors
///
/// Fails when there is no fenced JSON object.
pub fn parse_justification(text: &str) -> Result<Justification, ParseError> {
    let (raw, object) = last_json_object(text)?;
    Ok(Justification {
        raw: raw.to_string(),
        rules: rule_applications(&object),
    })
}

fn rule_applications(object: &JsonObject) -> Vec<RuleApplication> {
    numbered(object, &["rule"])
        .into_iter()
        .enumerate()
        .map(|(i, rule)| {
            let k = i + 1;
            RuleApplication {
                rule: rule
                    .as_str()
                    .map_or_else(|| rule.to_string(), str::to_string),
                sentence_numbers: index_list(object.get(&format!("sentence numbers {k}"))),
                conclusion_numbers: index_list(object.get(&format!("conclusion numbers {k}"))),
                conclusion: str_field(object, &format!("conclusion {k}"))
                    .unwrap_or_default()
                    .to_string(),
            }
        })
        .collect()
}

impl<O: Oracle + ?Sized> StepVerifier<'_, O> {
    /// Ask the oracle to derive or refute solution sentence `index` from
    /// everything before it.
    ///
    /// # Errors
    ///
    /// [`StepError::Session`] for an unsegmented session or bad index, and
    /// [`StepError::Exhausted`] when no attempt produced a JSON object.
    pub async fn name_theorem(
        &self,
        session: &VerificationSession,
        index: usize,
    ) -> Result<Justification, StepError> {
        let context = session.context_for(index)?;
        let prompt = justification_prompt(context);
        let _timer = self.metrics.map(|m| m.time_phase(Phase::Justify));

        let retry = BoundedRetry::new("justification", self.config.justification_retries);
        let justification = retry
            .run(|_| self.exchange(retry.operation(), &prompt, parse_justification))
            .await?;

        tracing::info!(
            index = session.global_index(index),
            rules = justification.rules.len(),
            "Justification received"
        );
        Ok(justification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifierConfig;
    use crate::error::{OracleError, ResponseError, SessionError};
    use crate::metrics::MetricsCollector;
    use crate::oracle::ScriptedOracle;

    const REPLY: &str = "We add 1 to both sides.\n```json\n{\"rule 1\": \"If a = b then a + 1 = b + 1.\", \
        \"sentence numbers 1\": [1], \"conclusion numbers 1\": [], \
        \"conclusion 1\": \"x + 1 = 3.\"}\n```";

    fn session() -> VerificationSession {
        VerificationSession::from_sentences(
            vec!["Let x = 2.".to_string()],
            vec!["Then x + 1 = 3.".to_string(), "Hence x = 5.".to_string()],
        )
    }

    #[test]
    fn test_parse_justification_rules() {
        let justification = parse_justification(REPLY).unwrap();
        assert_eq!(justification.rules.len(), 1);

        let rule = &justification.rules[0];
        assert_eq!(rule.rule, "If a = b then a + 1 = b + 1.");
        assert_eq!(rule.sentence_numbers, vec![1]);
        assert!(rule.conclusion_numbers.is_empty());
        assert_eq!(rule.conclusion, "x + 1 = 3.");
        assert!(justification.raw.starts_with('{'));
    }

    #[test]
    fn test_parse_justification_is_lenient() {
        let justification =
            parse_justification("```json{\"steps\": \"free-form\"}```").unwrap();
        assert!(justification.rules.is_empty());
        assert_eq!(justification.body(), "\"steps\": \"free-form\"");
    }

    #[test]
    fn test_parse_justification_last_block_wins() {
        let text = "```json{\"rule 1\": \"draft\"}``` then ```json{\"rule 1\": \"final\"}```";
        assert_eq!(parse_justification(text).unwrap().rules[0].rule, "final");
    }

    #[test]
    fn test_parse_justification_requires_object() {
        assert_eq!(
            parse_justification("just prose"),
            Err(ParseError::MissingJsonBlock)
        );
    }

    #[tokio::test]
    async fn test_name_theorem_retries_until_json() {
        let oracle = ScriptedOracle::new()
            .then_error(OracleError::Timeout(1))
            .then_text("no json")
            .then_text(REPLY);
        let config = VerifierConfig::default();
        let metrics = MetricsCollector::new();
        let verifier = StepVerifier::new(&oracle, &config).with_metrics(&metrics);

        let justification = verifier.name_theorem(&session(), 0).await.unwrap();
        assert_eq!(justification.rules.len(), 1);
        assert_eq!(oracle.call_count(), 3);
        assert_eq!(metrics.snapshot().malformed_responses, 1);
        assert_eq!(metrics.snapshot().phase_timings["justify"].invocations, 1);
    }

    #[tokio::test]
    async fn test_name_theorem_exhaustion() {
        let oracle = ScriptedOracle::new().repeating("I refuse to use JSON.");
        let config = VerifierConfig::default().with_justification_retries(5);
        let verifier = StepVerifier::new(&oracle, &config);

        let err = verifier.name_theorem(&session(), 0).await.unwrap_err();
        match err {
            StepError::Exhausted(exhausted) => {
                assert_eq!(exhausted.attempts, 5);
                assert_eq!(
                    exhausted.last,
                    Some(ResponseError::Malformed(ParseError::MissingJsonBlock))
                );
            }
            StepError::Session(e) => panic!("unexpected session error: {e}"),
        }
        assert_eq!(oracle.call_count(), 5);
    }

    #[tokio::test]
    async fn test_name_theorem_context_is_causal() {
        let oracle = ScriptedOracle::new().repeating(REPLY);
        let config = VerifierConfig::default();
        let verifier = StepVerifier::new(&oracle, &config);

        verifier.name_theorem(&session(), 0).await.unwrap();
        let prompt = &oracle.prompts()[0];
        assert!(prompt.contains("(2) Then x + 1 = 3."));
        assert!(!prompt.contains("Hence x = 5."));
    }

    #[tokio::test]
    async fn test_name_theorem_session_errors() {
        let oracle = ScriptedOracle::new().repeating(REPLY);
        let config = VerifierConfig::default();
        let verifier = StepVerifier::new(&oracle, &config);

        assert_eq!(
            verifier
                .name_theorem(&VerificationSession::new(), 0)
                .await
                .unwrap_err(),
            StepError::Session(SessionError::NotSegmented)
        );
        assert!(matches!(
            verifier.name_theorem(&session(), 9).await,
            Err(StepError::Session(SessionError::IndexOutOfRange { .. }))
        ));
        assert_eq!(oracle.call_count(), 0);
    }
}
