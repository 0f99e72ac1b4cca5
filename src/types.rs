//! Core types for `OxiProof`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label assigned to a solution sentence by the categorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Introduces new logical content and needs verification.
    #[serde(rename = "derivation")]
    Derivation,
    /// Restatement, plan, definition, hypothesis or theorem citation.
    #[serde(rename = "others")]
    Other,
}

impl Category {
    /// Parse the label used in categorization responses.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "derivation" => Some(Self::Derivation),
            "others" => Some(Self::Other),
            _ => None,
        }
    }

    /// The label used in categorization responses.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Derivation => "derivation",
            Self::Other => "others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// How a justification's last conclusion relates to the target sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// The conclusion says the sentence is true.
    Restate,
    /// The conclusion says the sentence is false.
    Contradict,
    /// Inconclusive.
    Neither,
}

impl Relation {
    /// Parse a relation label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "restate" => Some(Self::Restate),
            "contradict" => Some(Self::Contradict),
            "neither" => Some(Self::Neither),
            _ => None,
        }
    }

    /// The label used in audit responses.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Restate => "restate",
            Self::Contradict => "contradict",
            Self::Neither => "neither",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One rule application copied out of a justification response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleApplication {
    /// The rule with its premises and conclusion, in prose.
    pub rule: String,
    /// Global sentence numbers used as premises.
    pub sentence_numbers: Vec<usize>,
    /// Numbers of earlier conclusions used as premises.
    pub conclusion_numbers: Vec<usize>,
    /// The conclusion obtained.
    pub conclusion: String,
}

/// The oracle's proposed proof or refutation of one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification {
    /// The fenced JSON object exactly as the oracle wrote it.
    pub raw: String,
    /// Rule applications recovered from `raw`, in order.
    pub rules: Vec<RuleApplication>,
}

impl Justification {
    /// The raw object with its outer braces removed, as embedded in the
    /// audit prompt.
    #[must_use]
    pub fn body(&self) -> &str {
        let trimmed = self.raw.trim();
        trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed)
            .trim()
    }
}

/// An accepted audit of a justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditVerdict {
    /// Per-rule correctness, contiguous from rule 1.
    pub verdicts: Vec<bool>,
    /// Relation of the last conclusion to the target sentence.
    pub relation: Relation,
}

impl AuditVerdict {
    /// Whether every rule application was judged correct.
    #[must_use]
    pub fn all_correct(&self) -> bool {
        self.verdicts.iter().all(|v| *v)
    }
}

/// Final state of one solution sentence after the locator ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Justified and confirmed.
    Accepted,
    /// The oracle derived the negation of the sentence.
    Refuted,
    /// No round reached a terminal state; flagged fail-closed.
    Unresolved,
    /// Not a derivation, so not verified.
    Skipped,
}

impl StepOutcome {
    /// Whether this outcome is reported as a mistake.
    #[must_use]
    pub const fn is_mistake(self) -> bool {
        matches!(self, Self::Refuted | Self::Unresolved)
    }
}

/// Per-sentence record kept by the locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based index over problem and solution sentences.
    pub global_index: usize,
    /// What the locator concluded.
    pub outcome: StepOutcome,
    /// Justification/audit rounds spent.
    pub attempts: usize,
}

/// Result of running the locator over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeReport {
    /// Flagged global indices in ascending order.
    pub mistakes: Vec<usize>,
    /// One record per examined sentence.
    pub steps: Vec<StepRecord>,
}

impl MistakeReport {
    /// The earliest flagged sentence, if any.
    #[must_use]
    pub fn first_mistake(&self) -> Option<usize> {
        self.mistakes.first().copied()
    }

    /// Whether no sentence was flagged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.mistakes.is_empty()
    }

    pub(crate) fn push(&mut self, record: StepRecord) {
        if record.outcome.is_mistake() {
            self.mistakes.push(record.global_index);
        }
        self.steps.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::from_label("derivation"), Some(Category::Derivation));
        assert_eq!(Category::from_label("others"), Some(Category::Other));
        assert_eq!(Category::from_label("Derivation"), None);
        assert_eq!(Category::Other.to_string(), "others");
    }

    #[test]
    fn test_category_serde_matches_labels() {
        let json = serde_json::to_string(&Category::Other).unwrap();
        assert_eq!(json, "\"others\"");
    }

    #[test]
    fn test_relation_labels() {
        for relation in [Relation::Restate, Relation::Contradict, Relation::Neither] {
            assert_eq!(Relation::from_label(relation.as_label()), Some(relation));
        }
        assert_eq!(Relation::from_label("restates"), None);
    }

    #[test]
    fn test_justification_body_strips_braces() {
        let justification = Justification {
            raw: "{\"rule 1\": \"a\"}".to_string(),
            rules: Vec::new(),
        };
        assert_eq!(justification.body(), "\"rule 1\": \"a\"");
    }

    #[test]
    fn test_audit_all_correct() {
        let verdict = AuditVerdict {
            verdicts: vec![true, true],
            relation: Relation::Restate,
        };
        assert!(verdict.all_correct());

        let verdict = AuditVerdict {
            verdicts: vec![true, false],
            relation: Relation::Restate,
        };
        assert!(!verdict.all_correct());
    }

    #[test]
    fn test_report_tracks_mistakes() {
        let mut report = MistakeReport::default();
        report.push(StepRecord {
            global_index: 3,
            outcome: StepOutcome::Accepted,
            attempts: 1,
        });
        report.push(StepRecord {
            global_index: 4,
            outcome: StepOutcome::Unresolved,
            attempts: 10,
        });
        report.push(StepRecord {
            global_index: 5,
            outcome: StepOutcome::Skipped,
            attempts: 0,
        });

        assert_eq!(report.mistakes, vec![4]);
        assert_eq!(report.first_mistake(), Some(4));
        assert_eq!(report.steps.len(), 3);
        assert!(!report.is_clean());
    }
}
