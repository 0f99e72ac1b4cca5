//! Per-problem verification state.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::types::{AuditVerdict, Category, Justification, Relation};

/// State for one problem/solution pair.
///
/// Sentences are addressed two ways. Solution-local indices are 0-based
/// positions in [`solution_sentences`](Self::solution_sentences). Global
/// indices are 1-based positions in [`all_sentences`](Self::all_sentences),
/// i.e. problem sentences first. The per-sentence arrays are parallel to
/// the solution and are reset whenever the sentences change.
///
/// Deserialization rebuilds the derived state from the two sentence lists.
/// Stored artifacts are kept only when they line up with the solution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionParts")]
pub struct VerificationSession {
    problem_sentences: Vec<String>,
    solution_sentences: Vec<String>,
    all_sentences: Vec<String>,
    categories: Vec<Option<Category>>,
    justifications: Vec<Option<Justification>>,
    rule_verdicts: Vec<Vec<bool>>,
    relations: Vec<Option<Relation>>,
}

/// Serialized form of a session. `all_sentences` is ignored on input.
#[derive(Deserialize)]
struct SessionParts {
    problem_sentences: Vec<String>,
    solution_sentences: Vec<String>,
    #[serde(default)]
    categories: Vec<Option<Category>>,
    #[serde(default)]
    justifications: Vec<Option<Justification>>,
    #[serde(default)]
    rule_verdicts: Vec<Vec<bool>>,
    #[serde(default)]
    relations: Vec<Option<Relation>>,
}

/// Accept an empty array as "nothing recorded"; any other length must match.
fn aligned<T: Clone>(
    field: &'static str,
    values: Vec<T>,
    expected: usize,
    fresh: T,
) -> Result<Vec<T>, SessionError> {
    if values.is_empty() {
        return Ok(vec![fresh; expected]);
    }
    if values.len() != expected {
        return Err(SessionError::Misaligned {
            field,
            len: values.len(),
            expected,
        });
    }
    Ok(values)
}

impl TryFrom<SessionParts> for VerificationSession {
    type Error = SessionError;

    fn try_from(parts: SessionParts) -> Result<Self, Self::Error> {
        let mut session = Self::from_sentences(parts.problem_sentences, parts.solution_sentences);
        let n = session.solution_sentences.len();
        session.categories = aligned("categories", parts.categories, n, None)?;
        session.justifications = aligned("justifications", parts.justifications, n, None)?;
        session.rule_verdicts = aligned("rule_verdicts", parts.rule_verdicts, n, Vec::new())?;
        session.relations = aligned("relations", parts.relations, n, None)?;
        Ok(session)
    }
}

impl VerificationSession {
    /// Create an empty, unsegmented session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session from already segmented sentences.
    #[must_use]
    pub fn from_sentences(problem: Vec<String>, solution: Vec<String>) -> Self {
        let mut session = Self {
            problem_sentences: problem,
            solution_sentences: solution,
            ..Self::default()
        };
        session.rebuild();
        session
    }

    /// Replace the problem sentences.
    pub fn set_problem_sentences(&mut self, sentences: Vec<String>) {
        self.problem_sentences = sentences;
        self.rebuild();
    }

    /// Replace the solution sentences, clearing all per-sentence state.
    pub fn set_solution_sentences(&mut self, sentences: Vec<String>) {
        self.solution_sentences = sentences;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.all_sentences = self
            .problem_sentences
            .iter()
            .chain(&self.solution_sentences)
            .cloned()
            .collect();

        let n = self.solution_sentences.len();
        self.categories = vec![None; n];
        self.justifications = vec![None; n];
        self.rule_verdicts = vec![Vec::new(); n];
        self.relations = vec![None; n];
    }

    /// Problem statement sentences.
    #[must_use]
    pub fn problem_sentences(&self) -> &[String] {
        &self.problem_sentences
    }

    /// Solution sentences.
    #[must_use]
    pub fn solution_sentences(&self) -> &[String] {
        &self.solution_sentences
    }

    /// Problem sentences followed by solution sentences.
    #[must_use]
    pub fn all_sentences(&self) -> &[String] {
        &self.all_sentences
    }

    /// Whether the session has a solution to verify.
    #[must_use]
    pub fn is_segmented(&self) -> bool {
        !self.solution_sentences.is_empty()
    }

    /// Fail with [`SessionError::NotSegmented`] when there is no solution.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn ensure_segmented(&self) -> Result<(), SessionError> {
        if self.is_segmented() {
            Ok(())
        } else {
            Err(SessionError::NotSegmented)
        }
    }

    /// Fail unless `index` addresses a solution sentence.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotSegmented`] or [`SessionError::IndexOutOfRange`].
    pub fn check_index(&self, index: usize) -> Result<(), SessionError> {
        self.ensure_segmented()?;
        if index < self.solution_sentences.len() {
            Ok(())
        } else {
            Err(SessionError::IndexOutOfRange {
                index,
                len: self.solution_sentences.len(),
            })
        }
    }

    /// Global 1-based index of solution sentence `index`.
    #[must_use]
    pub fn global_index(&self, index: usize) -> usize {
        index + self.problem_sentences.len() + 1
    }

    /// Sentences `1..=n` where `n` is the global index of solution sentence
    /// `index`: every premise plus the target itself, never anything later.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of range.
    pub fn context_for(&self, index: usize) -> Result<&[String], SessionError> {
        self.check_index(index)?;
        Ok(&self.all_sentences[..self.global_index(index)])
    }

    /// Category of solution sentence `index`, if categorized.
    #[must_use]
    pub fn category(&self, index: usize) -> Option<Category> {
        self.categories.get(index).copied().flatten()
    }

    /// All categories.
    #[must_use]
    pub fn categories(&self) -> &[Option<Category>] {
        &self.categories
    }

    /// Store categorizer output. Extra labels are ignored.
    pub fn set_categories(&mut self, categories: &[Category]) {
        for (slot, category) in self.categories.iter_mut().zip(categories) {
            *slot = Some(*category);
        }
    }

    /// Latest justification for solution sentence `index`.
    #[must_use]
    pub fn justification(&self, index: usize) -> Option<&Justification> {
        self.justifications.get(index).and_then(Option::as_ref)
    }

    /// Per-rule verdicts for solution sentence `index`; empty means no verdict.
    #[must_use]
    pub fn rule_verdicts(&self, index: usize) -> &[bool] {
        self.rule_verdicts.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Relation verdict for solution sentence `index`.
    #[must_use]
    pub fn relation(&self, index: usize) -> Option<Relation> {
        self.relations.get(index).copied().flatten()
    }

    /// Overwrite the justification of solution sentence `index`.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of range.
    pub fn record_justification(
        &mut self,
        index: usize,
        justification: Option<Justification>,
    ) -> Result<(), SessionError> {
        self.check_index(index)?;
        self.justifications[index] = justification;
        Ok(())
    }

    /// Overwrite the audit outcome of solution sentence `index`. `None`
    /// resets it to the no-verdict state.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of range.
    pub fn record_audit(
        &mut self,
        index: usize,
        audit: Option<AuditVerdict>,
    ) -> Result<(), SessionError> {
        self.check_index(index)?;
        match audit {
            Some(audit) => {
                self.rule_verdicts[index] = audit.verdicts;
                self.relations[index] = Some(audit.relation);
            }
            None => {
                self.rule_verdicts[index].clear();
                self.relations[index] = None;
            }
        }
        Ok(())
    }
}

/// Render sentences as `(1) first (2) second ...`.
#[must_use]
pub fn numbered_text(sentences: &[String]) -> String {
    sentences
        .iter()
        .enumerate()
        .map(|(i, s)| format!("({}) {}", i + 1, s))
        .collect::<Vec<_>>()
        .join(" ")
}
