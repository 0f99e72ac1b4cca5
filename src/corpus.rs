//! Boundary formats for problem corpora and results.
//!
//! Sentence dumps store segmented pairs as plain text:
//!
//! ```text
//! --------------------------------------------------------------------------------
//! problem sentence 1
//! ********************************************************************************
//! solution sentence 1
//! solution sentence 2
//! ```
//!
//! Records open with a line of 80 `-`; a line of 80 `*` separates the
//! problem from the solution. JSON-lines files hold one serialized record
//! per line.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::engine::Verification;
use crate::error::{CorpusError, OxiProofError, Result};
use crate::parser::split_lines;
use crate::session::VerificationSession;

/// Width of the separator lines.
pub const SEPARATOR_WIDTH: usize = 80;

fn record_separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

fn section_separator() -> String {
    "*".repeat(SEPARATOR_WIDTH)
}

/// Parse a sentence dump into unverified sessions.
///
/// # Errors
///
/// [`CorpusError::MissingSeparator`] when a record has no `*` line.
pub fn parse_sentence_dump(text: &str) -> std::result::Result<Vec<VerificationSession>, CorpusError> {
    let section = section_separator();
    text.split(&record_separator())
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .enumerate()
        .map(|(i, record)| {
            let (problem, solution) = record
                .split_once(&section)
                .ok_or(CorpusError::MissingSeparator { record: i + 1 })?;
            Ok(VerificationSession::from_sentences(
                split_lines(problem),
                split_lines(solution),
            ))
        })
        .collect()
}

/// Render sessions as a sentence dump.
#[must_use]
pub fn format_sentence_dump(sessions: &[VerificationSession]) -> String {
    let record = record_separator();
    let section = section_separator();
    let mut out = String::new();
    for session in sessions {
        out.push_str(&record);
        out.push('\n');
        for sentence in session.problem_sentences() {
            out.push_str(sentence);
            out.push('\n');
        }
        out.push_str(&section);
        out.push('\n');
        for sentence in session.solution_sentences() {
            out.push_str(sentence);
            out.push('\n');
        }
    }
    out
}

/// A model solution whose final answer disagrees with the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncorrectSolution {
    /// Problem statement.
    pub problem: String,
    /// Reference answer.
    pub official_answer: String,
    /// Answer extracted from the model response.
    pub model_answer: String,
    /// Full model response.
    pub model_response: String,
}

impl IncorrectSolution {
    /// Build a record, extracting the model answer from the last
    /// `\boxed{...}` in `model_response`. Returns `None` without one.
    #[must_use]
    pub fn from_response(
        problem: impl Into<String>,
        official_answer: impl Into<String>,
        model_response: impl Into<String>,
    ) -> Option<Self> {
        let model_response = model_response.into();
        let model_answer = boxed_answer(&model_response)?.to_string();
        Some(Self {
            problem: problem.into(),
            official_answer: official_answer.into(),
            model_answer,
            model_response,
        })
    }
}

/// Segmented sentences with the indices flagged for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeRecord {
    /// Problem sentences.
    pub problem_sentences: Vec<String>,
    /// Solution sentences.
    pub solution_sentences: Vec<String>,
    /// Flagged global indices.
    pub mistakes: Vec<usize>,
}

impl From<&Verification> for MistakeRecord {
    fn from(verification: &Verification) -> Self {
        Self {
            problem_sentences: verification.session.problem_sentences().to_vec(),
            solution_sentences: verification.session.solution_sentences().to_vec(),
            mistakes: verification.report.mistakes.clone(),
        }
    }
}

/// Text of the last `\boxed{...}`: from the last opening tag to the last
/// closing brace, trimmed.
#[must_use]
pub fn boxed_answer(response: &str) -> Option<&str> {
    const TAG: &str = "\\boxed{";
    let start = response.rfind(TAG)? + TAG.len();
    let end = response.rfind('}')?;
    (end >= start).then(|| response[start..end].trim())
}

/// Serialize records one per line.
///
/// # Errors
///
/// Fails when a record cannot be serialized.
pub fn to_jsonl<T: Serialize>(records: &[T]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Parse one record per non-blank line.
///
/// # Errors
///
/// [`CorpusError::InvalidLine`] naming the first bad line.
pub fn from_jsonl<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| {
                OxiProofError::from(CorpusError::InvalidLine {
                    line: i + 1,
                    message: e.to_string(),
                })
            })
        })
        .collect()
}

/// Read a JSON-lines file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line fails to parse.
#[cfg(feature = "native")]
pub fn load_jsonl<T: DeserializeOwned>(path: impl AsRef<std::path::Path>) -> Result<Vec<T>> {
    let text = std::fs::read_to_string(path)?;
    from_jsonl(&text)
}

/// Write records to a JSON-lines file.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
#[cfg(feature = "native")]
pub fn save_jsonl<T: Serialize>(path: impl AsRef<std::path::Path>, records: &[T]) -> Result<()> {
    std::fs::write(path, to_jsonl(records)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "--------------------------------------------------------------------------------
What is 1 + 1?
********************************************************************************
We have 1 + 1 = 2.
The answer is 2.
--------------------------------------------------------------------------------
Let x = 3.
Find 2x.
********************************************************************************
So 2x = 6.
";

    #[test]
    fn test_parse_sentence_dump() {
        let sessions = parse_sentence_dump(DUMP).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].problem_sentences(), &["What is 1 + 1?".to_string()]);
        assert_eq!(sessions[0].solution_sentences().len(), 2);
        assert_eq!(sessions[1].problem_sentences().len(), 2);
        assert_eq!(sessions[1].global_index(0), 3);
    }

    #[test]
    fn test_format_matches_parse() {
        let sessions = parse_sentence_dump(DUMP).unwrap();
        assert_eq!(format_sentence_dump(&sessions), DUMP);
    }

    #[test]
    fn test_dump_missing_separator() {
        let text = format!("{}\nOnly a problem.\n", "-".repeat(80));
        assert_eq!(
            parse_sentence_dump(&text),
            Err(CorpusError::MissingSeparator { record: 1 })
        );
    }

    #[test]
    fn test_empty_dump() {
        assert!(parse_sentence_dump("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_boxed_answer() {
        assert_eq!(boxed_answer("so \\boxed{ 42 }."), Some("42"));
        assert_eq!(boxed_answer("\\boxed{1} then \\boxed{\\frac{1}{2}}"), Some("\\frac{1}{2}"));
        assert_eq!(boxed_answer("no box"), None);
        assert_eq!(boxed_answer("} \\boxed{"), None);
    }

    #[test]
    fn test_incorrect_solution_from_response() {
        let record =
            IncorrectSolution::from_response("What is 1 + 1?", "2", "It is \\boxed{3}.").unwrap();
        assert_eq!(record.model_answer, "3");
        assert!(IncorrectSolution::from_response("P", "2", "It is 3.").is_none());
    }

    #[test]
    fn test_jsonl_records() {
        let records = vec![
            MistakeRecord {
                problem_sentences: vec!["P.".to_string()],
                solution_sentences: vec!["S.".to_string()],
                mistakes: vec![2],
            },
            MistakeRecord {
                problem_sentences: vec![],
                solution_sentences: vec!["T.".to_string()],
                mistakes: vec![],
            },
        ];

        let text = to_jsonl(&records).unwrap();
        assert_eq!(text.lines().count(), 2);
        let parsed: Vec<MistakeRecord> = from_jsonl(&format!("\n{text}\n")).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_mistake_record_from_verification() {
        let verification = Verification {
            session: VerificationSession::from_sentences(
                vec!["P.".to_string()],
                vec!["S.".to_string()],
            ),
            report: crate::types::MistakeReport {
                mistakes: vec![2],
                steps: Vec::new(),
            },
        };

        let record = MistakeRecord::from(&verification);
        assert_eq!(record.problem_sentences, vec!["P.".to_string()]);
        assert_eq!(record.mistakes, vec![2]);
    }

    #[test]
    fn test_jsonl_reports_bad_line() {
        let text = "{\"problem\": \"p\", \"official_answer\": \"1\", \"model_answer\": \"2\", \"model_response\": \"r\"}\nnot json\n";
        let err = from_jsonl::<IncorrectSolution>(text).unwrap_err();
        assert!(matches!(
            err,
            OxiProofError::Corpus(CorpusError::InvalidLine { line: 2, .. })
        ));
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_jsonl_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incorrect.jsonl");
        let records = vec![IncorrectSolution {
            problem: "P".to_string(),
            official_answer: "1".to_string(),
            model_answer: "2".to_string(),
            model_response: "\\boxed{2}".to_string(),
        }];

        save_jsonl(&path, &records).unwrap();
        let loaded: Vec<IncorrectSolution> = load_jsonl(&path).unwrap();
        assert_eq!(loaded, records);
    }
}
