//! Unified error types for `OxiProof`.

use thiserror::Error;

/// The main error type for `OxiProof` operations.
#[derive(Debug, Error)]
pub enum OxiProofError {
    /// Oracle transport errors
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Response parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Segmentation errors
    #[error("Segmentation error: {0}")]
    Segment(#[from] SegmentError),

    /// Categorization errors
    #[error("Categorization error: {0}")]
    Categorize(#[from] CategorizeError),

    /// Session contract violations
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Corpus file format errors
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors (native only)
    #[cfg(feature = "native")]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by an oracle when it produces no usable text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The oracle could not be reached or refused the request.
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    /// The oracle answered with blank text.
    #[error("Oracle returned an empty response")]
    EmptyResponse,

    /// The request did not complete in time.
    #[error("Oracle timed out after {0}ms")]
    Timeout(u64),

    /// Backend-specific failure.
    #[error("Oracle backend error: {0}")]
    Backend(String),
}

/// Violations of the fenced-block and JSON conventions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Fewer than two distinct delimiter occurrences.
    #[error("Expected an opening and a closing ``` delimiter")]
    MissingDelimiter,

    /// No ```json { ... } ``` block in the response.
    #[error("No fenced JSON block in response")]
    MissingJsonBlock,

    /// The fenced block is not valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// The fenced block decoded to something other than an object.
    #[error("Fenced JSON is not an object")]
    NotAnObject,

    /// A required key is absent.
    #[error("Missing key '{0}'")]
    MissingKey(String),

    /// A key holds a value outside its allowed set.
    #[error("Invalid value for '{key}': {value}")]
    InvalidLabel {
        /// Offending key
        key: String,
        /// Offending value, as JSON text
        value: String,
    },

    /// No `verdict 1` / `rule 1` entry.
    #[error("No rule verdicts found")]
    NoVerdicts,

    /// A per-rule verdict is not a boolean.
    #[error("Verdict '{0}' is not a boolean")]
    NonBooleanVerdict(String),
}

/// Why a single oracle round-trip was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// The oracle produced no text.
    #[error("No response: {0}")]
    NoResponse(#[from] OracleError),

    /// The oracle produced text that breaks the expected format.
    #[error("Malformed response: {0}")]
    Malformed(#[from] ParseError),
}

/// Errors from sentence segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// The oracle produced no text for the named stage.
    #[error("No response while {stage}: {source}")]
    NoResponse {
        /// Segmentation stage
        stage: &'static str,
        /// Underlying oracle error
        source: OracleError,
    },

    /// The response could not be parsed for the named stage.
    #[error("Malformed response while {stage}: {source}")]
    Malformed {
        /// Segmentation stage
        stage: &'static str,
        /// Underlying parse error
        source: ParseError,
    },

    /// The delimited block contained no sentences.
    #[error("No sentences extracted while {0}")]
    Empty(&'static str),
}

/// Errors from the categorization pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategorizeError {
    /// There is nothing to categorize.
    #[error("No solution sentences to categorize")]
    EmptySolution,

    /// Every sample was discarded, so no vote can be taken.
    #[error("No valid categorization samples out of {requested}")]
    NoValidSamples {
        /// Number of samples requested from the oracle
        requested: usize,
    },
}

/// Contract violations on a [`VerificationSession`](crate::session::VerificationSession).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session has no solution sentences yet.
    #[error("Session has not been segmented")]
    NotSegmented,

    /// A solution index beyond the segmented solution.
    #[error("Solution index {index} out of range for {len} sentences")]
    IndexOutOfRange {
        /// Requested 0-based solution index
        index: usize,
        /// Number of solution sentences
        len: usize,
    },

    /// A stored per-sentence array does not line up with the solution.
    #[error("Field '{field}' has {len} entries for {expected} solution sentences")]
    Misaligned {
        /// Offending field
        field: &'static str,
        /// Entries found
        len: usize,
        /// Number of solution sentences
        expected: usize,
    },
}

/// Errors reading sentence dumps and JSON-lines corpora.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorpusError {
    /// A sentence dump record lacks the problem/solution separator.
    #[error("Record {record} has no problem/solution separator")]
    MissingSeparator {
        /// 1-based record number
        record: usize,
    },

    /// A JSON-lines entry failed to decode.
    #[error("Line {line}: {message}")]
    InvalidLine {
        /// 1-based line number
        line: usize,
        /// Decoder message
        message: String,
    },
}

/// A bounded retry loop ran out of attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} gave up after {attempts} attempts")]
pub struct RetryExhausted<E> {
    /// Label of the retried operation
    pub operation: &'static str,
    /// Attempts actually made
    pub attempts: usize,
    /// The last rejected attempt, if any was made.
    pub last: Option<E>,
}

/// Errors from one justification or audit sub-step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The step was requested outside the session's contract.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Every oracle attempt was rejected.
    #[error(transparent)]
    Exhausted(#[from] RetryExhausted<ResponseError>),
}

/// A type alias for Results with [`OxiProofError`].
pub type Result<T> = std::result::Result<T, OxiProofError>;
