//! Sentence segmentation through the oracle.
//!
//! Each stage is a single oracle call with no retry. A stage fails when the
//! oracle gives no text, when the reply lacks an opening and closing fence,
//! or when the fenced block holds no sentences.

use crate::error::{OracleError, ParseError, SegmentError};
use crate::oracle::{Oracle, ask};
use crate::parser::{extract_delimited, split_lines};

/// Stage label for problem statement splitting.
pub const STAGE_PROBLEM: &str = "segmenting the problem";
/// Stage label for solution splitting.
pub const STAGE_SOLUTION: &str = "segmenting the solution";
/// Stage label for the rewrite pass.
pub const STAGE_REWRITE: &str = "rewriting the solution";
/// Stage label for standalone segmentation of arbitrary text.
pub const STAGE_TEXT: &str = "segmenting text";

/// Prompt asking for one sentence per line.
#[must_use]
pub fn segment_prompt(text: &str) -> String {
    format!(
        "Place each sentence in the following text on its own line: \"{text}\". \
         Wrap your response with ```. "
    )
}

/// Prompt asking to embed every equation in a full sentence.
#[must_use]
pub fn rewrite_prompt(solution: &str) -> String {
    format!(
        "Rewrite the solution by embedding each equation in a complete sentence: \"{solution}\". \
         Do not correct the solution, omit parts of the solution, or add to the solution. \
         Wrap your response with ```. "
    )
}

async fn fenced_reply<O: Oracle + ?Sized>(
    oracle: &O,
    prompt: &str,
    stage: &'static str,
) -> Result<String, SegmentError> {
    let text = ask(oracle, prompt).await.map_err(|source: OracleError| {
        tracing::info!(stage, "No response from oracle: {}", source);
        SegmentError::NoResponse { stage, source }
    })?;

    extract_delimited(&text)
        .map(str::to_string)
        .map_err(|source: ParseError| {
            tracing::warn!(stage, "Rejected oracle reply: {}", source);
            SegmentError::Malformed { stage, source }
        })
}

async fn segment_stage<O: Oracle + ?Sized>(
    oracle: &O,
    text: &str,
    stage: &'static str,
) -> Result<Vec<String>, SegmentError> {
    let block = fenced_reply(oracle, &segment_prompt(text), stage).await?;
    let sentences = split_lines(&block);
    if sentences.is_empty() {
        tracing::warn!(stage, "Fenced block holds no sentences");
        return Err(SegmentError::Empty(stage));
    }
    Ok(sentences)
}

/// Split `text` into sentences with one oracle call.
///
/// # Errors
///
/// Returns [`SegmentError`] on no response, a missing fence pair, or an
/// empty block.
pub async fn segment<O: Oracle + ?Sized>(oracle: &O, text: &str) -> Result<Vec<String>, SegmentError> {
    segment_stage(oracle, text, STAGE_TEXT).await
}

/// Rewrite the solution so equations sit in complete sentences, then
/// segment the rewritten solution and the raw problem statement.
///
/// Returns `(problem_sentences, solution_sentences)`.
///
/// # Errors
///
/// Fails as soon as any of the three stages fails.
pub async fn cleanup_and_segment<O: Oracle + ?Sized>(
    oracle: &O,
    problem: &str,
    solution: &str,
) -> Result<(Vec<String>, Vec<String>), SegmentError> {
    let rewritten = fenced_reply(oracle, &rewrite_prompt(solution), STAGE_REWRITE).await?;
    tracing::info!("Segmenting problem statement");
    let problem_sentences = segment_stage(oracle, problem, STAGE_PROBLEM).await?;
    tracing::info!("Segmenting rewritten solution");
    let solution_sentences = segment_stage(oracle, &rewritten, STAGE_SOLUTION).await?;
    Ok((problem_sentences, solution_sentences))
}
