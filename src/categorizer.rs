//! Sentence categorization by repeated sampling and majority vote.

use crate::error::{CategorizeError, ParseError, ResponseError};
use crate::oracle::{Oracle, ask};
use crate::parser::{JsonObject, last_json_object};
use crate::session::numbered_text;
use crate::types::Category;

/// Prompt asking the oracle to label every solution sentence.
#[must_use]
pub fn categorize_prompt(solution_sentences: &[String]) -> String {
    let n = solution_sentences.len();
    let solution = numbered_text(solution_sentences);
    format!(
        "For all {n} sentences: Analyze and decide whether it derives any new result or not \
         (repeats existing results, cites a theorem, introduces a plan, introduces a definition, \
         or introduces a hypothesis) in \"{solution}\". \
         After analyzing, write your decisions in one JSON object in this format: \
         ```json{{\"sentence 1\": <value>, ...}}```, \
         where <value> should be only \"derivation\" or \"others\" \
         and '...' stands for the categorization of the remaining sentences."
    )
}

/// Decode one sample. Every `sentence 1..=n` must be present with a valid
/// label; extra keys are ignored.
///
/// # Errors
///
/// Any [`ParseError`] makes the whole sample invalid.
pub fn parse_sample(text: &str, n: usize) -> Result<Vec<Category>, ParseError> {
    let (_, object) = last_json_object(text)?;
    labels(&object, n)
}

fn labels(object: &JsonObject, n: usize) -> Result<Vec<Category>, ParseError> {
    (1..=n)
        .map(|i| {
            let key = format!("sentence {i}");
            let value = object
                .get(&key)
                .ok_or_else(|| ParseError::MissingKey(key.clone()))?;
            value
                .as_str()
                .and_then(Category::from_label)
                .ok_or_else(|| ParseError::InvalidLabel {
                    key,
                    value: value.to_string(),
                })
        })
        .collect()
}

/// Combine valid samples: sentence `i` is a derivation iff `c >= m / 2`
/// with integer division, where `m` is the sample count and `c` the number
/// of derivation votes.
///
/// # Errors
///
/// [`CategorizeError::NoValidSamples`] when `samples` is empty.
pub fn majority_vote(samples: &[Vec<Category>]) -> Result<Vec<Category>, CategorizeError> {
    let Some(first) = samples.first() else {
        return Err(CategorizeError::NoValidSamples { requested: 0 });
    };
    let m = samples.len();

    Ok((0..first.len())
        .map(|i| {
            let c = samples
                .iter()
                .filter(|sample| sample.get(i) == Some(&Category::Derivation))
                .count();
            if c >= m / 2 {
                Category::Derivation
            } else {
                Category::Other
            }
        })
        .collect())
}

/// Draw up to `samples` independent labelings and vote.
///
/// Invalid samples are discarded, never retried in place.
///
/// # Errors
///
/// [`CategorizeError::EmptySolution`] for an empty solution and
/// [`CategorizeError::NoValidSamples`] when every sample was discarded.
pub async fn categorize<O: Oracle + ?Sized>(
    oracle: &O,
    solution_sentences: &[String],
    samples: usize,
) -> Result<Vec<Category>, CategorizeError> {
    let n = solution_sentences.len();
    if n == 0 {
        return Err(CategorizeError::EmptySolution);
    }

    let prompt = categorize_prompt(solution_sentences);
    let mut valid = Vec::with_capacity(samples);

    for sample in 1..=samples {
        let outcome: Result<Vec<Category>, ResponseError> = match ask(oracle, &prompt).await {
            Ok(text) => parse_sample(&text, n).map_err(Into::into),
            Err(e) => Err(e.into()),
        };
        match outcome {
            Ok(labels) => valid.push(labels),
            Err(e) => tracing::warn!(sample, samples, "Discarding categorization sample: {}", e),
        }
    }

    tracing::info!(valid = valid.len(), requested = samples, "Categorization sampling finished");

    majority_vote(&valid).map_err(|_| CategorizeError::NoValidSamples { requested: samples })
}
