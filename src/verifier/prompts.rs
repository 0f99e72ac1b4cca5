//! Prompt templates for the step verifier.
//!
//! Every template takes the context slice `1..=n`, so a prompt for global
//! sentence `n` can never mention a later sentence.

use crate::session::numbered_text;

/// Ask the oracle to derive or refute sentence `n = context.len()` one rule
/// application at a time and to copy the chain into one JSON object.
#[must_use]
pub fn justification_prompt(context: &[String]) -> String {
    let n = context.len();
    let prev = n.saturating_sub(1);
    let progress = numbered_text(context);
    format!(
        "Sentences 1 to {prev} are correct but sentence {n} might be incorrect; \
         apply rules (general theorems/logical principles that have premises and a conclusion) one at a time \
         to refute or derive sentence {n} in \"{progress}\" (do not rederive sentences 1 to {prev}; \
         do not stop until you refuted or derived exactly sentence {n} by applying one rule at a time; \
         if you find that sentence {n} is 'not necessarily true/false', keep going until you know whether it is true or false). \
         After applying rules to refute or derive sentence {n}, copy ALL applications of rules \
         logically necessary to refute or derive sentence {n} \
         (rule used, indices of sentences used as premises to apply this rule, \
         indices of previously copied conclusions used as premises to apply this rule, and the obtained conclusion) \
         to only ONE JSON object with this format: \
         \"```json{{\"rule 1\": ALL premises and conclusion of the rule written in complete sentences, \
         \"sentence numbers 1\": list of integers, \"conclusion numbers 1\": list of integers, \
         \"conclusion 1\": result of application of the rule written as a complete sentence, ... }}```\" \
         with '...' being potentially other quadruplets of rule, sentence numbers, conclusion numbers, and conclusion. \
         Don't copy sentences 1 to {prev} as rules or conclusions; list their sentence numbers instead. \
         Don't copy sentences or previously copied conclusions to the \"rule i\" field. \
         Don't copy sentence {n} as a rule and then say sentence {n} is true by that rule. \
         Don't use JSON keys other than \"rule i\", \"sentence numbers i\", \"conclusion numbers i\", and \"conclusion i\". \
         Copy only a successful attempt, never incorrect applications. \
         Apply the rules in natural language and refute or derive sentence {n} before COPYING your results to JSON. "
    )
}

/// Ask the oracle to audit every rule application in `justification_body`
/// and relate the last conclusion to the literal target sentence.
#[must_use]
pub fn audit_prompt(context: &[String], justification_body: &str) -> String {
    let n = context.len();
    let prev = n.saturating_sub(1);
    let progress = numbered_text(context);
    let target = context.last().map_or("", String::as_str);
    format!(
        "Sentences 1 to {prev} are correct, sentence {n} might be incorrect. \
         Check applications of each rule in ```{justification_body}``` \
         that proves sentence {n} based on sentences 1 to {prev} \"{progress}\". \
         For every rule k, check that each of its premises is fulfilled and that it implies conclusion k \
         (think before you give a verdict; you don't have to use every listed sentence or conclusion; \
         go over the sentences listed in \"sentence numbers k\" and \"conclusion numbers k\"). \
         Then decide if the last conclusion restates or contradicts (or neither restates nor contradicts) sentence {n}: \
         \"{target}\" (the last conclusion doesn't have to answer the question in the context; \
         compare the last conclusion with the sentence quoted here; \
         conclude 'restate' if the last conclusion says sentence {n} is correct or true). \
         After checking, copy your correctness verdicts for all applications \
         and your relation verdict for the last conclusion to one JSON object in this format: \
         \"```json{{\"verdict 1\": application 1's correctness (true or false), ... \"relation\": <value>}}```\" \
         with '...' being potentially other verdicts and <value> being 'restate', 'contradict', or 'neither'. \
         Number the verdict keys from 1 and don't skip any application. "
    )
}

/// Single-shot baseline: ask for the first mistaken sentence directly.
#[must_use]
pub fn baseline_prompt(all_sentences: &[String], official_answer: Option<&str>) -> String {
    let progress = numbered_text(all_sentences);
    let reference = official_answer
        .map(|answer| format!("For your reference, the correct answer is {answer}. "))
        .unwrap_or_default();
    format!(
        "Find the sentence number of the first sentence in the solution that makes a mistake in \"{progress}\". \
         {reference}Think before you answer. If the solution is correct, say -1."
    )
}
