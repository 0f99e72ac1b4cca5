//! `OxiProof` - Stepwise verification of natural-language math proofs.
//!
//! `OxiProof` checks a step-by-step solution one sentence at a time against a
//! language-model oracle:
//!
//! - **Segmenter**: rewrites the solution and splits problem and solution into sentences
//! - **Categorizer**: labels sentences as derivations or not by majority vote
//! - **Step Verifier**: asks the oracle to justify each sentence, then to audit the justification
//! - **Mistake Locator**: applies the acceptance policy and reports flagged sentences
//!
//! The oracle is never trusted to certify anything. A sentence passes only
//! when the oracle produces a well-formed justification and then confirms
//! every rule application in it. Whatever stays inconclusive is flagged.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oxiproof::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), OxiProofError> {
//!     // Any backend implementing `Oracle`, wrapped with transport retries
//!     let oracle = RetryingOracle::new(MyModelClient::new());
//!
//!     let verifier = ProofVerifierBuilder::new()
//!         .with_oracle(oracle)
//!         .with_config(VerifierConfig::default())
//!         .build()?;
//!
//!     let verification = verifier
//!         .verify_solution("What is 1 + 1?", "We have 1 + 1 = 3, so the answer is 3.")
//!         .await?;
//!
//!     println!("Flagged sentences: {:?}", verification.mistakes());
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `native` (default): Tokio timers for transport backoff and file IO for
//!   configuration and corpora
//!
//! # Architecture
//!
//! ```text
//! problem + solution
//!   │
//!   ▼
//! ┌──────────────────┐
//! │    Segmenter     │  ← rewrite, then one sentence per line
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Categorizer    │  ← optional, 7 samples + majority vote
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Step Verifier   │  ← justification, then audit, per sentence
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Mistake Locator  │  ← acceptance policy, fail-closed
//! └────────┬─────────┘
//!          │
//!          ▼
//!   flagged sentence indices
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod categorizer;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod oracle;
pub mod parser;
pub mod retry;
pub mod segmenter;
pub mod session;
pub mod types;
pub mod verifier;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::categorizer::{categorize, majority_vote};
    pub use crate::config::{LocatorPolicy, OxiProofConfig, RetryConfig, VerifierConfig};
    pub use crate::corpus::{
        IncorrectSolution, MistakeRecord, boxed_answer, format_sentence_dump, from_jsonl,
        parse_sentence_dump, to_jsonl,
    };
    #[cfg(feature = "native")]
    pub use crate::corpus::{load_jsonl, save_jsonl};
    pub use crate::engine::{ProofVerifier, ProofVerifierBuilder, Verification};
    pub use crate::error::{
        CategorizeError, CorpusError, OracleError, OxiProofError, ParseError, ResponseError,
        RetryExhausted, SegmentError, SessionError, StepError,
    };
    pub use crate::metrics::{MetricsCollector, Phase, PhaseTiming, VerificationMetrics};
    pub use crate::oracle::{FnOracle, MeteredOracle, Oracle, RetryingOracle, ScriptedOracle};
    pub use crate::retry::{BoundedRetry, RetryPolicy, Retryable};
    pub use crate::segmenter::{cleanup_and_segment, segment};
    pub use crate::session::VerificationSession;
    pub use crate::types::{
        AuditVerdict, Category, Justification, MistakeReport, Relation, RuleApplication,
        StepOutcome, StepRecord,
    };
    pub use crate::verifier::prompts::baseline_prompt;
    pub use crate::verifier::{MistakeLocator, StepVerifier, parse_audit, parse_justification};
}

pub use error::{OxiProofError, Result};
