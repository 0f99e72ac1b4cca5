//! Deterministic oracles for tests and benchmarks.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::Oracle;
use crate::error::OracleError;

type Reply = Result<String, OracleError>;

/// An oracle that plays back a queue of replies.
///
/// Once the queue is drained the fallback reply is returned forever. Without
/// a fallback the oracle reports [`OracleError::Unavailable`]. Every prompt
/// is recorded so tests can inspect what the engine sent.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    /// Create an oracle with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply.
    #[must_use]
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then(Ok(text.into()))
    }

    /// Queue a failure.
    #[must_use]
    pub fn then_error(self, error: OracleError) -> Self {
        self.then(Err(error))
    }

    /// Queue an arbitrary reply.
    #[must_use]
    pub fn then(self, reply: Reply) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(reply);
        }
        self
    }

    /// Reply with `text` once the queue is drained.
    #[must_use]
    pub fn repeating(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(Ok(text.into()));
        self
    }

    /// Fail with `error` once the queue is drained.
    #[must_use]
    pub fn failing_with(mut self, error: OracleError) -> Self {
        self.fallback = Some(Err(error));
        self
    }

    /// Prompts received so far, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    /// Replies still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .unwrap_or_else(|| Err(OracleError::Unavailable("script exhausted".to_string()))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// An oracle backed by a closure, for replies that depend on the prompt.
pub struct FnOracle<F> {
    reply: F,
    calls: AtomicUsize,
}

impl<F> FnOracle<F>
where
    F: Fn(&str) -> Result<String, OracleError> + Send + Sync,
{
    /// Wrap a reply function.
    pub const fn new(reply: F) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<F> Oracle for FnOracle<F>
where
    F: Fn(&str) -> Result<String, OracleError> + Send + Sync,
{
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        (self.reply)(prompt)
    }

    fn name(&self) -> &str {
        "fn"
    }
}
