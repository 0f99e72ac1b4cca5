//! The oracle seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OracleError;

/// A text-generation backend queried by every engine component.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] when no text could be produced.
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "oracle"
    }
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for Arc<O> {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for &O {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Query `oracle`, treating blank text as [`OracleError::EmptyResponse`].
///
/// # Errors
///
/// Any oracle error, or `EmptyResponse` for whitespace-only text.
pub async fn ask<O: Oracle + ?Sized>(oracle: &O, prompt: &str) -> Result<String, OracleError> {
    tracing::debug!(oracle = oracle.name(), prompt, "Querying oracle");
    let text = oracle.generate(prompt).await?;
    if text.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    tracing::debug!(oracle = oracle.name(), response = %text, "Oracle responded");
    Ok(text)
}
