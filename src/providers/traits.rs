//! Traits for the external collaborators the pipelines depend on.
//!
//! Each capability gets its own small trait so implementations can be
//! swapped independently (HTTP clients in production, scripted doubles in
//! tests).
//!
//! # Error conventions
//!
//! - `ProviderNotFound` - the requested thing does not exist (unknown
//!   ticker, no statement for the period). Surfaces as a client error.
//! - `Provider` / `Api` / `Http` - the collaborator failed. Surfaces as a
//!   server error.

use async_trait::async_trait;

use crate::Result;
use crate::types::{Completion, CompletionOptions, StatementKind, StatementTable};

// ============================================================================
// Statement Provider
// ============================================================================

/// Source of financial statements from regulatory filings.
#[async_trait]
pub trait StatementProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch one statement of `ticker`'s filing for `period`.
    async fn fetch_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
        period: &str,
    ) -> Result<StatementTable>;
}

// ============================================================================
// Header Matcher
// ============================================================================

/// Picks the candidate label closest to a free-text header.
#[async_trait]
pub trait HeaderMatcher: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Returns `Ok(None)` when no candidate is a confident match.
    async fn match_header(&self, query: &str, candidates: &[String]) -> Result<Option<String>>;
}

// ============================================================================
// Completion Provider
// ============================================================================

/// Large-language-model text completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<Completion>;
}
