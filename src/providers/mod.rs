//! External collaborators: statement sources, header matching, completions.
//!
//! The pipelines only see the traits in [`traits`]; the concrete HTTP
//! clients here are what the daemon wires in.

pub mod groq;
pub mod matcher;
pub mod statements;
pub mod traits;

pub use groq::GroqClient;
pub use matcher::LlmHeaderMatcher;
pub use statements::HttpStatementProvider;
pub use traits::{CompletionProvider, HeaderMatcher, StatementProvider};
