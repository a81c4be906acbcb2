//! Chat pipeline.
//!
//! Chat answers are sampled with non-zero temperature, so they are not
//! memoized: identical queries are expected to get fresh answers.

use std::sync::Arc;

use tracing::info;

use crate::providers::CompletionProvider;
use crate::types::{ChatRequest, Completion};
use crate::{FinmemoError, Result};

const CHAT_TEMPLATE: &str = r#"<SYS>
You are a helpful assistant. Given the user query, help the user get what they asked for and respond with nothing else.
</SYS>
User Prompt: {{prompt}}
User: {{input_str}}
You:"#;

/// Render the chat prompt for a system `prompt` and user `query`.
pub fn render_chat_prompt(prompt: &str, query: &str) -> String {
    CHAT_TEMPLATE
        .replace("{{prompt}}", prompt)
        .replace("{{input_str}}", query)
}

/// Free-text chat over a completion provider.
#[derive(Clone)]
pub struct ChatService {
    completion: Arc<dyn CompletionProvider>,
}

impl ChatService {
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }

    /// Entry point for `POST /chat`.
    pub async fn get_chat_response(&self, request: &ChatRequest) -> Result<Completion> {
        validate(request)?;
        info!(
            provider = self.completion.name(),
            query = %request.query,
            prompt = %request.prompt,
            "chat request"
        );
        let prompt = render_chat_prompt(&request.prompt, &request.query);
        self.completion.complete(&prompt, &request.options()).await
    }
}

fn validate(request: &ChatRequest) -> Result<()> {
    if request.query.trim().is_empty() {
        return Err(FinmemoError::InvalidInput("query must not be empty".into()));
    }
    if request.max_tokens == 0 {
        return Err(FinmemoError::InvalidInput("max_tokens must be positive".into()));
    }
    if !(0.0..=2.0).contains(&request.temperature) {
        return Err(FinmemoError::InvalidInput(
            "temperature must be within [0, 2]".into(),
        ));
    }
    if !(request.top_p > 0.0 && request.top_p <= 1.0) {
        return Err(FinmemoError::InvalidInput("top_p must be within (0, 1]".into()));
    }
    Ok(())
}
