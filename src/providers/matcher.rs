//! Header matching backed by a completion provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::traits::{CompletionProvider, HeaderMatcher};
use crate::types::CompletionOptions;
use crate::{FinmemoError, Result};

const MATCH_TEMPLATE: &str = r#"<SYS>
You are a financial expert. Given a header and a list of headers, answer with the header from the list that most closely resembles the given header.
<OUTPUT_FORMAT>
Respond with a JSON object of the form {"key": "<header from the list>"}. If nothing in the list is a reasonable match, respond with {"key": null}.
</OUTPUT_FORMAT>
</SYS>
List of headers: {{list_of_headers}}
User: {{input_str}}
You:"#;

/// [`HeaderMatcher`] that asks an LLM to pick the closest statement label.
///
/// Answers naming something outside the candidate list are treated as "no
/// match" rather than trusted.
pub struct LlmHeaderMatcher {
    completion: Arc<dyn CompletionProvider>,
    options: CompletionOptions,
}

impl LlmHeaderMatcher {
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            completion,
            options: CompletionOptions::default()
                .max_tokens(100)
                .temperature(0.0)
                .top_p(1.0)
                .json_output(true),
        }
    }
}

#[derive(Deserialize)]
struct MatchOutput {
    key: Option<String>,
}

/// Render the matching prompt for `query` against `candidates`.
pub fn render_match_prompt(query: &str, candidates: &[String]) -> Result<String> {
    let list = serde_json::to_string(candidates)?;
    Ok(MATCH_TEMPLATE
        .replace("{{list_of_headers}}", &list)
        .replace("{{input_str}}", query))
}

#[async_trait]
impl HeaderMatcher for LlmHeaderMatcher {
    fn name(&self) -> &str {
        self.completion.name()
    }

    async fn match_header(&self, query: &str, candidates: &[String]) -> Result<Option<String>> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let prompt = render_match_prompt(query, candidates)?;
        let completion = self.completion.complete(&prompt, &self.options).await?;

        let output: MatchOutput = serde_json::from_str(completion.content.trim()).map_err(|e| {
            FinmemoError::Provider(format!("header matcher returned malformed JSON: {e}"))
        })?;

        let matched = output
            .key
            .and_then(|key| candidates.iter().find(|c| **c == key).cloned());
        debug!(query, matched = ?matched, "header match");
        Ok(matched)
    }
}
