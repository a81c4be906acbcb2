//! Request bodies accepted by the HTTP surface

use serde::{Deserialize, Serialize};

use super::CompletionOptions;

/// `POST /getData` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    pub header: String,
    pub year: String,
    #[serde(rename = "sheetName")]
    pub sheet_name: String,
    pub ticker: String,
    #[serde(default)]
    pub force_reload: bool,
}

/// `POST /chat` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_max_tokens() -> u32 {
    CompletionOptions::default().max_tokens
}

fn default_temperature() -> f32 {
    CompletionOptions::default().temperature
}

fn default_top_p() -> f32 {
    CompletionOptions::default().top_p
}

impl ChatRequest {
    pub fn options(&self) -> CompletionOptions {
        CompletionOptions::default()
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .top_p(self.top_p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_request_uses_camel_case_sheet_name() {
        let req: DataRequest = serde_json::from_str(
            r#"{"header":"Total Revenue","year":"2023","sheetName":"income_statement","ticker":"AAPL"}"#,
        )
        .unwrap();
        assert_eq!(req.sheet_name, "income_statement");
        assert!(!req.force_reload);
    }

    #[test]
    fn chat_request_defaults() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"query":"hi","prompt":"be brief"}"#).unwrap();
        assert_eq!(req.max_tokens, 50);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!((req.top_p - 0.95).abs() < f32::EPSILON);
        assert_eq!(req.options().max_tokens, 50);
    }
}
