use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::Config;

pub const ANALYSIS_ERROR_MESSAGE: &str =
    "Sorry, there was an error analyzing your chess game. Please try again later.";

pub const NO_GAME_MESSAGE: &str =
    "No game to analyze. Please make some moves or load a game first.";

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .user_agent("ChessReview/1.0")
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Review a game. Never fails: any error becomes [`ANALYSIS_ERROR_MESSAGE`].
    pub async fn analyze(&self, pgn: &str) -> String {
        if pgn.trim().is_empty() {
            return NO_GAME_MESSAGE.to_string();
        }
        match self.generate(&build_prompt(pgn)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Gemini analysis failed: {e:#}");
                ANALYSIS_ERROR_MESSAGE.to_string()
            }
        }
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .context("Request error")?;

        if !resp.status().is_success() {
            bail!("HTTP {}", resp.status());
        }

        let data: Value = resp.json().await.context("Body parse error")?;
        extract_text(&data).ok_or_else(|| anyhow!("Response has no candidate text"))
    }
}

fn build_prompt(pgn: &str) -> String {
    format!(
        "Analyze this chess game in PGN format:\n\n\
         {pgn}\n\n\
         Please provide:\n\
         1. An overview of the game\n\
         2. Key turning points\n\
         3. Notable tactics or strategies\n\
         4. Suggestions for improvement\n\
         5. Overall evaluation\n\n\
         Format your analysis in a clear, concise way that would be helpful \
         for a chess player looking to improve."
    )
}

/// Concatenated text parts of the first candidate.
fn extract_text(data: &Value) -> Option<String> {
    let parts = data
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_pgn_and_sections() {
        let prompt = build_prompt("1. e4 e5 *");
        assert!(prompt.contains("1. e4 e5 *"));
        assert!(prompt.contains("1. An overview of the game"));
        assert!(prompt.contains("5. Overall evaluation"));
    }

    #[test]
    fn test_extract_text() {
        let data = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Good " }, { "text": "game." }] }
            }]
        });
        assert_eq!(extract_text(&data).as_deref(), Some("Good game."));
        assert_eq!(extract_text(&json!({ "candidates": [] })), None);
        assert_eq!(extract_text(&json!({ "error": "quota" })), None);
    }

    #[tokio::test]
    async fn test_missing_key_gives_fallback() {
        let client = GeminiClient::new(&Config::default());
        assert_eq!(client.analyze("1. e4 *").await, ANALYSIS_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_empty_pgn_gives_no_game_message() {
        let client = GeminiClient::new(&Config::default());
        assert_eq!(client.analyze("  ").await, NO_GAME_MESSAGE);
    }
}
