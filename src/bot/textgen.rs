//! Text-generation client backing `/ask` and `/translate`.
//!
//! One request per call, no retries. Gemini is used when its key is set,
//! otherwise OpenRouter; without either key every call fails.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TextGenProvider;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENROUTER_DEFAULT_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ASK_PROMPT: &str = "You are a friendly assistant in a Telegram chat. \
Answer the following question concisely, in plain text, in at most a few short paragraphs.\n\nQuestion: ";

pub fn ask_prompt(question: &str) -> String {
    format!("{ASK_PROMPT}{question}")
}

pub fn translate_prompt(text: &str, language: &str) -> String {
    format!(
        "Translate the following text into {language}. \
Reply with the translation only, without quotes or explanations.\n\nText: {text}"
    )
}

#[derive(Debug)]
pub enum Error {
    NotConfigured,
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotConfigured => write!(f, "no text-generation API key configured"),
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

// ==================== GEMINI WIRE TYPES ====================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

// ==================== OPENROUTER WIRE TYPES ====================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct TextGenerator {
    provider: TextGenProvider,
    model: String,
    http: reqwest::Client,
}

impl TextGenerator {
    pub fn new(provider: TextGenProvider, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| match provider {
            TextGenProvider::OpenRouter { .. } => OPENROUTER_DEFAULT_MODEL.to_string(),
            _ => GEMINI_DEFAULT_MODEL.to_string(),
        });
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { provider, model, http }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(TextGenProvider::Disabled, None)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt and return the trimmed, non-empty output text.
    pub async fn generate(&self, prompt: &str) -> Result<String, Error> {
        let text = match &self.provider {
            TextGenProvider::Gemini { api_key } => self.gemini(api_key, prompt).await?,
            TextGenProvider::OpenRouter { api_key } => self.openrouter(api_key, prompt).await?,
            TextGenProvider::Disabled => return Err(Error::NotConfigured),
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Empty);
        }
        Ok(text.to_string())
    }

    async fn gemini(&self, api_key: &str, prompt: &str) -> Result<String, Error> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: Some(prompt.to_string()) }],
            }],
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        debug!("Gemini response status: {status}");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(extract_gemini_text(parsed))
    }

    async fn openrouter(&self, api_key: &str, prompt: &str) -> Result<String, Error> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };

        let response = self
            .http
            .post(OPENROUTER_API_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        debug!("OpenRouter response status: {status}");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_gemini_text(response: GeminiResponse) -> String {
    response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_gemini_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there"}],"role":"model"}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_gemini_text(parsed), "Hello there");
    }

    #[test]
    fn test_extract_gemini_text_without_candidates() {
        let parsed: GeminiResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(extract_gemini_text(parsed), "");
    }

    #[test]
    fn test_openrouter_response_shape() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Bonjour"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Bonjour"));
    }

    #[test]
    fn test_default_models() {
        let g = TextGenerator::new(TextGenProvider::Gemini { api_key: "k".into() }, None);
        assert_eq!(g.model(), GEMINI_DEFAULT_MODEL);
        let o = TextGenerator::new(TextGenProvider::OpenRouter { api_key: "k".into() }, None);
        assert_eq!(o.model(), OPENROUTER_DEFAULT_MODEL);
        let custom = TextGenerator::new(TextGenProvider::Disabled, Some("m".into()));
        assert_eq!(custom.model(), "m");
    }

    #[tokio::test]
    async fn test_disabled_generator_fails() {
        let err = TextGenerator::disabled().generate("hi").await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }

    #[test]
    fn test_prompts_embed_input() {
        assert!(ask_prompt("why is the sky blue?").ends_with("Question: why is the sky blue?"));
        let p = translate_prompt("hola", "English");
        assert!(p.contains("into English"));
        assert!(p.ends_with("Text: hola"));
    }
}
