//! Machine translation: recognized text (source auto-detected) → target language.
//!
//! * [`GoogleTranslator`] calls the public Google Translate web endpoint
//!   (`client=gtx`). It needs no API key but rejects long inputs, so text is
//!   sent in chunks of at most [`GOOGLE_MAX_CHUNK_CHARS`] characters, split on
//!   line boundaries where possible.
//! * [`LlmTranslator`] asks a chat model through `edgequake-llm`.

use crate::error::BackendError;
use crate::pipeline::postprocess::clean_model_text;
use crate::prompts::{translate_instruction, TRANSLATE_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Translates text into a target language, detecting the source language.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Translate `text` into `target_language` (e.g. `ru`, `en`).
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, BackendError>;
}

// ── Google web endpoint ─────────────────────────────────────────────────────

/// Longest input the web endpoint reliably accepts in one request.
pub const GOOGLE_MAX_CHUNK_CHARS: usize = 4500;

const GOOGLE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Translator backed by the keyless Google Translate web endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BackendError::Unavailable(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: GOOGLE_ENDPOINT.to_string(),
        })
    }

    /// Point the translator at a different endpoint with the same protocol.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn translate_chunk(&self, chunk: &str, target: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target),
                ("dt", "t"),
                ("q", chunk),
            ])
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        parse_google_response(&body)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, BackendError> {
        let chunks = chunk_text(text, GOOGLE_MAX_CHUNK_CHARS);
        debug!("google: translating {} chars in {} chunks", text.len(), chunks.len());

        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            out.push(self.translate_chunk(chunk, target_language).await?);
        }
        Ok(out.join("\n"))
    }
}

/// Concatenate the translated segments of a `translate_a/single` response.
///
/// The body is a nested JSON array whose first element lists
/// `[translated, original, ...]` segments.
pub fn parse_google_response(body: &str) -> Result<String, BackendError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| BackendError::InvalidResponse(format!("not JSON: {e}")))?;

    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::InvalidResponse("missing translation segments".into()))?;

    Ok(segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect())
}

/// Split `text` into chunks of at most `max_chars` characters, breaking
/// after a newline where possible. A single line longer than `max_chars` is
/// split at the last whitespace that fits, or hard-split if it has none.
/// Chunks joined with `"\n"` reproduce the input when every break fell on a
/// newline.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        // Byte offsets just past the `max_chars`-th character, and one further
        // so a separator sitting right after a full chunk can still be used.
        let byte_at = |n: usize| {
            rest.char_indices()
                .nth(n)
                .map(|(i, _)| i)
                .unwrap_or(rest.len())
        };
        let limit = byte_at(max_chars);
        let window = &rest[..byte_at(max_chars + 1)];

        let (head, tail) = if let Some(nl) = window.rfind('\n') {
            (&rest[..nl], &rest[nl + 1..])
        } else if let Some(ws) = window.rfind(char::is_whitespace).filter(|&i| i > 0) {
            let ws_len = window[ws..].chars().next().map(char::len_utf8).unwrap_or(1);
            (&rest[..ws], &rest[ws + ws_len..])
        } else {
            (&rest[..limit], &rest[limit..])
        };

        if !head.is_empty() {
            chunks.push(head);
        }
        rest = tail;
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

// ── LLM ─────────────────────────────────────────────────────────────────────

/// Translator backed by a chat model.
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, BackendError> {
        let messages = vec![
            ChatMessage::system(TRANSLATE_SYSTEM_PROMPT),
            ChatMessage::user(translate_instruction(target_language, text)),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let translated = clean_model_text(&response.content);
        if translated.is_empty() {
            return Err(BackendError::InvalidResponse("model returned no text".into()));
        }
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segmented_response() {
        let body = r#"[[["Привет, ","Hello, ",null,null,10],["мир","world",null,null,10]],null,"en"]"#;
        assert_eq!(parse_google_response(body).unwrap(), "Привет, мир");
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_google_response("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[test]
    fn rejects_unexpected_shape() {
        assert!(parse_google_response(r#"{"error": 1}"#).is_err());
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_text("a\nb", 10), vec!["a\nb"]);
        assert!(chunk_text("", 10).is_empty());
    }

    #[test]
    fn chunks_break_on_newlines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = chunk_text(text, 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn long_line_breaks_on_whitespace() {
        let chunks = chunk_text("один два три", 8);
        assert_eq!(chunks, vec!["один два", "три"]);
    }

    #[test]
    fn unbroken_run_is_hard_split() {
        let text = "x".repeat(25);
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn every_chunk_respects_limit() {
        let paragraph = "слово ".repeat(2000);
        let text = format!("{paragraph}\n{paragraph}");
        for chunk in chunk_text(&text, GOOGLE_MAX_CHUNK_CHARS) {
            assert!(chunk.chars().count() <= GOOGLE_MAX_CHUNK_CHARS);
        }
    }
}
