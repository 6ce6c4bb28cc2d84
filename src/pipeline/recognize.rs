//! Text recognition: page raster + language hints → raw text.
//!
//! Two backends ship with the crate:
//!
//! * [`TesseractRecognizer`] runs the `tesseract` CLI, feeding the page as a
//!   PNG on stdin and reading plain text from stdout. Hints are joined into
//!   tesseract's `-l eng+ukr+rus` syntax.
//! * [`VisionRecognizer`] asks a vision-capable LLM to transcribe the page.
//!
//! Neither retries. The pipeline owns timeouts and the fallback policy.

use crate::error::BackendError;
use crate::pipeline::encode::{encode_image_data, encode_png};
use crate::pipeline::postprocess::clean_model_text;
use crate::prompts::{recognize_instruction, RECOGNIZE_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use image::DynamicImage;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Extracts raw text from a page image.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Recognize the text on `image`. May return an empty string.
    async fn recognize(
        &self,
        image: &DynamicImage,
        language_hints: &[String],
    ) -> Result<String, BackendError>;
}

// ── tesseract ───────────────────────────────────────────────────────────────

/// OCR through a local `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: PathBuf,
}

impl TesseractRecognizer {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

/// `["eng", "ukr"]` → `"eng+ukr"`.
pub fn tesseract_languages(language_hints: &[String]) -> String {
    language_hints.join("+")
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        language_hints: &[String],
    ) -> Result<String, BackendError> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.command)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(tesseract_languages(language_hints))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BackendError::Unavailable(format!("{}: {e}", self.command.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .await
                .map_err(|e| BackendError::Request(format!("writing page to tesseract: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        if !output.status.success() {
            return Err(BackendError::Process {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract returned {} chars", text.len());
        Ok(text)
    }
}

// ── vision LLM ──────────────────────────────────────────────────────────────

/// Transcription by a vision-capable LLM.
pub struct VisionRecognizer {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl VisionRecognizer {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// System prompt, then the page image with the language hints as user text.
fn vision_messages(
    image: &DynamicImage,
    language_hints: &[String],
) -> Result<Vec<ChatMessage>, BackendError> {
    let image_data = encode_image_data(image)?;
    Ok(vec![
        ChatMessage::system(RECOGNIZE_SYSTEM_PROMPT),
        ChatMessage::user_with_images(recognize_instruction(language_hints), vec![image_data]),
    ])
}

#[async_trait]
impl Recognizer for VisionRecognizer {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        language_hints: &[String],
    ) -> Result<String, BackendError> {
        let messages = vision_messages(image, language_hints)?;
        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        debug!(
            "vision recognizer: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(clean_model_text(&response.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255])))
    }

    fn hints() -> Vec<String> {
        vec!["eng".into(), "ukr".into(), "rus".into()]
    }

    #[test]
    fn languages_joined_with_plus() {
        assert_eq!(tesseract_languages(&hints()), "eng+ukr+rus");
    }

    #[test]
    fn vision_request_has_system_and_image() {
        let messages = vision_messages(&page(), &hints()).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let r = TesseractRecognizer::new("/nonexistent/tesseract-binary");
        let err = r.recognize(&page(), &hints()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)), "got {err}");
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-tesseract");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passes_languages_and_reads_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(dir.path(), "cat > /dev/null\necho \"$@\"");
        let text = TesseractRecognizer::new(cmd)
            .recognize(&page(), &hints())
            .await
            .unwrap();
        assert_eq!(text.trim(), "stdin stdout -l eng+ukr+rus");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(dir.path(), "cat > /dev/null\necho 'Failed loading language' >&2\nexit 1");
        let err = TesseractRecognizer::new(cmd)
            .recognize(&page(), &hints())
            .await
            .unwrap_err();
        match err {
            BackendError::Process { stderr, .. } => assert!(stderr.contains("Failed loading")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
