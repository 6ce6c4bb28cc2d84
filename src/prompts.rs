//! Prompts for the LLM-backed recognizer and translator.
//!
//! Every prompt lives here so the behaviour of the model backends can be
//! changed in one place, and so unit tests can inspect the prompts without
//! calling a model.

/// System prompt for transcribing a scanned page with a vision model.
///
/// The page image carries all content; the model must return plain text
/// only, with no markup, because the text goes on to a translator and a
/// plain-text layout renderer.
pub const RECOGNIZE_SYSTEM_PROMPT: &str = r#"You are an OCR engine. Transcribe the text in the scanned page image exactly as printed.

Rules:
1. Output ONLY the transcribed text. No commentary, no explanations.
2. Do NOT translate, summarise, or correct wording.
3. Keep the reading order a human would use. Separate paragraphs with one blank line.
4. Keep line breaks inside a paragraph only where the page clearly breaks the line (verse, addresses, lists).
5. Ignore page numbers, running headers and footers, and decorative elements.
6. Do NOT use Markdown, HTML, or code fences.
7. If the page has no readable text, output nothing."#;

/// System prompt for translating recognized text with a chat model.
pub const TRANSLATE_SYSTEM_PROMPT: &str = r#"You are a professional translator. Detect the source language automatically and translate the user's text into the requested target language.

Rules:
1. Output ONLY the translation. No commentary, no notes, no quotation marks around the result.
2. Preserve paragraph and line breaks exactly.
3. Leave numbers, proper names, URLs and codes unchanged where a translator normally would.
4. If a passage is already in the target language, copy it unchanged.
5. Do NOT use Markdown or code fences."#;

/// User-turn text accompanying the page image for the vision recognizer.
pub fn recognize_instruction(language_hints: &[String]) -> String {
    format!(
        "The page is most likely written in one of these languages (tesseract codes): {}.",
        language_hints.join(", ")
    )
}

/// User-turn text for the LLM translator.
pub fn translate_instruction(target_language: &str, text: &str) -> String {
    format!("Target language: {target_language}\n\nText:\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognize_instruction_lists_hints() {
        let hints = vec!["eng".to_string(), "ukr".to_string()];
        assert!(recognize_instruction(&hints).ends_with("eng, ukr."));
    }

    #[test]
    fn translate_instruction_carries_text() {
        let msg = translate_instruction("ru", "Hello");
        assert!(msg.starts_with("Target language: ru"));
        assert!(msg.ends_with("Hello"));
    }

    #[test]
    fn prompts_forbid_fences() {
        assert!(RECOGNIZE_SYSTEM_PROMPT.contains("code fences"));
        assert!(TRANSLATE_SYSTEM_PROMPT.contains("code fences"));
    }
}
