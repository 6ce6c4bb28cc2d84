//! Word-processor document of translated paragraphs.

use super::{write_atomically, OutputSink, SinkError};
use crate::output::PageContent;
use docx_rs::{Docx, Paragraph, Run};
use std::path::Path;
use tracing::info;

/// One block of the flowed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowBlock {
    /// A non-blank line of translated text.
    Paragraph(String),
    /// The empty paragraph that closes every page.
    Separator,
}

/// Each non-blank, trimmed line of page text becomes its own paragraph,
/// followed by one empty separator paragraph per page. No layout is kept.
#[derive(Debug, Default)]
pub struct FlowTextSink {
    blocks: Vec<FlowBlock>,
    pages: usize,
}

impl FlowTextSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks accumulated so far, in document order.
    pub fn blocks(&self) -> &[FlowBlock] {
        &self.blocks
    }

    fn build(&self) -> Docx {
        self.blocks.iter().fold(Docx::new(), |doc, block| match block {
            FlowBlock::Paragraph(text) => {
                doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
            }
            FlowBlock::Separator => doc.add_paragraph(Paragraph::new()),
        })
    }
}

/// Split page text into paragraph blocks plus the trailing separator.
pub fn page_blocks(text: &str) -> Vec<FlowBlock> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| FlowBlock::Paragraph(l.to_string()))
        .chain(std::iter::once(FlowBlock::Separator))
        .collect()
}

impl OutputSink for FlowTextSink {
    fn accept_page(&mut self, page: PageContent) -> Result<(), SinkError> {
        self.blocks.extend(page_blocks(&page.text));
        self.pages += 1;
        Ok(())
    }

    fn finalize(&mut self, path: &Path) -> Result<(), SinkError> {
        if self.pages == 0 {
            return Err(SinkError::EmptyOutput);
        }

        let docx = self.build();
        write_atomically(path, |file| {
            docx.build()
                .pack(file)
                .map(|_| ())
                .map_err(|e| SinkError::Encode(format!("docx: {e}")))
        })?;

        info!(
            "Wrote {} paragraphs from {} pages to {}",
            self.blocks.len(),
            self.pages,
            path.display()
        );
        Ok(())
    }

    fn pages_accepted(&self) -> usize {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize, text: &str) -> PageContent {
        PageContent {
            index,
            text: text.to_string(),
            width: 100,
            height: 100,
        }
    }

    #[test]
    fn blank_lines_dropped_and_separator_added() {
        assert_eq!(
            page_blocks("  Первый  \n\n   \nВторой"),
            vec![
                FlowBlock::Paragraph("Первый".into()),
                FlowBlock::Paragraph("Второй".into()),
                FlowBlock::Separator,
            ]
        );
    }

    #[test]
    fn empty_page_still_gets_separator() {
        let mut sink = FlowTextSink::new();
        sink.accept_page(page(0, "")).unwrap();
        assert_eq!(sink.blocks(), &[FlowBlock::Separator]);
        assert_eq!(sink.pages_accepted(), 1);
    }

    #[test]
    fn writes_docx_archive() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("doc_translated.docx");
        let mut sink = FlowTextSink::new();
        sink.accept_page(page(0, "Hello\nWorld")).unwrap();
        sink.accept_page(page(1, "Again")).unwrap();
        sink.finalize(&out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        // DOCX is a zip archive.
        assert!(bytes.starts_with(b"PK"));
        assert_eq!(sink.blocks().len(), 5);
    }

    #[test]
    fn empty_finalize_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FlowTextSink::new();
        let out = dir.path().join("x.docx");
        assert!(matches!(sink.finalize(&out), Err(SinkError::EmptyOutput)));
        assert!(!out.exists());
    }
}
