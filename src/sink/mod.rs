//! Output sinks: where translated pages end up.
//!
//! The pipeline pushes one [`PageContent`] per page, strictly in page order,
//! then calls [`OutputSink::finalize`] exactly once. A sink never writes a
//! partial document: `finalize` writes to a temporary file in the target
//! directory and renames it into place.

pub mod flow;
pub mod paginated;

pub use flow::{FlowBlock, FlowTextSink};
pub use paginated::PaginatedImageSink;

use crate::output::PageContent;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure inside an output sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `finalize` was called before any page was accepted.
    #[error("no pages were accepted")]
    EmptyOutput,

    /// The document library refused the content.
    #[error("encoding failed: {0}")]
    Encode(String),
}

impl SinkError {
    fn io(path: &Path, source: io::Error) -> Self {
        SinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Consumes translated pages in order and assembles the output document.
pub trait OutputSink: Send {
    /// Append one page. Called in ascending `page.index` order.
    fn accept_page(&mut self, page: PageContent) -> Result<(), SinkError>;

    /// Write the assembled document to `path`. Called once, after the last
    /// accepted page. Returns [`SinkError::EmptyOutput`] if nothing was accepted.
    fn finalize(&mut self, path: &Path) -> Result<(), SinkError>;

    /// Number of pages accepted so far.
    fn pages_accepted(&self) -> usize;
}

/// Output document shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One rendered page image per source page, assembled into a PDF (default).
    #[default]
    PaginatedImage,
    /// Paragraphs of translated text in a word-processor document (DOCX).
    FlowText,
}

impl OutputFormat {
    /// File extension used when deriving an output path.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::PaginatedImage => "pdf",
            OutputFormat::FlowText => "docx",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" | "paginated" | "paginated_image" => Ok(OutputFormat::PaginatedImage),
            "docx" | "flow" | "flow_text" => Ok(OutputFormat::FlowText),
            other => Err(format!("unknown output format '{other}' (expected pdf or docx)")),
        }
    }
}

/// Write a file via a temporary sibling and an atomic rename, so a reader
/// never observes a half-written document at `path`.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<(), SinkError>
where
    F: FnOnce(&mut File) -> Result<(), SinkError>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| SinkError::io(path, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| SinkError::io(path, e))?;
    write(tmp.as_file_mut())?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| SinkError::io(path, e))?;
    tmp.persist(path).map_err(|e| SinkError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn extension_matches_format() {
        assert_eq!(OutputFormat::PaginatedImage.extension(), "pdf");
        assert_eq!(OutputFormat::FlowText.extension(), "docx");
    }

    #[test]
    fn parse_format_names() {
        assert_eq!("PDF".parse::<OutputFormat>(), Ok(OutputFormat::PaginatedImage));
        assert_eq!("docx".parse::<OutputFormat>(), Ok(OutputFormat::FlowText));
        assert!("epub".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn atomic_write_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.bin");
        write_atomically(&target, |f| {
            f.write_all(b"payload")
                .map_err(|e| SinkError::io(Path::new("x"), e))
        })
        .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
        let entries = std::fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn failed_write_leaves_target_absent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let err = write_atomically(&target, |_| Err(SinkError::Encode("nope".into())));
        assert!(err.is_err());
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
