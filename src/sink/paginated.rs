//! PDF of rendered page images, one output page per source page.

use super::{write_atomically, OutputSink, SinkError};
use crate::layout::{PageRenderer, RenderedPage};
use crate::output::PageContent;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

const MM_PER_INCH: f32 = 25.4;

/// Renders each page's text with a [`PageRenderer`] and keeps the raster.
/// `finalize` embeds every raster as a full-bleed image on a PDF page of the
/// same physical size as the source page.
pub struct PaginatedImageSink {
    renderer: Box<dyn PageRenderer>,
    dpi: f32,
    pages: Vec<RenderedPage>,
}

impl PaginatedImageSink {
    /// `dpi` is the resolution the source pages were rasterised at; it maps
    /// pixel sizes back to physical page sizes.
    pub fn new(renderer: Box<dyn PageRenderer>, dpi: u32) -> Self {
        Self {
            renderer,
            dpi: dpi.max(1) as f32,
            pages: Vec::new(),
        }
    }

    fn px_to_mm(&self, px: u32) -> Mm {
        Mm(px as f32 / self.dpi * MM_PER_INCH)
    }

    /// Assemble the accepted rasters into PDF bytes, in acceptance order.
    fn encode(&self) -> Vec<u8> {
        let mut doc = PdfDocument::new("Translated document");
        let mut pdf_pages = Vec::with_capacity(self.pages.len());

        for rendered in &self.pages {
            let (w, h) = (rendered.width(), rendered.height());
            let raw = RawImage {
                pixels: RawImageData::U8(rendered.image.as_raw().clone()),
                width: w as usize,
                height: h as usize,
                data_format: RawImageFormat::R8,
                tag: Vec::new(),
            };
            let id = doc.add_image(&raw);

            let ops = vec![Op::UseXobject {
                id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(1.0),
                    scale_y: Some(1.0),
                    dpi: Some(self.dpi),
                    rotate: None,
                },
            }];
            pdf_pages.push(PdfPage::new(self.px_to_mm(w), self.px_to_mm(h), ops));
        }

        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!("PDF writer reported {} warnings", warnings.len());
        }
        bytes
    }
}

impl OutputSink for PaginatedImageSink {
    fn accept_page(&mut self, page: PageContent) -> Result<(), SinkError> {
        let rendered = self.renderer.render(&page.text, page.width, page.height);
        debug!(
            "Page {} rendered ({}x{} px)",
            page.index + 1,
            rendered.width(),
            rendered.height()
        );
        self.pages.push(rendered);
        Ok(())
    }

    fn finalize(&mut self, path: &Path) -> Result<(), SinkError> {
        if self.pages.is_empty() {
            return Err(SinkError::EmptyOutput);
        }

        let bytes = self.encode();
        write_atomically(path, |file| {
            file.write_all(&bytes)
                .map_err(|e| SinkError::io(path, e))
        })?;

        info!("Wrote {} pages to {}", self.pages.len(), path.display());
        Ok(())
    }

    fn pages_accepted(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    struct BlankRenderer;

    impl PageRenderer for BlankRenderer {
        fn render(&self, _text: &str, width: u32, height: u32) -> RenderedPage {
            RenderedPage {
                image: GrayImage::from_pixel(width, height, Luma([255])),
            }
        }
    }

    fn page(index: usize) -> PageContent {
        PageContent {
            index,
            text: format!("page {index}"),
            width: 200,
            height: 300,
        }
    }

    #[test]
    fn writes_pdf_with_one_page_per_unit() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("doc_translated.pdf");

        let mut sink = PaginatedImageSink::new(Box::new(BlankRenderer), 100);
        sink.accept_page(page(0)).unwrap();
        sink.accept_page(page(1)).unwrap();
        assert_eq!(sink.pages_accepted(), 2);
        sink.finalize(&out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(sink.pages_accepted(), 2);
    }

    #[test]
    fn sink_can_cross_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<PaginatedImageSink>();
    }

    #[test]
    fn pages_are_kept_in_acceptance_order() {
        let mut sink = PaginatedImageSink::new(Box::new(BlankRenderer), 100);
        sink.accept_page(page(0)).unwrap();
        sink.accept_page(PageContent {
            width: 120,
            ..page(1)
        })
        .unwrap();
        let widths: Vec<u32> = sink.pages.iter().map(|p| p.width()).collect();
        assert_eq!(widths, vec![200, 120]);
    }

    #[test]
    fn page_size_follows_pixels_and_dpi() {
        let sink = PaginatedImageSink::new(Box::new(BlankRenderer), 100);
        let mm = sink.px_to_mm(100);
        assert!((mm.0 - 25.4).abs() < 1e-4);
    }

    #[test]
    fn empty_finalize_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.pdf");
        let mut sink = PaginatedImageSink::new(Box::new(BlankRenderer), 200);
        assert!(matches!(sink.finalize(&out), Err(SinkError::EmptyOutput)));
        assert!(!out.exists());
    }
}
