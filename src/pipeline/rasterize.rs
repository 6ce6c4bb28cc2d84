//! Source rasterisation: turn a document into an ordered stream of page images.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`stream_pages`] runs the whole rasterisation on a blocking-pool thread and
//! hands pages over through a bounded channel, so at most `capacity` decoded
//! pages wait for the pipeline at any moment.
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 200 DPI would produce a
//! 6,600 × 9,400 px image. `max_pixels` caps the longest edge regardless of
//! physical size, keeping memory bounded and OCR time predictable.

use crate::error::{PageError, TranslateError};
use image::imageops::FilterType;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One rasterised source page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based page index.
    pub index: usize,
    pub image: DynamicImage,
}

impl Page {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A page, or the reason that single page could not be rendered.
pub type RasterizedPage = Result<Page, PageError>;

/// Produces page rasters for a document, in page order.
///
/// Both methods block; call them from a blocking context.
pub trait Rasterizer: Send + Sync {
    /// Number of pages. Fails with a setup error if the document cannot be opened.
    fn page_count(&self, path: &Path) -> Result<usize, TranslateError>;

    /// Emit every page in order. Stops early when `emit` returns
    /// [`ControlFlow::Break`]. A page that fails on its own is emitted as
    /// `Err(PageError::RenderFailed)`; a document-level failure is returned.
    fn rasterize(
        &self,
        path: &Path,
        emit: &mut dyn FnMut(RasterizedPage) -> ControlFlow<()>,
    ) -> Result<(), TranslateError>;
}

/// Run `rasterizer` on a blocking thread, streaming pages through a channel
/// of the given capacity. Dropping the receiver stops rasterisation after
/// the page being rendered.
pub fn stream_pages(
    rasterizer: Arc<dyn Rasterizer>,
    path: PathBuf,
    capacity: usize,
) -> (
    mpsc::Receiver<RasterizedPage>,
    JoinHandle<Result<(), TranslateError>>,
) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::task::spawn_blocking(move || {
        rasterizer.rasterize(&path, &mut |page| {
            if tx.blocking_send(page).is_err() {
                debug!("Page receiver dropped, stopping rasterisation");
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    });
    (rx, handle)
}

// ── pdfium ──────────────────────────────────────────────────────────────────

/// PDF rasteriser backed by pdfium.
///
/// The library is bound on each call: `PDFIUM_LIB_PATH` if set, else the
/// system library search path.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
}

impl PdfiumRasterizer {
    pub fn new(dpi: u32, max_pixels: u32, password: Option<String>) -> Self {
        Self {
            dpi,
            max_pixels,
            password,
        }
    }

    fn open<'a>(&'a self, pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, TranslateError> {
        pdfium
            .load_pdf_from_file(path, self.password.as_deref())
            .map_err(|e| classify_load_error(path, self.password.is_some(), &format!("{e:?}")))
    }
}

/// Bind to a pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, TranslateError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(lib) if !lib.is_empty() => Pdfium::bind_to_library(PathBuf::from(lib)),
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| TranslateError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

fn classify_load_error(path: &Path, had_password: bool, detail: &str) -> TranslateError {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            TranslateError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            TranslateError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        TranslateError::CorruptDocument {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, path: &Path) -> Result<usize, TranslateError> {
        let pdfium = bind_pdfium()?;
        let document = self.open(&pdfium, path)?;
        let count = document.pages().len() as usize;
        Ok(count)
    }

    fn rasterize(
        &self,
        path: &Path,
        emit: &mut dyn FnMut(RasterizedPage) -> ControlFlow<()>,
    ) -> Result<(), TranslateError> {
        let pdfium = bind_pdfium()?;
        let document = self.open(&pdfium, path)?;
        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let max = self.max_pixels as i32;
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(max)
            .set_maximum_height(max);

        for (index, page) in pages.iter().enumerate() {
            let rendered = page
                .render_with_config(&render_config)
                .map(|bitmap| bitmap.as_image())
                .map_err(|e| PageError::RenderFailed {
                    page: index,
                    detail: format!("{e:?}"),
                });

            let item = match rendered {
                Ok(image) => {
                    debug!(
                        "Rendered page {} → {}x{} px",
                        index + 1,
                        image.width(),
                        image.height()
                    );
                    Ok(Page { index, image })
                }
                Err(e) => {
                    warn!("Page {}: {}", index + 1, e);
                    Err(e)
                }
            };

            if emit(item).is_break() {
                break;
            }
        }
        Ok(())
    }
}

// ── single image ────────────────────────────────────────────────────────────

/// Treats a PNG/JPEG/TIFF file as a one-page document.
#[derive(Debug, Clone)]
pub struct ImageFileRasterizer {
    max_pixels: u32,
}

impl ImageFileRasterizer {
    pub fn new(max_pixels: u32) -> Self {
        Self { max_pixels }
    }

    fn load(&self, path: &Path) -> Result<DynamicImage, TranslateError> {
        let image = image::open(path).map_err(|e| TranslateError::CorruptDocument {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        if image.width().max(image.height()) > self.max_pixels {
            debug!(
                "Downscaling {}x{} image to fit {} px",
                image.width(),
                image.height(),
                self.max_pixels
            );
            return Ok(image.resize(self.max_pixels, self.max_pixels, FilterType::Triangle));
        }
        Ok(image)
    }
}

impl Rasterizer for ImageFileRasterizer {
    fn page_count(&self, path: &Path) -> Result<usize, TranslateError> {
        image::image_dimensions(path).map_err(|e| TranslateError::CorruptDocument {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Ok(1)
    }

    fn rasterize(
        &self,
        path: &Path,
        emit: &mut dyn FnMut(RasterizedPage) -> ControlFlow<()>,
    ) -> Result<(), TranslateError> {
        let image = self.load(path)?;
        let _ = emit(Ok(Page { index: 0, image }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn write_png(dir: &Path, w: u32, h: u32) -> PathBuf {
        let path = dir.join("scan.png");
        GrayImage::from_pixel(w, h, Luma([200])).save(&path).unwrap();
        path
    }

    #[test]
    fn image_file_is_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 40, 30);
        let r = ImageFileRasterizer::new(4000);
        assert_eq!(r.page_count(&path).unwrap(), 1);

        let mut pages = Vec::new();
        r.rasterize(&path, &mut |p| {
            pages.push(p);
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(pages.len(), 1);
        let page = pages.remove(0).unwrap();
        assert_eq!((page.index, page.width(), page.height()), (0, 40, 30));
    }

    #[test]
    fn oversized_image_is_downscaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 400, 100);
        let r = ImageFileRasterizer::new(200);
        let mut size = None;
        r.rasterize(&path, &mut |p| {
            size = p.ok().map(|p| (p.width(), p.height()));
            ControlFlow::Break(())
        })
        .unwrap();
        assert_eq!(size, Some((200, 50)));
    }

    #[test]
    fn undecodable_image_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();
        let err = ImageFileRasterizer::new(4000).page_count(&path).unwrap_err();
        assert!(matches!(err, TranslateError::CorruptDocument { .. }));
    }

    #[test]
    fn load_errors_are_classified() {
        let p = Path::new("x.pdf");
        assert!(matches!(
            classify_load_error(p, false, "PdfiumLibraryInternalError(PasswordError)"),
            TranslateError::PasswordRequired { .. }
        ));
        assert!(matches!(
            classify_load_error(p, true, "PdfiumLibraryInternalError(PasswordError)"),
            TranslateError::WrongPassword { .. }
        ));
        assert!(matches!(
            classify_load_error(p, false, "FormatError"),
            TranslateError::CorruptDocument { .. }
        ));
    }

    #[tokio::test]
    async fn stream_stops_when_receiver_dropped() {
        struct Endless;
        impl Rasterizer for Endless {
            fn page_count(&self, _: &Path) -> Result<usize, TranslateError> {
                Ok(usize::MAX)
            }
            fn rasterize(
                &self,
                _: &Path,
                emit: &mut dyn FnMut(RasterizedPage) -> ControlFlow<()>,
            ) -> Result<(), TranslateError> {
                for index in 0.. {
                    let image = DynamicImage::ImageLuma8(GrayImage::new(1, 1));
                    if emit(Ok(Page { index, image })).is_break() {
                        break;
                    }
                }
                Ok(())
            }
        }

        let (mut rx, handle) = stream_pages(Arc::new(Endless), PathBuf::from("x"), 2);
        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.index, 0);
        drop(rx);
        handle.await.unwrap().unwrap();
    }
}
