//! Layout renderer: flow translated text onto a blank page raster.
//!
//! The renderer does not try to reproduce the source layout. It wraps the
//! translated text to the page width, stacks the lines from the top margin
//! down, and silently drops whatever does not fit above the bottom margin.
//!
//! Wrapping is split from drawing: [`wrap_lines`] takes any width-measuring
//! function, so the algorithm can be exercised without a font, while
//! [`LayoutRenderer`] measures and draws with a real TrueType face.

use crate::error::TranslateError;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_text_mut, text_size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BACKGROUND: Luma<u8> = Luma([255]);
const FOREGROUND: Luma<u8> = Luma([0]);

/// Fonts tried, in order, when no font path is configured. All of them
/// cover Latin and Cyrillic.
const SYSTEM_FONT_CANDIDATES: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Font and spacing parameters for rendered pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// TrueType/OpenType font file. If None, the first available system font.
    pub font_path: Option<PathBuf>,
    /// Glyph size in pixels. Default: 24.
    pub font_size: f32,
    /// Blank border on every side, in pixels. Default: 50.
    pub margin: u32,
    /// Extra vertical gap between lines as a fraction of `font_size`. Default: 0.2.
    pub line_spacing_ratio: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: 24.0,
            margin: 50,
            line_spacing_ratio: 0.2,
        }
    }
}

impl LayoutConfig {
    pub(crate) fn validate(&self) -> Result<(), TranslateError> {
        if !(self.font_size.is_finite() && self.font_size >= 4.0) {
            return Err(TranslateError::InvalidConfig(format!(
                "Font size must be at least 4px, got {}",
                self.font_size
            )));
        }
        if !(self.line_spacing_ratio.is_finite() && self.line_spacing_ratio >= 0.0) {
            return Err(TranslateError::InvalidConfig(
                "Line spacing ratio must be ≥ 0".into(),
            ));
        }
        Ok(())
    }

    /// Vertical gap added below every line, in whole pixels.
    pub fn line_spacing(&self) -> u32 {
        (self.font_size * self.line_spacing_ratio) as u32
    }
}

/// A rendered page: exactly the source page's pixel size, white background.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub image: GrayImage,
}

impl RenderedPage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Anything that can turn translated text into a page raster.
///
/// [`LayoutRenderer`] is the real implementation; the trait lets the
/// paginated sink be driven by other renderers.
pub trait PageRenderer: Send + Sync {
    fn render(&self, text: &str, width: u32, height: u32) -> RenderedPage;
}

/// Word-wraps text and draws it with a TrueType font.
pub struct LayoutRenderer {
    font: FontVec,
    config: LayoutConfig,
}

impl std::fmt::Debug for LayoutRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutRenderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LayoutRenderer {
    /// Load the configured font, or the first system font that parses.
    pub fn new(config: LayoutConfig) -> Result<Self, TranslateError> {
        config.validate()?;
        let font = match config.font_path {
            Some(ref path) => load_font(path)?,
            None => find_system_font()?,
        };
        Ok(Self { font, config })
    }

    /// Build from in-memory font bytes.
    pub fn from_font_bytes(bytes: Vec<u8>, config: LayoutConfig) -> Result<Self, TranslateError> {
        config.validate()?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| TranslateError::FontUnavailable {
            detail: format!("font data could not be parsed: {e}"),
        })?;
        Ok(Self { font, config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    fn scale(&self) -> PxScale {
        PxScale::from(self.config.font_size)
    }

    /// Rendered width of one line in pixels.
    pub fn measure(&self, line: &str) -> f32 {
        text_size(self.scale(), &self.font, line).0 as f32
    }

    /// Height of one line box (ascent to descent) in pixels.
    pub fn line_height(&self) -> u32 {
        self.font.as_scaled(self.scale()).height().ceil() as u32
    }
}

impl PageRenderer for LayoutRenderer {
    fn render(&self, text: &str, width: u32, height: u32) -> RenderedPage {
        let margin = self.config.margin;
        let mut image = GrayImage::from_pixel(width, height, BACKGROUND);

        let max_width = width.saturating_sub(2 * margin) as f32;
        let lines = wrap_lines(text, max_width, |s| self.measure(s));
        let advance = self.line_height() + self.config.line_spacing();
        let positions = line_positions(lines.len(), height, margin, advance);

        if positions.len() < lines.len() {
            debug!(
                "Layout truncated: {} of {} lines fit on a {}x{} page",
                positions.len(),
                lines.len(),
                width,
                height
            );
        }

        for (line, y) in lines.iter().zip(positions) {
            if line.is_empty() {
                continue;
            }
            draw_text_mut(
                &mut image,
                FOREGROUND,
                margin as i32,
                y as i32,
                self.scale(),
                &self.font,
                line,
            );
        }

        RenderedPage { image }
    }
}

/// Wrap `text` into display lines no wider than `max_width` where possible.
///
/// * Input lines (split on `\n`) are trimmed; blank ones become one empty
///   output line, reproducing paragraph breaks.
/// * A non-blank line is cut at the last space whose prefix fits. If no
///   prefix fits, it is cut at the first space. If it has no space at all it
///   is force-cut at the character midpoint of what remains; a single
///   character is emitted as-is. Every cut strictly shortens the remainder.
/// * Each wrapped input line is followed by one blank spacer line.
pub fn wrap_lines<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut rest = paragraph;
        while measure(rest) > max_width {
            match split_overflowing(rest, max_width, &measure) {
                Some((head, tail)) => {
                    lines.push(head.to_string());
                    rest = tail;
                }
                None => break,
            }
        }
        lines.push(rest.to_string());
        lines.push(String::new());
    }

    lines
}

fn split_overflowing<'a, F>(line: &'a str, max_width: f32, measure: &F) -> Option<(&'a str, &'a str)>
where
    F: Fn(&str) -> f32,
{
    let spaces: Vec<usize> = line
        .char_indices()
        .filter(|&(i, c)| c == ' ' && i > 0)
        .map(|(i, _)| i)
        .collect();

    if let Some(&first) = spaces.first() {
        let cut = spaces
            .iter()
            .rev()
            .copied()
            .find(|&i| measure(line[..i].trim_end()) <= max_width)
            .unwrap_or(first);
        return Some((line[..cut].trim_end(), line[cut + 1..].trim_start()));
    }

    let len = line.chars().count();
    if len < 2 {
        return None;
    }
    let mid = line.char_indices().nth(len / 2).map(|(i, _)| i)?;
    Some((&line[..mid], &line[mid..]))
}

/// Top y-coordinate of each line that fits, starting at `margin` and
/// advancing by `advance`. Stops at the first line whose top would fall
/// below `height - margin`.
pub fn line_positions(line_count: usize, height: u32, margin: u32, advance: u32) -> Vec<u32> {
    let bottom = height.saturating_sub(margin);
    let mut positions = Vec::with_capacity(line_count);
    let mut y = margin;
    for _ in 0..line_count {
        if y > bottom {
            break;
        }
        positions.push(y);
        y = y.saturating_add(advance.max(1));
    }
    positions
}

fn load_font(path: &Path) -> Result<FontVec, TranslateError> {
    let data = std::fs::read(path).map_err(|e| TranslateError::FontUnavailable {
        detail: format!("{}: {e}", path.display()),
    })?;
    let font = FontVec::try_from_vec(data).map_err(|e| TranslateError::FontUnavailable {
        detail: format!("{}: {e}", path.display()),
    })?;
    info!("Loaded font: {}", path.display());
    Ok(font)
}

fn find_system_font() -> Result<FontVec, TranslateError> {
    for candidate in SYSTEM_FONT_CANDIDATES {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        if let Ok(font) = load_font(path) {
            return Ok(font);
        }
    }
    Err(TranslateError::FontUnavailable {
        detail: format!(
            "none of the default fonts were found ({})",
            SYSTEM_FONT_CANDIDATES.join(", ")
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is 10px wide.
    fn mono(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    fn content(lines: &[String]) -> Vec<&str> {
        lines.iter().map(String::as_str).filter(|l| !l.is_empty()).collect()
    }

    #[test]
    fn short_line_gets_spacer() {
        let lines = wrap_lines("hello", 100.0, mono);
        assert_eq!(lines, vec!["hello", ""]);
    }

    #[test]
    fn blank_lines_preserved_without_spacer() {
        let lines = wrap_lines("one\n\ntwo", 100.0, mono);
        assert_eq!(lines, vec!["one", "", "", "two", ""]);
    }

    #[test]
    fn lines_are_trimmed() {
        let lines = wrap_lines("   padded   \n   ", 100.0, mono);
        assert_eq!(lines, vec!["padded", "", ""]);
    }

    #[test]
    fn greedy_wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog again and again";
        let lines = wrap_lines(text, 100.0, mono);
        for line in &lines {
            assert!(mono(line) <= 100.0, "line too wide: {line:?}");
        }
        assert_eq!(content(&lines).join(" "), text);
        assert_eq!(lines.last().map(String::as_str), Some(""));
    }

    #[test]
    fn greedy_wrap_packs_as_much_as_fits() {
        let lines = wrap_lines("aaa bbb ccc ddd", 70.0, mono);
        assert_eq!(content(&lines), vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn overlong_first_word_cut_at_first_space() {
        let lines = wrap_lines("abcdefghijkl xy", 50.0, mono);
        assert_eq!(content(&lines), vec!["abcdefghijkl", "xy"]);
    }

    #[test]
    fn unbreakable_token_terminates_with_midpoint_cuts() {
        for len in [2usize, 3, 16, 17, 100, 1000] {
            let token = "x".repeat(len);
            let lines = wrap_lines(&token, 10.0, mono);
            let content = content(&lines);
            assert_eq!(content.concat(), token);
            let cuts = content.len() - 1;
            let bound = (len as f64).log2().ceil() as usize;
            assert!(cuts <= bound, "len {len}: {cuts} cuts > {bound}");
        }
    }

    #[test]
    fn single_wide_char_is_emitted() {
        let lines = wrap_lines("W", 1.0, mono);
        assert_eq!(lines, vec!["W", ""]);
    }

    #[test]
    fn cyrillic_is_cut_on_char_boundaries() {
        let token = "переводчикпереводчик";
        let lines = wrap_lines(token, 30.0, mono);
        assert_eq!(content(&lines).concat(), token);
    }

    #[test]
    fn positions_truncate_at_bottom_margin() {
        let ys = line_positions(100, 200, 50, 30);
        assert_eq!(ys, vec![50, 80, 110, 140]);
    }

    #[test]
    fn positions_on_tiny_page() {
        assert!(line_positions(3, 40, 50, 10).is_empty());
        assert_eq!(line_positions(0, 1000, 50, 10), Vec::<u32>::new());
    }

    #[test]
    fn invalid_font_size_rejected() {
        let cfg = LayoutConfig {
            font_size: 0.5,
            ..LayoutConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn garbage_font_bytes_rejected() {
        let err = LayoutRenderer::from_font_bytes(vec![0, 1, 2, 3], LayoutConfig::default())
            .unwrap_err();
        assert!(matches!(err, TranslateError::FontUnavailable { .. }));
    }

    #[test]
    fn render_with_system_font() {
        let renderer = match LayoutRenderer::new(LayoutConfig::default()) {
            Ok(r) => r,
            Err(_) => {
                println!("SKIP: no system font available");
                return;
            }
        };
        let page = renderer.render("Привет, мир\n\nHello world", 400, 300);
        assert_eq!((page.width(), page.height()), (400, 300));
        assert!(page.image.pixels().any(|p| p.0[0] < 128), "expected ink");
        // Margins stay blank.
        assert!((0..400).all(|x| page.image.get_pixel(x, 0).0[0] == 255));

        let again = renderer.render("Привет, мир\n\nHello world", 400, 300);
        assert_eq!(page.image.as_raw(), again.image.as_raw());
    }

    #[test]
    fn render_empty_text_is_blank() {
        let renderer = match LayoutRenderer::new(LayoutConfig::default()) {
            Ok(r) => r,
            Err(_) => {
                println!("SKIP: no system font available");
                return;
            }
        };
        let page = renderer.render("", 120, 80);
        assert!(page.image.pixels().all(|p| p.0[0] == 255));
    }
}
