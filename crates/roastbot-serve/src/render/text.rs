//! Font loading, text measurement and glyph outlines.

use std::path::Path;
use std::sync::Arc;

use ab_glyph::{Font, FontArc, GlyphId, OutlineCurve};
use tiny_skia::PathBuilder;

use super::layout::MeasureText;

/// DejaVu Sans Bold, used when no font file is configured.
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Horizontal anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Center,
    Right,
}

/// A loaded font face shared across render tasks.
#[derive(Clone)]
pub struct FontFace {
    font: FontArc,
    family: Arc<str>,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace").field("family", &self.family).finish()
    }
}

impl FontFace {
    /// The embedded DejaVu Sans Bold face.
    pub fn embedded() -> anyhow::Result<Self> {
        let font = FontArc::try_from_slice(EMBEDDED_FONT)?;
        Ok(Self {
            font,
            family: Arc::from("DejaVu Sans"),
        })
    }

    /// Load a TTF/OTF file from disk under the given family name.
    pub fn from_file(path: &Path, family: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read font {}: {e}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("invalid font {}: {e}", path.display()))?;
        Ok(Self {
            font,
            family: Arc::from(family),
        })
    }

    /// Configured font file, or the embedded face when none is set.
    pub fn load(path: Option<&Path>, family: &str) -> anyhow::Result<Self> {
        let face = match path {
            Some(path) => Self::from_file(path, family)?,
            None => Self::embedded()?,
        };
        tracing::info!(family = face.family(), path = ?path, "font loaded");
        Ok(face)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    fn scale(&self, size: f32) -> f32 {
        size / self.font.units_per_em().unwrap_or(1000.0)
    }

    /// Glyph ids and pen positions (in font units) for a run of text.
    fn layout_glyphs(&self, text: &str) -> (Vec<(GlyphId, f32)>, f32) {
        let mut glyphs = Vec::with_capacity(text.len());
        let mut pen = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        for c in text.chars() {
            let id = self.font.glyph_id(c);
            if let Some(prev) = prev {
                pen += self.font.kern_unscaled(prev, id);
            }
            glyphs.push((id, pen));
            pen += self.font.h_advance_unscaled(id);
            prev = Some(id);
        }
        (glyphs, pen)
    }

    /// Outline path for `text` anchored at `(x, y)`.
    ///
    /// `y` is the vertical middle of the em box, matching a "middle" text
    /// baseline. Returns `None` for text without visible glyphs.
    pub fn text_path(&self, text: &str, size: f32, x: f32, y: f32, align: Align) -> Option<tiny_skia::Path> {
        let scale = self.scale(size);
        let (glyphs, advance) = self.layout_glyphs(text);
        let width = advance * scale;

        let left = match align {
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        let baseline =
            y + (self.font.ascent_unscaled() + self.font.descent_unscaled()) / 2.0 * scale;

        let mut builder = PathBuilder::new();
        for (id, pen) in glyphs {
            let Some(outline) = self.font.outline(id) else {
                continue;
            };
            let origin_x = left + pen * scale;
            let to_px = |p: ab_glyph::Point| (origin_x + p.x * scale, baseline - p.y * scale);

            let mut last: Option<ab_glyph::Point> = None;
            for curve in &outline.curves {
                let start = match curve {
                    OutlineCurve::Line(p0, _)
                    | OutlineCurve::Quad(p0, _, _)
                    | OutlineCurve::Cubic(p0, _, _, _) => *p0,
                };
                if last != Some(start) {
                    if last.is_some() {
                        builder.close();
                    }
                    let (sx, sy) = to_px(start);
                    builder.move_to(sx, sy);
                }
                let end = match curve {
                    OutlineCurve::Line(_, p1) => {
                        let (x1, y1) = to_px(*p1);
                        builder.line_to(x1, y1);
                        *p1
                    }
                    OutlineCurve::Quad(_, c, p1) => {
                        let (cx, cy) = to_px(*c);
                        let (x1, y1) = to_px(*p1);
                        builder.quad_to(cx, cy, x1, y1);
                        *p1
                    }
                    OutlineCurve::Cubic(_, c0, c1, p1) => {
                        let (ax, ay) = to_px(*c0);
                        let (bx, by) = to_px(*c1);
                        let (x1, y1) = to_px(*p1);
                        builder.cubic_to(ax, ay, bx, by, x1, y1);
                        *p1
                    }
                };
                last = Some(end);
            }
            if last.is_some() {
                builder.close();
            }
        }

        builder.finish()
    }
}

impl MeasureText for FontFace {
    fn measure(&self, text: &str, size: f32) -> f32 {
        self.layout_glyphs(text).1 * self.scale(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face() -> FontFace {
        FontFace::embedded().unwrap()
    }

    #[test]
    fn embedded_font_loads() {
        assert_eq!(face().family(), "DejaVu Sans");
    }

    #[test]
    fn measurement_scales_linearly() {
        let face = face();
        let small = face.measure("Roast me", 16.0);
        let large = face.measure("Roast me", 32.0);
        assert!(small > 0.0);
        assert!((large - small * 2.0).abs() < 1e-3);
    }

    #[test]
    fn longer_text_is_wider() {
        let face = face();
        assert!(face.measure("hello world", 20.0) > face.measure("hello", 20.0));
        assert_eq!(face.measure("", 20.0), 0.0);
    }

    #[test]
    fn centered_path_straddles_anchor() {
        let face = face();
        let path = face.text_path("Centered", 40.0, 200.0, 100.0, Align::Center).unwrap();
        let bounds = path.bounds();
        assert!(bounds.left() < 200.0 && bounds.right() > 200.0);
        assert!(bounds.top() < 100.0 && bounds.bottom() > 100.0);
        assert!((bounds.width() - face.measure("Centered", 40.0)).abs() < 40.0);
    }

    #[test]
    fn right_aligned_path_ends_at_anchor() {
        let face = face();
        let path = face.text_path("RoastBot.app", 12.0, 300.0, 50.0, Align::Right).unwrap();
        assert!(path.bounds().right() <= 300.5);
    }

    #[test]
    fn whitespace_has_no_path() {
        assert!(face().text_path("   ", 20.0, 10.0, 10.0, Align::Center).is_none());
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let result = FontFace::from_file(Path::new("/nonexistent/font.ttf"), "Nope");
        assert!(result.is_err());
    }
}
