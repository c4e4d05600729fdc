//! Raster compositing of the final meme.
//!
//! Drawing order is fixed: black background, source image (additive),
//! radial vignette, caption lines (shadowed stroke then fill), translucent
//! band across the caption, watermark. The band goes on top of the caption
//! and dims it.

use image::RgbaImage;
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, GradientStop, Paint, Path, Pixmap, PixmapPaint,
    Point, RadialGradient, Rect, SpreadMode, Stroke, Transform,
};

use super::MemeError;
use super::layout::{CanvasPlan, TextLayout};
use super::text::{Align, FontFace};

/// Vignette opacity at the gradient radius.
const VIGNETTE_ALPHA: f32 = 0.3;

/// Band opacity.
const BAND_ALPHA: f32 = 0.3;

fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Color {
    let mut color = Color::from_rgba8(r, g, b, 255);
    color.set_alpha(alpha);
    color
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Convert a decoded image into a premultiplied pixmap.
pub fn to_pixmap(image: &RgbaImage) -> Result<Pixmap, MemeError> {
    let mut pixmap = Pixmap::new(image.width(), image.height()).ok_or_else(|| {
        MemeError::Render(format!(
            "cannot allocate {}x{} source pixmap",
            image.width(),
            image.height()
        ))
    })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Render a complete meme onto a new canvas.
pub fn composite(
    source: &Pixmap,
    plan: CanvasPlan,
    layout: &TextLayout,
    font: &FontFace,
    watermark: &str,
) -> Result<Pixmap, MemeError> {
    let mut canvas = Canvas::new(plan)?;
    canvas.paint_source(source)?;
    canvas.apply_vignette();
    canvas.draw_caption(layout, font)?;
    canvas.draw_band(layout);
    canvas.draw_watermark(font, watermark, layout.font_size);
    Ok(canvas.into_pixmap())
}

/// Drop shadow parameters, in canvas terms.
#[derive(Debug, Clone, Copy)]
struct Shadow {
    color: Color,
    blur: f32,
    offset: f32,
}

pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    pub fn new(plan: CanvasPlan) -> Result<Self, MemeError> {
        let pixmap = Pixmap::new(plan.width, plan.height).ok_or_else(|| {
            MemeError::Render(format!(
                "cannot allocate {}x{} canvas",
                plan.width, plan.height
            ))
        })?;
        Ok(Self { pixmap })
    }

    fn width(&self) -> f32 {
        self.pixmap.width() as f32
    }

    fn height(&self) -> f32 {
        self.pixmap.height() as f32
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Black background with the source added on top of it.
    ///
    /// If the additive draw fails the canvas is cleared and the source drawn
    /// plainly instead.
    pub fn paint_source(&mut self, source: &Pixmap) -> Result<(), MemeError> {
        self.pixmap.fill(Color::BLACK);
        let blended = self.draw_image(source, BlendMode::Plus);
        self.recover_plain(blended, source)
    }

    fn recover_plain(
        &mut self,
        attempt: Result<(), MemeError>,
        source: &Pixmap,
    ) -> Result<(), MemeError> {
        let Err(err) = attempt else {
            return Ok(());
        };
        tracing::warn!(error = %err, "blended image draw failed, falling back to plain draw");
        metrics::counter!("meme_image_fallbacks_total", "source" => "plain_draw").increment(1);
        self.pixmap.fill(Color::TRANSPARENT);
        self.draw_image(source, BlendMode::SourceOver)
    }

    /// Draw `source` stretched over the whole canvas.
    fn draw_image(&mut self, source: &Pixmap, blend_mode: BlendMode) -> Result<(), MemeError> {
        let sx = self.width() / source.width() as f32;
        let sy = self.height() / source.height() as f32;
        if !(sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0) {
            return Err(MemeError::Render(format!(
                "degenerate scale {sx}x{sy} for {}x{} source",
                source.width(),
                source.height()
            )));
        }

        let paint = PixmapPaint {
            blend_mode,
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, Transform::from_scale(sx, sy), None);
        Ok(())
    }

    /// Darken the edges with a radial gradient centered on the canvas.
    pub fn apply_vignette(&mut self) {
        let (w, h) = (self.width(), self.height());
        let center = Point::from_xy(w / 2.0, h / 2.0);
        let radius = w.max(h) / 1.5;

        let Some(shader) = RadialGradient::new(
            center,
            center,
            radius,
            vec![
                GradientStop::new(0.0, rgba(0, 0, 0, 0.0)),
                GradientStop::new(1.0, rgba(0, 0, 0, VIGNETTE_ALPHA)),
            ],
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            return;
        };

        let paint = Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        };
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, w, h) {
            self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    /// Each caption line: blurred shadow of the outline, the outline, then a white fill.
    pub fn draw_caption(&mut self, layout: &TextLayout, font: &FontFace) -> Result<(), MemeError> {
        let fs = layout.font_size;
        let stroke = Stroke {
            width: (fs * 0.15).max(4.0),
            miter_limit: 10.0,
            ..Stroke::default()
        };
        let outline = rgba(0, 0, 0, 0.9);
        let shadow = Shadow {
            color: rgba(0, 0, 0, 0.8 * 0.9),
            blur: fs * 0.15,
            offset: fs * 0.08,
        };
        let fill = solid(Color::WHITE);
        let center_x = self.width() / 2.0;

        for (index, line) in layout.lines.iter().enumerate() {
            let y = layout.line_center_y(index);
            let Some(path) = font.text_path(line, fs, center_x, y, Align::Center) else {
                continue;
            };

            self.draw_stroke_shadow(&path, &stroke, shadow)?;
            self.pixmap
                .stroke_path(&path, &solid(outline), &stroke, Transform::identity(), None);
            self.pixmap
                .fill_path(&path, &fill, FillRule::Winding, Transform::identity(), None);
        }
        Ok(())
    }

    fn draw_stroke_shadow(
        &mut self,
        path: &Path,
        stroke: &Stroke,
        shadow: Shadow,
    ) -> Result<(), MemeError> {
        let sigma = shadow.blur / 2.0;
        let margin = stroke.width / 2.0 + (3.0 * sigma).ceil() + 2.0;
        let bounds = path.bounds();

        let left = (bounds.left() - margin + shadow.offset).floor();
        let top = (bounds.top() - margin + shadow.offset).floor();
        let width = (bounds.width() + 2.0 * margin + 1.0).ceil() as u32;
        let height = (bounds.height() + 2.0 * margin + 1.0).ceil() as u32;

        let mut layer = Pixmap::new(width, height).ok_or_else(|| {
            MemeError::Render(format!("cannot allocate {width}x{height} shadow layer"))
        })?;
        layer.stroke_path(
            path,
            &solid(shadow.color),
            stroke,
            Transform::from_translate(shadow.offset - left, shadow.offset - top),
            None,
        );
        box_blur(&mut layer, sigma);

        self.pixmap.draw_pixmap(
            left as i32,
            top as i32,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    /// Full-width translucent band spanning the caption block.
    pub fn draw_band(&mut self, layout: &TextLayout) {
        if let Some(rect) = Rect::from_xywh(0.0, layout.band_y, self.width(), layout.band_height) {
            self.pixmap.fill_rect(
                rect,
                &solid(rgba(0, 0, 0, BAND_ALPHA)),
                Transform::identity(),
                None,
            );
        }
    }

    /// Right-aligned label in the bottom-right corner.
    pub fn draw_watermark(&mut self, font: &FontFace, label: &str, body_font_size: f32) {
        let (w, h) = (self.width(), self.height());
        let size = (body_font_size * 0.4).max(12.0);
        let padding = (w / 80.0).max(10.0);

        let Some(path) = font.text_path(label, size, w - padding, h - padding, Align::Right) else {
            return;
        };
        let stroke = Stroke {
            width: (w / 400.0).max(2.0),
            miter_limit: 10.0,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &solid(rgba(0, 0, 0, 0.8)),
            &stroke,
            Transform::identity(),
            None,
        );
        self.pixmap.fill_path(
            &path,
            &solid(rgba(255, 255, 255, 0.8)),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

/// Approximate a gaussian blur with three box blurs.
fn box_blur(pixmap: &mut Pixmap, sigma: f32) {
    if sigma < 0.5 {
        return;
    }
    let (w, h) = (pixmap.width() as usize, pixmap.height() as usize);
    let mut scratch = vec![0u8; w * h * 4];
    for size in box_sizes(sigma) {
        let radius = (size - 1) / 2;
        blur_axis(pixmap.data(), &mut scratch, w, h, radius, true);
        blur_axis(&scratch, pixmap.data_mut(), w, h, radius, false);
    }
}

/// Box widths whose successive application matches a gaussian of `sigma`.
fn box_sizes(sigma: f32) -> [usize; 3] {
    let n = 3.0f32;
    let ideal = (12.0 * sigma * sigma / n + 1.0).sqrt();
    let mut lower = ideal.floor() as i64;
    if lower % 2 == 0 {
        lower -= 1;
    }
    let lower = lower.max(1);
    let upper = lower + 2;
    let lw = lower as f32;
    let m = ((12.0 * sigma * sigma - n * lw * lw - 4.0 * n * lw - 3.0 * n) / (-4.0 * lw - 4.0))
        .round() as i64;

    let pick = |i: i64| if i < m { lower as usize } else { upper as usize };
    [pick(0), pick(1), pick(2)]
}

/// One box-blur pass along rows (`horizontal`) or columns. Pixels outside the
/// layer count as transparent.
fn blur_axis(src: &[u8], dst: &mut [u8], w: usize, h: usize, radius: usize, horizontal: bool) {
    let (lines, len, line_stride, step) = if horizontal {
        (h, w, w * 4, 4)
    } else {
        (w, h, 4, w * 4)
    };
    if len == 0 {
        return;
    }
    let divisor = (2 * radius + 1) as u32;

    for line in 0..lines {
        let at = |i: usize| line * line_stride + i * step;
        let mut sum = [0u32; 4];
        for i in 0..=radius.min(len - 1) {
            let o = at(i);
            for c in 0..4 {
                sum[c] += src[o + c] as u32;
            }
        }

        for i in 0..len {
            let o = at(i);
            for c in 0..4 {
                dst[o + c] = ((sum[c] + divisor / 2) / divisor) as u8;
            }
            if i + radius + 1 < len {
                let add = at(i + radius + 1);
                for c in 0..4 {
                    sum[c] += src[add + c] as u32;
                }
            }
            if i >= radius {
                let sub = at(i - radius);
                for c in 0..4 {
                    sum[c] -= src[sub + c] as u32;
                }
            }
        }
    }
}
