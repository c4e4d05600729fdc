//! Canvas sizing and caption layout.
//!
//! Everything here is pure arithmetic over canvas dimensions and a text
//! measurer, so identical inputs always produce identical layouts.

/// Shortest side a small image is scaled up to.
pub const UPSCALE_MIN_SIDE: u32 = 400;

/// Largest canvas side.
pub const MAX_CANVAS_SIDE: u32 = 1200;

/// Smallest canvas side.
pub const MIN_CANVAS_SIDE: u32 = 50;

/// Font size bounds in pixels.
pub const MIN_FONT_SIZE: f32 = 16.0;
pub const MAX_FONT_SIZE: f32 = 48.0;

/// Hard cap on caption lines regardless of canvas height.
pub const MAX_LINES: usize = 10;

/// Line pitch as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.4;

const ELLIPSIS: &str = "...";

/// Output canvas dimensions derived from a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasPlan {
    pub width: u32,
    pub height: u32,
}

impl CanvasPlan {
    /// Scale source dimensions into the canvas bounds.
    ///
    /// Images smaller than [`UPSCALE_MIN_SIDE`] on both sides are enlarged so
    /// the shorter side reaches it, then the result is fit inside
    /// [`MAX_CANVAS_SIDE`] square. Each side is clamped to
    /// `[MIN_CANVAS_SIDE, MAX_CANVAS_SIDE]` and rounded down to an even number.
    pub fn for_image(width: u32, height: u32) -> Self {
        let (mut w, mut h) = (width.max(1) as f64, height.max(1) as f64);

        let min_side = UPSCALE_MIN_SIDE as f64;
        if w < min_side && h < min_side {
            let scale = min_side / w.min(h);
            w *= scale;
            h *= scale;
        }

        let max_side = MAX_CANVAS_SIDE as f64;
        let fit = (max_side / w).min(max_side / h).min(1.0);
        w *= fit;
        h *= fit;

        Self {
            width: even_side(w),
            height: even_side(h),
        }
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

fn even_side(side: f64) -> u32 {
    let clamped = side.clamp(MIN_CANVAS_SIDE as f64, MAX_CANVAS_SIDE as f64) as u32;
    clamped - clamped % 2
}

/// Measures the advance width of a run of text at a given pixel size.
pub trait MeasureText {
    fn measure(&self, text: &str, size: f32) -> f32;
}

/// Caption font size for a canvas and text length (in characters).
///
/// Starts at a fifteenth of the shorter side and shrinks with text length,
/// never below 60% of that base, then clamps to `[16, 48]`.
pub fn font_size(width: u32, height: u32, text_len: usize) -> f32 {
    let base = width.min(height) as f32 / 15.0;
    let length_factor = (1.0 - text_len as f32 / 200.0).max(0.6);
    (base * length_factor).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Width budget for one caption line. Portrait canvases get a wider column.
pub fn max_line_width(plan: CanvasPlan) -> f32 {
    let fraction = if plan.is_portrait() { 0.85 } else { 0.75 };
    plan.width as f32 * fraction
}

/// Most lines that fit the canvas height at `font_size`, capped at [`MAX_LINES`].
pub fn max_lines(height: u32, font_size: f32) -> usize {
    let fit = (height as f32 / (font_size * 1.2)).floor().max(0.0) as usize;
    fit.min(MAX_LINES)
}

/// Greedy word wrap.
///
/// Words are appended to the current line until the measured width would
/// exceed `max_width`. A word wider than the budget on its own still gets a
/// line to itself. Once `max_lines - 1` lines have been committed the line in
/// progress becomes the last one, with `...` appended when words were left
/// over.
pub fn wrap_text<M: MeasureText + ?Sized>(
    text: &str,
    measurer: &M,
    font_size: f32,
    max_width: f32,
    max_lines: usize,
) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut lines = Vec::new();
    let mut current = String::new();

    for (index, word) in words.iter().enumerate() {
        let candidate = if current.is_empty() {
            (*word).to_string()
        } else {
            format!("{current} {word}")
        };

        if current.is_empty() || measurer.measure(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        lines.push(std::mem::replace(&mut current, (*word).to_string()));

        if lines.len() >= max_lines.saturating_sub(1) {
            if index + 1 < words.len() {
                current.push_str(ELLIPSIS);
            }
            break;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Fully resolved caption placement for one canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: f32,
    pub lines: Vec<String>,
    pub line_height: f32,
    /// Top of the first line box; each line is centered vertically in its box.
    pub start_y: f32,
    /// Top of the translucent band drawn across the caption.
    pub band_y: f32,
    pub band_height: f32,
}

impl TextLayout {
    pub fn compute<M: MeasureText + ?Sized>(plan: CanvasPlan, text: &str, measurer: &M) -> Self {
        let height = plan.height as f32;
        let font_size = font_size(plan.width, plan.height, text.chars().count());
        let lines = wrap_text(
            text,
            measurer,
            font_size,
            max_line_width(plan),
            max_lines(plan.height, font_size),
        );

        let line_height = font_size * LINE_HEIGHT_FACTOR;
        let total_height = lines.len() as f32 * line_height;
        let padding = height * 0.1;

        // Portrait captions sit in the upper third, everything else is centered.
        let start_y = if plan.is_portrait() {
            padding + height * 0.15
        } else {
            (height - total_height) / 2.0
        };

        let band_height = total_height + font_size;
        let band_y = if plan.is_portrait() {
            padding
        } else {
            (height - band_height) / 2.0
        };

        Self {
            font_size,
            lines,
            line_height,
            start_y,
            band_y,
            band_height,
        }
    }

    /// Vertical center of line `index`.
    pub fn line_center_y(&self, index: usize) -> f32 {
        self.start_y + index as f32 * self.line_height + self.line_height / 2.0
    }

    pub fn total_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is `0.5 * size` wide.
    struct Monospace;

    impl MeasureText for Monospace {
        fn measure(&self, text: &str, size: f32) -> f32 {
            text.chars().count() as f32 * size * 0.5
        }
    }

    #[test]
    fn canvas_keeps_mid_sized_images() {
        assert_eq!(
            CanvasPlan::for_image(800, 600),
            CanvasPlan { width: 800, height: 600 }
        );
    }

    #[test]
    fn canvas_rounds_down_to_even() {
        assert_eq!(
            CanvasPlan::for_image(801, 599),
            CanvasPlan { width: 800, height: 598 }
        );
    }

    #[test]
    fn canvas_upscales_small_images() {
        let plan = CanvasPlan::for_image(100, 200);
        assert_eq!(plan, CanvasPlan { width: 400, height: 800 });
    }

    #[test]
    fn canvas_fits_large_images() {
        assert_eq!(
            CanvasPlan::for_image(4000, 2000),
            CanvasPlan { width: 1200, height: 600 }
        );
        assert_eq!(
            CanvasPlan::for_image(1000, 3000),
            CanvasPlan { width: 400, height: 1200 }
        );
    }

    #[test]
    fn canvas_clamps_extreme_aspect_ratios() {
        let plan = CanvasPlan::for_image(50, 5000);
        assert_eq!(plan, CanvasPlan { width: 50, height: 1200 });
    }

    #[test]
    fn canvas_sides_are_even_and_bounded() {
        for (w, h) in [(50, 50), (51, 4999), (5000, 5000), (399, 401), (777, 333)] {
            let plan = CanvasPlan::for_image(w, h);
            for side in [plan.width, plan.height] {
                assert_eq!(side % 2, 0, "{w}x{h} -> {plan:?}");
                assert!((MIN_CANVAS_SIDE..=MAX_CANVAS_SIDE).contains(&side));
            }
        }
    }

    #[test]
    fn font_size_is_clamped() {
        assert_eq!(font_size(100, 100, 0), MIN_FONT_SIZE);
        assert_eq!(font_size(1200, 1200, 0), MAX_FONT_SIZE);
        // 600 / 15 = 40, 1 - 20/200 = 0.9
        assert!((font_size(800, 600, 20) - 36.0).abs() < 1e-4);
    }

    #[test]
    fn font_size_never_grows_with_text_length() {
        let mut previous = f32::MAX;
        for len in 0..=500 {
            let size = font_size(900, 700, len);
            assert!(size <= previous);
            assert!((MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size));
            previous = size;
        }
    }

    #[test]
    fn line_width_depends_on_orientation() {
        assert_eq!(max_line_width(CanvasPlan { width: 800, height: 600 }), 600.0);
        assert_eq!(max_line_width(CanvasPlan { width: 400, height: 800 }), 340.0);
        assert_eq!(max_line_width(CanvasPlan { width: 500, height: 500 }), 375.0);
    }

    #[test]
    fn max_lines_is_capped() {
        assert_eq!(max_lines(1200, 16.0), 10);
        assert_eq!(max_lines(100, 20.0), 4);
        assert_eq!(max_lines(50, 16.0), 2);
    }

    #[test]
    fn wrap_keeps_short_text_on_one_line() {
        let lines = wrap_text("hello world", &Monospace, 10.0, 100.0, 5);
        assert_eq!(lines, vec!["hello world"]);
    }

    #[test]
    fn wrap_breaks_at_width_budget() {
        // 10 chars per line at size 10.
        let lines = wrap_text("aaaa bbbb cccc dddd", &Monospace, 10.0, 50.0, 10);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn wrap_never_splits_long_words() {
        let lines = wrap_text("a supercalifragilistic b", &Monospace, 10.0, 50.0, 10);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn wrap_truncates_with_ellipsis() {
        let lines = wrap_text("one two three four five six", &Monospace, 10.0, 20.0, 3);
        assert_eq!(lines, vec!["one", "two", "three..."]);
    }

    #[test]
    fn wrap_omits_ellipsis_on_last_word() {
        let lines = wrap_text("one two three", &Monospace, 10.0, 20.0, 3);
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn wrap_collapses_whitespace() {
        let lines = wrap_text("  spaced   out  ", &Monospace, 10.0, 100.0, 5);
        assert_eq!(lines, vec!["spaced out"]);
        assert!(wrap_text("   ", &Monospace, 10.0, 100.0, 5).is_empty());
    }

    #[test]
    fn layout_respects_line_and_width_bounds() {
        let text = "You spent three hours picking a font and it still looks like a ransom note \
                    written by a printer that gave up halfway through the job. "
            .repeat(4);
        for plan in [
            CanvasPlan { width: 800, height: 600 },
            CanvasPlan { width: 400, height: 800 },
            CanvasPlan { width: 50, height: 50 },
            CanvasPlan { width: 1200, height: 200 },
        ] {
            let layout = TextLayout::compute(plan, &text, &Monospace);
            let limit = max_lines(plan.height, layout.font_size);
            let width = max_line_width(plan);
            assert!(layout.lines.len() <= limit, "{plan:?}");
            for line in &layout.lines {
                let single_word = !line.contains(' ');
                assert!(
                    single_word || Monospace.measure(line, layout.font_size) <= width,
                    "{line:?} too wide for {plan:?}"
                );
            }
        }
    }

    #[test]
    fn landscape_caption_is_centered() {
        let plan = CanvasPlan { width: 800, height: 600 };
        let layout = TextLayout::compute(plan, "short", &Monospace);
        assert_eq!(layout.lines.len(), 1);
        let expected = (600.0 - layout.line_height) / 2.0;
        assert!((layout.start_y - expected).abs() < 1e-4);
        assert!((layout.line_center_y(0) - 300.0).abs() < 1e-4);
        assert!((layout.band_height - (layout.total_height() + layout.font_size)).abs() < 1e-4);
    }

    #[test]
    fn portrait_caption_sits_in_upper_third() {
        let plan = CanvasPlan { width: 400, height: 800 };
        let layout = TextLayout::compute(plan, "short", &Monospace);
        assert!((layout.start_y - 200.0).abs() < 1e-4);
        assert!((layout.band_y - 80.0).abs() < 1e-4);
    }

    #[test]
    fn layout_is_deterministic() {
        let plan = CanvasPlan { width: 640, height: 480 };
        let text = "the same words in the same order";
        assert_eq!(
            TextLayout::compute(plan, text, &Monospace),
            TextLayout::compute(plan, text, &Monospace)
        );
    }
}
