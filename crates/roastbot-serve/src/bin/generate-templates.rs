//! Writes the default roast and compliment templates and a placeholder
//! image for every catalog entry.
//!
//! # Usage
//!
//! ```bash
//! generate-templates --dir crates/roastbot-serve/assets/templates
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use roastbot_core::ContentType;
use roastbot_serve::render::encode::encode_png;
use roastbot_serve::templates::{CATALOG, default_filename};
use tiny_skia::{
    Color, GradientStop, LinearGradient, Paint, PathBuilder, Pixmap, Point, Rect, SpreadMode,
    Stroke, Transform,
};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

/// Gradient endpoints for catalog placeholders, by template id.
const PLACEHOLDER_GRADIENTS: &[(&str, [u8; 3], [u8; 3])] = &[
    ("skeptical", [0x6A, 0x5A, 0xCD], [0x2F, 0x2F, 0x4F]),
    ("success-kid", [0x3C, 0xB3, 0x71], [0x1E, 0x56, 0x31]),
    ("drake", [0xFF, 0xA5, 0x00], [0x8B, 0x45, 0x13]),
    ("doge", [0xF4, 0xD0, 0x3F], [0xB7, 0x95, 0x0B]),
    ("distracted", [0x5D, 0xAD, 0xE2], [0x1B, 0x4F, 0x72]),
    ("disaster-girl", [0xE7, 0x4C, 0x3C], [0x64, 0x1E, 0x16]),
    ("wholesome", [0xAE, 0xD6, 0xF1], [0x5D, 0x6D, 0x7E]),
];
const FALLBACK_GRADIENT: ([u8; 3], [u8; 3]) = ([0x80, 0x80, 0x80], [0x30, 0x30, 0x30]);

/// Placeholder border inset and width.
const BORDER_INSET: f32 = 24.0;
const BORDER_WIDTH: f32 = 4.0;

#[derive(Parser, Debug)]
#[command(name = "generate-templates")]
#[command(about = "Write the default meme templates as PNG files")]
struct Args {
    /// Output directory
    #[arg(long, default_value = "crates/roastbot-serve/assets/templates")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("creating {}", args.dir.display()))?;

    for content_type in ContentType::ALL {
        let pixmap = match content_type {
            ContentType::Roast => roast_template()?,
            ContentType::Compliment => compliment_template()?,
        };
        write_png(&args.dir.join(default_filename(content_type)), &pixmap)?;
    }

    for template in CATALOG {
        let pixmap = catalog_placeholder(template.id)?;
        write_png(&args.dir.join(template.filename), &pixmap)?;
    }

    Ok(())
}

fn write_png(path: &Path, pixmap: &Pixmap) -> Result<()> {
    let bytes = encode_png(pixmap).context("encoding template")?;
    std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "template written");
    Ok(())
}

/// Canvas filled with a top-left to bottom-right gradient.
fn gradient_canvas(from: Color, to: Color) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(WIDTH, HEIGHT).context("allocating template canvas")?;
    let shader = LinearGradient::new(
        Point::from_xy(0.0, 0.0),
        Point::from_xy(WIDTH as f32, HEIGHT as f32),
        vec![GradientStop::new(0.0, from), GradientStop::new(1.0, to)],
        SpreadMode::Pad,
        Transform::identity(),
    )
    .context("building gradient")?;
    let rect = Rect::from_xywh(0.0, 0.0, WIDTH as f32, HEIGHT as f32).context("canvas rect")?;
    let paint = Paint {
        shader,
        anti_alias: true,
        ..Paint::default()
    };
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    Ok(pixmap)
}

fn stroke_paint(alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.set_color_rgba8(255, 255, 255, alpha);
    paint
}

/// Red to near-black with five diagonal streaks.
fn roast_template() -> Result<Pixmap> {
    let mut pixmap = gradient_canvas(
        Color::from_rgba8(0xFF, 0x4D, 0x4D, 255),
        Color::from_rgba8(0x1A, 0x1A, 0x1A, 255),
    )?;

    let paint = stroke_paint(26);
    let stroke = Stroke {
        width: 2.0,
        ..Stroke::default()
    };
    for i in 0..5 {
        let mut pb = PathBuilder::new();
        pb.move_to(0.0, i as f32 * 150.0);
        pb.line_to(WIDTH as f32, HEIGHT as f32 - i as f32 * 100.0);
        let path = pb.finish().context("streak path")?;
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    Ok(pixmap)
}

/// Gold to orange with eight outlined circles.
fn compliment_template() -> Result<Pixmap> {
    let mut pixmap = gradient_canvas(
        Color::from_rgba8(0xFF, 0xD7, 0x00, 255),
        Color::from_rgba8(0xFF, 0x8C, 0x00, 255),
    )?;

    let paint = stroke_paint(51);
    let stroke = Stroke {
        width: 3.0,
        ..Stroke::default()
    };
    for i in 0..8u32 {
        let x = 60.0 + ((i * 233) % 680) as f32;
        let y = 50.0 + ((i * 151) % 500) as f32;
        let radius = 20.0 + ((i * 37) % 60) as f32;
        let path = PathBuilder::from_circle(x, y, radius).context("circle path")?;
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    Ok(pixmap)
}

/// Gradient card with an inset border standing in for a catalog image.
fn catalog_placeholder(id: &str) -> Result<Pixmap> {
    let (from, to) = PLACEHOLDER_GRADIENTS
        .iter()
        .find(|(gradient_id, _, _)| *gradient_id == id)
        .map(|(_, from, to)| (*from, *to))
        .unwrap_or(FALLBACK_GRADIENT);
    let mut pixmap = gradient_canvas(
        Color::from_rgba8(from[0], from[1], from[2], 255),
        Color::from_rgba8(to[0], to[1], to[2], 255),
    )?;

    let half = BORDER_WIDTH / 2.0;
    let border = Rect::from_ltrb(
        BORDER_INSET + half,
        BORDER_INSET + half,
        WIDTH as f32 - BORDER_INSET - half,
        HEIGHT as f32 - BORDER_INSET - half,
    )
    .context("border rect")?;
    let path = PathBuilder::from_rect(border);
    let stroke = Stroke {
        width: BORDER_WIDTH,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &stroke_paint(64), &stroke, Transform::identity(), None);
    Ok(pixmap)
}
