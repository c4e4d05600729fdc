//! PNG encoding of finished canvases.

use tiny_skia::Pixmap;

/// 72 DPI expressed in pixels per meter.
const PIXELS_PER_METER_72DPI: u32 = 2835;

/// Encode a canvas as an RGBA PNG with a 72 DPI `pHYs` chunk, maximum
/// deflate effort and no scanline filtering.
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, png::EncodingError> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_filter(png::FilterType::NoFilter);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: PIXELS_PER_METER_72DPI,
            yppu: PIXELS_PER_METER_72DPI,
            unit: png::Unit::Meter,
        }));

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
        writer.finish()?;
    }
    Ok(out)
}

/// Whether an encoding failure is worth another attempt.
pub fn is_transient(err: &png::EncodingError) -> bool {
    matches!(err, png::EncodingError::IoError(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_decodable_png_with_density() {
        let mut pixmap = Pixmap::new(6, 4).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(10, 20, 30, 255));
        let bytes = encode_png(&pixmap).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));

        let decoder = png::Decoder::new(std::io::Cursor::new(&bytes));
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (6, 4));
        assert_eq!(info.color_type, png::ColorType::Rgba);
        let dims = info.pixel_dims.unwrap();
        assert_eq!(dims.xppu, PIXELS_PER_METER_72DPI);
        assert_eq!(dims.unit, png::Unit::Meter);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(3, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut pixmap = Pixmap::new(32, 32).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(200, 0, 100, 255));
        assert_eq!(encode_png(&pixmap).unwrap(), encode_png(&pixmap).unwrap());
    }

    #[test]
    fn only_io_errors_are_transient() {
        let io = png::EncodingError::IoError(std::io::Error::other("disk full"));
        assert!(is_transient(&io));
    }
}
