// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::pixel_formats::sealed::PixelFormat;
use crate::pixel_formats::{R8UNorm, RGBA8UNorm};
use png::{BitDepth, ColorType};
use std::io::Write;

/// Formats whose byte layout matches a PNG color type directly.
///
/// # Safety
/// Implementors promise their `CPixel` bytes are exactly the PNG sample bytes.
pub unsafe trait PngPixelFormat: PixelFormat {
    fn png_color_type() -> png::ColorType;
    fn png_bit_depth() -> png::BitDepth;
}

unsafe impl PngPixelFormat for RGBA8UNorm {
    fn png_color_type() -> ColorType {
        ColorType::Rgba
    }

    fn png_bit_depth() -> BitDepth {
        BitDepth::Eight
    }
}

unsafe impl PngPixelFormat for R8UNorm {
    fn png_color_type() -> ColorType {
        ColorType::Grayscale
    }

    fn png_bit_depth() -> BitDepth {
        BitDepth::Eight
    }
}

/// Encodes tightly packed rows of `Format` pixels as a PNG.
pub(crate) fn encode<Format: PngPixelFormat, W: Write>(
    writer: W,
    width: u32,
    height: u32,
    bytes: &[u8],
) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(Format::png_color_type());
    encoder.set_depth(Format::png_bit_depth());
    let mut writer = encoder.write_header()?;
    writer.write_image_data(bytes)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::encode;
    use crate::pixel_formats::RGBA8UNorm;

    #[test]
    fn encodes_and_decodes_rgba() {
        let bytes = [10u8, 20, 30, 255, 40, 50, 60, 255];
        let mut out = Vec::new();
        encode::<RGBA8UNorm, _>(&mut out, 2, 1, &bytes).unwrap();

        let decoder = png::Decoder::new(std::io::Cursor::new(out));
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size().unwrap()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (2, 1));
        assert_eq!(&buf[..info.buffer_size()], &bytes);
    }
}
