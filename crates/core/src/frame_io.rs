//! Image encoding and decoding for frames

use anyhow::{Context, Result};
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use inkplay_types::Frame;
use std::io::Cursor;

/// Encode a frame as an 8-bit RGB PNG
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    frame
        .as_image()
        .write_to(&mut out, ImageFormat::Png)
        .context("png encoding failed")?;
    Ok(out.into_inner())
}

/// Decode a PNG or JPEG into an RGB frame
///
/// Transparent areas are composited onto white, which is what an e-paper
/// panel shows behind them.
pub fn decode_image(bytes: &[u8]) -> Result<Frame> {
    let decoded = image::load_from_memory(bytes).context("image data unreadable")?;
    if !decoded.color().has_alpha() {
        return Ok(Frame::from(decoded.into_rgb8()));
    }

    let top = decoded.into_rgba8();
    let mut canvas = RgbaImage::from_pixel(top.width(), top.height(), Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &top, 0, 0);
    Ok(Frame::from(DynamicImage::ImageRgba8(canvas).into_rgb8()))
}
