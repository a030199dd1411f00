//! Drawing and image helpers shared by the built-in plugins

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use image::imageops::{self, BiLevel, FilterType};
use image::DynamicImage;
use inkplay_core::{ColorMode, Frame, RenderError, Rgb};
use std::convert::Infallible;

/// Parse `#rgb`, `#rrggbb` or a basic colour name
pub fn parse_color(value: &str) -> Result<Rgb, RenderError> {
    let v = value.trim().to_ascii_lowercase();
    let named = match v.as_str() {
        "black" => Some(Rgb::BLACK),
        "white" => Some(Rgb::WHITE),
        "red" => Some(Rgb::RED),
        "green" => Some(Rgb(0, 128, 0)),
        "blue" => Some(Rgb(0, 0, 255)),
        "yellow" => Some(Rgb(255, 255, 0)),
        "orange" => Some(Rgb(255, 165, 0)),
        "gray" | "grey" => Some(Rgb(128, 128, 128)),
        _ => None,
    };
    if let Some(c) = named {
        return Ok(c);
    }

    let invalid = || RenderError::invalid_settings(format!("unrecognised colour '{}'", value));
    let hex = v.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        6 => Ok(Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let expand = |s: &str| channel(s).map(|c| c * 17);
            Ok(Rgb(expand(&hex[0..1])?, expand(&hex[1..2])?, expand(&hex[2..3])?))
        }
        _ => Err(invalid()),
    }
}

pub fn rgb888(c: Rgb) -> Rgb888 {
    Rgb888::new(c.0, c.1, c.2)
}

/// `embedded-graphics` draw target backed by a frame
pub struct Canvas<'a> {
    frame: &'a mut Frame,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut Frame) -> Self {
        Self { frame }
    }
}

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.frame.width(), self.frame.height())
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.frame
                .set_pixel(point.x.into(), point.y.into(), Rgb(color.r(), color.g(), color.b()));
        }
        Ok(())
    }
}

/// Reduce a frame to what the panel can show
///
/// Monochrome panels get a Floyd-Steinberg dither to black and white,
/// grayscale panels get luma. Colour panels are left to the display driver.
pub fn quantize(frame: Frame, mode: ColorMode) -> Frame {
    match mode {
        ColorMode::Monochrome => {
            let mut gray = imageops::grayscale(frame.as_image());
            imageops::dither(&mut gray, &BiLevel);
            Frame::from(DynamicImage::ImageLuma8(gray).into_rgb8())
        }
        ColorMode::Grayscale => {
            let gray = imageops::grayscale(frame.as_image());
            Frame::from(DynamicImage::ImageLuma8(gray).into_rgb8())
        }
        _ => frame,
    }
}

/// Crop to the target aspect ratio around the centre, then scale to `width` x `height`
pub fn fit(frame: &Frame, width: u32, height: u32) -> Frame {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 || width == 0 || height == 0 {
        return Frame::filled(width, height, Rgb::WHITE);
    }

    let (crop_w, crop_h) = if u64::from(w) * u64::from(height) > u64::from(h) * u64::from(width) {
        // wider than the target: trim the sides
        ((u64::from(h) * u64::from(width) / u64::from(height)) as u32, h)
    } else {
        (w, (u64::from(w) * u64::from(height) / u64::from(width)) as u32)
    };
    let (crop_w, crop_h) = (crop_w.max(1), crop_h.max(1));
    let cropped =
        imageops::crop_imm(frame.as_image(), (w - crop_w) / 2, (h - crop_h) / 2, crop_w, crop_h)
            .to_image();
    Frame::from(imageops::resize(&cropped, width, height, FilterType::Lanczos3))
}
