//! Rendered frames and display capability descriptions

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// An RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const RED: Rgb = Rgb(255, 0, 0);
}

/// Colours a panel can reproduce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Monochrome,
    Grayscale,
    BlackWhiteRed,
    SevenColor,
    #[default]
    FullColor,
}

/// Resolution and colour support reported by a display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayCapabilities {
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
}

/// Display section of the device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Display backend, e.g. "mock"
    #[serde(default = "default_display_kind")]
    pub kind: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub color_mode: ColorMode,
    /// Where the mock display writes the current image
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

fn default_display_kind() -> String {
    "mock".to_string()
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    480
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            kind: default_display_kind(),
            width: default_width(),
            height: default_height(),
            color_mode: ColorMode::default(),
            output_path: None,
        }
    }
}

impl DisplaySettings {
    pub fn capabilities(&self) -> DisplayCapabilities {
        DisplayCapabilities {
            width: self.width,
            height: self.height,
            color_mode: self.color_mode,
        }
    }
}

/// Which way up the panel is mounted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    /// Panel turned a quarter; content is rendered portrait and rotated back
    Vertical,
}

impl Orientation {
    /// Size plugins render at for a `width` x `height` panel
    pub fn render_size(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Orientation::Horizontal => (width, height),
            Orientation::Vertical => (height, width),
        }
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(c: Rgb) -> Self {
        image::Rgb([c.0, c.1, c.2])
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(p: image::Rgb<u8>) -> Self {
        Rgb(p.0[0], p.0[1], p.0[2])
    }
}

/// A rendered image in packed RGB8
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    image: RgbImage,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish_non_exhaustive()
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self { image }
    }
}

impl Frame {
    /// Frame of the given size filled with one colour
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, color.into()),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.image.get_pixel_checked(x, y).map(|p| Rgb::from(*p))
    }

    /// Set a pixel; coordinates outside the frame are ignored
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Rgb) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if let Some(p) = self.image.get_pixel_mut_checked(x, y) {
            *p = color.into();
        }
    }

    /// Turn a frame rendered for `orientation` into panel layout
    pub fn oriented(self, orientation: Orientation, inverted: bool) -> Self {
        let image = match orientation {
            Orientation::Horizontal => self.image,
            // a quarter turn counter-clockwise
            Orientation::Vertical => imageops::rotate270(&self.image),
        };
        let image = if inverted {
            imageops::rotate180(&image)
        } else {
            image
        };
        Self { image }
    }

    /// Hash of size and pixel data, used to detect unchanged content
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.image.dimensions().hash(&mut hasher);
        self.image.as_raw().hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frame() {
        let frame = Frame::filled(4, 2, Rgb::RED);
        assert_eq!(frame.dimensions(), (4, 2));
        assert_eq!(frame.as_image().as_raw().len(), 24);
        assert_eq!(frame.pixel(3, 1), Some(Rgb::RED));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn test_set_pixel_ignores_out_of_bounds() {
        let mut frame = Frame::filled(2, 2, Rgb::WHITE);
        frame.set_pixel(-1, 0, Rgb::BLACK);
        frame.set_pixel(5, 5, Rgb::BLACK);
        frame.set_pixel(1, 1, Rgb::BLACK);
        assert_eq!(frame.pixel(1, 1), Some(Rgb::BLACK));
        assert_eq!(frame.pixel(0, 0), Some(Rgb::WHITE));
    }

    #[test]
    fn test_content_hash_changes_with_pixels() {
        let a = Frame::filled(3, 3, Rgb::WHITE);
        let mut b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());
        b.set_pixel(0, 0, Rgb::BLACK);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_vertical_frame_turns_back_to_panel_layout() {
        let mut frame = Frame::filled(2, 4, Rgb::WHITE);
        frame.set_pixel(0, 0, Rgb::RED);
        assert_eq!(Orientation::Vertical.render_size(4, 2), (2, 4));

        let panel = frame.clone().oriented(Orientation::Vertical, false);
        assert_eq!(panel.dimensions(), (4, 2));
        assert_eq!(panel.pixel(0, 1), Some(Rgb::RED));

        let upside_down = frame.oriented(Orientation::Horizontal, true);
        assert_eq!(upside_down.dimensions(), (2, 4));
        assert_eq!(upside_down.pixel(1, 3), Some(Rgb::RED));
    }

    #[test]
    fn test_display_settings_defaults() {
        let settings: DisplaySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.kind, "mock");
        assert_eq!(settings.capabilities().width, 800);
        assert_eq!(settings.capabilities().color_mode, ColorMode::FullColor);
    }
}
