//! Solid colour plugin
//!
//! Fills the whole panel with one colour. Handy for clearing a panel and as
//! the simplest possible playlist entry.

use crate::raster::{parse_color, quantize};
use inkplay_core::{setting_str, Frame, Plugin, PluginMetadata, RenderError, RenderTarget, Settings};

pub struct ColorPlugin {
    metadata: PluginMetadata,
}

impl ColorPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("color", "Solid Color", "Fills the display with one colour"),
        }
    }
}

impl Default for ColorPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ColorPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn render(&self, settings: &Settings, target: &RenderTarget) -> Result<Frame, RenderError> {
        let color = parse_color(setting_str(settings, "color")?.unwrap_or("white"))?;
        Ok(quantize(
            Frame::filled(target.width, target.height, color),
            target.color_mode,
        ))
    }
}
