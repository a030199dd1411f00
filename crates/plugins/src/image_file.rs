//! Image file plugin
//!
//! Shows a PNG or JPEG from disk. With `fit` enabled the image is cropped
//! to the panel's aspect ratio and scaled; otherwise it is passed through
//! as-is and must already match the display resolution.

use crate::raster::{fit, quantize};
use inkplay_core::{
    decode_image, setting_bool, setting_str, Frame, Plugin, PluginMetadata, RenderError,
    RenderTarget, Settings,
};
use std::path::Path;

pub struct ImageFilePlugin {
    metadata: PluginMetadata,
}

impl ImageFilePlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new("image_file", "Image File", "Displays an image file from disk"),
        }
    }
}

impl Default for ImageFilePlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// Load an image file as a frame
pub(crate) fn load_image(path: &Path) -> Result<Frame, RenderError> {
    let bytes = std::fs::read(path).map_err(|e| {
        RenderError::invalid_settings(format!("cannot read '{}': {}", path.display(), e))
    })?;
    decode_image(&bytes)
        .map_err(|e| RenderError::internal(format!("cannot decode '{}': {:#}", path.display(), e)))
}

impl Plugin for ImageFilePlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn render(&self, settings: &Settings, target: &RenderTarget) -> Result<Frame, RenderError> {
        let path = setting_str(settings, "path")?
            .ok_or_else(|| RenderError::invalid_settings("'path' is required"))?;
        let scale = setting_bool(settings, "fit")?.unwrap_or(false);

        let mut frame = load_image(Path::new(path))?;
        if scale && frame.dimensions() != (target.width, target.height) {
            log::debug!(
                "Scaling {} from {}x{} to {}x{}",
                path,
                frame.width(),
                frame.height(),
                target.width,
                target.height
            );
            frame = fit(&frame, target.width, target.height);
        }
        Ok(quantize(frame, target.color_mode))
    }
}
