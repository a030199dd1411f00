//! inkplay-display: Display implementations for inkplay.
//!
//! Physical panel drivers live outside this workspace; the mock display
//! lets the scheduler run end to end and writes the current image to disk.

mod mock;

pub use mock::MockDisplay;

use anyhow::{bail, Result};
use inkplay_core::BoxedDisplay;
use inkplay_types::DisplaySettings;

/// Build the display described by the device settings
pub fn build_display(settings: &DisplaySettings) -> Result<BoxedDisplay> {
    if settings.width == 0 || settings.height == 0 {
        bail!(
            "display resolution {}x{} is not usable",
            settings.width,
            settings.height
        );
    }
    match settings.kind.as_str() {
        "mock" => {
            let mut display = MockDisplay::new(settings.capabilities());
            if let Some(path) = &settings.output_path {
                display = display.with_output_path(path);
            }
            log::info!(
                "Using mock display {}x{} ({:?})",
                settings.width,
                settings.height,
                settings.color_mode
            );
            Ok(Box::new(display))
        }
        other => bail!("unknown display kind '{}'", other),
    }
}
