//! Mock display
//!
//! Stands in for a physical panel. Keeps the last frame in memory and can
//! write it to a PNG file so the current image can be inspected.

use inkplay_core::{
    check_dimensions, encode_png, Display, DisplayCapabilities, DisplayError, Frame,
};
use std::path::PathBuf;

/// In-memory display
pub struct MockDisplay {
    capabilities: DisplayCapabilities,
    output_path: Option<PathBuf>,
    last_frame: Option<Frame>,
    shown: usize,
    /// Makes the next `show` fail with this hardware error
    fail_next: Option<String>,
}

impl MockDisplay {
    pub fn new(capabilities: DisplayCapabilities) -> Self {
        Self {
            capabilities,
            output_path: None,
            last_frame: None,
            shown: 0,
            fail_next: None,
        }
    }

    /// Also write every shown frame to `path` as PNG
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn shown_count(&self) -> usize {
        self.shown
    }

    fn write_output(&self, frame: &Frame) -> Result<(), DisplayError> {
        let Some(path) = &self.output_path else {
            return Ok(());
        };
        let bytes = encode_png(frame).map_err(|e| DisplayError::Hardware(format!("{:#}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // write then rename so readers never see a half-written image
        let tmp = path.with_extension("png.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl Display for MockDisplay {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> DisplayCapabilities {
        self.capabilities
    }

    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        check_dimensions(&self.capabilities, frame)?;

        if let Some(message) = self.fail_next.take() {
            return Err(DisplayError::Hardware(message));
        }

        self.write_output(frame)?;

        self.last_frame = Some(frame.clone());
        self.shown += 1;
        log::info!(
            "Mock display updated ({}x{}, update #{})",
            frame.width(),
            frame.height(),
            self.shown
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkplay_core::{decode_image, ColorMode, Rgb};

    fn caps() -> DisplayCapabilities {
        DisplayCapabilities {
            width: 6,
            height: 3,
            color_mode: ColorMode::BlackWhiteRed,
        }
    }

    #[test]
    fn test_show_records_frame() {
        let mut display = MockDisplay::new(caps());

        display.show(&Frame::filled(6, 3, Rgb::RED)).unwrap();
        assert_eq!(display.shown_count(), 1);
        assert_eq!(display.last_frame().unwrap().pixel(0, 0), Some(Rgb::RED));
    }

    #[test]
    fn test_rejects_wrong_dimensions() {
        let mut display = MockDisplay::new(caps());
        let err = display.show(&Frame::filled(3, 6, Rgb::RED)).unwrap_err();
        assert!(matches!(err, DisplayError::Dimensions { .. }));
        assert_eq!(display.shown_count(), 0);
    }

    #[test]
    fn test_injected_failure_applies_once() {
        let mut display = MockDisplay::new(caps());
        display.fail_next = Some("SPI timeout".to_string());

        let err = display.show(&Frame::filled(6, 3, Rgb::WHITE)).unwrap_err();
        assert_eq!(err.to_string(), "display hardware error: SPI timeout");
        assert!(display.show(&Frame::filled(6, 3, Rgb::WHITE)).is_ok());
        assert_eq!(display.shown_count(), 1);
    }

    #[test]
    fn test_writes_current_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images").join("current_image.png");
        let mut display = MockDisplay::new(caps()).with_output_path(&path);

        display.show(&Frame::filled(6, 3, Rgb::BLACK)).unwrap();
        let written = decode_image(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, Frame::filled(6, 3, Rgb::BLACK));
    }
}
