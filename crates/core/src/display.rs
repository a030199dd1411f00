//! Display trait and related types

use inkplay_types::{DisplayCapabilities, Frame};
use thiserror::Error;

/// Failure reported by a display update
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("frame is {actual_width}x{actual_height}, display expects {expected_width}x{expected_height}")]
    Dimensions {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("display I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("display hardware error: {0}")]
    Hardware(String),
}

/// Trait for all displays
///
/// `show` blocks until the panel update finished (or failed). Errors are
/// returned from `show` itself, never delivered later.
pub trait Display: Send {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Resolution and colour support
    fn capabilities(&self) -> DisplayCapabilities;

    /// Push a frame to the panel
    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError>;
}

/// Type-erased display for dynamic dispatch
pub type BoxedDisplay = Box<dyn Display>;

/// Check that a frame matches the display resolution
pub fn check_dimensions(caps: &DisplayCapabilities, frame: &Frame) -> Result<(), DisplayError> {
    if frame.dimensions() == (caps.width, caps.height) {
        Ok(())
    } else {
        Err(DisplayError::Dimensions {
            expected_width: caps.width,
            expected_height: caps.height,
            actual_width: frame.width(),
            actual_height: frame.height(),
        })
    }
}
