//! inkplay-core: Plugin and display contracts for inkplay.
//!
//! This crate contains the fundamental traits (Plugin, Display), the
//! plugin registry, frame image I/O and shared constants.

pub mod constants;
mod display;
mod frame_io;
mod plugin;
mod registry;

pub use constants::{
    COMMAND_POLL_INTERVAL, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CYCLE_INTERVAL_SECS,
    DEFAULT_RENDER_TIMEOUT_SECS, MANUAL_REFRESH_WAIT_SECS, MAX_CYCLE_INTERVAL_SECS,
    NO_ACTIVE_RETRY_SECS,
};
pub use display::{check_dimensions, BoxedDisplay, Display, DisplayError};
pub use frame_io::{decode_image, encode_png};
pub use plugin::{
    setting_bool, setting_str, setting_u64, Plugin, PluginMetadata, RenderError,
    RenderErrorKind, RenderTarget,
};
pub use registry::{PluginRegistry, SharedPlugin};

// Re-export types used in trait signatures for convenience
pub use inkplay_types::{ColorMode, DisplayCapabilities, Frame, Orientation, Rgb, Settings};
