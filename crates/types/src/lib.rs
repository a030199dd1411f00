//! inkplay-types: Shared data types for the inkplay content scheduler.
//!
//! This crate contains pure serde data types (time windows, playlists,
//! plugin instances, refresh metadata, frames) shared by every inkplay
//! crate. Nothing here touches the filesystem or spawns threads.

pub mod frame;
pub mod playlist;
pub mod plugin_instance;
pub mod refresh;
pub mod time_window;

// Re-export commonly used types at the crate root for convenience
pub use frame::{ColorMode, DisplayCapabilities, DisplaySettings, Frame, Orientation, Rgb};
pub use playlist::{Playlist, PlaylistError, DEFAULT_PLAYLIST_NAME};
pub use plugin_instance::{PluginInstance, RefreshPolicy, Settings};
pub use refresh::{
    CycleFault, CycleStatus, DisplayedInstance, FaultKind, InstanceRef, RefreshMetadata,
    RefreshType,
};
pub use time_window::{ActiveWindow, ParseTimeError, TimeOfDay};
