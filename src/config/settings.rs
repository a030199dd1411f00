//! Application configuration document

use chrono_tz::Tz;
use inkplay_types::{DisplaySettings, Orientation, Playlist, RefreshMetadata};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::StoreError;
use inkplay_core::constants::{
    DEFAULT_CYCLE_INTERVAL_SECS, DEFAULT_RENDER_TIMEOUT_SECS, NO_ACTIVE_RETRY_SECS,
};

/// Current version of the config format
pub const CONFIG_VERSION: u32 = 1;

/// Everything inkplay persists: device setup, playlists and refresh state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Playlists in creation order
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    /// Name of the playlist that was chosen last
    #[serde(default)]
    pub rotation: Option<String>,
    #[serde(default)]
    pub refresh: RefreshMetadata,
}

impl AppConfig {
    pub fn find_playlist(&self, name: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.name == name)
    }

    pub fn find_playlist_mut(&mut self, name: &str) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| p.name == name)
    }

    pub fn playlist_position(&self, name: &str) -> Option<usize> {
        self.playlists.iter().position(|p| p.name == name)
    }

    /// Pull every cursor back into its playlist's range
    pub fn normalize_cursors(&mut self) {
        for playlist in &mut self.playlists {
            playlist.normalize_cursor();
        }
    }

    /// Check the invariants every stored document must hold
    pub fn validate(&self) -> Result<(), StoreError> {
        for (i, playlist) in self.playlists.iter().enumerate() {
            if playlist.name.trim().is_empty() {
                return Err(StoreError::Invariant(format!(
                    "playlist #{} has an empty name",
                    i + 1
                )));
            }
            if self.playlists[..i].iter().any(|p| p.name == playlist.name) {
                return Err(StoreError::Invariant(format!(
                    "playlist name '{}' is used twice",
                    playlist.name
                )));
            }
            playlist.validate().map_err(|e| {
                StoreError::Invariant(format!("playlist '{}': {}", playlist.name, e))
            })?;
            if playlist.cursor != playlist.next_cursor_index().unwrap_or(0) {
                return Err(StoreError::Invariant(format!(
                    "playlist '{}' cursor {} is out of range",
                    playlist.name, playlist.cursor
                )));
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            device: DeviceSettings::default(),
            scheduler: SchedulerSettings::default(),
            playlists: vec![Playlist::default_playlist()],
            rotation: None,
            refresh: RefreshMetadata::default(),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// The frame itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default = "default_device_name")]
    pub name: String,
    /// IANA timezone used to evaluate playlist windows
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub display: DisplaySettings,
    /// How the panel is mounted; vertical frames render in portrait
    #[serde(default)]
    pub orientation: Orientation,
    /// Panel is mounted upside down
    #[serde(default)]
    pub inverted_image: bool,
}

impl DeviceSettings {
    /// Parsed timezone, UTC when the name is unknown
    pub fn tz(&self) -> Tz {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                log::warn!("Unknown timezone '{}', using UTC", self.timezone);
                Tz::UTC
            }
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            timezone: default_timezone(),
            display: DisplaySettings::default(),
            orientation: Orientation::Horizontal,
            inverted_image: false,
        }
    }
}

fn default_device_name() -> String {
    "inkplay".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Refresh scheduler tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Dwell time when neither instance nor playlist sets one
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
    /// Wait before re-checking when no playlist is active
    #[serde(default = "default_no_active_retry")]
    pub no_active_retry_secs: u64,
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,
    /// Run a cycle immediately at startup
    #[serde(default = "default_true")]
    pub refresh_on_start: bool,
    /// Skip pushing frames identical to the one on screen
    #[serde(default)]
    pub skip_unchanged_frames: bool,
}

impl SchedulerSettings {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs.max(1))
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval(),
            no_active_retry_secs: default_no_active_retry(),
            render_timeout_secs: default_render_timeout(),
            refresh_on_start: true,
            skip_unchanged_frames: false,
        }
    }
}

fn default_cycle_interval() -> u64 {
    DEFAULT_CYCLE_INTERVAL_SECS
}

fn default_no_active_retry() -> u64 {
    NO_ACTIVE_RETRY_SECS
}

fn default_render_timeout() -> u64 {
    DEFAULT_RENDER_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

/// Default location of the config file
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "inkplay", "inkplay")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(dirs.config_dir().join("config.json"))
}
