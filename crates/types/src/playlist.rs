//! Playlists: ordered rotations of plugin instances

use crate::plugin_instance::PluginInstance;
use crate::time_window::{ActiveWindow, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name given to the playlist created for a fresh configuration
pub const DEFAULT_PLAYLIST_NAME: &str = "Default";

/// Rejected playlist edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    EmptyName,
    DuplicateInstance(String),
    InstanceNotFound(String),
}

impl fmt::Display for PlaylistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistError::EmptyName => write!(f, "instance name must not be empty"),
            PlaylistError::DuplicateInstance(name) => {
                write!(f, "instance '{}' already exists in this playlist", name)
            }
            PlaylistError::InstanceNotFound(name) => write!(f, "instance '{}' not found", name),
        }
    }
}

impl std::error::Error for PlaylistError {}

/// An ordered set of plugin instances with an optional daily window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    /// Unique across all playlists
    pub name: String,
    /// Daily window; `None` means always active
    #[serde(default)]
    pub window: Option<ActiveWindow>,
    /// Dwell time for instances without their own interval
    #[serde(default)]
    pub cycle_interval_secs: Option<u64>,
    #[serde(default)]
    pub instances: Vec<PluginInstance>,
    /// Index of the next instance to display
    #[serde(default)]
    pub cursor: usize,
}

impl Playlist {
    pub fn new(name: impl Into<String>, window: Option<ActiveWindow>) -> Self {
        Self {
            name: name.into(),
            window,
            cycle_interval_secs: None,
            instances: Vec::new(),
            cursor: 0,
        }
    }

    /// The playlist a fresh configuration starts with
    pub fn default_playlist() -> Self {
        Self::new(DEFAULT_PLAYLIST_NAME, Some(ActiveWindow::all_day()))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Whether the window covers `time`. Playlists without a window always are.
    pub fn is_active(&self, time: TimeOfDay) -> bool {
        self.window.map_or(true, |w| w.contains(time))
    }

    /// Active and has at least one instance
    pub fn is_selectable(&self, time: TimeOfDay) -> bool {
        !self.is_empty() && self.is_active(time)
    }

    pub fn find_instance(&self, name: &str) -> Option<&PluginInstance> {
        self.instances.iter().find(|i| i.name == name)
    }

    pub fn find_instance_mut(&mut self, name: &str) -> Option<&mut PluginInstance> {
        self.instances.iter_mut().find(|i| i.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.instances.iter().position(|i| i.name == name)
    }

    /// Cursor clamped into the instance range, `None` for an empty playlist
    pub fn next_cursor_index(&self) -> Option<usize> {
        if self.instances.is_empty() {
            None
        } else {
            Some(self.cursor % self.instances.len())
        }
    }

    /// Move the cursor to the slot after `index`, wrapping to the start
    pub fn advance_past(&mut self, index: usize) {
        if self.instances.is_empty() {
            self.cursor = 0;
        } else {
            self.cursor = (index + 1) % self.instances.len();
        }
    }

    /// Bring the cursor back into range after the instance list changed
    pub fn normalize_cursor(&mut self) {
        self.cursor = self.next_cursor_index().unwrap_or(0);
    }

    pub fn add_instance(&mut self, instance: PluginInstance) -> Result<(), PlaylistError> {
        if instance.name.trim().is_empty() {
            return Err(PlaylistError::EmptyName);
        }
        if self.find_instance(&instance.name).is_some() {
            return Err(PlaylistError::DuplicateInstance(instance.name));
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Remove an instance, keeping the cursor on the same upcoming instance
    pub fn remove_instance(&mut self, name: &str) -> Result<PluginInstance, PlaylistError> {
        let index = self
            .position(name)
            .ok_or_else(|| PlaylistError::InstanceNotFound(name.to_string()))?;
        let removed = self.instances.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        }
        self.normalize_cursor();
        Ok(removed)
    }

    /// Check per-playlist invariants: non-empty, unique instance names
    pub fn validate(&self) -> Result<(), PlaylistError> {
        for (i, instance) in self.instances.iter().enumerate() {
            if instance.name.trim().is_empty() {
                return Err(PlaylistError::EmptyName);
            }
            if self.instances[..i].iter().any(|other| other.name == instance.name) {
                return Err(PlaylistError::DuplicateInstance(instance.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_instance::Settings;

    fn playlist_with(names: &[&str]) -> Playlist {
        let mut playlist = Playlist::new("Test", None);
        for name in names {
            playlist
                .add_instance(PluginInstance::new(*name, "color", Settings::new()))
                .unwrap();
        }
        playlist
    }

    #[test]
    fn test_add_rejects_duplicates_and_empty_names() {
        let mut playlist = playlist_with(&["a"]);
        assert_eq!(
            playlist.add_instance(PluginInstance::new("a", "clock", Settings::new())),
            Err(PlaylistError::DuplicateInstance("a".to_string()))
        );
        assert_eq!(
            playlist.add_instance(PluginInstance::new("  ", "clock", Settings::new())),
            Err(PlaylistError::EmptyName)
        );
    }

    #[test]
    fn test_cursor_wraps() {
        let mut playlist = playlist_with(&["a", "b", "c"]);
        playlist.advance_past(2);
        assert_eq!(playlist.next_cursor_index(), Some(0));

        playlist.cursor = 7;
        assert_eq!(playlist.next_cursor_index(), Some(1));
    }

    #[test]
    fn test_remove_keeps_upcoming_instance() {
        let mut playlist = playlist_with(&["a", "b", "c"]);
        playlist.cursor = 2;
        playlist.remove_instance("a").unwrap();
        assert_eq!(playlist.cursor, 1);
        assert_eq!(playlist.instances[playlist.cursor].name, "c");

        playlist.remove_instance("c").unwrap();
        assert_eq!(playlist.cursor, 0);

        playlist.remove_instance("b").unwrap();
        assert_eq!(playlist.next_cursor_index(), None);
        assert!(playlist.remove_instance("b").is_err());
    }

    #[test]
    fn test_empty_playlist_is_never_selectable() {
        let playlist = Playlist::default_playlist();
        let noon: TimeOfDay = "12:00".parse().unwrap();
        assert!(playlist.is_active(noon));
        assert!(!playlist.is_selectable(noon));
    }
}
