//! Playlist Manager
//!
//! Decides which plugin instance is shown next. Playlists whose daily window
//! covers the current local time take turns in creation order; inside a
//! playlist the cursor walks the instances in order. Cursor and rotation
//! moves are committed to the store before the caller renders anything.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use inkplay_core::{PluginRegistry, SharedPlugin};
use inkplay_types::{CycleFault, FaultKind, InstanceRef, PluginInstance, TimeOfDay};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AppConfig, ConfigStore, StoreError};

/// The instance chosen for a cycle
pub struct Selection {
    pub playlist: String,
    /// Position of the instance in its playlist
    pub index: usize,
    pub instance: PluginInstance,
    pub plugin: SharedPlugin,
    /// Dwell time override from the instance or its playlist
    pub interval_secs: Option<u64>,
    /// Instances passed over because their plugin is not registered
    pub skipped: Vec<InstanceRef>,
}

impl Selection {
    pub fn instance_ref(&self) -> InstanceRef {
        InstanceRef::new(&self.playlist, &self.instance.name)
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("playlist", &self.playlist)
            .field("index", &self.index)
            .field("instance", &self.instance.name)
            .field("plugin", &self.plugin.metadata().id)
            .field("interval_secs", &self.interval_secs)
            .field("skipped", &self.skipped)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("instance {0} not found")]
    NotFound(InstanceRef),
    #[error("no plugin '{plugin_id}' registered for instance {instance}")]
    Unresolved { instance: InstanceRef, plugin_id: String },
}

/// Chosen slot before the plugin is attached
struct Pick {
    playlist: usize,
    index: usize,
}

/// Result of scanning the active playlists
struct Scan {
    pick: Option<Pick>,
    skipped: Vec<InstanceRef>,
}

/// Local time of day in `tz`
pub fn local_time_of_day(now: DateTime<Utc>, tz: Tz) -> TimeOfDay {
    let local = now.with_timezone(&tz);
    // hour < 24 and minute < 60, so this is always in range
    TimeOfDay::from_minutes((local.hour() * 60 + local.minute()) as u16).unwrap_or(TimeOfDay::MIDNIGHT)
}

/// Round robin over the playlists active at `time`
fn scan_next(config: &AppConfig, time: TimeOfDay, resolves: &dyn Fn(&str) -> bool) -> Scan {
    let active: Vec<usize> = config
        .playlists
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_selectable(time))
        .map(|(i, _)| i)
        .collect();
    let mut skipped = Vec::new();
    if active.is_empty() {
        return Scan { pick: None, skipped };
    }

    // start after the playlist chosen last, wrapping to the oldest
    let last = config
        .rotation
        .as_deref()
        .and_then(|name| config.playlist_position(name));
    let start = last
        .and_then(|last| active.iter().position(|&i| i > last))
        .unwrap_or(0);

    for offset in 0..active.len() {
        let p = active[(start + offset) % active.len()];
        let playlist = &config.playlists[p];
        let Some(first) = playlist.next_cursor_index() else {
            continue;
        };
        for step in 0..playlist.len() {
            let index = (first + step) % playlist.len();
            let instance = &playlist.instances[index];
            if resolves(&instance.plugin_id) {
                return Scan {
                    pick: Some(Pick { playlist: p, index }),
                    skipped,
                };
            }
            skipped.push(InstanceRef::new(&playlist.name, &instance.name));
        }
        log::warn!(
            "No instance in playlist '{}' has a registered plugin, trying the next one",
            playlist.name
        );
    }
    Scan { pick: None, skipped }
}

/// Step backwards from the instance on screen
fn scan_previous(config: &AppConfig, resolves: &dyn Fn(&str) -> bool) -> Scan {
    let displayed = config.refresh.last_displayed.as_ref();
    let p = displayed
        .and_then(|d| config.playlist_position(&d.playlist))
        .or_else(|| {
            config
                .rotation
                .as_deref()
                .and_then(|name| config.playlist_position(name))
        })
        .filter(|&p| !config.playlists[p].is_empty());
    let mut skipped = Vec::new();
    let Some(p) = p else {
        return Scan { pick: None, skipped };
    };

    let playlist = &config.playlists[p];
    let n = playlist.len();
    let current = displayed
        .filter(|d| d.playlist == playlist.name)
        .and_then(|d| playlist.position(&d.instance))
        .unwrap_or((playlist.cursor + n - 1) % n);
    for step in 1..=n {
        let index = (current + n - step) % n;
        let instance = &playlist.instances[index];
        if resolves(&instance.plugin_id) {
            return Scan {
                pick: Some(Pick { playlist: p, index }),
                skipped,
            };
        }
        skipped.push(InstanceRef::new(&playlist.name, &instance.name));
    }
    Scan { pick: None, skipped }
}

/// Note an unresolvable plugin on each skipped instance
fn mark_unresolved(config: &mut AppConfig, skipped: &[InstanceRef], now: DateTime<Utc>) {
    for instance_ref in skipped {
        let Some(instance) = config
            .find_playlist_mut(&instance_ref.playlist)
            .and_then(|p| p.find_instance_mut(&instance_ref.instance))
        else {
            continue;
        };
        let fault = CycleFault::new(
            FaultKind::UnresolvedPlugin,
            format!("plugin '{}' is not registered", instance.plugin_id),
            now,
        )
        .for_instance(instance_ref.clone());
        instance.record_failure(fault);
    }
}

/// Commit a pick: move the cursor past it and point the rotation at its playlist
fn commit_pick(config: &mut AppConfig, pick: &Pick) -> (String, PluginInstance, Option<u64>) {
    let playlist = &mut config.playlists[pick.playlist];
    playlist.advance_past(pick.index);
    let instance = playlist.instances[pick.index].clone();
    let interval = instance
        .refresh_interval_secs
        .or(playlist.cycle_interval_secs);
    let name = playlist.name.clone();
    config.rotation = Some(name.clone());
    (name, instance, interval)
}

pub struct PlaylistManager {
    store: Arc<ConfigStore>,
    registry: Arc<PluginRegistry>,
}

impl PlaylistManager {
    pub fn new(store: Arc<ConfigStore>, registry: Arc<PluginRegistry>) -> Self {
        Self { store, registry }
    }

    /// Pick the next instance to show, or `None` when nothing is active
    pub fn select_next(&self, now: DateTime<Utc>) -> Result<Option<Selection>, SelectionError> {
        let time = local_time_of_day(now, self.store.device_settings().tz());
        let registry = &self.registry;
        let resolves = |id: &str| registry.contains(id);

        let picked = self.store.record(|cfg| {
            let scan = scan_next(cfg, time, &resolves);
            mark_unresolved(cfg, &scan.skipped, now);
            Ok(scan.pick.map(|pick| (commit_pick(cfg, &pick), pick.index, scan.skipped)))
        })?;

        match picked {
            Some(((playlist, instance, interval_secs), index, skipped)) => {
                let selection = self.attach(playlist, index, instance, interval_secs, skipped)?;
                log::debug!(
                    "Selected {} at {} (index {})",
                    selection.instance_ref(),
                    time,
                    selection.index
                );
                Ok(Some(selection))
            }
            None => {
                log::debug!("No active playlist at {}", time);
                Ok(None)
            }
        }
    }

    /// Step back one instance in the playlist on screen
    pub fn select_previous(&self, now: DateTime<Utc>) -> Result<Option<Selection>, SelectionError> {
        let registry = &self.registry;
        let resolves = |id: &str| registry.contains(id);

        let picked = self.store.record(|cfg| {
            let scan = scan_previous(cfg, &resolves);
            mark_unresolved(cfg, &scan.skipped, now);
            Ok(scan.pick.map(|pick| (commit_pick(cfg, &pick), pick.index, scan.skipped)))
        })?;

        match picked {
            Some(((playlist, instance, interval_secs), index, skipped)) => {
                Ok(Some(self.attach(playlist, index, instance, interval_secs, skipped)?))
            }
            None => {
                log::debug!("Nothing displayed yet, selecting next instead of previous");
                self.select_next(now)
            }
        }
    }

    /// Re-render the instance on screen without moving any cursor
    pub fn select_current(&self, now: DateTime<Utc>) -> Result<Option<Selection>, SelectionError> {
        let config = self.store.snapshot();
        let current = config.refresh.last_displayed.as_ref().and_then(|d| {
            let playlist = config.find_playlist(&d.playlist)?;
            let index = playlist.position(&d.instance)?;
            Some((playlist, index))
        });
        let Some((playlist, index)) = current else {
            log::debug!("Nothing displayed yet, selecting next instead of current");
            return self.select_next(now);
        };

        let instance = playlist.instances[index].clone();
        let interval_secs = instance.refresh_interval_secs.or(playlist.cycle_interval_secs);
        Ok(Some(self.attach(
            playlist.name.clone(),
            index,
            instance,
            interval_secs,
            Vec::new(),
        )?))
    }

    /// Target one instance directly; the cursor ends up just after it
    pub fn select_instance(
        &self,
        playlist: &str,
        instance: &str,
    ) -> Result<Selection, SelectionError> {
        let target = InstanceRef::new(playlist, instance);
        let registry = &self.registry;

        let (name, picked, interval_secs, index) = self.store.record(|cfg| {
            let Some(p) = cfg.playlist_position(playlist) else {
                return Ok(None);
            };
            let Some(index) = cfg.playlists[p].position(instance) else {
                return Ok(None);
            };
            let plugin_id = &cfg.playlists[p].instances[index].plugin_id;
            if !registry.contains(plugin_id) {
                return Ok(Some(Err(plugin_id.clone())));
            }
            let (name, picked, interval) = commit_pick(cfg, &Pick { playlist: p, index });
            Ok(Some(Ok((name, picked, interval, index))))
        })?
        .ok_or_else(|| SelectionError::NotFound(target.clone()))?
        .map_err(|plugin_id| SelectionError::Unresolved {
            instance: target.clone(),
            plugin_id,
        })?;

        self.attach(name, index, picked, interval_secs, Vec::new())
    }

    fn attach(
        &self,
        playlist: String,
        index: usize,
        instance: PluginInstance,
        interval_secs: Option<u64>,
        skipped: Vec<InstanceRef>,
    ) -> Result<Selection, SelectionError> {
        let plugin = self
            .registry
            .resolve(&instance.plugin_id)
            .ok_or_else(|| SelectionError::Unresolved {
                instance: InstanceRef::new(&playlist, &instance.name),
                plugin_id: instance.plugin_id.clone(),
            })?;
        Ok(Selection {
            playlist,
            index,
            instance,
            plugin,
            interval_secs,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use inkplay_core::{Frame, Plugin, PluginMetadata, RenderError, RenderTarget, Rgb, Settings};
    use inkplay_types::{ActiveWindow, DisplayedInstance, Playlist};

    struct Blank {
        metadata: PluginMetadata,
    }

    impl Plugin for Blank {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        fn render(&self, _: &Settings, target: &RenderTarget) -> Result<Frame, RenderError> {
            Ok(Frame::filled(target.width, target.height, Rgb::WHITE))
        }
    }

    fn registry(ids: &[&str]) -> Arc<PluginRegistry> {
        let mut registry = PluginRegistry::new();
        for id in ids {
            registry.register(Arc::new(Blank {
                metadata: PluginMetadata::new(id, id, "test plugin"),
            }));
        }
        Arc::new(registry)
    }

    fn playlist(name: &str, window: Option<(&str, &str)>, instances: &[(&str, &str)]) -> Playlist {
        let window = window.map(|(start, end)| ActiveWindow::parse(start, end).unwrap());
        let mut playlist = Playlist::new(name, window);
        for (instance, plugin) in instances {
            playlist
                .add_instance(PluginInstance::new(*instance, *plugin, Settings::new()))
                .unwrap();
        }
        playlist
    }

    fn manager(playlists: Vec<Playlist>, plugins: &[&str]) -> (PlaylistManager, Arc<ConfigStore>) {
        let config = AppConfig {
            playlists,
            ..AppConfig::default()
        };
        let store = Arc::new(ConfigStore::in_memory(config).unwrap());
        (PlaylistManager::new(Arc::clone(&store), registry(plugins)), store)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn picked(manager: &PlaylistManager, now: DateTime<Utc>) -> (String, String) {
        let selection = manager.select_next(now).unwrap().unwrap();
        (selection.playlist, selection.instance.name)
    }

    fn pair(p: &str, i: &str) -> (String, String) {
        (p.to_string(), i.to_string())
    }

    #[test]
    fn test_day_night_scenario() {
        let (manager, store) = manager(
            vec![
                playlist("Day", Some(("06:00", "22:00")), &[("A", "clock"), ("B", "clock")]),
                playlist("Night", Some(("22:00", "06:00")), &[("C", "clock")]),
            ],
            &["clock"],
        );

        assert_eq!(picked(&manager, at(10, 0)), pair("Day", "A"));
        assert_eq!(store.snapshot().find_playlist("Day").unwrap().cursor, 1);

        assert_eq!(picked(&manager, at(23, 0)), pair("Night", "C"));
        assert_eq!(picked(&manager, at(2, 0)), pair("Night", "C"));
        assert_eq!(picked(&manager, at(12, 0)), pair("Day", "B"));
    }

    #[test]
    fn test_cycles_in_order_modulo_length() {
        let (manager, store) = manager(
            vec![playlist("Default", None, &[("a", "clock"), ("b", "clock"), ("c", "clock")])],
            &["clock"],
        );

        let names: Vec<String> = (0..7).map(|_| picked(&manager, at(9, 0)).1).collect();
        assert_eq!(names, ["a", "b", "c", "a", "b", "c", "a"]);
        assert_eq!(store.playlists()[0].cursor, 1);
    }

    #[test]
    fn test_no_active_playlist() {
        let (manager, _) = manager(
            vec![playlist("Night", Some(("22:00", "06:00")), &[("C", "clock")])],
            &["clock"],
        );
        assert!(manager.select_next(at(12, 0)).unwrap().is_none());
    }

    #[test]
    fn test_empty_playlist_is_not_selectable() {
        let (manager, _) = manager(vec![playlist("Default", None, &[])], &["clock"]);
        assert!(manager.select_next(at(12, 0)).unwrap().is_none());
    }

    #[test]
    fn test_all_unresolvable_returns_none() {
        let (manager, store) = manager(
            vec![playlist("Default", None, &[("a", "weather"), ("b", "calendar")])],
            &["clock"],
        );

        assert!(manager.select_next(at(12, 0)).unwrap().is_none());
        let config = store.snapshot();
        let instance = &config.playlists[0].instances[0];
        assert_eq!(instance.consecutive_failures, 1);
        assert_eq!(
            instance.last_error.as_ref().unwrap().kind,
            FaultKind::UnresolvedPlugin
        );
    }

    #[test]
    fn test_unresolvable_instance_is_skipped() {
        let (manager, store) = manager(
            vec![playlist("Default", None, &[("a", "weather"), ("b", "clock")])],
            &["clock"],
        );

        let selection = manager.select_next(at(12, 0)).unwrap().unwrap();
        assert_eq!(selection.instance.name, "b");
        assert_eq!(selection.skipped, vec![InstanceRef::new("Default", "a")]);
        assert_eq!(store.playlists()[0].cursor, 0);
    }

    #[test]
    fn test_unresolvable_playlist_falls_through_to_next() {
        let (manager, _) = manager(
            vec![
                playlist("Broken", None, &[("x", "weather")]),
                playlist("Working", None, &[("y", "clock")]),
            ],
            &["clock"],
        );
        assert_eq!(picked(&manager, at(12, 0)), pair("Working", "y"));
        assert_eq!(picked(&manager, at(12, 5)), pair("Working", "y"));
    }

    #[test]
    fn test_round_robin_between_active_playlists() {
        let (manager, store) = manager(
            vec![
                playlist("First", None, &[("a", "clock"), ("b", "clock")]),
                playlist("Second", Some(("08:00", "18:00")), &[("c", "clock")]),
            ],
            &["clock"],
        );

        assert_eq!(picked(&manager, at(9, 0)), pair("First", "a"));
        assert_eq!(picked(&manager, at(9, 1)), pair("Second", "c"));
        assert_eq!(picked(&manager, at(9, 2)), pair("First", "b"));
        assert_eq!(store.snapshot().rotation.as_deref(), Some("First"));
        // Second is closed in the evening, so First keeps the screen
        assert_eq!(picked(&manager, at(20, 0)), pair("First", "a"));
        assert_eq!(picked(&manager, at(20, 1)), pair("First", "b"));
    }

    #[test]
    fn test_always_selects_when_resolvable() {
        let (manager, _) = manager(
            vec![
                playlist("Day", Some(("06:00", "22:00")), &[("A", "clock"), ("B", "weather")]),
                playlist("Night", Some(("22:00", "06:00")), &[("C", "weather"), ("D", "clock")]),
            ],
            &["clock"],
        );
        for hour in 0..24 {
            for minute in [0, 29, 59] {
                assert!(manager.select_next(at(hour, minute)).unwrap().is_some());
            }
        }
    }

    #[test]
    fn test_window_uses_configured_timezone() {
        let (manager, store) = manager(
            vec![playlist("Morning", Some(("08:00", "09:00")), &[("a", "clock")])],
            &["clock"],
        );
        store
            .update(|cfg| {
                cfg.device.timezone = "Asia/Tokyo".to_string();
                Ok(())
            })
            .unwrap();

        // 23:30 UTC is 08:30 in Tokyo
        assert!(manager.select_next(at(23, 30)).unwrap().is_some());
        assert!(manager.select_next(at(8, 30)).unwrap().is_none());
    }

    #[test]
    fn test_interval_precedence() {
        let mut day = playlist("Day", None, &[("a", "clock"), ("b", "clock")]);
        day.cycle_interval_secs = Some(600);
        day.instances[1].refresh_interval_secs = Some(60);
        let (manager, _) = manager(vec![day], &["clock"]);

        assert_eq!(manager.select_next(at(9, 0)).unwrap().unwrap().interval_secs, Some(600));
        assert_eq!(manager.select_next(at(9, 1)).unwrap().unwrap().interval_secs, Some(60));
    }

    #[test]
    fn test_select_previous_steps_back() {
        let (manager, store) = manager(
            vec![playlist("Default", None, &[("a", "clock"), ("b", "clock"), ("c", "clock")])],
            &["clock"],
        );
        store
            .record(|cfg| {
                cfg.refresh.last_displayed = Some(DisplayedInstance {
                    playlist: "Default".to_string(),
                    instance: "a".to_string(),
                    plugin_id: "clock".to_string(),
                });
                cfg.playlists[0].cursor = 1;
                Ok(())
            })
            .unwrap();

        let selection = manager.select_previous(at(9, 0)).unwrap().unwrap();
        assert_eq!(selection.instance.name, "c");
        // the next timer cycle continues after the instance now shown
        assert_eq!(store.playlists()[0].cursor, 0);
    }

    #[test]
    fn test_select_previous_without_history_selects_next() {
        let (manager, _) = manager(
            vec![playlist("Default", None, &[("a", "clock"), ("b", "clock")])],
            &["clock"],
        );
        assert_eq!(
            manager.select_previous(at(9, 0)).unwrap().unwrap().instance.name,
            "a"
        );
    }

    #[test]
    fn test_select_current_keeps_cursor() {
        let (manager, store) = manager(
            vec![playlist("Default", None, &[("a", "clock"), ("b", "clock")])],
            &["clock"],
        );
        store
            .record(|cfg| {
                cfg.refresh.last_displayed = Some(DisplayedInstance {
                    playlist: "Default".to_string(),
                    instance: "b".to_string(),
                    plugin_id: "clock".to_string(),
                });
                Ok(())
            })
            .unwrap();

        let selection = manager.select_current(at(9, 0)).unwrap().unwrap();
        assert_eq!(selection.instance.name, "b");
        assert_eq!(store.playlists()[0].cursor, 0);
    }

    #[test]
    fn test_select_instance() {
        let (manager, store) = manager(
            vec![playlist("Default", None, &[("a", "clock"), ("b", "clock"), ("c", "weather")])],
            &["clock"],
        );

        let selection = manager.select_instance("Default", "b").unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(store.playlists()[0].cursor, 2);

        assert!(matches!(
            manager.select_instance("Default", "zzz"),
            Err(SelectionError::NotFound(_))
        ));
        assert!(matches!(
            manager.select_instance("Default", "c"),
            Err(SelectionError::Unresolved { .. })
        ));
    }
}
