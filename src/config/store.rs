//! Config Store
//!
//! Owns the durable configuration. Every write clones the current document,
//! applies the change, validates it, persists it and only then publishes it,
//! so readers never observe a state that is not on disk.
//!
//! The file may also be edited by another process (the CLI while the
//! scheduler runs). Before each write the store re-reads the file and adopts
//! it if it changed since the last read or write, so those edits are kept.

use inkplay_types::{
    ActiveWindow, Playlist, PluginInstance, RefreshMetadata, RefreshPolicy, Settings,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use thiserror::Error;

use super::settings::{AppConfig, DeviceSettings, SchedulerSettings};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("playlist '{0}' already exists")]
    DuplicatePlaylist(String),
    #[error("instance '{instance}' already exists in playlist '{playlist}'")]
    DuplicateInstance { playlist: String, instance: String },
    #[error("playlist '{0}' not found")]
    PlaylistNotFound(String),
    #[error("instance '{instance}' not found in playlist '{playlist}'")]
    InstanceNotFound { playlist: String, instance: String },
    #[error("invalid name '{0}'")]
    InvalidName(String),
    #[error("config invariant violated: {0}")]
    Invariant(String),
}

impl StoreError {
    /// Errors that mean the stored document can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Invariant(_) | StoreError::Parse(_))
    }
}

/// What a committed write touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Playlists, instances or settings edited by the user
    Configuration,
    /// Cursors and refresh bookkeeping written by the scheduler
    RefreshState,
}

type ChangeCallback = Box<dyn Fn(ChangeKind) + Send + Sync>;

/// Partial edit of a playlist; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct PlaylistUpdate {
    pub name: Option<String>,
    pub window: Option<Option<ActiveWindow>>,
    pub cycle_interval_secs: Option<Option<u64>>,
}

/// Partial edit of a plugin instance
#[derive(Debug, Clone, Default)]
pub struct InstanceUpdate {
    pub settings: Option<Settings>,
    pub refresh_interval_secs: Option<Option<u64>>,
    pub refresh: Option<RefreshPolicy>,
}

pub struct ConfigStore {
    path: Option<PathBuf>,
    config: RwLock<AppConfig>,
    /// File content as last read or written by this store
    synced: Mutex<Option<String>>,
    listeners: Mutex<HashMap<String, ChangeCallback>>,
}

impl ConfigStore {
    /// Open the store at `path`, writing a default document if none exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let (config, content) = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let config = parse_config(&content)?;
            log::info!(
                "Loaded config from {} ({} playlists)",
                path.display(),
                config.playlists.len()
            );
            (config, content)
        } else {
            let config = AppConfig::default();
            let content = write_atomic(&path, &config)?;
            log::info!("Created default config at {}", path.display());
            (config, content)
        };

        Ok(Self {
            path: Some(path),
            config: RwLock::new(config),
            synced: Mutex::new(Some(content)),
            listeners: Mutex::new(HashMap::new()),
        })
    }

    /// Store that never touches the filesystem
    pub fn in_memory(mut config: AppConfig) -> Result<Self, StoreError> {
        config.normalize_cursors();
        config.validate()?;
        Ok(Self {
            path: None,
            config: RwLock::new(config),
            synced: Mutex::new(None),
            listeners: Mutex::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> AppConfig {
        self.read().clone()
    }

    pub fn refresh_metadata(&self) -> RefreshMetadata {
        self.read().refresh.clone()
    }

    pub fn playlists(&self) -> Vec<Playlist> {
        self.read().playlists.clone()
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        self.read().scheduler.clone()
    }

    pub fn device_settings(&self) -> DeviceSettings {
        self.read().device.clone()
    }

    /// Apply a user edit
    pub fn update<R>(
        &self,
        f: impl FnOnce(&mut AppConfig) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        self.commit(ChangeKind::Configuration, f)
    }

    /// Apply a scheduler bookkeeping write
    pub fn record<R>(
        &self,
        f: impl FnOnce(&mut AppConfig) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        self.commit(ChangeKind::RefreshState, f)
    }

    /// Adopt edits another process made to the file
    ///
    /// Returns true when the in-memory config changed.
    pub fn reload(&self) -> Result<bool, StoreError> {
        let reloaded = {
            let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
            self.sync_from_disk(&mut current)?
        };
        if reloaded {
            self.notify(ChangeKind::Configuration);
        }
        Ok(reloaded)
    }

    fn commit<R>(
        &self,
        kind: ChangeKind,
        f: impl FnOnce(&mut AppConfig) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let (result, reloaded, changed) = {
            let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
            let reloaded = self.sync_from_disk(&mut current)?;
            let mut next = current.clone();
            let result = match f(&mut next) {
                Ok(result) => result,
                Err(e) => {
                    drop(current);
                    if reloaded {
                        self.notify(ChangeKind::Configuration);
                    }
                    return Err(e);
                }
            };
            next.normalize_cursors();
            next.validate()?;
            let changed = next != *current;
            if changed {
                if let Some(path) = &self.path {
                    let content = write_atomic(path, &next)?;
                    *self.synced.lock().unwrap_or_else(PoisonError::into_inner) = Some(content);
                }
                *current = next;
            }
            (result, reloaded, changed)
        };
        if reloaded {
            self.notify(ChangeKind::Configuration);
        }
        if changed {
            self.notify(kind);
        }
        Ok(result)
    }

    /// Replace `current` with the file if someone else rewrote it
    fn sync_from_disk(&self, current: &mut AppConfig) -> Result<bool, StoreError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };

        let mut synced = self.synced.lock().unwrap_or_else(PoisonError::into_inner);
        if synced.as_deref() == Some(content.as_str()) {
            return Ok(false);
        }
        let config = parse_config(&content)?;
        *synced = Some(content);
        if config == *current {
            return Ok(false);
        }
        log::info!("Config file {} changed on disk, reloading", path.display());
        *current = config;
        Ok(true)
    }

    pub fn add_playlist(&self, name: &str, window: Option<ActiveWindow>) -> Result<(), StoreError> {
        let name = checked_name(name)?;
        self.update(|cfg| {
            if cfg.find_playlist(&name).is_some() {
                return Err(StoreError::DuplicatePlaylist(name.clone()));
            }
            cfg.playlists.push(Playlist::new(name.clone(), window));
            log::info!("Added playlist '{}'", name);
            Ok(())
        })
    }

    pub fn update_playlist(&self, name: &str, changes: PlaylistUpdate) -> Result<(), StoreError> {
        let new_name = changes.name.as_deref().map(checked_name).transpose()?;
        self.update(|cfg| {
            if let Some(new_name) = &new_name {
                if new_name != name && cfg.find_playlist(new_name).is_some() {
                    return Err(StoreError::DuplicatePlaylist(new_name.clone()));
                }
            }
            let playlist = cfg
                .find_playlist_mut(name)
                .ok_or_else(|| StoreError::PlaylistNotFound(name.to_string()))?;
            if let Some(window) = changes.window {
                playlist.window = window;
            }
            if let Some(interval) = changes.cycle_interval_secs {
                playlist.cycle_interval_secs = interval;
            }
            if let Some(new_name) = new_name {
                playlist.name = new_name.clone();
                rename_references(cfg, name, &new_name);
            }
            Ok(())
        })
    }

    pub fn delete_playlist(&self, name: &str) -> Result<Playlist, StoreError> {
        self.update(|cfg| {
            let index = cfg
                .playlist_position(name)
                .ok_or_else(|| StoreError::PlaylistNotFound(name.to_string()))?;
            if cfg.rotation.as_deref() == Some(name) {
                cfg.rotation = None;
            }
            log::info!("Deleted playlist '{}'", name);
            Ok(cfg.playlists.remove(index))
        })
    }

    pub fn add_instance(&self, playlist: &str, instance: PluginInstance) -> Result<(), StoreError> {
        checked_name(&instance.name)?;
        self.update(|cfg| {
            let target = cfg
                .find_playlist_mut(playlist)
                .ok_or_else(|| StoreError::PlaylistNotFound(playlist.to_string()))?;
            if target.find_instance(&instance.name).is_some() {
                return Err(StoreError::DuplicateInstance {
                    playlist: playlist.to_string(),
                    instance: instance.name.clone(),
                });
            }
            log::info!(
                "Added instance '{}' ({}) to playlist '{}'",
                instance.name,
                instance.plugin_id,
                playlist
            );
            target
                .add_instance(instance)
                .map_err(|e| StoreError::Invariant(e.to_string()))
        })
    }

    pub fn update_instance(
        &self,
        playlist: &str,
        instance: &str,
        changes: InstanceUpdate,
    ) -> Result<(), StoreError> {
        self.update(|cfg| {
            let target = find_instance_mut(cfg, playlist, instance)?;
            if let Some(settings) = changes.settings {
                target.settings = settings;
            }
            if let Some(interval) = changes.refresh_interval_secs {
                target.refresh_interval_secs = interval;
            }
            if let Some(policy) = changes.refresh {
                target.refresh = policy;
            }
            Ok(())
        })
    }

    pub fn remove_instance(&self, playlist: &str, instance: &str) -> Result<PluginInstance, StoreError> {
        self.update(|cfg| {
            let target = cfg
                .find_playlist_mut(playlist)
                .ok_or_else(|| StoreError::PlaylistNotFound(playlist.to_string()))?;
            target
                .remove_instance(instance)
                .map_err(|_| StoreError::InstanceNotFound {
                    playlist: playlist.to_string(),
                    instance: instance.to_string(),
                })
        })
    }

    pub fn update_scheduler_settings(&self, settings: SchedulerSettings) -> Result<(), StoreError> {
        self.update(|cfg| {
            cfg.scheduler = settings;
            Ok(())
        })
    }

    /// Register a callback run after every committed write
    pub fn on_change(&self, callback: impl Fn(ChangeKind) + Send + Sync + 'static) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Box::new(callback));
        id
    }

    pub fn remove_listener(&self, id: &str) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    fn notify(&self, kind: ChangeKind) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        for callback in listeners.values() {
            callback(kind);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AppConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn checked_name(name: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn find_instance_mut<'a>(
    cfg: &'a mut AppConfig,
    playlist: &str,
    instance: &str,
) -> Result<&'a mut PluginInstance, StoreError> {
    cfg.find_playlist_mut(playlist)
        .ok_or_else(|| StoreError::PlaylistNotFound(playlist.to_string()))?
        .find_instance_mut(instance)
        .ok_or_else(|| StoreError::InstanceNotFound {
            playlist: playlist.to_string(),
            instance: instance.to_string(),
        })
}

/// Keep refresh bookkeeping pointing at a renamed playlist
fn rename_references(cfg: &mut AppConfig, old: &str, new: &str) {
    if cfg.rotation.as_deref() == Some(old) {
        cfg.rotation = Some(new.to_string());
    }
    let refresh = &mut cfg.refresh;
    if let Some(displayed) = refresh.last_displayed.as_mut() {
        if displayed.playlist == old {
            displayed.playlist = new.to_string();
        }
    }
    for instance in [refresh.last_attempted.as_mut(), refresh.failing_instance.as_mut()]
        .into_iter()
        .flatten()
    {
        if instance.playlist == old {
            instance.playlist = new.to_string();
        }
    }
}

fn parse_config(content: &str) -> Result<AppConfig, StoreError> {
    let mut config: AppConfig = serde_json::from_str(content)?;
    config.normalize_cursors();
    config.validate()?;
    Ok(config)
}

/// Write then rename so a crash never leaves a truncated file
fn write_atomic(path: &Path, config: &AppConfig) -> Result<String, StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &content).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(content)
}
