//! Last rendered frame per plugin instance
//!
//! Instances whose refresh policy says they are not due are shown from
//! here instead of being rendered again. With a directory configured the
//! frames are also kept as PNG files so they survive a restart.

use inkplay_core::{decode_image, encode_png, Frame};
use inkplay_types::InstanceRef;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct FrameCache {
    dir: Option<PathBuf>,
    frames: HashMap<String, Frame>,
}

impl FrameCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            frames: HashMap::new(),
        }
    }

    pub fn get(&mut self, instance: &InstanceRef, plugin_id: &str) -> Option<Frame> {
        let key = cache_file_name(instance, plugin_id);
        if let Some(frame) = self.frames.get(&key) {
            return Some(frame.clone());
        }

        let path = self.dir.as_ref()?.join(&key);
        let bytes = std::fs::read(&path).ok()?;
        match decode_image(&bytes) {
            Ok(frame) => {
                debug!("Loaded cached frame {}", path.display());
                self.frames.insert(key, frame.clone());
                Some(frame)
            }
            Err(e) => {
                warn!("Ignoring unreadable cached frame {}: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Remember `frame`; a failed disk write only costs the copy on disk
    pub fn put(&mut self, instance: &InstanceRef, plugin_id: &str, frame: &Frame) {
        let key = cache_file_name(instance, plugin_id);
        if let Some(dir) = &self.dir {
            if let Err(e) = write_png(&dir.join(&key), frame) {
                warn!("Could not write cached frame for {}: {:#}", instance, e);
            }
        }
        self.frames.insert(key, frame.clone());
    }
}

fn write_png(path: &Path, frame: &Frame) -> anyhow::Result<()> {
    let bytes = encode_png(frame)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("png.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// `{playlist}_{plugin}_{instance}.png` with spaces replaced
fn cache_file_name(instance: &InstanceRef, plugin_id: &str) -> String {
    format!("{}_{}_{}.png", instance.playlist, plugin_id, instance.instance).replace(' ', "_")
}
