//! External renderer plugin
//!
//! Runs a program that writes a PNG or JPEG to the path given in `INKPLAY_OUTPUT`.
//! This is how heavyweight renderers (headless browsers, scripts) plug in.
//! The child is bounded by its own timeout and killed on expiry, so a hung
//! renderer never outlives the render call.
//!
//! Settings:
//! - `program` (required) and `args` (array of strings)
//! - `timeout_secs`, default 60
//! - `fit`: scale the output to the panel

use crate::image_file::load_image;
use crate::raster::{fit, quantize};
use inkplay_core::{
    setting_bool, setting_str, setting_u64, Frame, Plugin, PluginMetadata, RenderError,
    RenderTarget, Settings, COMMAND_POLL_INTERVAL, DEFAULT_COMMAND_TIMEOUT_SECS,
};
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static OUTPUT_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct CommandPlugin {
    metadata: PluginMetadata,
}

impl CommandPlugin {
    pub fn new() -> Self {
        Self {
            metadata: PluginMetadata::new(
                "command",
                "External Renderer",
                "Runs a program that renders a PNG",
            ),
        }
    }
}

impl Default for CommandPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_args(settings: &Settings) -> Result<Vec<String>, RenderError> {
    match settings.get("args") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| RenderError::invalid_settings("'args' must contain only strings"))
            })
            .collect(),
        Some(_) => Err(RenderError::invalid_settings("'args' must be an array of strings")),
    }
}

/// Unique scratch file for one render
fn output_path() -> PathBuf {
    let n = OUTPUT_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("inkplay-render-{}-{}.png", std::process::id(), n))
}

/// Wait for the child until `timeout`, killing it on expiry
fn wait_bounded(child: &mut Child, timeout: Duration) -> Result<std::process::ExitStatus, RenderError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => return Err(RenderError::internal(format!("cannot poll renderer: {}", e))),
        }
        if Instant::now() >= deadline {
            if let Err(e) = child.kill() {
                log::warn!("Failed to kill renderer process {}: {}", child.id(), e);
            }
            // reap so no zombie is left behind
            let _ = child.wait();
            return Err(RenderError::timeout(format!(
                "renderer did not finish within {}s",
                timeout.as_secs()
            )));
        }
        std::thread::sleep(COMMAND_POLL_INTERVAL);
    }
}

impl Plugin for CommandPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn render(&self, settings: &Settings, target: &RenderTarget) -> Result<Frame, RenderError> {
        let program = setting_str(settings, "program")?
            .ok_or_else(|| RenderError::invalid_settings("'program' is required"))?;
        let args = parse_args(settings)?;
        let timeout = Duration::from_secs(
            setting_u64(settings, "timeout_secs")?.unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
        );
        let scale = setting_bool(settings, "fit")?.unwrap_or(false);
        let output = output_path();

        let mut child = Command::new(program)
            .args(&args)
            .env("INKPLAY_OUTPUT", &output)
            .env("INKPLAY_WIDTH", target.width.to_string())
            .env("INKPLAY_HEIGHT", target.height.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    RenderError::invalid_settings(format!("program '{}' not found", program))
                }
                _ => RenderError::internal(format!("cannot start '{}': {}", program, e)),
            })?;
        log::debug!("Started renderer '{}' (pid {})", program, child.id());

        let result = wait_bounded(&mut child, timeout).and_then(|status| {
            if status.success() {
                load_image(&output)
            } else {
                Err(RenderError::internal(format!("'{}' exited with {}", program, status)))
            }
        });
        let _ = std::fs::remove_file(&output);

        let mut frame = result?;
        if scale && frame.dimensions() != (target.width, target.height) {
            frame = fit(&frame, target.width, target.height);
        }
        Ok(quantize(frame, target.color_mode))
    }
}
