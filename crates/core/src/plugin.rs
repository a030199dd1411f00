//! Plugin trait and related types

use inkplay_types::{ColorMode, DisplayCapabilities, FaultKind, Frame, Orientation, Settings};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Metadata about a plugin implementation
#[derive(Debug, Clone)]
pub struct PluginMetadata {
    /// Unique identifier used by plugin instances
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Description of what the plugin renders
    pub description: String,
}

impl PluginMetadata {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// What a plugin must produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
}

impl RenderTarget {
    /// What to render for a panel mounted in `orientation`
    pub fn oriented(caps: DisplayCapabilities, orientation: Orientation) -> Self {
        let (width, height) = orientation.render_size(caps.width, caps.height);
        Self {
            width,
            height,
            color_mode: caps.color_mode,
        }
    }
}

/// Category of a render failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderErrorKind {
    Network,
    Timeout,
    InvalidSettings,
    Internal,
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenderErrorKind::Network => "network error",
            RenderErrorKind::Timeout => "timeout",
            RenderErrorKind::InvalidSettings => "invalid settings",
            RenderErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

impl From<RenderErrorKind> for FaultKind {
    fn from(kind: RenderErrorKind) -> Self {
        match kind {
            RenderErrorKind::Network => FaultKind::NetworkError,
            RenderErrorKind::Timeout => FaultKind::TimeoutError,
            RenderErrorKind::InvalidSettings => FaultKind::InvalidSettings,
            RenderErrorKind::Internal => FaultKind::InternalError,
        }
    }
}

/// Failure reported by a plugin's render call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RenderError {
    pub kind: RenderErrorKind,
    pub message: String,
}

impl RenderError {
    pub fn new(kind: RenderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Timeout, message)
    }

    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::InvalidSettings, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Internal, message)
    }
}

/// Trait for all content plugins
///
/// A plugin turns a settings map into a frame for the given target.
/// `render` may block for a long time (network fetches, external
/// renderers); the scheduler bounds it with its own timeout, but any child
/// process the plugin starts is the plugin's to clean up.
pub trait Plugin: Send + Sync {
    /// Get metadata about this plugin
    fn metadata(&self) -> &PluginMetadata;

    /// Render a frame for `target` using instance `settings`
    fn render(&self, settings: &Settings, target: &RenderTarget) -> Result<Frame, RenderError>;
}

/// Read an optional string setting
pub fn setting_str<'a>(settings: &'a Settings, key: &str) -> Result<Option<&'a str>, RenderError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(RenderError::invalid_settings(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
    }
}

/// Read an optional non-negative integer setting
pub fn setting_u64(settings: &Settings, key: &str) -> Result<Option<u64>, RenderError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            RenderError::invalid_settings(format!(
                "'{}' must be a non-negative integer, got {}",
                key, v
            ))
        }),
    }
}

/// Read an optional boolean setting
pub fn setting_bool(settings: &Settings, key: &str) -> Result<Option<bool>, RenderError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(RenderError::invalid_settings(format!(
            "'{}' must be true or false, got {}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> Settings {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_setting_helpers() {
        let s = settings(json!({"path": "/tmp/a.png", "timeout_secs": 5, "fit": true}));
        assert_eq!(setting_str(&s, "path").unwrap(), Some("/tmp/a.png"));
        assert_eq!(setting_u64(&s, "timeout_secs").unwrap(), Some(5));
        assert_eq!(setting_bool(&s, "fit").unwrap(), Some(true));
        assert_eq!(setting_str(&s, "missing").unwrap(), None);
    }

    #[test]
    fn test_wrong_setting_type_is_invalid_settings() {
        let s = settings(json!({"path": 3, "timeout_secs": -1}));
        let err = setting_str(&s, "path").unwrap_err();
        assert_eq!(err.kind, RenderErrorKind::InvalidSettings);
        assert!(setting_u64(&s, "timeout_secs").is_err());
    }

    #[test]
    fn test_render_error_maps_to_fault_kind() {
        let err = RenderError::timeout("took too long");
        assert_eq!(FaultKind::from(err.kind), FaultKind::TimeoutError);
        assert_eq!(err.to_string(), "timeout: took too long");
    }

    #[test]
    fn test_vertical_panel_renders_portrait() {
        let caps = DisplayCapabilities {
            width: 800,
            height: 480,
            color_mode: ColorMode::Monochrome,
        };
        let target = RenderTarget::oriented(caps, Orientation::Vertical);
        assert_eq!((target.width, target.height), (480, 800));
        assert_eq!(RenderTarget::oriented(caps, Orientation::Horizontal).width, 800);
    }
}
