//! Refresh bookkeeping written by the scheduler after every cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failed or skipped cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// No playlist window covers the current time (or none had a usable instance)
    NoActivePlaylist,
    /// Instance references a plugin that is not registered
    UnresolvedPlugin,
    NetworkError,
    TimeoutError,
    InvalidSettings,
    InternalError,
    /// Rendered frame does not match the display resolution
    DimensionMismatch,
    /// Display hardware rejected the frame
    DisplayFailure,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::NoActivePlaylist => "no_active_playlist",
            FaultKind::UnresolvedPlugin => "unresolved_plugin",
            FaultKind::NetworkError => "network_error",
            FaultKind::TimeoutError => "timeout_error",
            FaultKind::InvalidSettings => "invalid_settings",
            FaultKind::InternalError => "internal_error",
            FaultKind::DimensionMismatch => "dimension_mismatch",
            FaultKind::DisplayFailure => "display_failure",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to one instance inside one playlist
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRef {
    pub playlist: String,
    pub instance: String,
}

impl InstanceRef {
    pub fn new(playlist: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            playlist: playlist.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.playlist, self.instance)
    }
}

/// A recorded failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleFault {
    pub kind: FaultKind,
    pub message: String,
    pub at: DateTime<Utc>,
    /// Instance the cycle was working on, if one had been selected
    #[serde(default)]
    pub instance: Option<InstanceRef>,
}

impl CycleFault {
    pub fn new(kind: FaultKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: message.into(),
            at,
            instance: None,
        }
    }

    pub fn for_instance(mut self, instance: InstanceRef) -> Self {
        self.instance = Some(instance);
        self
    }
}

impl fmt::Display for CycleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// What started the cycle that produced the current image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshType {
    Playlist,
    Manual,
}

/// Outcome of the most recent cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// No cycle has run yet
    #[default]
    Pending,
    Displayed,
    /// Rendered frame was identical to what is already on the panel
    Unchanged,
    NoActivePlaylist,
    Failed,
}

/// The instance whose image is currently on the display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedInstance {
    pub playlist: String,
    pub instance: String,
    pub plugin_id: String,
}

impl DisplayedInstance {
    pub fn instance_ref(&self) -> InstanceRef {
        InstanceRef::new(self.playlist.clone(), self.instance.clone())
    }
}

/// Process-wide refresh state, persisted after every cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshMetadata {
    /// Last time a frame reached the display
    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,
    /// Start of the most recent cycle, successful or not
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_displayed: Option<DisplayedInstance>,
    /// Instance the most recent cycle selected
    #[serde(default)]
    pub last_attempted: Option<InstanceRef>,
    #[serde(default)]
    pub refresh_type: Option<RefreshType>,
    /// Content hash of the frame currently on the display
    #[serde(default)]
    pub image_hash: Option<u64>,
    #[serde(default)]
    pub last_error: Option<CycleFault>,
    /// Consecutive failures of the instance named by `failing_instance`
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub failing_instance: Option<InstanceRef>,
    #[serde(default)]
    pub status: CycleStatus,
}

impl RefreshMetadata {
    /// Record a cycle that put a frame on the display (or found it unchanged)
    pub fn record_success(
        &mut self,
        displayed: DisplayedInstance,
        refresh_type: RefreshType,
        image_hash: u64,
        unchanged: bool,
        at: DateTime<Utc>,
    ) {
        self.last_success = Some(at);
        self.last_attempted = Some(displayed.instance_ref());
        self.last_displayed = Some(displayed);
        self.refresh_type = Some(refresh_type);
        self.image_hash = Some(image_hash);
        self.last_error = None;
        self.consecutive_failures = 0;
        self.failing_instance = None;
        self.status = if unchanged {
            CycleStatus::Unchanged
        } else {
            CycleStatus::Displayed
        };
    }

    /// Record a failed cycle for a selected instance
    ///
    /// The counter continues when the same instance fails again and restarts
    /// at one for a different instance. `last_success` is left untouched.
    pub fn record_failure(&mut self, instance: InstanceRef, fault: CycleFault) {
        if self.failing_instance.as_ref() == Some(&instance) {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        } else {
            self.consecutive_failures = 1;
            self.failing_instance = Some(instance.clone());
        }
        self.last_attempted = Some(instance);
        self.last_error = Some(fault);
        self.status = CycleStatus::Failed;
    }

    /// Record a cycle that found nothing to show
    pub fn record_idle(&mut self, fault: CycleFault) {
        self.last_error = Some(fault);
        self.status = CycleStatus::NoActivePlaylist;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    fn displayed(instance: &str) -> DisplayedInstance {
        DisplayedInstance {
            playlist: "Default".to_string(),
            instance: instance.to_string(),
            plugin_id: "clock".to_string(),
        }
    }

    #[test]
    fn test_failure_counter_tracks_same_instance() {
        let mut meta = RefreshMetadata::default();
        let a = InstanceRef::new("Default", "a");
        let b = InstanceRef::new("Default", "b");

        meta.record_failure(a.clone(), CycleFault::new(FaultKind::TimeoutError, "slow", at(1)));
        meta.record_failure(a.clone(), CycleFault::new(FaultKind::TimeoutError, "slow", at(2)));
        assert_eq!(meta.consecutive_failures, 2);

        meta.record_failure(b.clone(), CycleFault::new(FaultKind::NetworkError, "down", at(3)));
        assert_eq!(meta.consecutive_failures, 1);
        assert_eq!(meta.failing_instance, Some(b));
        assert_eq!(meta.status, CycleStatus::Failed);
        assert!(meta.last_success.is_none());
    }

    #[test]
    fn test_success_resets_failures() {
        let mut meta = RefreshMetadata::default();
        let a = InstanceRef::new("Default", "a");
        meta.record_failure(a, CycleFault::new(FaultKind::InternalError, "boom", at(1)));

        meta.record_success(displayed("a"), RefreshType::Playlist, 42, false, at(2));
        assert_eq!(meta.consecutive_failures, 0);
        assert!(meta.last_error.is_none());
        assert_eq!(meta.last_success, Some(at(2)));
        assert_eq!(meta.status, CycleStatus::Displayed);
    }

    #[test]
    fn test_idle_keeps_counters() {
        let mut meta = RefreshMetadata::default();
        let a = InstanceRef::new("Default", "a");
        meta.record_failure(a, CycleFault::new(FaultKind::InternalError, "boom", at(1)));
        meta.record_idle(CycleFault::new(FaultKind::NoActivePlaylist, "nothing active", at(2)));

        assert_eq!(meta.consecutive_failures, 1);
        assert_eq!(meta.status, CycleStatus::NoActivePlaylist);
        assert_eq!(
            meta.last_error.as_ref().map(|f| f.kind),
            Some(FaultKind::NoActivePlaylist)
        );
    }

    #[test]
    fn test_fault_kind_serialization() {
        let json = serde_json::to_string(&FaultKind::DimensionMismatch).unwrap();
        assert_eq!(json, "\"dimension_mismatch\"");
    }
}
