//! Configured plugin instances

use crate::refresh::CycleFault;
use crate::time_window::{TimeOfDay, MINUTES_PER_DAY};
use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque plugin settings, passed to the plugin untouched
pub type Settings = Map<String, Value>;

/// When an instance's content goes stale
///
/// Serialized as `"always"`, `{"interval": 900}` or `{"scheduled": "07:30"}`.
/// Between refreshes the last rendered frame is shown again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Render on every cycle
    #[default]
    Always,
    /// Render again once this many seconds passed since the last render
    Interval(u64),
    /// Render once a day, at the first cycle after this local time
    Scheduled(TimeOfDay),
}

impl RefreshPolicy {
    /// Whether content last rendered at `latest` must be rendered again at `now`
    pub fn is_due<Tz: TimeZone>(
        &self,
        latest: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> bool {
        let Some(latest) = latest else {
            return true;
        };
        match *self {
            RefreshPolicy::Always => true,
            RefreshPolicy::Interval(secs) => i64::try_from(secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .map_or(false, |interval| now.signed_duration_since(latest) >= interval),
            RefreshPolicy::Scheduled(at) => {
                let seconds = u32::from(at.minutes() % MINUTES_PER_DAY) * 60;
                let Some(time) = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0) else {
                    return true;
                };
                let now_local = now.with_timezone(tz).naive_local();
                // most recent occurrence of `at`, today or yesterday
                let mut occurrence = now_local.date().and_time(time);
                if occurrence > now_local {
                    occurrence -= TimeDelta::days(1);
                }
                latest.with_timezone(tz).naive_local() < occurrence
            }
        }
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPolicy::Always => write!(f, "every cycle"),
            RefreshPolicy::Interval(secs) => write!(f, "every {}s", secs),
            RefreshPolicy::Scheduled(at) => write!(f, "daily at {}", at),
        }
    }
}

/// A named, configured use of a plugin inside a playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInstance {
    /// Unique within the owning playlist
    pub name: String,
    /// Identifier of a registered plugin
    pub plugin_id: String,
    #[serde(default)]
    pub settings: Settings,
    /// Seconds to keep this instance on screen before the next cycle.
    /// Falls back to the playlist, then the global interval.
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
    /// When to render fresh content instead of reusing the last frame
    #[serde(default)]
    pub refresh: RefreshPolicy,
    /// Last successful render
    #[serde(default)]
    pub latest_refresh: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<CycleFault>,
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl PluginInstance {
    pub fn new(name: impl Into<String>, plugin_id: impl Into<String>, settings: Settings) -> Self {
        Self {
            name: name.into(),
            plugin_id: plugin_id.into(),
            settings,
            refresh_interval_secs: None,
            refresh: RefreshPolicy::Always,
            latest_refresh: None,
            last_error: None,
            consecutive_failures: 0,
        }
    }

    pub fn with_refresh_interval(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = Some(secs);
        self
    }

    pub fn with_refresh_policy(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// A cycle showed this instance; `rendered_at` is set when fresh content was rendered
    pub fn record_success(&mut self, rendered_at: Option<DateTime<Utc>>) {
        if let Some(at) = rendered_at {
            self.latest_refresh = Some(at);
        }
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, fault: CycleFault) {
        self.last_error = Some(fault);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}
