//! Time-of-day values and daily active windows

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Minutes in a day; also the value of the `24:00` end-of-day bound
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A wall-clock time of day with minute resolution
///
/// Serialized as `"HH:MM"`. `"24:00"` is accepted so a window can end at
/// midnight of the following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Midnight at the start of the day
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    /// Midnight at the end of the day
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(MINUTES_PER_DAY);

    /// Build from hours and minutes. Returns `None` outside `00:00..=24:00`.
    pub fn new(hours: u16, minutes: u16) -> Option<Self> {
        if minutes >= 60 {
            return None;
        }
        let total = hours.checked_mul(60)?.checked_add(minutes)?;
        if total > MINUTES_PER_DAY {
            return None;
        }
        Some(Self(total))
    }

    /// Build from minutes since midnight
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Error returned when a `"HH:MM"` string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeError(pub String);

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time of day '{}', expected HH:MM", self.0)
    }
}

impl std::error::Error for ParseTimeError {}

impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimeError(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        let hours = h.parse::<u16>().map_err(|_| err())?;
        let minutes = m.parse::<u16>().map_err(|_| err())?;
        TimeOfDay::new(hours, minutes).ok_or_else(err)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Daily window during which a playlist may be selected
///
/// Membership is half-open, `[start, end)`. A window whose start is later
/// than its end wraps past midnight, so `22:00-06:00` covers the night.
/// Equal bounds, or `00:00-24:00`, cover the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl ActiveWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Window covering the whole day
    pub fn all_day() -> Self {
        Self::new(TimeOfDay::MIDNIGHT, TimeOfDay::END_OF_DAY)
    }

    /// Parse a pair of `"HH:MM"` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, ParseTimeError> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }

    /// Check whether `time` falls inside the window
    pub fn contains(&self, time: TimeOfDay) -> bool {
        let t = time.minutes() % MINUTES_PER_DAY;
        let start = self.start.minutes() % MINUTES_PER_DAY;
        let end = self.end.minutes() % MINUTES_PER_DAY;

        if start == end {
            true
        } else if start < end {
            start <= t && t < end
        } else {
            t >= start || t < end
        }
    }

    /// Length of the window in minutes
    pub fn span_minutes(&self) -> u16 {
        let start = self.start.minutes();
        let end = self.end.minutes();
        if start == end || (start == 0 && end == MINUTES_PER_DAY) {
            MINUTES_PER_DAY
        } else if start < end {
            end - start
        } else {
            MINUTES_PER_DAY - start + end
        }
    }
}

impl fmt::Display for ActiveWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_format() {
        assert_eq!(t("06:30").minutes(), 390);
        assert_eq!(t("24:00"), TimeOfDay::END_OF_DAY);
        assert_eq!(t("7:05").to_string(), "07:05");
        assert!("24:01".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_overnight_window() {
        let night = ActiveWindow::parse("22:00", "06:00").unwrap();
        assert!(night.contains(t("23:30")));
        assert!(night.contains(t("02:00")));
        assert!(night.contains(t("22:00")));
        assert!(!night.contains(t("06:00")));
        assert!(!night.contains(t("12:00")));
        assert_eq!(night.span_minutes(), 8 * 60);
    }

    #[test]
    fn test_daytime_window_is_half_open() {
        let day = ActiveWindow::parse("06:00", "22:00").unwrap();
        assert!(day.contains(t("06:00")));
        assert!(day.contains(t("21:59")));
        assert!(!day.contains(t("22:00")));
        assert!(!day.contains(t("03:00")));
    }

    #[test]
    fn test_whole_day_windows() {
        let all = ActiveWindow::all_day();
        assert!(all.contains(t("00:00")));
        assert!(all.contains(t("23:59")));
        assert_eq!(all.span_minutes(), MINUTES_PER_DAY);

        let same = ActiveWindow::parse("08:00", "08:00").unwrap();
        assert!(same.contains(t("03:00")));
    }

    #[test]
    fn test_window_serialization() {
        let window = ActiveWindow::parse("22:00", "06:00").unwrap();
        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(json, r#"{"start":"22:00","end":"06:00"}"#);

        let back: ActiveWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, window);
    }
}
