//! Server maintenance windows.
//!
//! Core suppresses server alerts while a maintenance window is active. The
//! same check is exposed here so clients can tell ahead of time whether a
//! server is expected to be down.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A recurring or one-off period where a server is expected to be unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub schedule_type: MaintenanceScheduleType,
    /// Start hour in 24-hour format (0-23)
    pub hour: u8,
    /// Start minute (0-59)
    pub minute: u8,
    /// A day (1440) or more covers the whole scheduled day.
    pub duration_minutes: u32,
    /// IANA name (`Europe/Berlin`) or fixed offset (`+02:00`).
    /// Empty falls back to the default timezone.
    #[serde(default)]
    pub timezone: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const MINUTES_PER_DAY: u32 = 24 * 60;

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum MaintenanceScheduleType {
    Daily,
    Weekly { day_of_week: DayOfWeek },
    /// `date` is `YYYY-MM-DD`.
    OneTime { date: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Timezone a window is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowTimezone {
    /// The host's local timezone.
    Local,
    Named(chrono_tz::Tz),
    Fixed(FixedOffset),
}

impl WindowTimezone {
    /// Parse an IANA name or a `+HH:MM` / `-HH:MM` offset.
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        let value = value.trim();
        if let Some(offset) = parse_fixed_offset(value) {
            return Ok(Self::Fixed(offset));
        }
        value
            .parse::<chrono_tz::Tz>()
            .map(Self::Named)
            .map_err(|e| anyhow::anyhow!("Failed to parse timezone '{}': {}", value, e))
    }

    /// Resolve the zone for a window: its own timezone first, then the default,
    /// then the host's local zone.
    pub fn resolve(window_timezone: &str, default_timezone: &str) -> anyhow::Result<Self> {
        match (window_timezone.trim(), default_timezone.trim()) {
            ("", "") => Ok(Self::Local),
            ("", timezone) | (timezone, _) => Self::parse(timezone),
        }
    }

    fn localize(&self, dt: DateTime<Utc>) -> (NaiveTime, Weekday, NaiveDate) {
        fn parts<Tz: TimeZone>(dt: DateTime<Tz>) -> (NaiveTime, Weekday, NaiveDate) {
            (dt.time(), dt.weekday(), dt.date_naive())
        }
        match self {
            Self::Local => parts(dt.with_timezone(&Local)),
            Self::Named(tz) => parts(dt.with_timezone(tz)),
            Self::Fixed(offset) => parts(dt.with_timezone(offset)),
        }
    }
}

fn parse_fixed_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60) as i32)
}

impl MaintenanceWindow {
    /// Check whether the window is active at `timestamp` (unix ms).
    ///
    /// `default_timezone` applies when the window has none of its own.
    /// An unparseable timezone makes the window inactive.
    pub fn is_active_at(&self, timestamp: i64, default_timezone: &str) -> bool {
        if !self.enabled {
            return false;
        }

        let timezone = match WindowTimezone::resolve(&self.timezone, default_timezone) {
            Ok(timezone) => timezone,
            Err(e) => {
                warn!(window = %self.name, "Failed to parse maintenance window timezone: {e:#}");
                return false;
            }
        };

        let dt = DateTime::from_timestamp_millis(timestamp).unwrap_or_else(Utc::now);
        let (local_time, local_weekday, local_date) = timezone.localize(dt);

        match &self.schedule_type {
            MaintenanceScheduleType::Daily => self.is_time_in_window(local_time),
            MaintenanceScheduleType::Weekly { day_of_week } => {
                DayOfWeek::from(local_weekday) == *day_of_week
                    && self.is_time_in_window(local_time)
            }
            MaintenanceScheduleType::OneTime { date } => {
                match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                    Ok(maintenance_date) => {
                        local_date == maintenance_date && self.is_time_in_window(local_time)
                    }
                    Err(_) => false,
                }
            }
        }
    }

    /// Both bounds are inclusive. Windows ending past midnight wrap around.
    /// An out of range start time is treated as 00:00.
    fn is_time_in_window(&self, current_time: NaiveTime) -> bool {
        if self.duration_minutes >= MINUTES_PER_DAY {
            return true;
        }

        let start_time = NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0)
            .unwrap_or_default();

        let end_time = start_time + chrono::Duration::minutes(self.duration_minutes as i64);

        if end_time < start_time {
            current_time >= start_time || current_time <= end_time
        } else {
            current_time >= start_time && current_time <= end_time
        }
    }
}

/// Windows active at `timestamp`.
pub fn active_windows<'a>(
    windows: &'a [MaintenanceWindow],
    timestamp: i64,
    default_timezone: &str,
) -> Vec<&'a MaintenanceWindow> {
    windows
        .iter()
        .filter(|window| window.is_active_at(timestamp, default_timezone))
        .collect()
}

pub fn is_in_maintenance(
    windows: &[MaintenanceWindow],
    timestamp: i64,
    default_timezone: &str,
) -> bool {
    windows
        .iter()
        .any(|window| window.is_active_at(timestamp, default_timezone))
}
