//! Ranking windows and their start instants

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::fmt;

/// Time window a ranking covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardWindow {
    /// Since the most recent Monday 00:00, local time
    Weekly,
    /// Since the first day of the month 00:00, local time
    Monthly,
    /// All time
    Total,
}

impl LeaderboardWindow {
    pub const ALL: [LeaderboardWindow; 3] = [Self::Weekly, Self::Monthly, Self::Total];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Total => "total",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Some(Self::Weekly),
            "monthly" | "month" => Some(Self::Monthly),
            "total" | "all" => Some(Self::Total),
            _ => None,
        }
    }
}

impl fmt::Display for LeaderboardWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start instants of every window, fixed at one `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub week: DateTime<Utc>,
    pub month: DateTime<Utc>,
    pub total: DateTime<Utc>,
}

impl WindowBounds {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            week: week_start(now),
            month: month_start(now),
            // Unix epoch
            total: DateTime::<Utc>::default(),
        }
    }

    pub fn start_of(&self, window: LeaderboardWindow) -> DateTime<Utc> {
        match window {
            LeaderboardWindow::Weekly => self.week,
            LeaderboardWindow::Monthly => self.month,
            LeaderboardWindow::Total => self.total,
        }
    }
}

/// Most recent Monday (today included) at midnight in `now`'s zone
pub fn week_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    local_midnight(&now.timezone(), monday)
}

/// First day of `now`'s month at midnight in `now`'s zone
pub fn month_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    local_midnight(&now.timezone(), first)
}

/// Midnight can be skipped by a DST change; the earliest valid instant
/// wins, else the wall time is read as UTC
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = NaiveDateTime::new(date, NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_week_start_midweek() {
        // Wednesday
        let now = utc(2024, 5, 15, 13);
        assert_eq!(week_start(&now), utc(2024, 5, 13, 0));
    }

    #[test]
    fn test_week_start_on_monday_is_today() {
        let now = utc(2024, 5, 13, 9);
        assert_eq!(week_start(&now), utc(2024, 5, 13, 0));
    }

    #[test]
    fn test_week_start_crosses_month() {
        // Sunday 2 June; Monday is 27 May
        let now = utc(2024, 6, 2, 23);
        assert_eq!(week_start(&now), utc(2024, 5, 27, 0));
    }

    #[test]
    fn test_month_start() {
        assert_eq!(month_start(&utc(2024, 2, 29, 18)), utc(2024, 2, 1, 0));
    }

    #[test]
    fn test_local_zone_offset_applied() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        // Wednesday 15 May 10:00 +09:00
        let now = tz.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap();
        // Monday 13 May 00:00 +09:00 is 12 May 15:00 UTC
        assert_eq!(week_start(&now), utc(2024, 5, 12, 15));
    }

    #[test]
    fn test_bounds_total_is_epoch() {
        let bounds = WindowBounds::at(&utc(2024, 5, 15, 13));
        assert_eq!(bounds.start_of(LeaderboardWindow::Total).timestamp(), 0);
        assert_eq!(bounds.start_of(LeaderboardWindow::Monthly), utc(2024, 5, 1, 0));
    }

    #[test]
    fn test_window_parse() {
        assert_eq!(LeaderboardWindow::parse("Weekly"), Some(LeaderboardWindow::Weekly));
        assert_eq!(LeaderboardWindow::parse("all"), Some(LeaderboardWindow::Total));
        assert_eq!(LeaderboardWindow::parse("daily"), None);
    }
}
