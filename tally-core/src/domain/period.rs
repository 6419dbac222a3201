//! Reporting periods, month keys and request window resolution

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};

use super::result::{Error, Result};

/// Inclusive `[start, end]` window with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Period {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange {
                from: start.to_string(),
                to: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Whole days `[first 00:00:00.000, last 23:59:59.999]`
    pub fn days(first: NaiveDate, last: NaiveDate) -> Result<Self> {
        if first > last {
            return Err(Error::InvalidRange {
                from: first.to_string(),
                to: last.to_string(),
            });
        }
        Ok(Self {
            start: day_start(first),
            end: day_end(last),
        })
    }

    /// January 1st through December 31st of `year`
    pub fn calendar_year(year: i32) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| Error::InvalidDate(format!("year {year} is out of range")))?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| Error::InvalidDate(format!("year {year} is out of range")))?;
        Self::days(first, last)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// The comparison window: same length, ending on the day before `start`.
    pub fn previous(&self) -> Result<Period> {
        let out_of_range =
            || Error::InvalidDate(format!("no comparison window before {}", self.start.date()));
        let before = self
            .start
            .checked_sub_signed(Duration::milliseconds(1))
            .ok_or_else(out_of_range)?;
        let prev_end = day_end(before.date());
        let prev_start = prev_end
            .checked_sub_signed(self.duration())
            .ok_or_else(out_of_range)?;
        Ok(Period {
            start: day_start(prev_start.date()),
            end: prev_end,
        })
    }

    /// Every calendar month touched by the window, oldest first. Never empty.
    pub fn months(&self) -> Vec<MonthKey> {
        let last = MonthKey::of(self.end);
        let mut months = Vec::new();
        let mut month = MonthKey::of(self.start);
        while month <= last {
            months.push(month);
            month = month.next();
        }
        months
    }

    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.date().format("%Y-%m-%d"),
            self.end.date().format("%Y-%m-%d")
        )
    }
}

pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

pub fn day_end(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| day_start(date))
}

/// Calendar month, ordered chronologically and rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(instant: NaiveDateTime) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How the end of a request window is normalized.
///
/// Callers pick one explicitly; the two are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// End is always pushed to 23:59:59.999 of its day.
    DayBounds,
    /// Default window ends at the current instant (dashboard view).
    UntilNow,
}

/// A request window together with its comparison window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPeriod {
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub prev_start: NaiveDateTime,
    pub prev_end: NaiveDateTime,
    pub label: String,
}

impl ResolvedPeriod {
    pub fn current(&self) -> Period {
        Period {
            start: self.period_start,
            end: self.period_end,
        }
    }

    pub fn previous(&self) -> Period {
        Period {
            start: self.prev_start,
            end: self.prev_end,
        }
    }
}

/// Resolve optional `from`/`to` request parameters into a window.
///
/// - both given: `from <= to` or `InvalidRange`
/// - one given: that single day
/// - neither: first day of the current month up to today (or `now`)
pub fn resolve_period(
    from: Option<&str>,
    to: Option<&str>,
    mode: ResolutionMode,
    now: NaiveDateTime,
) -> Result<ResolvedPeriod> {
    let from = from.map(|raw| parse_date("from", raw)).transpose()?;
    let to = to.map(|raw| parse_date("to", raw)).transpose()?;

    let current = match (from, to) {
        (Some(from), Some(to)) => Period::days(from, to)?,
        (Some(day), None) | (None, Some(day)) => Period::days(day, day)?,
        (None, None) => {
            let today = now.date();
            let first = today.with_day(1).unwrap_or(today);
            match mode {
                ResolutionMode::DayBounds => Period::days(first, today)?,
                ResolutionMode::UntilNow => Period::new(day_start(first), now)?,
            }
        }
    };

    let previous = current.previous()?;
    Ok(ResolvedPeriod {
        period_start: current.start,
        period_end: current.end,
        prev_start: previous.start,
        prev_end: previous.end,
        label: current.label(),
    })
}

/// Parse an ISO date (`2024-01-31`) or an ISO timestamp, keeping the date.
///
/// Years outside 1..=9999 are rejected even though chrono parses them.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let parsed = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        });
    match parsed {
        Some(date) if (1..=9999).contains(&date.year()) => Ok(date),
        _ => Err(Error::InvalidDate(format!(
            "{field} must be an ISO date (YYYY-MM-DD), got '{raw}'"
        ))),
    }
}

/// Parse the `year` request parameter.
pub fn parse_year(raw: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|year| (1..=9999).contains(year))
        .ok_or_else(|| Error::InvalidDate(format!("year must be a four-digit year, got '{raw}'")))
}

/// Parse a stored date attribute into an instant.
///
/// Accepts the shapes collections actually hold: plain dates, naive
/// timestamps with `T` or space separators, and RFC 3339. Stored instants
/// are wall-clock times, so an RFC 3339 offset is dropped rather than
/// converted to UTC; period bounds are wall-clock times too.
pub fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(day_start(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        date(2024, 3, 15).and_hms_opt(10, 30, 0).unwrap()
    }

    #[test]
    fn test_both_bounds_are_day_normalized() {
        let resolved =
            resolve_period(Some("2024-01-01"), Some("2024-01-31"), ResolutionMode::DayBounds, now())
                .unwrap();
        assert_eq!(resolved.period_start, day_start(date(2024, 1, 1)));
        assert_eq!(
            resolved.period_end,
            date(2024, 1, 31).and_hms_milli_opt(23, 59, 59, 999).unwrap()
        );
        assert_eq!(resolved.label, "2024-01-01 to 2024-01-31");
    }

    #[test]
    fn test_from_after_to_is_invalid_range() {
        let err =
            resolve_period(Some("2024-02-01"), Some("2024-01-01"), ResolutionMode::DayBounds, now())
                .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn test_single_bound_is_single_day() {
        for (from, to) in [(Some("2024-02-10"), None), (None, Some("2024-02-10"))] {
            let resolved = resolve_period(from, to, ResolutionMode::DayBounds, now()).unwrap();
            assert_eq!(resolved.period_start, day_start(date(2024, 2, 10)));
            assert_eq!(resolved.period_end, day_end(date(2024, 2, 10)));
        }
    }

    #[test]
    fn test_default_window_depends_on_mode() {
        let kpi = resolve_period(None, None, ResolutionMode::DayBounds, now()).unwrap();
        assert_eq!(kpi.period_start, day_start(date(2024, 3, 1)));
        assert_eq!(kpi.period_end, day_end(date(2024, 3, 15)));

        let dashboard = resolve_period(None, None, ResolutionMode::UntilNow, now()).unwrap();
        assert_eq!(dashboard.period_start, day_start(date(2024, 3, 1)));
        assert_eq!(dashboard.period_end, now());
    }

    #[test]
    fn test_previous_period_has_same_duration_and_no_overlap() {
        let windows = [
            (date(2024, 1, 1), date(2024, 1, 31)),
            (date(2024, 3, 1), date(2024, 3, 1)),
            (date(2023, 11, 15), date(2024, 2, 29)),
        ];
        for (first, last) in windows {
            let period = Period::days(first, last).unwrap();
            let previous = period.previous().unwrap();
            assert_eq!(previous.duration(), period.duration());
            assert!(previous.end < period.start);
            assert_eq!(previous.end + Duration::milliseconds(1), period.start);
        }
    }

    #[test]
    fn test_previous_of_january() {
        let previous = Period::days(date(2024, 1, 1), date(2024, 1, 31))
            .unwrap()
            .previous()
            .unwrap();
        assert_eq!(previous.start, day_start(date(2023, 12, 1)));
        assert_eq!(previous.end, day_end(date(2023, 12, 31)));
    }

    #[test]
    fn test_months_inclusive_and_never_empty() {
        let same_month = Period::days(date(2024, 5, 3), date(2024, 5, 20)).unwrap();
        assert_eq!(same_month.months(), vec![MonthKey::new(2024, 5).unwrap()]);

        let across_year = Period::days(date(2023, 11, 30), date(2024, 2, 1)).unwrap();
        let keys: Vec<String> = across_year.months().iter().map(|m| m.to_string()).collect();
        assert_eq!(keys, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn test_calendar_year_has_twelve_months() {
        let year = Period::calendar_year(2024).unwrap();
        assert_eq!(year.months().len(), 12);
    }

    #[test]
    fn test_parse_date_accepts_timestamps() {
        assert_eq!(parse_date("from", "2024-01-05T08:00:00Z").unwrap(), date(2024, 1, 5));
        assert!(matches!(parse_date("from", "05/01/2024"), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_parse_instant_shapes() {
        assert_eq!(parse_instant("2024-01-05"), Some(day_start(date(2024, 1, 5))));
        assert_eq!(
            parse_instant("2024-01-05 13:45:00"),
            Some(date(2024, 1, 5).and_hms_opt(13, 45, 0).unwrap())
        );
        assert_eq!(parse_instant("not a date"), None);
    }

    #[test]
    fn test_parse_date_rejects_extended_years() {
        for raw in ["-262143-01-01", "0000-06-01", "+10000-01-01", "-0001-12-31T00:00:00"] {
            assert!(matches!(parse_date("from", raw), Err(Error::InvalidDate(_))), "{raw}");
        }
        assert_eq!(parse_date("from", "0001-01-01").unwrap(), date(1, 1, 1));
        assert_eq!(parse_date("to", "9999-12-31").unwrap(), date(9999, 12, 31));
    }

    #[test]
    fn test_extreme_windows_resolve_without_overflow() {
        let err = resolve_period(Some("-262143-01-01"), Some("2024-01-01"), ResolutionMode::DayBounds, now())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)));

        let widest =
            resolve_period(Some("0001-01-01"), Some("9999-12-31"), ResolutionMode::DayBounds, now())
                .unwrap();
        assert!(widest.prev_end < widest.period_start);

        assert_eq!(
            day_end(NaiveDate::MAX),
            NaiveDate::MAX.and_hms_milli_opt(23, 59, 59, 999).unwrap()
        );
        let earliest = Period::days(NaiveDate::MIN, NaiveDate::MIN).unwrap();
        assert!(matches!(earliest.previous(), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_parse_instant_keeps_wall_clock_of_offset() {
        assert_eq!(
            parse_instant("2024-01-31T23:30:00+02:00"),
            Some(date(2024, 1, 31).and_hms_opt(23, 30, 0).unwrap())
        );
        assert_eq!(
            parse_instant("2024-02-01T00:15:00-05:00"),
            Some(date(2024, 2, 1).and_hms_opt(0, 15, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(" 2024 ").unwrap(), 2024);
        assert!(matches!(parse_year("twenty"), Err(Error::InvalidDate(_))));
        assert!(matches!(parse_year("0"), Err(Error::InvalidDate(_))));
    }
}
