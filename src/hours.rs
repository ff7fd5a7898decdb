//! Operating hours policy
//!
//! Pure function of an instant: the instant is shifted by a fixed UTC offset
//! into business-local time and checked against a per-weekday window table.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HoursError {
    #[error("Invalid UTC offset: {0} (expected +HH:MM or -HH:MM)")]
    InvalidOffset(String),
    #[error("Invalid schedule entry: {0}")]
    InvalidSchedule(String),
}

/// Opening window for one weekday; `close` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl DayWindow {
    fn contains(&self, time: NaiveTime) -> bool {
        time >= self.open && time < self.close
    }
}

/// Weekly opening table in business-local time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatingHours {
    offset: FixedOffset,
    /// Indexed by days from Monday
    windows: [Option<DayWindow>; 7],
}

impl OperatingHours {
    /// Always-closed table for the given offset
    pub fn closed(offset: FixedOffset) -> Self {
        Self {
            offset,
            windows: [None; 7],
        }
    }

    pub fn with_window(mut self, day: Weekday, open: NaiveTime, close: NaiveTime) -> Self {
        self.windows[day.num_days_from_monday() as usize] = Some(DayWindow { open, close });
        self
    }

    /// Same local windows, different zone
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn window(&self, day: Weekday) -> Option<DayWindow> {
        self.windows[day.num_days_from_monday() as usize]
    }

    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.offset);
        self.window(local.weekday())
            .is_some_and(|w| w.contains(local.time()))
    }

    /// Parse a table like `mon-sat=11:00-22:00;sun=13:00-22:00`.
    /// Days not mentioned are closed.
    pub fn parse(offset: FixedOffset, schedule: &str) -> Result<Self, HoursError> {
        let mut hours = Self::closed(offset);
        for entry in schedule.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = || HoursError::InvalidSchedule(entry.to_string());
            let (days, times) = entry.split_once('=').ok_or_else(invalid)?;
            let (open, close) = times.split_once('-').ok_or_else(invalid)?;
            let open = NaiveTime::parse_from_str(open.trim(), "%H:%M").map_err(|_| invalid())?;
            let close = NaiveTime::parse_from_str(close.trim(), "%H:%M").map_err(|_| invalid())?;
            if close <= open {
                return Err(invalid());
            }
            for day in parse_day_range(days.trim()).ok_or_else(invalid)? {
                hours = hours.with_window(day, open, close);
            }
        }
        Ok(hours)
    }
}

fn parse_day(s: &str) -> Option<Weekday> {
    s.parse::<Weekday>().ok()
}

fn parse_day_range(s: &str) -> Option<Vec<Weekday>> {
    match s.split_once('-') {
        Some((from, to)) => {
            let (from, to) = (parse_day(from.trim())?, parse_day(to.trim())?);
            let mut days = vec![from];
            let mut day = from;
            while day != to {
                day = day.succ();
                days.push(day);
            }
            Some(days)
        }
        None => parse_day(s).map(|d| vec![d]),
    }
}

/// Parse `-05:00` / `+01:30` / `Z`
pub fn parse_offset(s: &str) -> Result<FixedOffset, HoursError> {
    let invalid = || HoursError::InvalidOffset(s.to_string());
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let mut chars = s.chars();
    let sign = match chars.next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Err(invalid()),
    };
    let (h, m) = chars.as_str().split_once(':').ok_or_else(invalid)?;
    let h: i32 = h.parse().map_err(|_| invalid())?;
    let m: i32 = m.parse().map_err(|_| invalid())?;
    if !(0..60).contains(&m) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (h * 3600 + m * 60)).ok_or_else(invalid)
}

impl Default for OperatingHours {
    /// Monday to Saturday 11:00-22:00, Sunday 13:00-22:00, at UTC-5
    fn default() -> Self {
        let offset = FixedOffset::west_opt(5 * 3600).expect("UTC-5 is a valid offset");
        let at = |h| NaiveTime::from_hms_opt(h, 0, 0).expect("whole hour is a valid time");
        let mut hours = Self::closed(offset);
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ] {
            hours = hours.with_window(day, at(11), at(22));
        }
        hours.with_window(Weekday::Sun, at(13), at(22))
    }
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
