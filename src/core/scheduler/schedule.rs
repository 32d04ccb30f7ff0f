// Host cron strings.
//
//   EVERY:10m            every 10 minutes, aligned to the epoch
//   EVERY:2h             every 2 hours
//   WEEKDAYS:MO:FR/09:00 at 09:00 local time on Monday..Friday
//
// Local time is the bot's configured zone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

use crate::core::reports::report_models::parse_weekday;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleParseError {
    #[error("unknown schedule kind in '{0}'")]
    UnknownKind(String),
    #[error("invalid interval in '{0}', expected e.g. 10m or 2h")]
    Interval(String),
    #[error("invalid weekday range in '{0}', expected e.g. MO:FR")]
    Weekdays(String),
    #[error("invalid time in '{0}', expected HH:MM")]
    Time(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleWhen {
    Every { minutes: u32 },
    Weekdays {
        from: Weekday,
        to: Weekday,
        at: NaiveTime,
    },
}

fn day_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

impl FromStr for ScheduleWhen {
    type Err = ScheduleParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if let Some(interval) = s.strip_prefix("EVERY:") {
            let bad = || ScheduleParseError::Interval(raw.to_string());
            let unit_at = interval.len().saturating_sub(1);
            if !interval.is_char_boundary(unit_at) {
                return Err(bad());
            }
            let (num, unit) = interval.split_at(unit_at);
            let n: u32 = num.parse().map_err(|_| bad())?;
            let minutes = match unit {
                "m" => n,
                "h" => n.checked_mul(60).ok_or_else(bad)?,
                _ => return Err(bad()),
            };
            if minutes == 0 {
                return Err(bad());
            }
            return Ok(ScheduleWhen::Every { minutes });
        }
        if let Some(rest) = s.strip_prefix("WEEKDAYS:") {
            let (days, time) = rest
                .split_once('/')
                .ok_or_else(|| ScheduleParseError::Time(raw.to_string()))?;
            let (from, to) = days
                .split_once(':')
                .and_then(|(a, b)| Some((parse_weekday(a)?, parse_weekday(b)?)))
                .ok_or_else(|| ScheduleParseError::Weekdays(raw.to_string()))?;
            let at = NaiveTime::parse_from_str(time, "%H:%M")
                .map_err(|_| ScheduleParseError::Time(raw.to_string()))?;
            return Ok(ScheduleWhen::Weekdays { from, to, at });
        }
        Err(ScheduleParseError::UnknownKind(raw.to_string()))
    }
}

impl fmt::Display for ScheduleWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleWhen::Every { minutes } if minutes % 60 == 0 => {
                write!(f, "EVERY:{}h", minutes / 60)
            }
            ScheduleWhen::Every { minutes } => write!(f, "EVERY:{}m", minutes),
            ScheduleWhen::Weekdays { from, to, at } => write!(
                f,
                "WEEKDAYS:{}:{}/{}",
                day_code(*from),
                day_code(*to),
                at.format("%H:%M")
            ),
        }
    }
}

/// Inclusive range check that also handles wrapping ranges like FR:MO.
fn day_in_range(day: Weekday, from: Weekday, to: Weekday) -> bool {
    let d = day.num_days_from_monday();
    let (a, b) = (from.num_days_from_monday(), to.num_days_from_monday());
    if a <= b {
        (a..=b).contains(&d)
    } else {
        d >= a || d <= b
    }
}

impl ScheduleWhen {
    /// Whether the schedule fires in the minute containing `instant`.
    pub fn matches(&self, instant: DateTime<Utc>, tz: Tz) -> bool {
        match *self {
            ScheduleWhen::Every { minutes } => {
                (instant.timestamp().div_euclid(60)) % i64::from(minutes) == 0
            }
            ScheduleWhen::Weekdays { from, to, at } => {
                let local = instant.with_timezone(&tz);
                day_in_range(local.weekday(), from, to)
                    && local.hour() == at.hour()
                    && local.minute() == at.minute()
            }
        }
    }

    /// First firing strictly after `instant`.
    pub fn next_after(&self, instant: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        match *self {
            ScheduleWhen::Every { minutes } => {
                let period = i64::from(minutes) * 60;
                let next = (instant.timestamp().div_euclid(period) + 1) * period;
                Utc.timestamp_opt(next, 0).single()
            }
            ScheduleWhen::Weekdays { from, to, at } => {
                let start = instant.with_timezone(&tz).date_naive();
                // Two weeks covers any range plus DST gaps.
                (0..15).find_map(|offset| {
                    let date = start + Duration::days(offset);
                    if !day_in_range(date.weekday(), from, to) {
                        return None;
                    }
                    let local = tz.from_local_datetime(&date.and_time(at)).earliest()?;
                    let utc = local.with_timezone(&Utc);
                    (utc > instant).then_some(utc)
                })
            }
        }
    }
}
