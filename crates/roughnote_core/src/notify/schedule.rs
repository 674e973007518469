//! Calendar arithmetic behind the notification triggers.
//!
//! All comparisons happen on local wall time (`NaiveDateTime` in the offset
//! of `now`), matching how routines and birthdays are entered.

use crate::model::modules::RepeatOption;
use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc,
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const REMIND_AT_LOCAL_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
/// Format used when writing a rescheduled `remind_at`.
pub const REMIND_AT_WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parses a reminder time as local wall time in the offset of `now`.
///
/// Accepts RFC 3339 instants and zone-less local timestamps.
pub fn parse_remind_at(value: &str, now: &DateTime<FixedOffset>) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(now.offset()).naive_local());
    }
    REMIND_AT_LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Returns whether `stamp` falls on the same local calendar day as `now`.
pub fn is_same_local_day(stamp: &DateTime<Utc>, now: &DateTime<FixedOffset>) -> bool {
    stamp.with_timezone(now.offset()).date_naive() == now.date_naive()
}

/// Local time at which a routine starting at `start` on `day` should alert.
pub fn routine_alert_time(day: NaiveDate, start: NaiveTime, remind_before_minutes: u32) -> NaiveDateTime {
    day.and_time(start) - chrono::Duration::minutes(i64::from(remind_before_minutes))
}

/// The next birthday relative to `now`, as seen by the birthday trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingBirthday {
    pub date: NaiveDate,
    pub age: i32,
    /// Whole days until `date`, rounded up. `0` on the day itself.
    pub days_until: i64,
}

impl UpcomingBirthday {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Computes the upcoming birthday for `dob`.
///
/// This year's date is used unless it lies more than one day in the past,
/// in which case next year's is used. Feb 29 resolves to Mar 1 in non-leap
/// years.
pub fn upcoming_birthday(dob: NaiveDate, now: &DateTime<FixedOffset>) -> UpcomingBirthday {
    let now_local = now.naive_local();
    let midnight = |year: i32| birthday_in_year(dob, year).and_time(NaiveTime::MIN);

    let mut next = midnight(now_local.year());
    if (next - now_local).num_milliseconds() < -DAY_MS {
        next = midnight(now_local.year() + 1);
    }

    let diff_ms = (next - now_local).num_milliseconds();
    let days_until = (diff_ms as f64 / DAY_MS as f64).ceil() as i64;

    UpcomingBirthday {
        date: next.date(),
        age: next.year() - dob.year(),
        days_until,
    }
}

fn birthday_in_year(dob: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, dob.month(), dob.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(dob)
}

/// First occurrence of a repeating reminder strictly after `now_local`.
///
/// Occurrences are computed from `base` (not chained) so month-end dates do
/// not drift. Returns `None` for non-repeating reminders.
pub fn next_occurrence(
    base: NaiveDateTime,
    repeat: RepeatOption,
    now_local: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let nth = |n: u32| -> Option<NaiveDateTime> {
        match repeat {
            RepeatOption::None => None,
            RepeatOption::Daily => base.checked_add_days(Days::new(u64::from(n))),
            RepeatOption::Weekly => base.checked_add_days(Days::new(7 * u64::from(n))),
            RepeatOption::Monthly => base.checked_add_months(Months::new(n)),
            RepeatOption::Yearly => base.checked_add_months(Months::new(12 * n)),
        }
    };

    let mut n = 1;
    if matches!(repeat, RepeatOption::Daily | RepeatOption::Weekly) && now_local > base {
        // Jump close to `now` instead of stepping one day at a time.
        let step_days = if repeat == RepeatOption::Daily { 1 } else { 7 };
        let elapsed_days = (now_local - base).num_days();
        n = u32::try_from(elapsed_days / step_days).ok()?.max(1);
    }

    loop {
        let candidate = nth(n)?;
        if candidate > now_local {
            return Some(candidate);
        }
        n = n.checked_add(1)?;
    }
}
