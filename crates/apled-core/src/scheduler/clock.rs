// Wall-clock arithmetic for weekly edges
//
// Timers sleep on the monotonic clock, but *when* an edge is due is a
// wall-clock question: "next Monday 07:00 local". These helpers answer it
// for any `TimeZone` so they can be exercised against fixed offsets.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone};

use crate::model::DayOfWeek;

/// Source of "now" in local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Local>>);

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Next instant strictly after `now` that falls on `day` at `secs` past
/// local midnight.
///
/// The offset from today is `(day - today) mod 7`; if that instant is not
/// in the future (same weekday, time already passed) it moves a week out.
pub fn next_fire<Tz: TimeZone>(now: &DateTime<Tz>, day: DayOfWeek, secs: u32) -> DateTime<Tz> {
    let target = chrono::Weekday::from(day).num_days_from_monday();
    let today = now.weekday().num_days_from_monday();
    let offset = (target + 7 - today) % 7;

    let date = now.date_naive() + Days::new(offset.into());
    let candidate = at_time_of_day(&now.timezone(), date, secs);
    if candidate > *now {
        candidate
    } else {
        at_time_of_day(&now.timezone(), date + Days::new(7), secs)
    }
}

/// Local midnight of `date` plus `secs` elapsed seconds.
///
/// An ambiguous midnight resolves to the earlier instant; a midnight that
/// does not exist (DST gap) is read as UTC.
fn at_time_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate, secs: u32) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    let start = tz
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight));
    start + TimeDelta::seconds(i64::from(secs))
}
