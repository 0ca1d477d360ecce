//! Recurrence rule parsing and next-occurrence calculation.
//!
//! A task's `repeat` field holds one of four textual rules:
//!
//! | Rule | Meaning |
//! |------|---------|
//! | `d N` | every `N` days, `1 <= N <= 400` |
//! | `y` | every year on the same calendar day |
//! | `w 1,3,5` | on the listed weekdays (Monday = 1, Sunday = 7) |
//! | `m 1,15,-1 [1,6]` | on the listed days of month, optionally only in the listed months |
//!
//! For month rules `-1` is the last day of the month and `-2` the day before it.
//!
//! Everything here is pure: no I/O, no shared state, no clock. All comparisons
//! happen on calendar days, so time-of-day never influences a result.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

use crate::models::{format_canonical_date, parse_canonical_date};

/// Largest accepted interval for the `d` rule.
pub const MAX_DAY_INTERVAL: u32 = 400;

/// Upper bound on the number of days a month rule scans past its start.
/// Every accepted month rule matches at least once a year, so eight years
/// leaves ample room while still guaranteeing termination.
const MAX_MONTH_SCAN_DAYS: u32 = 366 * 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("invalid date format: '{0}' (expected YYYYMMDD)")]
    InvalidDateFormat(String),

    #[error("invalid '{0}' rule format")]
    InvalidFormat(String),

    #[error("invalid day interval '{0}': must be between 1 and 400")]
    InvalidDayInterval(String),

    #[error("invalid weekday '{0}': must be between 1 and 7")]
    InvalidWeekday(String),

    #[error("invalid day in month '{0}': must be -2, -1 or between 1 and 31")]
    InvalidDayInMonth(String),

    #[error("invalid month '{0}': must be between 1 and 12")]
    InvalidMonth(String),

    #[error("unsupported repeat format: '{0}'")]
    UnsupportedRepeatFormat(String),

    #[error("no occurrence found for rule '{0}'")]
    NoOccurrence(String),
}

/// Small set of integers in `-2..=61`, used for weekday, day-of-month and
/// month lists. Membership is a single bit test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DaySet(u64);

impl DaySet {
    const OFFSET: i32 = 2;
    const MIN: i32 = -Self::OFFSET;
    const MAX: i32 = 63 - Self::OFFSET;

    pub const fn new() -> Self {
        Self(0)
    }

    /// Inserts `value`. Values outside the representable range are ignored;
    /// parsers validate ranges before inserting.
    pub fn insert(&mut self, value: i32) {
        if (Self::MIN..=Self::MAX).contains(&value) {
            self.0 |= 1u64 << (value + Self::OFFSET);
        }
    }

    #[inline]
    pub fn contains(&self, value: i32) -> bool {
        (Self::MIN..=Self::MAX).contains(&value) && self.0 & (1u64 << (value + Self::OFFSET)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        (Self::MIN..=Self::MAX).filter(move |v| self.contains(*v))
    }
}

impl FromIterator<i32> for DaySet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = DaySet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl fmt::Display for DaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

/// A parsed, validated recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceRule {
    /// `d N`
    Days { interval: u32 },
    /// `y`
    Yearly,
    /// `w list`; members are ISO weekday numbers.
    Weekly { weekdays: DaySet },
    /// `m days [months]`
    Monthly { days: DaySet, months: Option<DaySet> },
}

impl RecurrenceRule {
    /// Parses a `repeat` field, treating an empty (or blank) value as "no rule".
    pub fn parse_optional(repeat: &str) -> Result<Option<Self>, RecurrenceError> {
        if repeat.trim().is_empty() {
            Ok(None)
        } else {
            repeat.parse().map(Some)
        }
    }

    /// Returns the first occurrence strictly after `now`, starting from `date`.
    pub fn next_after(&self, date: NaiveDate, now: NaiveDate) -> Result<NaiveDate, RecurrenceError> {
        let next = match self {
            RecurrenceRule::Days { interval } => next_by_days(date, now, *interval),
            RecurrenceRule::Yearly => next_by_year(date, now),
            RecurrenceRule::Weekly { weekdays } => next_by_weekday(date, now, weekdays),
            RecurrenceRule::Monthly { days, months } => {
                next_by_month_day(date, now, days, months.as_ref())
            }
        };
        next.ok_or_else(|| RecurrenceError::NoOccurrence(self.to_string()))
    }
}

impl FromStr for RecurrenceRule {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let Some((&kind, args)) = parts.split_first() else {
            return Err(RecurrenceError::UnsupportedRepeatFormat(s.to_string()));
        };

        match kind {
            "d" => match args {
                [interval] => parse_interval(interval).map(|interval| RecurrenceRule::Days { interval }),
                _ => Err(RecurrenceError::InvalidFormat(kind.to_string())),
            },
            "y" if args.is_empty() => Ok(RecurrenceRule::Yearly),
            "y" => Err(RecurrenceError::InvalidFormat(kind.to_string())),
            "w" => match args {
                [list] => Ok(RecurrenceRule::Weekly {
                    weekdays: parse_list(list, 1..=7, RecurrenceError::InvalidWeekday)?,
                }),
                _ => Err(RecurrenceError::InvalidFormat(kind.to_string())),
            },
            "m" => match args {
                [days] => Ok(RecurrenceRule::Monthly {
                    days: parse_month_days(days)?,
                    months: None,
                }),
                [days, months] => Ok(RecurrenceRule::Monthly {
                    days: parse_month_days(days)?,
                    months: Some(parse_list(months, 1..=12, RecurrenceError::InvalidMonth)?),
                }),
                _ => Err(RecurrenceError::InvalidFormat(kind.to_string())),
            },
            other => Err(RecurrenceError::UnsupportedRepeatFormat(other.to_string())),
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceRule::Days { interval } => write!(f, "d {}", interval),
            RecurrenceRule::Yearly => f.write_str("y"),
            RecurrenceRule::Weekly { weekdays } => write!(f, "w {}", weekdays),
            RecurrenceRule::Monthly { days, months: None } => write!(f, "m {}", days),
            RecurrenceRule::Monthly { days, months: Some(months) } => {
                write!(f, "m {} {}", days, months)
            }
        }
    }
}

/// Computes the next date for a task given as canonical strings.
///
/// With an empty `repeat` the task does not recur, so the result is simply
/// "not before today": `date` if it lies after `now`, otherwise `now`.
pub fn next_date(now: NaiveDate, date: &str, repeat: &str) -> Result<String, RecurrenceError> {
    let start = parse_canonical_date(date)
        .ok_or_else(|| RecurrenceError::InvalidDateFormat(date.to_string()))?;

    let next = match RecurrenceRule::parse_optional(repeat)? {
        None if start > now => start,
        None => now,
        Some(rule) => rule.next_after(start, now)?,
    };

    Ok(format_canonical_date(next))
}

fn parse_interval(token: &str) -> Result<u32, RecurrenceError> {
    token
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_DAY_INTERVAL).contains(n))
        .ok_or_else(|| RecurrenceError::InvalidDayInterval(token.to_string()))
}

fn parse_list(
    list: &str,
    range: std::ops::RangeInclusive<i32>,
    error: fn(String) -> RecurrenceError,
) -> Result<DaySet, RecurrenceError> {
    let mut set = DaySet::new();
    for token in list.split(',') {
        match token.parse::<i32>() {
            Ok(value) if range.contains(&value) => set.insert(value),
            _ => return Err(error(token.to_string())),
        }
    }
    Ok(set)
}

fn parse_month_days(list: &str) -> Result<DaySet, RecurrenceError> {
    let days = parse_list(list, -2..=31, RecurrenceError::InvalidDayInMonth)?;
    if days.contains(0) {
        return Err(RecurrenceError::InvalidDayInMonth("0".to_string()));
    }
    Ok(days)
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn next_by_days(date: NaiveDate, now: NaiveDate, interval: u32) -> Option<NaiveDate> {
    let steps = if date > now {
        1
    } else {
        let behind = u64::try_from((now - date).num_days()).ok()?;
        behind / u64::from(interval) + 1
    };
    date.checked_add_days(Days::new(steps * u64::from(interval)))
}

/// Adds one calendar year. Feb 29 rolls over to Mar 1 when the target year
/// is not a leap year.
fn add_year(date: NaiveDate) -> Option<NaiveDate> {
    let year = date.year() + 1;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

fn next_by_year(date: NaiveDate, now: NaiveDate) -> Option<NaiveDate> {
    let mut next = add_year(date)?;
    let max_steps = (now.year() - date.year()).max(0) + 2;
    let mut steps = 1;
    while next <= now {
        if steps >= max_steps {
            return None;
        }
        next = add_year(next)?;
        steps += 1;
    }

    if next.month() == 2 && next.day() == 29 && !is_leap_year(next.year()) {
        return NaiveDate::from_ymd_opt(next.year(), 3, 1);
    }
    Some(next)
}

fn next_by_weekday(date: NaiveDate, now: NaiveDate, weekdays: &DaySet) -> Option<NaiveDate> {
    // Days on or before `now` can never qualify, so skip them outright.
    let start = date.max(now).succ_opt()?;
    (0..7)
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .find(|day| weekdays.contains(day.weekday().number_from_monday() as i32))
}

fn next_by_month_day(
    date: NaiveDate,
    now: NaiveDate,
    days: &DaySet,
    months: Option<&DaySet>,
) -> Option<NaiveDate> {
    let mut day = date.max(now).succ_opt()?;

    for _ in 0..MAX_MONTH_SCAN_DAYS {
        if let Some(found) = month_day_match(day, days, months) {
            return Some(found);
        }
        day = day.succ_opt()?;
    }
    None
}

/// Checks a single candidate day against a month rule, returning the
/// occurrence it yields (the day itself, or a day in the following month
/// when a requested day overflows the current one).
fn month_day_match(day: NaiveDate, days: &DaySet, months: Option<&DaySet>) -> Option<NaiveDate> {
    let month = day.month();
    if let Some(months) = months {
        if !months.contains(month as i32) {
            return None;
        }
    }

    let last = days_in_month(day.year(), month);
    let current = day.day();

    if days.contains(-1) && current == last {
        return Some(day);
    }
    if days.contains(-2) && current + 1 == last {
        return Some(day);
    }
    if days.contains(current as i32) {
        return Some(day);
    }

    if current == last {
        // Smallest requested day that does not exist in this month.
        let overflow = days.iter().find(|&d| d > last as i32)?;
        let (year, next_month) = if month == 12 {
            (day.year() + 1, 1)
        } else {
            (day.year(), month + 1)
        };
        let target = (overflow as u32).min(days_in_month(year, next_month));
        return NaiveDate::from_ymd_opt(year, next_month, target);
    }

    None
}
