//! Period boundaries, navigation stepping, and period labels.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Reporting window granularity used by table views and navigation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMode {
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for PeriodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PeriodMode::Day => "Day",
            PeriodMode::Week => "Week",
            PeriodMode::Month => "Month",
            PeriodMode::Year => "Year",
        };
        f.write_str(label)
    }
}

/// Returns the inclusive start/end dates of the period containing `reference`.
///
/// Day collapses to the reference itself; Week is the ISO Monday–Sunday week
/// (a Sunday reference still belongs to the week that started the previous
/// Monday); Month and Year cover the full calendar month/year.
pub fn period_range(reference: NaiveDate, mode: PeriodMode) -> (NaiveDate, NaiveDate) {
    match mode {
        PeriodMode::Day => (reference, reference),
        PeriodMode::Week => {
            let monday =
                reference - Duration::days(reference.weekday().num_days_from_monday() as i64);
            (monday, monday + Duration::days(6))
        }
        PeriodMode::Month => {
            let first = reference.with_day(1).expect("day 1 always valid");
            let last_day = days_in_month(reference.year(), reference.month());
            (first, first.with_day(last_day).expect("clamped day valid"))
        }
        PeriodMode::Year => (
            NaiveDate::from_ymd_opt(reference.year(), 1, 1).expect("jan 1 valid"),
            NaiveDate::from_ymd_opt(reference.year(), 12, 31).expect("dec 31 valid"),
        ),
    }
}

/// Steps `reference` forward or backward by whole periods.
///
/// Month and year stepping use calendar arithmetic with the day clamped to
/// the end of the target month, so January 31 stepped by one month lands on
/// February 28/29 rather than rolling over into March.
pub fn step_period(reference: NaiveDate, mode: PeriodMode, steps: i32) -> NaiveDate {
    match mode {
        PeriodMode::Day => reference + Duration::days(steps as i64),
        PeriodMode::Week => reference + Duration::weeks(steps as i64),
        PeriodMode::Month => shift_month(reference, steps),
        PeriodMode::Year => shift_year(reference, steps),
    }
}

/// Human label for the period containing `reference`, used by navigation
/// headers: "15 January 2024", "8 – 14 Jan 2024", "January 2024", "2024".
pub fn period_label(reference: NaiveDate, mode: PeriodMode) -> String {
    match mode {
        PeriodMode::Day => format!(
            "{} {} {}",
            reference.day(),
            month_name(reference.month()),
            reference.year()
        ),
        PeriodMode::Week => {
            let (start, end) = period_range(reference, PeriodMode::Week);
            if start.month() == end.month() {
                format!(
                    "{} – {} {} {}",
                    start.day(),
                    end.day(),
                    short_month_name(start.month()),
                    start.year()
                )
            } else {
                format!(
                    "{} {} – {} {} {}",
                    start.day(),
                    short_month_name(start.month()),
                    end.day(),
                    short_month_name(end.month()),
                    end.year()
                )
            }
        }
        PeriodMode::Month => format!("{} {}", month_name(reference.month()), reference.year()),
        PeriodMode::Year => reference.year().to_string(),
    }
}

fn month_name(month: u32) -> &'static str {
    MONTHS[(month - 1) as usize]
}

fn short_month_name(month: u32) -> &'static str {
    &month_name(month)[..3]
}

pub(crate) fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    let mut day = date.day();
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    day = day.min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).expect("clamped date valid")
}

pub(crate) fn shift_year(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() + years;
    let day = date.day().min(days_in_month(year, date.month()));
    NaiveDate::from_ymd_opt(year, date.month(), day).expect("clamped date valid")
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("first of month");
    (first_next - Duration::days(1)).day()
}
