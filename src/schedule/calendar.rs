use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{Result, RosterError};

/// Length of the first/last weekend windows, in days
pub const WINDOW_DAYS: u32 = 7;

/// A run of consecutive calendar days inside one month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekendWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekendWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Saturdays and Sundays inside the window, in calendar order
    pub fn weekend_dates(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter(|d| is_weekend(*d))
            .collect()
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of days in the given month, None for an invalid year/month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Days 1-7 of the month
pub fn first_weekend_window(year: i32, month: u32) -> Option<WeekendWindow> {
    Some(WeekendWindow {
        start: NaiveDate::from_ymd_opt(year, month, 1)?,
        end: NaiveDate::from_ymd_opt(year, month, WINDOW_DAYS)?,
    })
}

/// The final seven days of the month
pub fn last_weekend_window(year: i32, month: u32) -> Option<WeekendWindow> {
    let last_day = days_in_month(year, month)?;
    Some(WeekendWindow {
        start: NaiveDate::from_ymd_opt(year, month, last_day - WINDOW_DAYS + 1)?,
        end: NaiveDate::from_ymd_opt(year, month, last_day)?,
    })
}

/// A year is usable when every month of it fits the calendar range
pub fn validate_year(year: i32) -> Result<i32> {
    first_weekend_window(year, 1)
        .and(last_weekend_window(year, 12))
        .map(|_| year)
        .ok_or(RosterError::InvalidYear(year))
}

pub fn validate_month(month: u32) -> Result<u32> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(RosterError::InvalidMonth(month))
    }
}

/// Parses a time string (HH:MM) to minutes since midnight
pub fn parse_time_to_minutes(time_str: &str) -> Option<u32> {
    let (hours, minutes) = time_str.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight to time string (HH:MM)
pub fn minutes_to_time_string(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    format!("{:02}:{:02}", hours % 24, mins)
}

/// Normalizes a user-supplied HH:MM value ("9:5" -> "09:05")
pub fn normalize_time(time_str: &str) -> Result<String> {
    parse_time_to_minutes(time_str)
        .map(minutes_to_time_string)
        .ok_or_else(|| RosterError::InvalidTime(time_str.to_string()))
}

/// Portuguese label used on printed rosters
pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Segunda",
        Weekday::Tue => "Terça",
        Weekday::Wed => "Quarta",
        Weekday::Thu => "Quinta",
        Weekday::Fri => "Sexta",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}
