use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::calendar::normalize_time;
use super::types::TimeWindow;
use crate::error::{Result, RosterError};

/// Id of the built-in first/last weekend definition
pub const DEFAULT_DEFINITION_ID: &str = "default";

/// One weekday's time window inside a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWindow {
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
}

/// A named duty pattern: which weekdays need cover and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleDefinition {
    pub id: String,
    pub name: String,
    pub days: Vec<Weekday>,
    pub schedule: Vec<ScheduleWindow>,
    pub active: bool,
}

impl ScaleDefinition {
    /// The first-and-last-weekend pattern that drives roster generation
    pub fn default_weekends() -> Self {
        Self {
            id: DEFAULT_DEFINITION_ID.to_string(),
            name: "Fins de semana (primeiro e último)".to_string(),
            days: vec![Weekday::Sat, Weekday::Sun],
            schedule: vec![
                ScheduleWindow {
                    day: Weekday::Sat,
                    start_time: "20:00".to_string(),
                    end_time: "00:00".to_string(),
                },
                ScheduleWindow {
                    day: Weekday::Sun,
                    start_time: "09:00".to_string(),
                    end_time: "12:00".to_string(),
                },
            ],
            active: true,
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_DEFINITION_ID
    }

    /// Time window configured for `day`, if the definition covers it
    pub fn window_for(&self, day: Weekday) -> Option<TimeWindow> {
        self.schedule
            .iter()
            .find(|w| w.day == day)
            .map(|w| TimeWindow::new(&w.start_time, &w.end_time))
    }

    /// Checks the definition and normalizes its times and day set in place
    pub fn validate(&mut self) -> Result<()> {
        let invalid = |reason: String| RosterError::InvalidDefinition {
            id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name is required".to_string()));
        }
        if self.days.is_empty() {
            return Err(invalid("at least one weekday is required".to_string()));
        }

        let mut days: Vec<Weekday> = Vec::with_capacity(self.days.len());
        for day in &self.days {
            if !days.contains(day) {
                days.push(*day);
            }
        }
        days.sort_by_key(|d| d.num_days_from_monday());

        let mut schedule = Vec::with_capacity(self.schedule.len());
        for window in &self.schedule {
            if !days.contains(&window.day) {
                return Err(invalid(format!("schedule day {} is not one of the definition's days", window.day)));
            }
            let start_time = normalize_time(&window.start_time)?;
            let end_time = normalize_time(&window.end_time)?;
            // Equal bounds would be a zero-length shift; end < start wraps past midnight
            if start_time == end_time {
                return Err(invalid(format!("{} shift starts and ends at the same time", window.day)));
            }
            schedule.push(ScheduleWindow {
                day: window.day,
                start_time,
                end_time,
            });
        }

        self.days = days;
        self.schedule = schedule;
        Ok(())
    }
}
