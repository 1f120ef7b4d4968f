use std::fmt;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A person eligible for duty, as supplied by the member directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub member_number: String,
    pub is_admin: bool,
}

impl Member {
    pub fn new(id: &str, name: &str, member_number: &str, is_admin: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            member_number: member_number.to_string(),
            is_admin,
        }
    }
}

/// Duty role held within a shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DutyFunction {
    Bar,
    Reception,
    Security,
    Kitchen,
    Cleaning,
}

impl DutyFunction {
    /// Round-robin order used when handing out functions
    pub const ROTATION: [DutyFunction; 5] = [
        DutyFunction::Bar,
        DutyFunction::Reception,
        DutyFunction::Security,
        DutyFunction::Kitchen,
        DutyFunction::Cleaning,
    ];

    pub fn from_cursor(cursor: usize) -> Self {
        Self::ROTATION[cursor % Self::ROTATION.len()]
    }
}

impl fmt::Display for DutyFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DutyFunction::Bar => "Bar",
            DutyFunction::Reception => "Reception",
            DutyFunction::Security => "Security",
            DutyFunction::Kitchen => "Kitchen",
            DutyFunction::Cleaning => "Cleaning",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    Default,
    Custom,
}

impl ScaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleType::Default => "default",
            ScaleType::Custom => "custom",
        }
    }
}

/// Start and end of a shift, both HH:MM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

impl TimeWindow {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One member's assignment to one function on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleEntry {
    pub id: u64,
    pub member_id: String,
    pub member_name: String,
    pub member_number: String,
    pub day: Weekday,
    pub date: NaiveDate,
    pub time_window: TimeWindow,
    pub function: DutyFunction,
    pub confirmed: bool,
    pub scale_type: ScaleType,
    pub definition_id: String,
    pub active: bool,
}

/// Which weekend of the month a shift belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekendSlot {
    First,
    Last,
}

/// A shift that ended up with fewer members than it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfilledShift {
    pub date: NaiveDate,
    pub weekend: WeekendSlot,
    pub missing: usize,
}

/// Output of one generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterReport {
    pub year: i32,
    pub entries: Vec<ScaleEntry>,
    pub unfilled: Vec<UnfilledShift>,
}

impl RosterReport {
    pub fn unfilled_slots(&self) -> usize {
        self.unfilled.iter().map(|u| u.missing).sum()
    }
}
