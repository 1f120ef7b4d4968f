pub mod types;
pub mod calendar;
pub mod random;
pub mod definitions;
pub mod generator;

pub use types::{DutyFunction, Member, RosterReport, ScaleEntry, ScaleType, TimeWindow, UnfilledShift, WeekendSlot};
pub use random::{InOrder, RandomSource, RngSource};
pub use definitions::{ScaleDefinition, ScheduleWindow, DEFAULT_DEFINITION_ID};
pub use generator::{generate_default_roster, RosterGenerator};
