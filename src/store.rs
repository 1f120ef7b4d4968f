use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, RosterError};
use crate::schedule::calendar::{last_weekend_window, normalize_time, validate_month};
use crate::schedule::definitions::{ScaleDefinition, DEFAULT_DEFINITION_ID};
use crate::schedule::types::{DutyFunction, Member, RosterReport, ScaleEntry, ScaleType, TimeWindow, UnfilledShift};

/// Generated entries for one year, grouped by month
#[derive(Debug, Clone, Default)]
struct YearRoster {
    months: BTreeMap<u32, Vec<ScaleEntry>>,
    unfilled: Vec<UnfilledShift>,
    next_id: u64,
}

impl YearRoster {
    fn entries(&self) -> impl Iterator<Item = &ScaleEntry> {
        self.months.values().flatten()
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut ScaleEntry> {
        self.months.values_mut().flatten()
    }
}

/// A manual assignment added on top of a generated roster
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAssignment {
    pub definition_id: String,
    pub date: NaiveDate,
    pub time_window: TimeWindow,
    pub function: DutyFunction,
}

/// In-memory roster store keyed by (year, month), plus the definition registry
#[derive(Debug, Clone)]
pub struct RosterStore {
    years: HashMap<i32, YearRoster>,
    definitions: BTreeMap<String, ScaleDefinition>,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore {
    pub fn new() -> Self {
        let default = ScaleDefinition::default_weekends();
        let mut definitions = BTreeMap::new();
        definitions.insert(default.id.clone(), default);
        Self {
            years: HashMap::new(),
            definitions,
        }
    }

    /// Stores a generation run, replacing the generated entries held for that year.
    ///
    /// Manual entries survive and are renumbered after the new generated ids.
    pub fn save_report(&mut self, report: RosterReport) {
        let mut kept: Vec<ScaleEntry> = self
            .years
            .remove(&report.year)
            .map(|old| {
                old.months
                    .into_values()
                    .flatten()
                    .filter(|e| e.scale_type != ScaleType::Default)
                    .collect()
            })
            .unwrap_or_default();
        kept.sort_by_key(|e| e.id);

        let default_active = self
            .definitions
            .get(DEFAULT_DEFINITION_ID)
            .map_or(true, |d| d.active);
        let mut roster = YearRoster {
            next_id: report.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1,
            unfilled: report.unfilled,
            ..YearRoster::default()
        };
        for mut entry in report.entries {
            entry.active = default_active;
            roster.months.entry(entry.date.month()).or_default().push(entry);
        }

        let manual = kept.len();
        for mut entry in kept {
            entry.id = roster.next_id;
            roster.next_id += 1;
            roster.months.entry(entry.date.month()).or_default().push(entry);
        }
        for month in roster.months.values_mut() {
            month.sort_by_key(|e| (e.date, e.id));
        }

        info!(year = report.year, months = roster.months.len(), manual, "Roster stored");
        self.years.insert(report.year, roster);
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    pub fn year_entries(&self, year: i32) -> Result<Vec<ScaleEntry>> {
        let roster = self.year(year)?;
        Ok(roster.entries().cloned().collect())
    }

    pub fn month_entries(&self, year: i32, month: u32) -> Result<Vec<ScaleEntry>> {
        let month = validate_month(month)?;
        let roster = self.year(year)?;
        Ok(roster.months.get(&month).cloned().unwrap_or_default())
    }

    pub fn unfilled(&self, year: i32) -> Result<&[UnfilledShift]> {
        Ok(&self.year(year)?.unfilled)
    }

    /// Members on the last weekend of the given month, for anti-repeat carry-over
    pub fn last_weekend_members(&self, year: i32, month: u32) -> HashSet<String> {
        let (Some(roster), Some(window)) = (self.years.get(&year), last_weekend_window(year, month)) else {
            return HashSet::new();
        };
        roster
            .months
            .get(&month)
            .into_iter()
            .flatten()
            .filter(|e| e.scale_type == ScaleType::Default && window.contains(e.date))
            .map(|e| e.member_id.clone())
            .collect()
    }

    /// Marks an entry as confirmed by its member
    pub fn confirm_entry(&mut self, year: i32, id: u64) -> Result<ScaleEntry> {
        let roster = self
            .years
            .get_mut(&year)
            .ok_or(RosterError::RosterNotGenerated(year))?;
        let entry = roster
            .entries_mut()
            .find(|e| e.id == id)
            .ok_or(RosterError::EntryNotFound { year, id })?;
        entry.confirmed = true;
        debug!(year, id, member = %entry.member_id, "Entry confirmed");
        Ok(entry.clone())
    }

    /// Adds a custom assignment; a member can hold only one shift per date
    pub fn add_manual_entry(&mut self, member: &Member, mut assignment: ManualAssignment) -> Result<ScaleEntry> {
        assignment.time_window.start = normalize_time(&assignment.time_window.start)?;
        assignment.time_window.end = normalize_time(&assignment.time_window.end)?;
        let definition = self
            .definitions
            .get(&assignment.definition_id)
            .ok_or_else(|| RosterError::DefinitionNotFound(assignment.definition_id.clone()))?;
        let active = definition.active;
        let year = assignment.date.year();
        let roster = self.years.entry(year).or_insert_with(|| YearRoster {
            next_id: 1,
            ..YearRoster::default()
        });

        if roster
            .entries()
            .any(|e| e.member_id == member.id && e.date == assignment.date)
        {
            return Err(RosterError::DuplicateShift {
                member_id: member.id.clone(),
                date: assignment.date,
            });
        }

        let entry = ScaleEntry {
            id: roster.next_id,
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            member_number: member.member_number.clone(),
            day: assignment.date.weekday(),
            date: assignment.date,
            time_window: assignment.time_window,
            function: assignment.function,
            confirmed: false,
            scale_type: ScaleType::Custom,
            definition_id: assignment.definition_id,
            active,
        };
        roster.next_id += 1;

        let month = roster.months.entry(assignment.date.month()).or_default();
        month.push(entry.clone());
        month.sort_by_key(|e| (e.date, e.id));
        info!(year, id = entry.id, member = %member.id, "Manual entry added");
        Ok(entry)
    }

    /// Edits an entry in place; the date has to stay within the same year
    pub fn update_entry(
        &mut self,
        year: i32,
        id: u64,
        member: &Member,
        mut assignment: ManualAssignment,
    ) -> Result<ScaleEntry> {
        assignment.time_window.start = normalize_time(&assignment.time_window.start)?;
        assignment.time_window.end = normalize_time(&assignment.time_window.end)?;
        if assignment.date.year() != year {
            return Err(RosterError::InvalidEntry(format!(
                "date {} is outside {year}",
                assignment.date
            )));
        }
        let active = self.definition(&assignment.definition_id)?.active;

        let roster = self
            .years
            .get_mut(&year)
            .ok_or(RosterError::RosterNotGenerated(year))?;
        if roster
            .entries()
            .any(|e| e.id != id && e.member_id == member.id && e.date == assignment.date)
        {
            return Err(RosterError::DuplicateShift {
                member_id: member.id.clone(),
                date: assignment.date,
            });
        }

        let mut entry = take_entry(roster, year, id)?;
        if entry.member_id != member.id || entry.date != assignment.date {
            entry.confirmed = false;
        }
        entry.member_id = member.id.clone();
        entry.member_name = member.name.clone();
        entry.member_number = member.member_number.clone();
        entry.day = assignment.date.weekday();
        entry.date = assignment.date;
        entry.time_window = assignment.time_window;
        entry.function = assignment.function;
        entry.definition_id = assignment.definition_id;
        entry.active = active;

        let month = roster.months.entry(entry.date.month()).or_default();
        month.push(entry.clone());
        month.sort_by_key(|e| (e.date, e.id));
        info!(year, id, member = %member.id, "Entry updated");
        Ok(entry)
    }

    pub fn remove_entry(&mut self, year: i32, id: u64) -> Result<ScaleEntry> {
        let roster = self
            .years
            .get_mut(&year)
            .ok_or(RosterError::RosterNotGenerated(year))?;
        let removed = take_entry(roster, year, id)?;
        info!(year, id, member = %removed.member_id, "Entry removed");
        Ok(removed)
    }

    pub fn definitions(&self) -> Vec<ScaleDefinition> {
        self.definitions.values().cloned().collect()
    }

    pub fn definition(&self, id: &str) -> Result<&ScaleDefinition> {
        self.definitions
            .get(id)
            .ok_or_else(|| RosterError::DefinitionNotFound(id.to_string()))
    }

    pub fn add_definition(&mut self, mut definition: ScaleDefinition) -> Result<ScaleDefinition> {
        definition.validate()?;
        if self.definitions.contains_key(&definition.id) {
            return Err(RosterError::DuplicateDefinition(definition.id));
        }
        info!(id = %definition.id, name = %definition.name, "Scale definition added");
        self.definitions.insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    /// Toggles a definition and cascades the flag to every entry it owns
    pub fn set_definition_active(&mut self, id: &str, active: bool) -> Result<usize> {
        let definition = self
            .definitions
            .get_mut(id)
            .ok_or_else(|| RosterError::DefinitionNotFound(id.to_string()))?;
        definition.active = active;

        let mut touched = 0;
        for entry in self.years.values_mut().flat_map(|r| r.entries_mut()) {
            if entry.definition_id == id {
                entry.active = active;
                touched += 1;
            }
        }
        info!(id, active, entries = touched, "Scale definition toggled");
        Ok(touched)
    }

    /// Replaces a definition's name, days and windows; its id is fixed
    pub fn update_definition(&mut self, id: &str, mut definition: ScaleDefinition) -> Result<ScaleDefinition> {
        if definition.id != id {
            return Err(RosterError::InvalidDefinition {
                id: id.to_string(),
                reason: format!("id cannot be changed to '{}'", definition.id),
            });
        }
        definition.validate()?;
        let current = self
            .definitions
            .get_mut(id)
            .ok_or_else(|| RosterError::DefinitionNotFound(id.to_string()))?;
        let active_changed = current.active != definition.active;
        *current = definition.clone();

        if active_changed {
            self.set_definition_active(&definition.id, definition.active)?;
        }
        info!(id = %definition.id, name = %definition.name, "Scale definition updated");
        Ok(definition)
    }

    pub fn remove_definition(&mut self, id: &str) -> Result<ScaleDefinition> {
        let definition = self.definition(id)?;
        if definition.is_default() {
            return Err(RosterError::DefaultDefinitionLocked);
        }
        let removed = self
            .definitions
            .remove(id)
            .ok_or_else(|| RosterError::DefinitionNotFound(id.to_string()))?;
        for roster in self.years.values_mut() {
            for month in roster.months.values_mut() {
                month.retain(|e| e.definition_id != id);
            }
        }
        info!(id, "Scale definition removed");
        Ok(removed)
    }

    fn year(&self, year: i32) -> Result<&YearRoster> {
        self.years
            .get(&year)
            .ok_or(RosterError::RosterNotGenerated(year))
    }
}

/// Pulls an entry out of whichever month holds it
fn take_entry(roster: &mut YearRoster, year: i32, id: u64) -> Result<ScaleEntry> {
    for month in roster.months.values_mut() {
        if let Some(pos) = month.iter().position(|e| e.id == id) {
            return Ok(month.remove(pos));
        }
    }
    Err(RosterError::EntryNotFound { year, id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::definitions::ScheduleWindow;
    use crate::schedule::generator::RosterGenerator;
    use crate::schedule::random::InOrder;
    use chrono::Weekday;

    fn members() -> Vec<Member> {
        (0..6)
            .map(|i| Member::new(&format!("m{i}"), &format!("Membro {i}"), &format!("{i:03}"), i < 2))
            .collect()
    }

    fn stored_2025() -> RosterStore {
        let mut store = RosterStore::new();
        let definition = store.definition(DEFAULT_DEFINITION_ID).unwrap().clone();
        let report = RosterGenerator::new(&members(), &definition).generate(2025, &mut InOrder);
        store.save_report(report);
        store
    }

    fn friday_bar() -> ScaleDefinition {
        ScaleDefinition {
            id: "friday-bar".to_string(),
            name: "Sexta no bar".to_string(),
            days: vec![Weekday::Fri],
            schedule: vec![ScheduleWindow {
                day: Weekday::Fri,
                start_time: "21:00".to_string(),
                end_time: "02:00".to_string(),
            }],
            active: true,
        }
    }

    #[test]
    fn entries_are_grouped_by_month() {
        let store = stored_2025();
        let open_slots: usize = store.unfilled(2025).unwrap().iter().map(|u| u.missing).sum();
        assert_eq!(store.year_entries(2025).unwrap().len() + open_slots, 12 * 8);
        let january = store.month_entries(2025, 1).unwrap();
        assert!(january.iter().all(|e| e.date.month() == 1));
        assert!(matches!(store.month_entries(2025, 13), Err(RosterError::InvalidMonth(13))));
        assert!(matches!(store.year_entries(2030), Err(RosterError::RosterNotGenerated(2030))));
    }

    #[test]
    fn last_weekend_members_reads_the_final_window() {
        let store = stored_2025();
        let members = store.last_weekend_members(2025, 1);
        let expected: HashSet<String> = ["m0", "m1", "m2", "m3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(members, expected);
        assert!(store.last_weekend_members(2024, 12).is_empty());
    }

    #[test]
    fn confirm_marks_only_that_entry() {
        let mut store = stored_2025();
        let confirmed = store.confirm_entry(2025, 3).unwrap();
        assert!(confirmed.confirmed);
        let confirmed_count = store.year_entries(2025).unwrap().iter().filter(|e| e.confirmed).count();
        assert_eq!(confirmed_count, 1);
        assert!(matches!(store.confirm_entry(2025, 10_000), Err(RosterError::EntryNotFound { .. })));
    }

    #[test]
    fn manual_entry_rejects_second_shift_on_same_date() {
        let mut store = stored_2025();
        store.add_definition(friday_bar()).unwrap();
        let member = Member::new("m5", "Membro 5", "005", false);
        let assignment = ManualAssignment {
            definition_id: "friday-bar".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            time_window: TimeWindow::new("21:00", "02:00"),
            function: DutyFunction::Bar,
        };

        let entry = store.add_manual_entry(&member, assignment.clone()).unwrap();
        assert_eq!(entry.scale_type, ScaleType::Custom);
        assert_eq!(entry.day, Weekday::Fri);
        assert!(entry.id > 8);

        let err = store.add_manual_entry(&member, assignment).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateShift { .. }));
    }

    #[test]
    fn toggling_default_definition_cascades_to_entries() {
        let mut store = stored_2025();
        let total = store.year_entries(2025).unwrap().len();
        let touched = store.set_definition_active(DEFAULT_DEFINITION_ID, false).unwrap();
        assert_eq!(touched, total);
        assert!(store.year_entries(2025).unwrap().iter().all(|e| !e.active));
        assert!(!store.definition(DEFAULT_DEFINITION_ID).unwrap().active);
    }

    #[test]
    fn definitions_are_validated_and_default_is_locked() {
        let mut store = RosterStore::new();
        store.add_definition(friday_bar()).unwrap();
        assert!(matches!(store.add_definition(friday_bar()), Err(RosterError::DuplicateDefinition(_))));
        assert_eq!(store.definitions().len(), 2);

        let mut broken = friday_bar();
        broken.id = "broken".to_string();
        broken.days = vec![Weekday::Sat];
        assert!(matches!(store.add_definition(broken), Err(RosterError::InvalidDefinition { .. })));

        assert!(matches!(store.remove_definition(DEFAULT_DEFINITION_ID), Err(RosterError::DefaultDefinitionLocked)));
        store.remove_definition("friday-bar").unwrap();
        assert_eq!(store.definitions().len(), 1);
    }

    fn wednesday_bar(date: NaiveDate) -> ManualAssignment {
        ManualAssignment {
            definition_id: DEFAULT_DEFINITION_ID.to_string(),
            date,
            time_window: TimeWindow::new("18:00", "22:00"),
            function: DutyFunction::Bar,
        }
    }

    #[test]
    fn regenerating_keeps_manual_entries() {
        let mut store = stored_2025();
        let member = Member::new("m5", "Membro 5", "005", false);
        let march_12 = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        store.add_manual_entry(&member, wednesday_bar(march_12)).unwrap();

        let definition = store.definition(DEFAULT_DEFINITION_ID).unwrap().clone();
        let members: Vec<Member> = (0..10).map(|i| Member::new(&format!("m{i}"), "X", "", i < 2)).collect();
        let report = RosterGenerator::new(&members, &definition).generate(2025, &mut InOrder);
        let generated = report.entries.len();
        store.save_report(report);

        let entries = store.year_entries(2025).unwrap();
        let custom: Vec<&ScaleEntry> = entries.iter().filter(|e| e.scale_type == ScaleType::Custom).collect();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].date, march_12);
        assert_eq!(custom[0].id, generated as u64 + 1);

        let ids: HashSet<u64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), entries.len());
        let march = store.month_entries(2025, 3).unwrap();
        assert!(march.windows(2).all(|w| (w[0].date, w[0].id) <= (w[1].date, w[1].id)));
    }

    #[test]
    fn manual_entries_added_before_generation_survive_it() {
        let mut store = RosterStore::new();
        let member = Member::new("m5", "Membro 5", "005", false);
        let entry = store
            .add_manual_entry(&member, wednesday_bar(NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()))
            .unwrap();
        assert_eq!(entry.id, 1);

        let definition = store.definition(DEFAULT_DEFINITION_ID).unwrap().clone();
        store.save_report(RosterGenerator::new(&members(), &definition).generate(2025, &mut InOrder));
        let custom = store
            .year_entries(2025)
            .unwrap()
            .into_iter()
            .filter(|e| e.scale_type == ScaleType::Custom)
            .count();
        assert_eq!(custom, 1);
    }

    #[test]
    fn entries_can_be_edited_and_removed() {
        let mut store = stored_2025();
        let member = Member::new("m5", "Membro 5", "005", false);
        let entry = store
            .add_manual_entry(&member, wednesday_bar(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()))
            .unwrap();
        store.confirm_entry(2025, entry.id).unwrap();

        let mut moved = wednesday_bar(NaiveDate::from_ymd_opt(2025, 4, 16).unwrap());
        moved.time_window = TimeWindow::new("19:0", "23:00");
        moved.function = DutyFunction::Kitchen;
        let updated = store.update_entry(2025, entry.id, &member, moved).unwrap();
        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.time_window, TimeWindow::new("19:00", "23:00"));
        assert!(!updated.confirmed);
        assert!(store.month_entries(2025, 3).unwrap().iter().all(|e| e.id != entry.id));
        assert!(store.month_entries(2025, 4).unwrap().iter().any(|e| e.id == entry.id));

        let next_year = wednesday_bar(NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
        assert!(matches!(
            store.update_entry(2025, entry.id, &member, next_year),
            Err(RosterError::InvalidEntry(_))
        ));

        let total = store.year_entries(2025).unwrap().len();
        let removed = store.remove_entry(2025, entry.id).unwrap();
        assert_eq!(removed.function, DutyFunction::Kitchen);
        assert_eq!(store.year_entries(2025).unwrap().len(), total - 1);
        assert!(matches!(store.remove_entry(2025, entry.id), Err(RosterError::EntryNotFound { .. })));
    }

    #[test]
    fn editing_into_an_occupied_date_is_rejected() {
        let mut store = stored_2025();
        let january = store.month_entries(2025, 1).unwrap();
        let shifts: Vec<&ScaleEntry> = january.iter().filter(|e| e.member_id == "m0").collect();
        assert_eq!(shifts.len(), 2);
        let (first, last) = (shifts[0].clone(), shifts[1].clone());
        let member = Member::new("m0", "Membro 0", "000", true);
        let onto = |entry: &ScaleEntry, date: NaiveDate| ManualAssignment {
            definition_id: DEFAULT_DEFINITION_ID.to_string(),
            date,
            time_window: entry.time_window.clone(),
            function: entry.function,
        };

        let err = store.update_entry(2025, last.id, &member, onto(&last, first.date)).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateShift { .. }));

        // Rewriting an entry onto its own date is not a clash with itself
        let kept = store.update_entry(2025, first.id, &member, onto(&first, first.date)).unwrap();
        assert_eq!(kept.date, first.date);
    }

    #[test]
    fn definitions_can_be_updated_but_not_renamed() {
        let mut store = stored_2025();
        store.add_definition(friday_bar()).unwrap();

        let mut edited = friday_bar();
        edited.name = "Sexta e sábado".to_string();
        edited.days = vec![Weekday::Sat, Weekday::Fri];
        edited.schedule.push(ScheduleWindow {
            day: Weekday::Sat,
            start_time: "22:00".to_string(),
            end_time: "3:00".to_string(),
        });
        let updated = store.update_definition("friday-bar", edited).unwrap();
        assert_eq!(updated.days, vec![Weekday::Fri, Weekday::Sat]);
        assert_eq!(store.definition("friday-bar").unwrap().schedule[1].end_time, "03:00");

        let mut renamed = ScaleDefinition::default_weekends();
        renamed.id = "weekends".to_string();
        assert!(matches!(
            store.update_definition(DEFAULT_DEFINITION_ID, renamed),
            Err(RosterError::InvalidDefinition { .. })
        ));

        let mut paused = ScaleDefinition::default_weekends();
        paused.active = false;
        store.update_definition(DEFAULT_DEFINITION_ID, paused).unwrap();
        assert!(store.year_entries(2025).unwrap().iter().all(|e| !e.active));

        let mut broken = friday_bar();
        broken.schedule[0].start_time = "99:00".to_string();
        assert!(matches!(store.update_definition("friday-bar", broken), Err(RosterError::InvalidTime(_))));
        assert!(matches!(
            store.update_definition("missing", ScaleDefinition { id: "missing".to_string(), ..friday_bar() }),
            Err(RosterError::DefinitionNotFound(_))
        ));
    }
}
