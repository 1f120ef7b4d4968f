use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Weekday};
use tracing::{debug, info, warn};

use super::calendar::{first_weekend_window, last_weekend_window, WeekendWindow};
use super::definitions::ScaleDefinition;
use super::random::RandomSource;
use super::types::{
    DutyFunction, Member, RosterReport, ScaleEntry, ScaleType, UnfilledShift, WeekendSlot,
};

/// Members needed on each shift
pub const SHIFT_SIZE: usize = 2;
/// Members drawn per weekend: a Saturday shift plus a Sunday shift
pub const CREW_SIZE: usize = SHIFT_SIZE * 2;
/// Most shifts a member may hold within one month
pub const MONTHLY_CAP: u8 = 2;

/// State threaded from one month to the next
#[derive(Debug, Default)]
struct MonthCarry {
    previous_last_weekend: HashSet<String>,
    next_id: u64,
    function_cursor: usize,
    entries: Vec<ScaleEntry>,
    unfilled: Vec<UnfilledShift>,
}

/// Builds a year of first/last weekend duty assignments
pub struct RosterGenerator<'a> {
    members: Vec<&'a Member>,
    definition: &'a ScaleDefinition,
    carry_over: HashSet<String>,
}

impl<'a> RosterGenerator<'a> {
    /// Duplicate member ids are dropped, keeping the first occurrence
    pub fn new(members: &'a [Member], definition: &'a ScaleDefinition) -> Self {
        let mut seen = HashSet::new();
        let members = members
            .iter()
            .filter(|m| seen.insert(m.id.as_str()))
            .collect();
        Self {
            members,
            definition,
            carry_over: HashSet::new(),
        }
    }

    /// Members who worked the last weekend of the previous December
    pub fn with_carry_over<I>(mut self, member_ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.carry_over = member_ids.into_iter().collect();
        self
    }

    pub fn generate<R: RandomSource>(&self, year: i32, rng: &mut R) -> RosterReport {
        let initial = MonthCarry {
            previous_last_weekend: self.carry_over.clone(),
            next_id: 1,
            ..MonthCarry::default()
        };

        let carry = (1..=12).fold(initial, |carry, month| {
            self.generate_month(year, month, carry, &mut *rng)
        });

        let report = RosterReport {
            year,
            entries: carry.entries,
            unfilled: carry.unfilled,
        };
        info!(
            year,
            members = self.members.len(),
            entries = report.entries.len(),
            unfilled_slots = report.unfilled_slots(),
            "Roster generated"
        );
        report
    }

    fn generate_month<R: RandomSource>(
        &self,
        year: i32,
        month: u32,
        mut carry: MonthCarry,
        rng: &mut R,
    ) -> MonthCarry {
        let (Some(first), Some(last)) = (
            first_weekend_window(year, month),
            last_weekend_window(year, month),
        ) else {
            warn!(year, month, "Skipping month outside the supported calendar range");
            return carry;
        };

        let mut counts: HashMap<&str, u8> =
            self.members.iter().map(|m| (m.id.as_str(), 0)).collect();
        let (first_anchor, last_anchor) = self.seed_admins(&carry.previous_last_weekend, rng);

        // Anyone on last month's final weekend sits out this first weekend
        let excluded = &carry.previous_last_weekend;
        let first_crew = self.draw_crew(first_anchor, |m| !excluded.contains(&m.id), rng);
        for member in &first_crew {
            *counts.entry(member.id.as_str()).or_insert(0) += 1;
        }
        self.emit_weekend(first, &first_crew, WeekendSlot::First, &mut carry);

        let last_crew = self.draw_crew(
            last_anchor,
            |m| counts.get(m.id.as_str()).copied().unwrap_or(0) < MONTHLY_CAP,
            rng,
        );
        self.emit_weekend(last, &last_crew, WeekendSlot::Last, &mut carry);

        debug!(
            year,
            month,
            first_weekend = first_crew.len(),
            last_weekend = last_crew.len(),
            "Month scheduled"
        );

        carry.previous_last_weekend = last_crew.iter().map(|m| m.id.clone()).collect();
        carry
    }

    /// Picks the admins anchoring the first and last weekend.
    ///
    /// Needs at least two distinct admins; the first-weekend anchor also has
    /// to be clear of the anti-repeat exclusion set.
    fn seed_admins<R: RandomSource>(
        &self,
        excluded: &HashSet<String>,
        rng: &mut R,
    ) -> (Option<&'a Member>, Option<&'a Member>) {
        let mut admins: Vec<&'a Member> = self.members.iter().copied().filter(|m| m.is_admin).collect();
        if admins.len() < 2 {
            return (None, None);
        }
        rng.shuffle(&mut admins);

        let first = admins.iter().copied().find(|a| !excluded.contains(&a.id));
        let last = admins
            .iter()
            .copied()
            .find(|a| first.map_or(true, |f| f.id != a.id));
        (first, last)
    }

    /// Anchor first, then shuffled eligible members until the crew is full
    fn draw_crew<R, F>(&self, anchor: Option<&'a Member>, eligible: F, rng: &mut R) -> Vec<&'a Member>
    where
        R: RandomSource,
        F: Fn(&Member) -> bool,
    {
        let mut crew: Vec<&'a Member> = anchor.into_iter().collect();
        let mut pool: Vec<&'a Member> = self
            .members
            .iter()
            .copied()
            .filter(|m| eligible(*m) && anchor.map_or(true, |a| a.id != m.id))
            .collect();
        rng.shuffle(&mut pool);
        let room = CREW_SIZE.saturating_sub(crew.len());
        crew.extend(pool.into_iter().take(room));
        crew
    }

    /// The first two crew members take Saturday, the next two Sunday
    fn emit_weekend(
        &self,
        window: WeekendWindow,
        crew: &[&Member],
        slot: WeekendSlot,
        carry: &mut MonthCarry,
    ) {
        for date in window.weekend_dates() {
            let day = date.weekday();
            let Some(time_window) = self.definition.window_for(day) else {
                continue;
            };
            let range = if day == Weekday::Sat { 0..SHIFT_SIZE } else { SHIFT_SIZE..CREW_SIZE };
            let shift: &[&Member] = crew.get(range.start..range.end.min(crew.len())).unwrap_or(&[]);

            for member in shift {
                carry.entries.push(ScaleEntry {
                    id: carry.next_id,
                    member_id: member.id.clone(),
                    member_name: member.name.clone(),
                    member_number: member.member_number.clone(),
                    day,
                    date,
                    time_window: time_window.clone(),
                    function: DutyFunction::from_cursor(carry.function_cursor),
                    confirmed: false,
                    scale_type: ScaleType::Default,
                    definition_id: self.definition.id.clone(),
                    active: self.definition.active,
                });
                carry.next_id += 1;
                carry.function_cursor += 1;
            }

            if shift.len() < SHIFT_SIZE {
                let missing = SHIFT_SIZE - shift.len();
                warn!(%date, ?slot, missing, "Shift under-filled, not enough eligible members");
                carry.unfilled.push(UnfilledShift {
                    date,
                    weekend: slot,
                    missing,
                });
            }
        }
    }
}

/// Generates the default first/last weekend roster for `year`
pub fn generate_default_roster<R: RandomSource>(
    year: i32,
    members: &[Member],
    rng: &mut R,
) -> Vec<ScaleEntry> {
    let definition = ScaleDefinition::default_weekends();
    RosterGenerator::new(members, &definition)
        .generate(year, rng)
        .entries
}
