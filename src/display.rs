use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Datelike;

use crate::error::Result;
use crate::schedule::calendar::weekday_label;
use crate::schedule::{RosterReport, ScaleEntry};

/// Formats a member name with membership number
pub fn format_member_name(member_number: &str, name: &str) -> String {
    if member_number.is_empty() {
        name.to_string()
    } else {
        format!("[{}] {}", member_number, name)
    }
}

fn format_entry(entry: &ScaleEntry) -> String {
    let mut line = format!(
        "{} {} {} {:<9} {}",
        entry.date.format("%d/%m/%Y"),
        weekday_label(entry.day),
        entry.time_window,
        entry.function.to_string(),
        format_member_name(&entry.member_number, &entry.member_name),
    );
    if entry.confirmed {
        line.push_str(" (confirmado)");
    }
    if !entry.active {
        line.push_str(" [inativo]");
    }
    line
}

/// Writes a roster to a file, one month header followed by one line per entry
pub fn write_roster_to_file<P: AsRef<Path>>(report: &RosterReport, path: P) -> Result<()> {
    let mut file = File::create(path)?;

    writeln!(file, "** Escala {} **", report.year)?;

    let mut current_month = 0;
    for entry in &report.entries {
        if entry.date.month() != current_month {
            current_month = entry.date.month();
            writeln!(file)?;
            writeln!(file, "== {:02}/{} ==", current_month, report.year)?;
        }
        writeln!(file, "{}", format_entry(entry))?;
    }

    Ok(())
}

/// Prints a roster summary in a readable format
pub fn print_roster(report: &RosterReport) {
    println!("\n=== Escala {} ===", report.year);
    println!("Total assignments: {}", report.entries.len());

    if !report.unfilled.is_empty() {
        println!("⚠️  Under-filled shifts ({} open slots):", report.unfilled_slots());
        for shift in &report.unfilled {
            println!("  - {} ({:?} weekend): {} missing", shift.date, shift.weekend, shift.missing);
        }
    }

    for month in 1..=12 {
        let entries: Vec<&ScaleEntry> = report.entries.iter().filter(|e| e.date.month() == month).collect();
        if entries.is_empty() {
            continue;
        }
        println!("\n{:02}/{}:", month, report.year);
        for entry in entries {
            println!("  #{:<4} {}", entry.id, format_entry(entry));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{generate_default_roster, InOrder, Member};

    #[test]
    fn member_name_includes_number_when_present() {
        assert_eq!(format_member_name("012", "Rui"), "[012] Rui");
        assert_eq!(format_member_name("", "Rui"), "Rui");
    }

    #[test]
    fn roster_file_has_month_sections() {
        let members = vec![
            Member::new("1", "Rui", "001", false),
            Member::new("2", "Ana", "002", false),
        ];
        let entries = generate_default_roster(2025, &members, &mut InOrder);
        let report = RosterReport { year: 2025, entries, unfilled: Vec::new() };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escala.txt");
        write_roster_to_file(&report, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("** Escala 2025 **"));
        assert!(text.contains("== 01/2025 =="));
        assert!(text.contains("04/01/2025 Sábado 20:00-00:00 Bar       [001] Rui"));
    }
}
