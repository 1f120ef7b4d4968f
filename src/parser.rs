use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::{Reader, StringRecord};
use tracing::{debug, info};

use crate::error::{Result, RosterError};
use crate::schedule::Member;

/// Parses a boolean value from various string representations
fn parse_bool(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "yes" || lower == "true" || lower == "1" || lower == "sim" || lower == "admin"
}

/// Column positions of the member directory, located by header text
struct Columns {
    id: usize,
    name: usize,
    member_number: usize,
    is_admin: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Self {
        let find = |needles: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().to_lowercase();
                needles.iter().any(|n| h == *n || h.replace([' ', '-'], "_") == *n)
            })
        };
        Self {
            id: find(&["id", "member_id"]).unwrap_or(0),
            name: find(&["name", "nome"]).unwrap_or(1),
            member_number: find(&["member_number", "membernumber", "number", "numero"]).unwrap_or(2),
            is_admin: find(&["is_admin", "isadmin", "admin"]).unwrap_or(3),
        }
    }
}

/// Loads the member directory from a CSV file
pub fn load_members<P: AsRef<Path>>(csv_path: P) -> Result<Vec<Member>> {
    let path = csv_path.as_ref();
    let members = read_members(Reader::from_path(path)?)?;
    info!(path = %path.display(), members = members.len(), "Member directory loaded");
    Ok(members)
}

/// Loads the member directory from any CSV source, e.g. an uploaded body
pub fn parse_members<R: Read>(source: R) -> Result<Vec<Member>> {
    read_members(Reader::from_reader(source))
}

/// A later row with the same id replaces the earlier one, keeping its position
fn read_members<R: Read>(mut reader: Reader<R>) -> Result<Vec<Member>> {
    let columns = Columns::locate(reader.headers()?);

    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, Member> = HashMap::new();

    for result in reader.records() {
        let record = result?;
        let field = |col: usize| record.get(col).unwrap_or("").trim().to_string();

        let id = field(columns.id);
        let name = field(columns.name);
        // Skip if essential fields are missing
        if id.is_empty() || name.is_empty() {
            debug!(line = ?record.position().map(|p| p.line()), "Skipping member row without id or name");
            continue;
        }

        let member = Member {
            id: id.clone(),
            name,
            member_number: field(columns.member_number),
            is_admin: parse_bool(record.get(columns.is_admin).unwrap_or("")),
        };
        if by_id.insert(id.clone(), member).is_none() {
            order.push(id);
        }
    }

    if order.is_empty() {
        return Err(RosterError::EmptyDirectory);
    }

    Ok(order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_columns_by_header_name() {
        let csv = "Nome,Numero,Admin,ID\nRui,001,sim,a1\nAna,002,no,a2\n";
        let members = parse_members(csv.as_bytes()).unwrap();
        assert_eq!(members, vec![
            Member::new("a1", "Rui", "001", true),
            Member::new("a2", "Ana", "002", false),
        ]);
    }

    #[test]
    fn later_rows_replace_earlier_ones_in_place() {
        let csv = "id,name,member_number,is_admin\n1,Rui,001,false\n2,Ana,002,false\n1,Rui Silva,001,true\n";
        let members = parse_members(csv.as_bytes()).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "Rui Silva");
        assert!(members[0].is_admin);
        assert_eq!(members[1].id, "2");
    }

    #[test]
    fn rows_without_id_or_name_are_skipped() {
        let csv = "id,name,member_number,is_admin\n,Sem Id,003,false\n4,,004,false\n5,Joana,005,1\n";
        let members = parse_members(csv.as_bytes()).unwrap();
        assert_eq!(members, vec![Member::new("5", "Joana", "005", true)]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let csv = "id,name,member_number,is_admin\n";
        assert!(matches!(parse_members(csv.as_bytes()), Err(RosterError::EmptyDirectory)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("members.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "id,name,member_number,is_admin").unwrap();
        writeln!(file, "1,Rui,001,yes").unwrap();
        drop(file);

        let members = load_members(&path).unwrap();
        assert_eq!(members, vec![Member::new("1", "Rui", "001", true)]);
    }
}
