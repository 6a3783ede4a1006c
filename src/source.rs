//! Property-sheet loading.
//!
//! The sheet is CSV with one row per property. Header names are matched
//! case-insensitively and trimmed; missing required columns abort the run
//! before any job is submitted. Individual malformed rows are skipped
//! with a warning so one bad line cannot take the whole sheet down.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};
use url::Url;

use crate::error::Error;
use crate::models::{PropertyCategory, PropertyRow, Role, RoomType};

const REQUIRED_COLUMNS: &[&str] = &[
    "unit_name",
    "room_type",
    "role",
    "property_name",
    "target_url",
    "property_category",
];

pub fn load_rows_from_path(path: &Path) -> Result<Vec<PropertyRow>, Error> {
    let file = File::open(path)?;
    let rows = load_rows(file)?;
    info!("loaded {} property rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse and validate property rows from CSV.
pub fn load_rows<R: Read>(reader: R) -> Result<Vec<PropertyRow>, Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::Config(format!("unreadable sheet header: {e}")))?
        .clone();
    let column_index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_lowercase(), idx))
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !column_index.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| Error::Config(format!("unreadable sheet row: {e}")))?;
        let field =
            |name: &str| record.get(column_index[name]).unwrap_or("").trim();

        let unit_name = field("unit_name");
        let property_name = field("property_name");
        if unit_name.is_empty() || property_name.is_empty() {
            warn!("row {}: missing unit or property name, skipping", line + 2);
            continue;
        }

        let Some(role) = Role::parse(field("role")) else {
            warn!(
                "row {}: unrecognized role '{}', skipping",
                line + 2,
                field("role")
            );
            continue;
        };

        let Some(property_category) = PropertyCategory::parse(field("property_category")) else {
            warn!(
                "row {}: unrecognized property category '{}', skipping",
                line + 2,
                field("property_category")
            );
            continue;
        };

        let target_url = match Url::parse(field("target_url")) {
            Ok(url) if url.has_host() => url,
            _ => {
                warn!(
                    "row {}: '{}' is not an absolute URL, skipping",
                    line + 2,
                    field("target_url")
                );
                continue;
            }
        };

        rows.push(PropertyRow {
            unit_name: unit_name.to_string(),
            room_type: RoomType::parse(field("room_type")),
            property_category,
            role,
            property_name: property_name.to_string(),
            target_url,
        });
    }

    Ok(rows)
}

/// Restrict rows to the selected unit and/or room type.
pub fn filter_rows(
    rows: Vec<PropertyRow>,
    unit: Option<&str>,
    room_type: Option<&RoomType>,
) -> Vec<PropertyRow> {
    rows.into_iter()
        .filter(|row| unit.map_or(true, |u| row.unit_name.eq_ignore_ascii_case(u)))
        .filter(|row| room_type.map_or(true, |rt| &row.room_type == rt))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
unit_name,room_type,role,property_name,target_url,property_category
Villa Mare,double,own,Villa Mare,https://example.com/villa-mare,hotel
Villa Mare,double,competitor,Hotel Adria,https://example.com/hotel-adria,hotel
Villa Mare,family,competitor,Camp Sun,https://example.com/camp-sun,mobile-home
";

    #[test]
    fn loads_valid_rows() {
        let rows = load_rows(SHEET.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].role, Role::Own);
        assert_eq!(rows[2].property_category, PropertyCategory::MobileHome);
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        let sheet = "\
Unit_Name,ROOM_TYPE,Role,Property_Name,Target_URL,Property_Category
Villa Mare,double,own,Villa Mare,https://example.com/villa-mare,hotel
";
        let rows = load_rows(sheet.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn missing_columns_are_a_fatal_error() {
        let sheet = "unit_name,room_type,property_name\nVilla Mare,double,Villa Mare\n";
        match load_rows(sheet.as_bytes()) {
            Err(Error::MissingColumns(mut missing)) => {
                missing.sort();
                assert_eq!(missing, vec!["property_category", "role", "target_url"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn relative_urls_are_skipped_not_fatal() {
        let sheet = "\
unit_name,room_type,role,property_name,target_url,property_category
Villa Mare,double,own,Villa Mare,/villa-mare,hotel
Villa Mare,double,competitor,Hotel Adria,https://example.com/hotel-adria,hotel
";
        let rows = load_rows(sheet.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].property_name, "Hotel Adria");
    }

    #[test]
    fn filter_selects_unit_and_room_type() {
        let rows = load_rows(SHEET.as_bytes()).unwrap();
        let filtered = filter_rows(rows, Some("villa mare"), Some(&RoomType::Double));
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.room_type == RoomType::Double));
    }
}
