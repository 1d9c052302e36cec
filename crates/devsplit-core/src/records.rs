use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::Error;
use crate::path;

/// Type label for rows whose designated type cell is empty.
pub const UNKNOWN_TYPE: &str = "Unknown";
/// Type label when no type column is designated.
pub const DEFAULT_TYPE: &str = "Points";

/// One source row with a usable path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointRecord {
    /// Canonical full path, leaf segment included.
    pub path: String,
    pub point_type: String,
}

impl PointRecord {
    pub fn new(path: &str, point_type: &str, root: &str) -> Self {
        Self {
            path: path::canonical_path(path, root),
            point_type: point_type.to_string(),
        }
    }
}

/// The user-designated columns of the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub path_column: String,
    pub type_column: Option<String>,
}

impl ColumnSelection {
    pub fn new(path_column: &str) -> Self {
        Self {
            path_column: path_column.to_string(),
            type_column: None,
        }
    }

    pub fn with_type_column(mut self, type_column: &str) -> Self {
        self.type_column = Some(type_column.to_string());
        self
    }
}

impl From<&AppConfig> for ColumnSelection {
    fn from(config: &AppConfig) -> Self {
        Self {
            path_column: config.path_column.clone(),
            type_column: config.type_column.clone(),
        }
    }
}

/// Index of a header cell, ignoring surrounding whitespace and a BOM.
pub fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    let wanted = name.trim();
    headers
        .iter()
        .position(|header| header.trim_start_matches('\u{feff}').trim() == wanted)
}

/// Read point records from CSV text. Rows with an empty path cell are skipped.
pub fn read_points<R: Read>(
    input: R,
    columns: &ColumnSelection,
    root: &str,
) -> Result<Vec<PointRecord>, Error> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers()?.clone();

    let path_idx = find_column(&headers, &columns.path_column)
        .ok_or_else(|| Error::MissingColumn(columns.path_column.clone()))?;

    let type_idx = match columns.type_column.as_deref() {
        Some(name) => {
            let idx = find_column(&headers, name);
            if idx.is_none() {
                warn!("Type column '{}' not found, using '{}'", name, UNKNOWN_TYPE);
            }
            Some(idx)
        }
        None => None,
    };

    let mut points = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let raw_path = record.get(path_idx).unwrap_or("").trim();
        if path::is_root(raw_path, root) {
            skipped += 1;
            continue;
        }

        let point_type = match type_idx {
            None => DEFAULT_TYPE.to_string(),
            Some(idx) => {
                let cell = idx.and_then(|i| record.get(i)).unwrap_or("").trim();
                if cell.is_empty() {
                    UNKNOWN_TYPE.to_string()
                } else {
                    cell.to_string()
                }
            }
        };

        points.push(PointRecord::new(raw_path, &point_type, root));
    }

    debug!("Read {} points ({} rows without a path)", points.len(), skipped);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "root";

    #[test]
    fn test_read_points_with_type_column() {
        let csv = "name,path,kind\n\
                   a,root/A/1,Temp\n\
                   b,root/A/2,\n\
                   c,  ,Temp\n\
                   d,B/1,Flow\n";
        let columns = ColumnSelection::new("path").with_type_column("kind");
        let points = read_points(csv.as_bytes(), &columns, ROOT).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0], PointRecord::new("root/A/1", "Temp", ROOT));
        assert_eq!(points[1].point_type, UNKNOWN_TYPE);
        // Paths without the root label are anchored under it.
        assert_eq!(points[2].path, "root/B/1");
    }

    #[test]
    fn test_read_points_without_type_column() {
        let csv = "path\nroot/A/1\n";
        let points = read_points(csv.as_bytes(), &ColumnSelection::new("path"), ROOT).unwrap();
        assert_eq!(points[0].point_type, DEFAULT_TYPE);
    }

    #[test]
    fn test_read_points_missing_path_column() {
        let csv = "name,kind\na,b\n";
        let result = read_points(csv.as_bytes(), &ColumnSelection::new("path"), ROOT);
        assert!(matches!(result, Err(Error::MissingColumn(ref c)) if c == "path"));
    }

    #[test]
    fn test_read_points_short_rows() {
        let csv = "kind,path\nTemp\nFlow,root/X/1\n";
        let columns = ColumnSelection::new(" path ").with_type_column("kind");
        let points = read_points(csv.as_bytes(), &columns, ROOT).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].point_type, "Flow");
    }
}
