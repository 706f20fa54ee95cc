use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::models::StationRef;

#[derive(Error, Debug)]
pub enum StationListError {
    #[error("Failed to read station list {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse station list CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: expected at least 2 columns, found {found}")]
    MissingColumn { line: usize, found: usize },

    #[error("Line {line}: invalid {column} '{value}': {source}")]
    InvalidId {
        line: usize,
        column: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Load `<local_id>,<source_id>` pairs from a station list file.
///
/// Any malformed row aborts the load; a partial station list is never
/// returned.
pub fn load_station_list(path: &Path) -> Result<Vec<StationRef>, StationListError> {
    info!("Loading station list from file: {path:?}");

    let contents = std::fs::read_to_string(path).map_err(|source| StationListError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let stations = parse_station_list(&contents)?;
    info!("Loaded {} stations", stations.len());
    Ok(stations)
}

pub fn parse_station_list(contents: &str) -> Result<Vec<StationRef>, StationListError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(contents.as_bytes());

    let mut stations = Vec::new();

    for result in reader.records() {
        let record = result?;
        // Blank lines and indented comments survive the reader's own comment handling
        let commented = record.get(0).is_some_and(|field| field.starts_with('#'));
        if commented || record.iter().all(str::is_empty) {
            continue;
        }

        let line = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(stations.len() + 1);
        let station = parse_record(line, &record)?;
        debug!("Line {}: {:?}", line, station);
        stations.push(station);
    }

    Ok(stations)
}

fn parse_record(line: usize, record: &csv::StringRecord) -> Result<StationRef, StationListError> {
    let (Some(local), Some(source)) = (record.get(0), record.get(1)) else {
        return Err(StationListError::MissingColumn {
            line,
            found: record.len(),
        });
    };

    let local_id = parse_id(line, "local id", local)?;
    let source_id = parse_id(line, "source id", source)?;

    Ok(StationRef::new(local_id, source_id))
}

fn parse_id(line: usize, column: &'static str, value: &str) -> Result<u32, StationListError> {
    value.parse::<u32>().map_err(|source| StationListError::InvalidId {
        line,
        column,
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_row() {
        let stations = parse_station_list("1234,8518750").unwrap();
        assert_eq!(stations, vec![StationRef::new(1234, 8518750)]);
    }

    #[test]
    fn test_parse_quoted_row() {
        let stations = parse_station_list("\"1234\",\"8518750\"\n").unwrap();
        assert_eq!(stations, vec![StationRef::new(1234, 8518750)]);
    }

    #[test]
    fn test_parse_quoted_extra_column_with_comma() {
        let stations = parse_station_list("12,8518750,\"The Battery, NY\"\n").unwrap();
        assert_eq!(stations, vec![StationRef::new(12, 8518750)]);
    }

    #[test]
    fn test_parse_preserves_order_and_ignores_extra_columns() {
        let contents = "12,8518750,The Battery\n 1 , 9414290 \n7,1612340,Honolulu,HI\n";
        let stations = parse_station_list(contents).unwrap();

        assert_eq!(
            stations,
            vec![
                StationRef::new(12, 8518750),
                StationRef::new(1, 9414290),
                StationRef::new(7, 1612340),
            ]
        );
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let contents = "# psmsl,noaa\n\n  # indented\n   \n1234,8518750\n\n";
        let stations = parse_station_list(contents).unwrap();
        assert_eq!(stations.len(), 1);
    }

    #[test]
    fn test_parse_non_integer_id_is_fatal() {
        let result = parse_station_list("1234,8518750\nabc,123\n5,6");
        match result {
            Err(StationListError::InvalidId {
                line,
                column,
                value,
                ..
            }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "local id");
                assert_eq!(value, "abc");
            }
            other => panic!("Expected InvalidId error, got: {other:?}"),
        }
    }

    #[test]
    fn test_parse_negative_source_id_is_fatal() {
        let result = parse_station_list("1234,-5");
        assert!(matches!(
            result,
            Err(StationListError::InvalidId {
                column: "source id",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_missing_column() {
        let result = parse_station_list("1234");
        assert!(matches!(
            result,
            Err(StationListError::MissingColumn { line: 1, found: 1 })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_station_list(Path::new("/nonexistent/idList.txt"));
        assert!(matches!(result, Err(StationListError::Io { .. })));
    }

    #[test]
    fn test_error_display_names_line() {
        let err = parse_station_list("abc,123").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Line 1"));
        assert!(message.contains("abc"));
    }
}
