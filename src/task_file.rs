use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::models::{MonthlyRecord, StationRef};

#[cfg(unix)]
const TASK_FILE_MODE: u32 = 0o644;

pub const TASK_FILE_EXTENSION: &str = "tsk";

#[derive(Error, Debug)]
pub enum TaskFileError {
    #[error("I/O error on task file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task file {path:?}, line {line}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> TaskFileError + '_ {
    move |source| TaskFileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `<dir>/<local_id>_<source_id>.tsk`
pub fn task_file_path(dir: &Path, station: &StationRef) -> PathBuf {
    dir.join(format!(
        "{}.{}",
        station.task_file_stem(),
        TASK_FILE_EXTENSION
    ))
}

/// Write a station's records, replacing any previous file.
///
/// Format: two `#` header lines, then `year<TAB>month<TAB>height_m<TAB>inferred`
/// per record with `inferred` as `0` or `1`. The file is written to a temp
/// file in the same directory and renamed into place.
pub fn write_task_file(
    path: &Path,
    station: &StationRef,
    records: &[MonthlyRecord],
) -> Result<(), TaskFileError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write_records(&mut writer, station, records).map_err(io_error(path))?;
        writer.flush().map_err(io_error(path))?;
    }
    // Temp files are created 0600; task files are shared output
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(TASK_FILE_MODE))
            .map_err(io_error(path))?;
    }
    temp.persist(path).map_err(|e| io_error(path)(e.error))?;

    debug!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}

fn write_records<W: Write>(
    writer: &mut W,
    station: &StationRef,
    records: &[MonthlyRecord],
) -> std::io::Result<()> {
    writeln!(
        writer,
        "# station {station} monthly mean sea level (metres above STND datum)"
    )?;
    writeln!(writer, "# year\tmonth\theight_m\tinferred")?;
    for record in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            record.year(),
            record.month(),
            record.height_m(),
            u8::from(record.inferred())
        )?;
    }
    Ok(())
}

pub fn read_task_file(path: &Path) -> Result<Vec<MonthlyRecord>, TaskFileError> {
    let contents = fs::read_to_string(path).map_err(io_error(path))?;
    let mut records = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record = parse_line(trimmed).map_err(|message| TaskFileError::Malformed {
            path: path.to_path_buf(),
            line: idx + 1,
            message,
        })?;
        records.push(record);
    }

    Ok(records)
}

fn parse_line(line: &str) -> Result<MonthlyRecord, String> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() != 4 {
        return Err(format!("expected 4 fields, found {}", parts.len()));
    }

    let year = parts[0]
        .parse::<i32>()
        .map_err(|e| format!("year '{}': {e}", parts[0]))?;
    let month = parts[1]
        .parse::<u32>()
        .map_err(|e| format!("month '{}': {e}", parts[1]))?;
    let height_m = parts[2]
        .parse::<f64>()
        .map_err(|e| format!("height '{}': {e}", parts[2]))?;
    let inferred = match parts[3] {
        "0" => false,
        "1" => true,
        other => return Err(format!("inferred flag '{other}'")),
    };

    MonthlyRecord::new(year, month, height_m, inferred)
        .ok_or_else(|| format!("{year}-{month} is not a calendar month"))
}
