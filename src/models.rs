use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// A tide gauge as known to the local catalog and to the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StationRef {
    pub local_id: u32,
    pub source_id: u32,
}

impl StationRef {
    pub fn new(local_id: u32, source_id: u32) -> Self {
        Self {
            local_id,
            source_id,
        }
    }

    /// File stem for the station's output, `<local_id>_<source_id>`
    pub fn task_file_stem(&self) -> String {
        format!("{}_{}", self.local_id, self.source_id)
    }
}

impl fmt::Display for StationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.local_id, self.source_id)
    }
}

/// One validated monthly mean sea level value.
///
/// The month is stored as the first day of that month, so a record always
/// has a valid calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRecord {
    date: NaiveDate,
    height_m: f64,
    inferred: bool,
}

impl MonthlyRecord {
    /// Returns `None` when `(year, month)` is not a calendar month
    pub fn new(year: i32, month: u32, height_m: f64, inferred: bool) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self {
            date,
            height_m,
            inferred,
        })
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn height_m(&self) -> f64 {
        self.height_m
    }

    pub fn inferred(&self) -> bool {
        self.inferred
    }

    /// `YYYY-MM`, used in run reports
    pub fn month_label(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}
