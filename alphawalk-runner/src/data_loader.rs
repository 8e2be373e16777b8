//! CSV loading for bars and expiration dates.
//!
//! Bars: a header row naming `Date, Open, High, Low, Close, Volume` (any
//! order, extra columns ignored). Rows with an empty or unparseable field are
//! dropped and counted; the rest are sorted by timestamp and validated into a
//! `BarSeries`, so duplicates surface as a data integrity error.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, warn};

use alphawalk_core::domain::{Bar, BarSeries, ExpirationCalendar};
use alphawalk_core::DataIntegrityError;

/// Timestamp layouts accepted in the `Date` column, tried in order.
pub const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

const BAR_COLUMNS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data integrity: {0}")]
    Integrity(#[from] DataIntegrityError),

    #[error("no usable rows ({dropped} dropped)")]
    NoRows { dropped: usize },
}

/// Parsed bars plus how many rows were discarded on the way.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub series: BarSeries,
    pub dropped_rows: usize,
}

/// Parse one `Date` cell; a bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_bars(path: &Path) -> Result<LoadedBars, LoadError> {
    let loaded = read_bars(open(path)?)?;
    debug!(
        path = %path.display(),
        bars = loaded.series.len(),
        dropped = loaded.dropped_rows,
        "loaded bars"
    );
    Ok(loaded)
}

pub fn read_bars<R: Read>(reader: R) -> Result<LoadedBars, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let mut columns = [0usize; 6];
    for (slot, name) in columns.iter_mut().zip(BAR_COLUMNS) {
        *slot = *index
            .get(name)
            .ok_or_else(|| DataIntegrityError::MissingColumn(name.to_string()))?;
    }
    let [date, open, high, low, close, volume] = columns;

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let number = |i: usize| record.get(i).and_then(|v| v.parse::<f64>().ok()).filter(|v| v.is_finite());
        let parsed = record.get(date).and_then(parse_timestamp).and_then(|timestamp| {
            Some(Bar {
                timestamp,
                open: number(open)?,
                high: number(high)?,
                low: number(low)?,
                close: number(close)?,
                volume: number(volume)?,
            })
        });
        match parsed {
            Some(bar) => bars.push(bar),
            None => {
                dropped += 1;
                debug!(row = row + 1, "dropping incomplete row");
            }
        }
    }
    if dropped > 0 {
        warn!(dropped, kept = bars.len(), "dropped bar rows with missing or unparseable fields");
    }
    if bars.is_empty() {
        return Err(LoadError::NoRows { dropped });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(LoadedBars {
        series: BarSeries::new(bars)?,
        dropped_rows: dropped,
    })
}

pub fn load_expirations(path: &Path) -> Result<ExpirationCalendar, LoadError> {
    read_expirations(open(path)?)
}

/// Dates from the `Date` column; datetimes contribute their date part.
pub fn read_expirations<R: Read>(reader: R) -> Result<ExpirationCalendar, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let column = rdr
        .headers()?
        .iter()
        .position(|h| h == "Date")
        .ok_or_else(|| DataIntegrityError::MissingColumn("Date".to_string()))?;

    let mut calendar = ExpirationCalendar::new();
    let mut dropped = 0usize;
    for record in rdr.records() {
        match record?.get(column).and_then(parse_timestamp) {
            Some(ts) => {
                calendar.insert(ts.date());
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(dropped, "dropped unparseable expiration rows");
    }
    Ok(calendar)
}
