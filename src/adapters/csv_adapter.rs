//! CSV bar source.
//!
//! Expects a header row with a timestamp column (`timestamp`, `datetime`,
//! `date` or `time`) and `open`, `high`, `low`, `close`, `volume`, in any
//! order and case. Rows with an empty field are skipped. Timestamps with an
//! offset are converted to UTC. When a timestamp repeats, the last row wins.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::RegimeTraderError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;

const TIMESTAMP_HEADERS: [&str; 4] = ["timestamp", "datetime", "date", "time"];
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, RegimeTraderError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |wanted: &str| -> Result<usize, RegimeTraderError> {
            names
                .iter()
                .position(|n| n == wanted)
                .ok_or_else(|| RegimeTraderError::Data {
                    reason: format!("missing {} column", wanted),
                })
        };
        let timestamp = TIMESTAMP_HEADERS
            .iter()
            .find_map(|h| names.iter().position(|n| n == h))
            .ok_or_else(|| RegimeTraderError::Data {
                reason: "missing timestamp column".into(),
            })?;

        Ok(Columns {
            timestamp,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }

    fn all(&self) -> [usize; 6] {
        [
            self.timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        ]
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_utc());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_number(
    record: &StringRecord,
    idx: usize,
    name: &str,
    line: u64,
) -> Result<f64, RegimeTraderError> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|e| RegimeTraderError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })
}

/// Keep the last occurrence of each timestamp, at that occurrence's position.
pub fn keep_last_duplicates(bars: Vec<Bar>) -> Vec<Bar> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Bar> = bars
        .into_iter()
        .rev()
        .filter(|b| seen.insert(b.timestamp))
        .collect();
    kept.reverse();
    kept
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self) -> Result<Vec<Bar>, RegimeTraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| RegimeTraderError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| RegimeTraderError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        let cols = Columns::from_headers(headers)?;

        let mut bars = Vec::new();
        let mut skipped = 0usize;
        for result in rdr.records() {
            let record = result.map_err(|e| RegimeTraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if cols
                .all()
                .iter()
                .any(|&i| record.get(i).is_none_or(|v| v.trim().is_empty()))
            {
                skipped += 1;
                continue;
            }

            let raw_ts = record.get(cols.timestamp).unwrap_or("");
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| RegimeTraderError::Data {
                reason: format!("line {}: invalid timestamp '{}'", line, raw_ts),
            })?;

            bars.push(Bar {
                timestamp,
                open: parse_number(&record, cols.open, "open", line)?,
                high: parse_number(&record, cols.high, "high", line)?,
                low: parse_number(&record, cols.low, "low", line)?,
                close: parse_number(&record, cols.close, "close", line)?,
                volume: parse_number(&record, cols.volume, "volume", line)?,
            });
        }

        if skipped > 0 {
            tracing::debug!("skipped {} rows with missing fields", skipped);
        }

        let total = bars.len();
        let bars = keep_last_duplicates(bars);
        if bars.len() < total {
            tracing::warn!(
                "dropped {} duplicate timestamps from {}",
                total - bars.len(),
                self.path.display()
            );
        }

        if bars.is_empty() {
            return Err(RegimeTraderError::Data {
                reason: format!("no bars in {}", self.path.display()),
            });
        }
        Ok(bars)
    }
}
