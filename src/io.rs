//! CSV I/O for recordings and pipeline outputs.
//!
//! Readers:
//!   - [`read_table`]: photometry export, one header row, missing cells
//!     (empty / `nan`) drop the whole row.
//!   - [`read_tracking`]: DeepLabCut export, three header rows
//!     (scorer, body parts, coordinate axes).
//!
//! Writers produce long-format CSV for the shell binaries.
use ndarray::Array1;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::aggregate::Aggregate;
use crate::epoch::Epoch;
use crate::error::{Error, Result};
use crate::merge::MergedRecord;

// ── Readers ───────────────────────────────────────────────────────────────────

/// A header-row CSV with incomplete rows removed.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    records: Vec<csv::StringRecord>,
    /// Rows discarded because at least one cell was missing.
    pub dropped: usize,
}

fn is_missing(cell: &str) -> bool {
    let c = cell.trim();
    c.is_empty() || c.eq_ignore_ascii_case("nan") || c.eq_ignore_ascii_case("na")
}

fn parse_cell(path: &Path, record: &csv::StringRecord, idx: usize, column: &str) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("");
    raw.trim().parse::<f64>().map_err(|_| Error::Parse {
        path: path.to_path_buf(),
        row: record.position().map(|p| p.line() as usize).unwrap_or(0),
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Read a single-header CSV, dropping every row that has a missing cell in
/// any column.
pub fn read_table(path: impl AsRef<Path>) -> Result<RawTable> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let n_cols = headers.len();

    let mut records = Vec::new();
    let mut dropped = 0;
    for result in reader.records() {
        let record = result?;
        if record.len() < n_cols || record.iter().any(is_missing) {
            dropped += 1;
            continue;
        }
        records.push(record);
    }

    Ok(RawTable { path: path.to_path_buf(), headers, records, dropped })
}

impl RawTable {
    pub fn n_rows(&self) -> usize {
        self.records.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Parse column `name` as `f64`.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })?;
        self.records
            .iter()
            .map(|r| parse_cell(&self.path, r, idx, name))
            .collect()
    }
}

/// Per-body-part coordinate columns from a tracking export.
#[derive(Debug, Clone)]
pub struct TrackingTable {
    pub path: PathBuf,
    /// Body part → (x, y).
    pub parts: BTreeMap<String, (Vec<f64>, Vec<f64>)>,
    pub n_rows: usize,
}

/// Number of header rows in a DeepLabCut export.
pub const TRACKING_HEADER_ROWS: usize = 3;

/// Read a DeepLabCut CSV.
///
/// Row 1 names the body part of every column; row 2 (`x`, `y`,
/// `likelihood`) is skipped. Following the `part`, `part.1` convention the
/// first column of a part is x and the second y; further columns of the
/// same part (likelihood) are ignored. The first column is the frame
/// index.
///
/// Every part in `required` must be present. Parts in `optional` are read
/// when the file has them.
pub fn read_tracking(
    path: impl AsRef<Path>,
    required: &[&str],
    optional: &[&str],
) -> Result<TrackingTable> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = reader.records();
    let mut header_rows = Vec::with_capacity(TRACKING_HEADER_ROWS);
    for _ in 0..TRACKING_HEADER_ROWS {
        match rows.next() {
            Some(r) => header_rows.push(r?),
            None => return Err(Error::EmptyInput { path: path.to_path_buf() }),
        }
    }
    let names = &header_rows[1];
    let xy_columns = |part: &str| {
        let mut hits = names
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, n)| n.trim() == part)
            .map(|(i, _)| i);
        (hits.next(), hits.next())
    };

    // part → (x column, y column)
    let mut columns: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for &part in required {
        match xy_columns(part) {
            (Some(x), Some(y)) => {
                columns.insert(part, (x, y));
            }
            (Some(_), None) => {
                return Err(Error::MissingColumn {
                    path: path.to_path_buf(),
                    column: format!("{part}.1"),
                })
            }
            _ => {
                return Err(Error::MissingColumn {
                    path: path.to_path_buf(),
                    column: part.to_string(),
                })
            }
        }
    }
    for &part in optional {
        if let (Some(x), Some(y)) = xy_columns(part) {
            columns.entry(part).or_insert((x, y));
        } else {
            log::debug!("{}: optional body part '{part}' not tracked", path.display());
        }
    }

    let mut parts: BTreeMap<String, (Vec<f64>, Vec<f64>)> = columns
        .keys()
        .map(|p| (p.to_string(), (Vec::new(), Vec::new())))
        .collect();
    let mut n_rows = 0;
    for result in rows {
        let record = result?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        for (part, &(xi, yi)) in &columns {
            let x = parse_cell(path, &record, xi, part)?;
            let y = parse_cell(path, &record, yi, &format!("{part}.1"))?;
            if let Some((xs, ys)) = parts.get_mut(*part) {
                xs.push(x);
                ys.push(y);
            }
        }
        n_rows += 1;
    }

    Ok(TrackingTable { path: path.to_path_buf(), parts, n_rows })
}

// ── Writers ───────────────────────────────────────────────────────────────────

/// Write the merged record: time, TTL, every numeric column, every event
/// column (0/1).
pub fn write_merged_csv(merged: &MergedRecord, path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;

    let mut header = vec!["Time(s)".to_string(), "ttl".to_string()];
    header.extend(merged.columns.keys().cloned());
    header.extend(merged.events.keys().cloned());
    w.write_record(&header)?;

    for i in 0..merged.len() {
        let mut row = vec![merged.time[i].to_string(), merged.ttl[i].to_string()];
        row.extend(merged.columns.values().map(|c| c[i].to_string()));
        row.extend(merged.events.values().map(|e| u8::from(e[i]).to_string()));
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// Write epochs in long format: one row per sample, time relative to the
/// anchor in seconds.
pub fn write_epochs_csv(epochs: &[Epoch], before_frames: usize, fps: f64, path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["epoch", "onset", "offset", "beg", "end", "t", "zdFF"])?;
    for (e, ep) in epochs.iter().enumerate() {
        for (k, v) in ep.values.iter().enumerate() {
            let t = (k as f64 - before_frames as f64) / fps;
            w.write_record(&[
                e.to_string(),
                ep.interval.onset.to_string(),
                ep.interval.offset.to_string(),
                ep.bounds.0.to_string(),
                ep.bounds.1.to_string(),
                format!("{t:.4}"),
                v.to_string(),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Write labelled mean/std traces; `None` entries become a single
/// `no data` row so empty groups stay visible.
pub fn write_aggregates_csv(
    traces: &[(String, Option<&Aggregate>)],
    time: &Array1<f64>,
    path: &Path,
) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["group", "n_epochs", "t", "mean", "std"])?;
    for (label, agg) in traces {
        match agg {
            Some(a) => {
                for ((t, m), s) in time.iter().zip(a.mean.iter()).zip(a.std.iter()) {
                    w.write_record(&[
                        label.clone(),
                        a.n_epochs.to_string(),
                        format!("{t:.4}"),
                        m.to_string(),
                        s.to_string(),
                    ])?;
                }
            }
            None => w.write_record(&[label.clone(), "0".into(), "".into(), "".into(), "".into()])?,
        }
    }
    w.flush()?;
    Ok(())
}
