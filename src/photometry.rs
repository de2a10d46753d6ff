//! Photometry loading: rename, clean, bin, low-pass.
//!
//! ```text
//! recording.csv
//!   ├─ read_table          drop rows with any missing cell
//!   ├─ ChannelMap rename   raw column → "{Region}.signal" / ".control"
//!   ├─ bin_by_time         mean per bin, TTL = min per bin
//!   └─ filtfilt            2nd-order Butterworth low-pass per channel
//! ```
//!
//! Dropping incomplete rows before binning can shift the first bin forward
//! in wall-clock time; the number of dropped rows is logged.
use ndarray::Array1;
use std::collections::BTreeMap;
use std::path::Path;

use crate::binning::{bin_by_time, Reduce};
use crate::config::PhotometryConfig;
use crate::error::{Error, Result};
use crate::filter::{butter_lowpass, filtfilt_array};
use crate::io::read_table;

/// Time-indexed photometry frame, one row per bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFrame {
    /// Bin times in seconds, strictly increasing.
    pub time: Array1<f64>,
    /// Binned TTL / marker column.
    pub ttl: Array1<f64>,
    /// Canonical channel name → values.
    pub channels: BTreeMap<String, Array1<f64>>,
    /// Nominal sampling rate (Hz).
    pub fps: f64,
}

impl ChannelFrame {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn channel(&self, name: &str) -> Result<&Array1<f64>> {
        self.channels
            .get(name)
            .ok_or_else(|| Error::MissingRequiredColumn { column: name.to_string() })
    }

    /// Region prefixes present among the channel names.
    pub fn regions(&self) -> Vec<String> {
        let mut r: Vec<String> = self
            .channels
            .keys()
            .filter_map(|k| k.split_once('.').map(|(region, _)| region.to_string()))
            .collect();
        r.dedup();
        r
    }
}

/// Load a photometry CSV into a binned, low-pass filtered [`ChannelFrame`].
///
/// # Errors
///
/// * [`Error::MissingColumn`] if the time column, the TTL column or a
///   channel-map source column is absent.
/// * [`Error::EmptyInput`] if no complete row remains.
/// * [`Error::InvalidParameter`] for a non-positive bin size or a cutoff
///   outside `(0, fps / 2)`.
pub fn load_signal(path: impl AsRef<Path>, cfg: &PhotometryConfig) -> Result<ChannelFrame> {
    let path = path.as_ref();
    let table = read_table(path)?;

    let required = std::iter::once(cfg.time_column.as_str())
        .chain(std::iter::once(cfg.ttl_column.as_str()))
        .chain(cfg.channel_map.iter().map(|(raw, _)| raw));
    for column in required {
        if !table.has_column(column) {
            return Err(Error::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    if table.dropped > 0 {
        log::warn!(
            "{}: dropped {} row(s) with missing values",
            path.display(),
            table.dropped
        );
    }
    if table.n_rows() == 0 {
        return Err(Error::EmptyInput { path: path.to_path_buf() });
    }

    let time = table.column(&cfg.time_column)?;
    let ttl = table.column(&cfg.ttl_column)?;
    let mut names = Vec::new();
    let mut raw = Vec::new();
    for (source, target) in cfg.channel_map.iter() {
        names.push(target.to_string());
        raw.push(table.column(source)?);
    }

    let frame = build_frame(&time, &ttl, names, &raw, cfg)?;
    log::info!(
        "{}: {} rows → {} bins of {} s, {} channel(s)",
        path.display(),
        table.n_rows(),
        frame.len(),
        cfg.bin_size,
        frame.channels.len()
    );
    Ok(frame)
}

/// Bin and filter already-parsed columns. `raw[i]` holds the values of
/// channel `names[i]`.
pub fn build_frame(
    time: &[f64],
    ttl: &[f64],
    names: Vec<String>,
    raw: &[Vec<f64>],
    cfg: &PhotometryConfig,
) -> Result<ChannelFrame> {
    let mut columns: Vec<(&[f64], Reduce)> = vec![(ttl, Reduce::Min)];
    columns.extend(raw.iter().map(|c| (c.as_slice(), Reduce::Mean)));

    let binned = bin_by_time(time, &columns, cfg.bin_size)?;
    let coeffs = butter_lowpass(cfg.filter_order, cfg.cutoff, cfg.fps)?;

    let mut binned_cols = binned.columns.into_iter();
    let ttl = binned_cols.next().unwrap_or_default();
    let channels = names
        .into_iter()
        .zip(binned_cols)
        .map(|(name, values)| {
            let filtered = filtfilt_array(&values, &coeffs);
            (name, filtered)
        })
        .collect();

    Ok(ChannelFrame { time: binned.time, ttl, channels, fps: cfg.fps })
}
