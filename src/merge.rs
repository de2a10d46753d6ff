//! Alignment of photometry and behavior on a shared time axis.
//!
//! ```text
//! ChannelFrame  ─┐
//!                ├─ key = round_half_even(t × 100)    centisecond grid
//! BehaviorFrame ─┘
//!   ├─ join on key                 rows present in both sources only
//!   ├─ TtlPolicy::DropZero         drop rows with TTL == 0
//!   └─ dense 0..N-1 index          fps = min(photometry, behavior)
//! ```
//!
//! Duplicate keys within one source keep their first row.
use ndarray::Array1;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::behavior::BehaviorFrame;
use crate::binning::grid_key;
use crate::config::{MergeConfig, TtlPolicy};
use crate::error::{Error, Result};
use crate::photometry::ChannelFrame;

/// Join grid in seconds (two decimals).
pub const MERGE_STEP: f64 = 0.01;

/// Name of the event column derived from behavior.
pub const FREEZING: &str = "freezing";

/// Name of the behavior velocity column.
pub const VELOCITY: &str = "velocity";

/// Aligned photometry and behavior, densely indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    /// Seconds, strictly increasing.
    pub time: Array1<f64>,
    pub ttl: Array1<f64>,
    /// Numeric columns: photometry channels, `velocity`, `{part}_x`,
    /// `{part}_y`.
    pub columns: BTreeMap<String, Array1<f64>>,
    /// Boolean event columns, e.g. `freezing`.
    pub events: BTreeMap<String, Vec<bool>>,
    pub fps: f64,
}

impl MergedRecord {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<&Array1<f64>> {
        self.columns
            .get(name)
            .ok_or_else(|| Error::MissingRequiredColumn { column: name.to_string() })
    }

    pub fn event(&self, name: &str) -> Result<&[bool]> {
        self.events
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingRequiredColumn { column: name.to_string() })
    }

    /// Regions with a `.zdFF` column, sorted.
    pub fn regions(&self) -> Vec<String> {
        self.columns
            .keys()
            .filter_map(|k| k.strip_suffix(".zdFF").map(str::to_string))
            .collect()
    }
}

/// First row index per grid key; returns the map and the number of
/// duplicate rows skipped.
fn index_by_key(time: &Array1<f64>) -> (BTreeMap<i64, usize>, usize) {
    let mut map = BTreeMap::new();
    let mut duplicates = 0;
    for (i, &t) in time.iter().enumerate() {
        match map.entry(grid_key(t, MERGE_STEP)) {
            Entry::Vacant(e) => {
                e.insert(i);
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }
    (map, duplicates)
}

fn take(src: &Array1<f64>, rows: &[usize]) -> Array1<f64> {
    rows.iter().map(|&i| src[i]).collect()
}

fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::LengthMismatch { expected, got })
    }
}

/// Join `signal` and `behavior` on their centisecond-rounded times.
///
/// Only rows present in both sources survive. With
/// [`TtlPolicy::DropZero`] rows whose TTL is exactly zero are removed
/// afterwards.
///
/// # Errors
///
/// * [`Error::MissingRequiredColumn`] if the photometry frame has no TTL
///   values for its rows.
/// * [`Error::LengthMismatch`] if a column of either frame does not match
///   its time axis.
pub fn merge(signal: ChannelFrame, behavior: BehaviorFrame, cfg: &MergeConfig) -> Result<MergedRecord> {
    let n_sig = signal.len();
    let n_beh = behavior.len();
    if n_sig > 0 && signal.ttl.is_empty() {
        return Err(Error::MissingRequiredColumn { column: "ttl".into() });
    }
    check_len(n_sig, signal.ttl.len())?;
    for values in signal.channels.values() {
        check_len(n_sig, values.len())?;
    }
    check_len(n_beh, behavior.velocity.len())?;
    check_len(n_beh, behavior.freezing.len())?;
    for (x, y) in behavior.parts.values() {
        check_len(n_beh, x.len())?;
        check_len(n_beh, y.len())?;
    }

    let (sig_index, sig_dups) = index_by_key(&signal.time);
    let (beh_index, beh_dups) = index_by_key(&behavior.time);
    if sig_dups + beh_dups > 0 {
        log::warn!(
            "merge: {sig_dups} photometry and {beh_dups} behavior row(s) share a time key; kept the first"
        );
    }

    // (key, photometry row, behavior row)
    let mut rows: Vec<(i64, usize, usize)> = sig_index
        .iter()
        .filter_map(|(&k, &i)| beh_index.get(&k).map(|&j| (k, i, j)))
        .collect();
    let joined = rows.len();
    log::debug!(
        "merge: {} photometry-only, {} behavior-only, {} matched row(s)",
        sig_index.len() - joined,
        beh_index.len() - joined,
        joined
    );

    if cfg.ttl_policy == TtlPolicy::DropZero {
        rows.retain(|&(_, i, _)| signal.ttl[i] != 0.0);
        if rows.len() < joined {
            log::info!("merge: dropped {} row(s) with TTL = 0", joined - rows.len());
        }
    }

    let sig_rows: Vec<usize> = rows.iter().map(|r| r.1).collect();
    let beh_rows: Vec<usize> = rows.iter().map(|r| r.2).collect();

    let time: Array1<f64> = rows.iter().map(|&(k, _, _)| k as f64 * MERGE_STEP).collect();
    let ttl = take(&signal.ttl, &sig_rows);

    let mut columns = BTreeMap::new();
    for (name, values) in &signal.channels {
        columns.insert(name.clone(), take(values, &sig_rows));
    }
    columns.insert(VELOCITY.to_string(), take(&behavior.velocity, &beh_rows));
    for (part, (x, y)) in &behavior.parts {
        columns.insert(format!("{part}_x"), take(x, &beh_rows));
        columns.insert(format!("{part}_y"), take(y, &beh_rows));
    }

    let mut events = BTreeMap::new();
    events.insert(
        FREEZING.to_string(),
        beh_rows.iter().map(|&j| behavior.freezing[j]).collect(),
    );

    let fps = signal.fps.min(behavior.fps);
    log::info!("merged {} row(s) at {fps} fps", rows.len());
    Ok(MergedRecord { time, ttl, columns, events, fps })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(n: usize, step: f64) -> ChannelFrame {
        let mut channels = BTreeMap::new();
        channels.insert(
            "ACC.zdFF".to_string(),
            Array1::from_iter((0..n).map(|i| i as f64)),
        );
        ChannelFrame {
            time: Array1::from_iter((0..n).map(|i| i as f64 * step)),
            ttl: Array1::ones(n),
            channels,
            fps: 1.0 / step,
        }
    }

    fn behavior(n: usize, fps: f64) -> BehaviorFrame {
        let mut parts = BTreeMap::new();
        parts.insert("head".to_string(), (Array1::zeros(n), Array1::ones(n)));
        BehaviorFrame {
            time: Array1::from_iter((0..n).map(|i| i as f64 / fps)),
            parts,
            velocity: Array1::from_iter((0..n).map(|i| i as f64 * 10.0)),
            freezing: (0..n).map(|i| i % 2 == 0).collect(),
            fps,
        }
    }

    #[test]
    fn keeps_only_shared_keys() {
        // 100 Hz photometry, 50 Hz behavior: every second photometry row.
        let m = merge(signal(100, 0.01), behavior(40, 50.0), &MergeConfig::default()).unwrap();
        assert_eq!(m.len(), 40);
        assert_eq!(m.fps, 50.0);
        assert_eq!(m.column("ACC.zdFF").unwrap()[3], 6.0);
        assert_eq!(m.column(VELOCITY).unwrap()[3], 30.0);
        assert!(m.columns.contains_key("head_x") && m.columns.contains_key("head_y"));
        assert_eq!(m.event(FREEZING).unwrap().len(), 40);
        assert!(m.time.windows(2).into_iter().all(|w| w[0] < w[1]));
        // Output times sit on the merge grid: row k of the 50 Hz join is key 2k.
        for (k, &t) in m.time.iter().enumerate() {
            assert_eq!(grid_key(t, MERGE_STEP), 2 * k as i64);
        }
    }

    #[test]
    fn ttl_policy_is_configurable() {
        let mut sig = signal(50, 0.01);
        for i in 0..10 {
            sig.ttl[i] = 0.0;
        }
        let beh = behavior(50, 100.0);
        let dropped = merge(sig.clone(), beh.clone(), &MergeConfig::default()).unwrap();
        assert_eq!(dropped.len(), 40);
        approx::assert_abs_diff_eq!(dropped.time[0], 0.1, epsilon = 1e-12);

        let kept = merge(sig, beh, &MergeConfig { ttl_policy: TtlPolicy::Keep }).unwrap();
        assert_eq!(kept.len(), 50);
    }

    #[test]
    fn duplicate_keys_keep_first_row() {
        let mut sig = signal(5, 0.01);
        sig.time[2] = 0.0101;
        let m = merge(sig, behavior(5, 100.0), &MergeConfig::default()).unwrap();
        assert_eq!(m.len(), 4);
        assert_eq!(m.column("ACC.zdFF").unwrap().to_vec(), vec![0.0, 1.0, 3.0, 4.0]);
    }

    #[test]
    fn missing_ttl_is_rejected() {
        let mut sig = signal(5, 0.01);
        sig.ttl = Array1::zeros(0);
        assert!(matches!(
            merge(sig, behavior(5, 100.0), &MergeConfig::default()),
            Err(Error::MissingRequiredColumn { .. })
        ));
    }

    #[test]
    fn regions_from_zdff_columns() {
        let m = merge(signal(4, 0.01), behavior(4, 100.0), &MergeConfig::default()).unwrap();
        assert_eq!(m.regions(), vec!["ACC".to_string()]);
    }
}
