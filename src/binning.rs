//! Time binning onto a fixed grid.
//!
//! Raw photometry timestamps jitter around the nominal rate. Each sample is
//! assigned to the bin `round(t / bin_size)` (ties to even, as numpy's
//! `round`) and every bin is reduced to a single row:
//!
//! ```text
//! key   = round_half_even(t / bin_size)
//! time  = key * bin_size
//! value = mean(values in bin)    (signal channels)
//! ttl   = min(ttl in bin)        (any zero marks the bin invalid)
//! ```
//!
//! Bins come out strictly increasing in time, one row per distinct key.
use ndarray::Array1;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// How a column is reduced within a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    Mean,
    Min,
}

/// Output of [`bin_by_time`]: one entry per bin, columns in input order.
#[derive(Debug, Clone)]
pub struct Binned {
    pub time: Array1<f64>,
    pub columns: Vec<Array1<f64>>,
}

/// Grid key of timestamp `t` on a `step` grid.
pub fn grid_key(t: f64, step: f64) -> i64 {
    (t / step).round_ties_even() as i64
}

/// Bin `columns` (each the same length as `time`) onto a `bin_size` grid.
pub fn bin_by_time(
    time: &[f64],
    columns: &[(&[f64], Reduce)],
    bin_size: f64,
) -> Result<Binned> {
    if !(bin_size > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "bin size must be positive, got {bin_size}"
        )));
    }
    for (col, _) in columns {
        if col.len() != time.len() {
            return Err(Error::LengthMismatch { expected: time.len(), got: col.len() });
        }
    }

    // key → (count, per-column accumulator)
    let mut bins: BTreeMap<i64, (usize, Vec<f64>)> = BTreeMap::new();
    for (row, &t) in time.iter().enumerate() {
        let key = grid_key(t, bin_size);
        let entry = bins.entry(key).or_insert_with(|| {
            let init = columns
                .iter()
                .map(|(_, r)| match r {
                    Reduce::Mean => 0.0,
                    Reduce::Min => f64::INFINITY,
                })
                .collect();
            (0, init)
        });
        entry.0 += 1;
        for (acc, (col, reduce)) in entry.1.iter_mut().zip(columns) {
            match reduce {
                Reduce::Mean => *acc += col[row],
                Reduce::Min => *acc = acc.min(col[row]),
            }
        }
    }

    let n_bins = bins.len();
    let mut out_time = Vec::with_capacity(n_bins);
    let mut out_cols: Vec<Vec<f64>> = vec![Vec::with_capacity(n_bins); columns.len()];
    for (key, (count, accs)) in bins {
        out_time.push(key as f64 * bin_size);
        for ((out, acc), (_, reduce)) in out_cols.iter_mut().zip(accs).zip(columns) {
            out.push(match reduce {
                Reduce::Mean => acc / count as f64,
                Reduce::Min => acc,
            });
        }
    }

    Ok(Binned {
        time: Array1::from(out_time),
        columns: out_cols.into_iter().map(Array1::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_and_mins_per_bin() {
        let time = [0.001, 0.004, 0.011, 0.0149, 0.021];
        let sig = [1.0, 3.0, 10.0, 20.0, 5.0];
        let ttl = [1.0, 0.0, 1.0, 1.0, 1.0];
        let b = bin_by_time(&time, &[(&sig, Reduce::Mean), (&ttl, Reduce::Min)], 0.01).unwrap();

        assert_eq!(b.time.len(), 3);
        approx::assert_abs_diff_eq!(b.time[1], 0.01, epsilon = 1e-12);
        assert_eq!(b.columns[0].to_vec(), vec![2.0, 15.0, 5.0]);
        assert_eq!(b.columns[1].to_vec(), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn unsorted_input_comes_out_sorted() {
        let time = [0.03, 0.01, 0.02];
        let v = [3.0, 1.0, 2.0];
        let b = bin_by_time(&time, &[(&v, Reduce::Mean)], 0.01).unwrap();
        assert_eq!(b.columns[0].to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(b.time.windows(2).into_iter().all(|w| w[0] < w[1]));
    }

    #[test]
    fn ties_round_to_even() {
        assert_eq!(grid_key(0.5, 1.0), 0);
        assert_eq!(grid_key(1.5, 1.0), 2);
        assert_eq!(grid_key(2.4, 1.0), 2);
    }

    #[test]
    fn rejects_bad_bin_size_and_lengths() {
        assert!(bin_by_time(&[0.0], &[], 0.0).is_err());
        assert!(matches!(
            bin_by_time(&[0.0, 0.1], &[(&[1.0], Reduce::Mean)], 0.01),
            Err(Error::LengthMismatch { .. })
        ));
    }
}
