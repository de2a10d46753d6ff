//! Pose-tracking loading, movement velocity and freezing detection.
//!
//! ```text
//! tracking.csv (DeepLabCut, 3 header rows)
//!   ├─ box_sum(x|y, 60)             head and base of tail, per axis
//!   ├─ |Δ(x, y)| per frame          per part, then mean of both parts
//!   ├─ pad last velocity            keeps one value per frame
//!   ├─ mean over centred window 5   < 6 → immobile
//!   └─ box_sum(mask, 10) > 2        removes single-frame flicker
//! ```
//!
//! The coordinate kernel is an unnormalised sum, so velocities are in
//! box-summed pixels per frame; the default threshold is calibrated to
//! that unit.
use ndarray::Array1;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::BehaviorConfig;
use crate::error::{Error, Result};
use crate::filter::box_sum;
use crate::io::{read_tracking, TrackingTable};

/// Per-frame tracking data with derived velocity and freezing.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorFrame {
    /// `index / fps`, seconds.
    pub time: Array1<f64>,
    /// Raw body-part coordinates, part → (x, y).
    pub parts: BTreeMap<String, (Array1<f64>, Array1<f64>)>,
    pub velocity: Array1<f64>,
    pub freezing: Vec<bool>,
    pub fps: f64,
}

impl BehaviorFrame {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Euclidean frame-to-frame displacement; one sample shorter than the
/// input.
pub fn velocity(x: &[f64], y: &[f64]) -> Vec<f64> {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(dx, dy)| ((dx[1] - dx[0]).powi(2) + (dy[1] - dy[0]).powi(2)).sqrt())
        .collect()
}

/// Classify each sample as freezing from a velocity trace.
///
/// A sample is immobile when the mean velocity over a centred window of
/// `freeze_window` samples (clipped at the edges) is below
/// `freeze_threshold`. The immobility mask is then box-summed with width
/// `flicker_kernel` and thresholded at `> flicker_threshold`.
pub fn detect_freezing(velocity: &[f64], cfg: &BehaviorConfig) -> Vec<bool> {
    let n = velocity.len();
    let w = cfg.freeze_window.max(1);
    let left = (w - 1) / 2;
    let right = w - 1 - left;

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for &v in velocity {
        let last = *prefix.last().unwrap_or(&0.0);
        prefix.push(last + v);
    }

    let immobile: Vec<f64> = (0..n)
        .map(|i| {
            let lo = i.saturating_sub(left);
            let hi = (i + right + 1).min(n);
            let mean = (prefix[hi] - prefix[lo]) / (hi - lo) as f64;
            if mean < cfg.freeze_threshold { 1.0 } else { 0.0 }
        })
        .collect();

    box_sum(&immobile, cfg.flicker_kernel)
        .into_iter()
        .map(|s| s > cfg.flicker_threshold)
        .collect()
}

/// Mean movement velocity of head and base of tail after box smoothing,
/// padded to one value per frame.
pub fn movement_velocity(
    head: (&[f64], &[f64]),
    base: (&[f64], &[f64]),
    kernel: usize,
) -> Result<Vec<f64>> {
    let n = head.0.len();
    if n < 2 {
        return Err(Error::TooShort { what: "velocity".into(), needed: 2, got: n });
    }
    let smooth = |v: &[f64]| box_sum(v, kernel);
    let head_v = velocity(&smooth(head.0), &smooth(head.1));
    let base_v = velocity(&smooth(base.0), &smooth(base.1));

    let mut v: Vec<f64> = head_v.iter().zip(&base_v).map(|(h, b)| (h + b) / 2.0).collect();
    let last = v[v.len() - 1];
    v.push(last);
    Ok(v)
}

fn part<'a>(table: &'a TrackingTable, name: &str) -> Result<(&'a [f64], &'a [f64])> {
    table
        .parts
        .get(name)
        .map(|(x, y)| (x.as_slice(), y.as_slice()))
        .ok_or_else(|| Error::MissingColumn { path: table.path.clone(), column: name.into() })
}

/// Load a DeepLabCut tracking CSV and derive velocity and freezing.
///
/// # Errors
///
/// * [`Error::MissingColumn`] if a configured body part is absent.
/// * [`Error::EmptyInput`] if there are no data rows.
/// * [`Error::TooShort`] if there is a single data row.
pub fn load_behavior(path: impl AsRef<Path>, cfg: &BehaviorConfig) -> Result<BehaviorFrame> {
    let path = path.as_ref();
    if !(cfg.fps > 0.0) {
        return Err(Error::InvalidParameter(format!("behavior fps must be positive, got {}", cfg.fps)));
    }

    let extra: Vec<&str> = cfg.extra_parts.iter().map(String::as_str).collect();
    let table = read_tracking(path, &[cfg.head.as_str(), cfg.base.as_str()], &extra)?;
    if table.n_rows == 0 {
        return Err(Error::EmptyInput { path: path.to_path_buf() });
    }

    let velocity = movement_velocity(
        part(&table, &cfg.head)?,
        part(&table, &cfg.base)?,
        cfg.position_kernel,
    )?;
    let freezing = detect_freezing(&velocity, cfg);

    let n = table.n_rows;
    let time = Array1::from_iter((0..n).map(|i| i as f64 / cfg.fps));
    let n_freezing = freezing.iter().filter(|&&f| f).count();
    log::info!(
        "{}: {} frames @ {} fps, {:.1}% freezing",
        path.display(),
        n,
        cfg.fps,
        100.0 * n_freezing as f64 / n as f64
    );

    let parts = table
        .parts
        .into_iter()
        .map(|(name, (x, y))| (name, (Array1::from(x), Array1::from(y))))
        .collect();

    Ok(BehaviorFrame {
        time,
        parts,
        velocity: Array1::from(velocity),
        freezing,
        fps: cfg.fps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_is_one_shorter() {
        let v = velocity(&[0.0, 3.0, 3.0], &[0.0, 4.0, 4.0]);
        assert_eq!(v, vec![5.0, 0.0]);
    }

    #[test]
    fn movement_velocity_pads_last_value() {
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let y = vec![0.0; 100];
        let v = movement_velocity((&x, &y), (&x, &y), 1).unwrap();
        assert_eq!(v.len(), 100);
        assert_eq!(v[98], v[99]);
        approx::assert_abs_diff_eq!(v[50], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn movement_velocity_needs_two_frames() {
        assert!(matches!(
            movement_velocity((&[1.0], &[1.0]), (&[1.0], &[1.0]), 60),
            Err(Error::TooShort { .. })
        ));
    }

    #[test]
    fn freezing_needs_sustained_stillness() {
        let cfg = BehaviorConfig::default();
        // A 2-sample dip is erased by the flicker filter.
        let mut v = vec![20.0; 200];
        v[100] = 0.0;
        v[101] = 0.0;
        assert!(detect_freezing(&v, &cfg).iter().all(|f| !f));

        let mut v = vec![20.0; 200];
        for s in &mut v[80..140] {
            *s = 0.5;
        }
        let f = detect_freezing(&v, &cfg);
        assert!(f[110]);
        assert!(!f[10] && !f[190]);
    }

    #[test]
    fn freezing_length_matches_velocity() {
        let cfg = BehaviorConfig::default();
        assert_eq!(detect_freezing(&[1.0; 7], &cfg).len(), 7);
        assert!(detect_freezing(&[], &cfg).is_empty());
    }
}
