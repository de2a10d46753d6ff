//! Baseline-corrected, z-scored differential fluorescence (zdFF).
//!
//! Per region, with `s` the signal channel and `c` the isosbestic control:
//!
//! ```text
//! s' = moving_average(s, w)          c' = moving_average(c, w)
//! s" = s' - polyfit1(s')             c" = c' - polyfit1(c')
//! zs = (s" - median(s")) / std(s")   zc = (c" - median(c")) / std(c")
//! zdFF = zs - zc
//! ```
//!
//! `std` is the population standard deviation over the full recording.
//! The median centre is the default; [`ZScoreCenter::Mean`] reproduces the
//! mean-centred variant and changes the output materially.
use ndarray::Array1;
use rayon::prelude::*;

use crate::config::{NormalizeConfig, ZScoreCenter};
use crate::error::{Error, Result};
use crate::filter::moving_average;
use crate::photometry::ChannelFrame;

/// Least-squares line `a·i + b` over sample indices, evaluated at every
/// index.
pub fn linear_baseline(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n < 2 {
        return x.to_vec();
    }
    let nf = n as f64;
    let mean_i = (nf - 1.0) / 2.0;
    let mean_x = x.iter().sum::<f64>() / nf;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, &v) in x.iter().enumerate() {
        let di = i as f64 - mean_i;
        sxy += di * (v - mean_x);
        sxx += di * di;
    }
    let slope = sxy / sxx;
    let intercept = mean_x - slope * mean_i;
    (0..n).map(|i| slope * i as f64 + intercept).collect()
}

/// Median with the even-length midpoint convention.
pub fn median(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    let mut v = x.to_vec();
    v.sort_by(f64::total_cmp);
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

/// Population standard deviation (`ddof = 0`).
pub fn population_std(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    (x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Z-score `x` around the chosen centre. Returns `None` when the standard
/// deviation is zero or not finite.
pub fn zscore(x: &[f64], center: ZScoreCenter) -> Option<Vec<f64>> {
    let std = population_std(x);
    if !(std.is_finite() && std > 0.0) {
        return None;
    }
    let c = match center {
        ZScoreCenter::Median => median(x),
        ZScoreCenter::Mean => x.iter().sum::<f64>() / x.len() as f64,
    };
    Some(x.iter().map(|v| (v - c) / std).collect())
}

/// Normalised columns of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSignals {
    pub region: String,
    pub z_signal: Array1<f64>,
    pub z_control: Array1<f64>,
    pub zdff: Array1<f64>,
}

fn detrended(values: &Array1<f64>, window: usize) -> Result<Vec<f64>> {
    let raw = values.to_vec();
    let smoothed = moving_average(&raw, window)?;
    let base = linear_baseline(&smoothed);
    Ok(smoothed.iter().zip(&base).map(|(v, b)| v - b).collect())
}

/// Normalise one region of `frame`.
///
/// # Errors
///
/// * [`Error::MissingRequiredColumn`] if `{region}.signal` or
///   `{region}.control` is absent.
/// * [`Error::DegenerateSignal`] if either channel has zero variance after
///   baseline removal.
/// * [`Error::TooShort`] if the recording is shorter than the smoothing
///   window.
pub fn normalize_region(
    frame: &ChannelFrame,
    region: &str,
    cfg: &NormalizeConfig,
) -> Result<RegionSignals> {
    let sig_name = format!("{region}.signal");
    let ctl_name = format!("{region}.control");
    let signal = detrended(frame.channel(&sig_name)?, cfg.smooth_window)?;
    let control = detrended(frame.channel(&ctl_name)?, cfg.smooth_window)?;

    let degenerate = |channel: String| Error::DegenerateSignal {
        region: region.to_string(),
        channel,
    };
    let z_signal = zscore(&signal, cfg.center).ok_or_else(|| degenerate(sig_name))?;
    let z_control = zscore(&control, cfg.center).ok_or_else(|| degenerate(ctl_name))?;

    let zdff: Vec<f64> = z_signal.iter().zip(&z_control).map(|(s, c)| s - c).collect();
    Ok(RegionSignals {
        region: region.to_string(),
        z_signal: Array1::from(z_signal),
        z_control: Array1::from(z_control),
        zdff: Array1::from(zdff),
    })
}

/// Result of [`normalize`]: the updated frame plus the regions that could
/// not be normalised.
#[derive(Debug)]
pub struct NormalizeOutcome {
    pub frame: ChannelFrame,
    pub failed: Vec<(String, Error)>,
}

/// Normalise every region of `frame`.
///
/// Healthy regions get `.signal` / `.control` replaced by their z-scores
/// and a new `.zdFF` column. A region that fails is reported in
/// [`NormalizeOutcome::failed`] and its raw columns are removed, so nothing
/// un-normalised reaches epoch extraction. Only non-recoverable errors
/// (see [`Error::is_recoverable`]) abort the whole call.
pub fn normalize(mut frame: ChannelFrame, cfg: &NormalizeConfig) -> Result<NormalizeOutcome> {
    let regions = frame.regions();
    let results: Vec<Result<RegionSignals>> = if cfg.parallel {
        regions
            .par_iter()
            .map(|r| normalize_region(&frame, r, cfg))
            .collect()
    } else {
        regions.iter().map(|r| normalize_region(&frame, r, cfg)).collect()
    };

    let mut failed = Vec::new();
    for (region, result) in regions.into_iter().zip(results) {
        match result {
            Ok(sig) => {
                frame.channels.insert(format!("{region}.signal"), sig.z_signal);
                frame.channels.insert(format!("{region}.control"), sig.z_control);
                frame.channels.insert(format!("{region}.zdFF"), sig.zdff);
                log::debug!("normalised region {region}");
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("skipping region {region}: {e}");
                frame.channels.remove(&format!("{region}.signal"));
                frame.channels.remove(&format!("{region}.control"));
                failed.push((region, e));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(NormalizeOutcome { frame, failed })
}
