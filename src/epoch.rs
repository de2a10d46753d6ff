//! Event-locked epoch extraction.
//!
//! ```text
//!            before_frames       after_frames
//!        |<--------------->|<-------------->|
//!       beg              anchor            end      [beg, end)
//! ```
//!
//! Frame counts truncate (`trunc(seconds × fps)`), so every epoch taken with
//! the same `before`, `after` and `fps` has the same length
//! `before_frames + after_frames`.
//!
//! With `filter` enabled, intervals are screened in two passes before
//! windowing:
//!
//!   1. proximity: anchor closer than `before_frames + after_frames` to the
//!      anchor of the previous input interval,
//!   2. duration: event shorter than the half-window inside it
//!      (`after_frames` for onsets, `before_frames` for offsets).
//!
//! Windows must satisfy `beg >= 0` and `end < len - 1` (the last sample
//! index); the rest are dropped and counted.
use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::events::EventInterval;
use crate::merge::MergedRecord;

/// Which edge of the interval the window is centred on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    On,
    Off,
}

impl Anchor {
    pub fn index(self, interval: &EventInterval) -> usize {
        match self {
            Anchor::On => interval.onset,
            Anchor::Off => interval.offset,
        }
    }
}

/// Per-call epoch extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochParams {
    /// Region name; the `{channel}.zdFF` column is extracted.
    pub channel: String,
    /// Seconds before the anchor.
    pub before: f64,
    /// Seconds after the anchor.
    pub after: f64,
    pub anchor: Anchor,
    /// Apply the proximity and duration screens.
    pub filter: bool,
}

impl EpochParams {
    pub fn new(channel: impl Into<String>, before: f64, after: f64) -> Self {
        Self {
            channel: channel.into(),
            before,
            after,
            anchor: Anchor::On,
            filter: false,
        }
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_filter(mut self, filter: bool) -> Self {
        self.filter = filter;
        self
    }

    pub fn before_frames(&self, fps: f64) -> usize {
        (self.before * fps).trunc() as usize
    }

    pub fn after_frames(&self, fps: f64) -> usize {
        (self.after * fps).trunc() as usize
    }

    /// Samples per epoch at `fps`.
    pub fn window_len(&self, fps: f64) -> usize {
        self.before_frames(fps).saturating_add(self.after_frames(fps))
    }

    fn validate(&self) -> Result<()> {
        if !(self.before.is_finite() && self.after.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "epoch window must be finite, got before={} after={}",
                self.before, self.after
            )));
        }
        if !(self.before >= 0.0 && self.after >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "epoch window must be non-negative, got before={} after={}",
                self.before, self.after
            )));
        }
        if self.before + self.after == 0.0 {
            return Err(Error::InvalidParameter("epoch window is empty".into()));
        }
        Ok(())
    }
}

/// One extracted epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Epoch {
    /// `[beg, end)` sample range in the merged record.
    pub bounds: (usize, usize),
    pub interval: EventInterval,
    pub values: Array1<f64>,
}

/// Time-averaged epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochAverage {
    pub bounds: (usize, usize),
    pub interval: EventInterval,
    pub value: f64,
}

/// How many intervals each stage rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub too_close: usize,
    pub too_short: usize,
    pub out_of_bounds: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.too_close + self.too_short + self.out_of_bounds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochExtraction {
    pub epochs: Vec<Epoch>,
    pub dropped: DropCounts,
}

/// Window bounds of every interval that survives screening, in input order.
fn select_windows(
    len: usize,
    fps: f64,
    intervals: &[EventInterval],
    params: &EpochParams,
) -> (Vec<((usize, usize), EventInterval)>, DropCounts) {
    let before = params.before_frames(fps);
    let after = params.after_frames(fps);
    let min_gap = before.saturating_add(after);
    let last = len.saturating_sub(1);
    let min_duration = match params.anchor {
        Anchor::On => after,
        Anchor::Off => before,
    };

    let mut dropped = DropCounts::default();
    let mut windows = Vec::with_capacity(intervals.len());
    let mut prev_anchor: Option<usize> = None;

    for iv in intervals {
        let anchor = params.anchor.index(iv);
        if params.filter {
            let close = prev_anchor.is_some_and(|p| anchor.abs_diff(p) < min_gap);
            prev_anchor = Some(anchor);
            if close {
                dropped.too_close += 1;
                continue;
            }
            if iv.len() < min_duration {
                dropped.too_short += 1;
                continue;
            }
        }

        match (anchor.checked_sub(before), anchor.checked_add(after)) {
            (Some(beg), Some(end)) if end < last => windows.push(((beg, end), *iv)),
            _ => dropped.out_of_bounds += 1,
        }
    }
    (windows, dropped)
}

/// Extract `{channel}.zdFF` around each interval's anchor.
///
/// # Errors
///
/// * [`Error::InvalidParameter`] for a negative or empty window.
/// * [`Error::MissingRequiredColumn`] if `{channel}.zdFF` is absent.
pub fn get_epoch_data(
    merged: &MergedRecord,
    intervals: &[EventInterval],
    params: &EpochParams,
) -> Result<EpochExtraction> {
    params.validate()?;
    let series = merged.column(&format!("{}.zdFF", params.channel))?;
    let (windows, dropped) = select_windows(merged.len(), merged.fps, intervals, params);

    if dropped.out_of_bounds > 0 {
        log::warn!(
            "{}: {} epoch(s) outside the recording dropped",
            params.channel,
            dropped.out_of_bounds
        );
    }
    log::debug!(
        "{} {:?}: {} of {} interval(s) kept ({:?})",
        params.channel,
        params.anchor,
        windows.len(),
        intervals.len(),
        dropped
    );

    let epochs = windows
        .into_iter()
        .map(|((beg, end), interval)| Epoch {
            bounds: (beg, end),
            interval,
            values: series.slice(s![beg..end]).to_owned(),
        })
        .collect();
    Ok(EpochExtraction { epochs, dropped })
}

/// Same selection as [`get_epoch_data`], reduced to the mean of each
/// epoch.
pub fn get_epoch_average(
    merged: &MergedRecord,
    intervals: &[EventInterval],
    params: &EpochParams,
) -> Result<Vec<EpochAverage>> {
    let extraction = get_epoch_data(merged, intervals, params)?;
    Ok(extraction
        .epochs
        .into_iter()
        .filter_map(|ep| {
            ep.values.mean().map(|value| EpochAverage {
                bounds: ep.bounds,
                interval: ep.interval,
                value,
            })
        })
        .collect())
}
