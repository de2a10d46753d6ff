//! Event interval detection on boolean event columns.
//!
//! ```text
//! col   0 0 1 1 1 0 0 1 1 0
//!           ^     ^     ^   ^
//!         onset offset onset offset      half-open [onset, offset)
//! ```
//!
//! A recording that starts inside an event gets an onset at 0, one that
//! ends inside an event gets an offset at `len`. Both are flagged on the
//! interval so callers can exclude truncated events.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::merge::MergedRecord;

/// Half-open sample range `[onset, offset)` of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInterval {
    pub onset: usize,
    pub offset: usize,
    /// The recording started inside this event.
    pub synthetic_onset: bool,
    /// The recording ended inside this event.
    pub synthetic_offset: bool,
}

impl EventInterval {
    pub fn new(onset: usize, offset: usize) -> Self {
        Self { onset, offset, synthetic_onset: false, synthetic_offset: false }
    }

    /// Duration in samples.
    pub fn len(&self) -> usize {
        self.offset - self.onset
    }

    pub fn is_empty(&self) -> bool {
        self.offset <= self.onset
    }

    /// Either edge was synthesised at a recording boundary.
    pub fn is_truncated(&self) -> bool {
        self.synthetic_onset || self.synthetic_offset
    }
}

/// Rising/falling edges of `col`, paired into intervals.
pub fn detect_intervals(col: &[bool]) -> Vec<EventInterval> {
    let n = col.len();
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, &on) in col.iter().enumerate() {
        match (start, on) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                out.push(EventInterval { synthetic_onset: s == 0, ..EventInterval::new(s, i) });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(EventInterval {
            onset: s,
            offset: n,
            synthetic_onset: s == 0,
            synthetic_offset: true,
        });
    }
    out
}

/// Fuse intervals separated by fewer than `gap_frames` samples.
///
/// The fused interval inherits the first onset and the last offset along
/// with their synthetic flags.
pub fn merge_close_intervals(intervals: &[EventInterval], gap_frames: f64) -> Vec<EventInterval> {
    let mut out: Vec<EventInterval> = Vec::with_capacity(intervals.len());
    for &next in intervals {
        match out.last_mut() {
            Some(cur) if (next.onset as f64 - cur.offset as f64) < gap_frames => {
                cur.offset = next.offset;
                cur.synthetic_offset = next.synthetic_offset;
            }
            _ => out.push(next),
        }
    }
    out
}

/// Intervals of the boolean column `event` in `merged`.
///
/// With `merge_gap` (seconds) set, intervals closer than `gap × fps`
/// samples are fused.
///
/// # Errors
///
/// * [`Error::MissingRequiredColumn`] if `event` is not an event column.
/// * [`Error::InvalidParameter`] for a negative or non-finite gap.
pub fn get_event_intervals(
    merged: &MergedRecord,
    event: &str,
    merge_gap: Option<f64>,
) -> Result<Vec<EventInterval>> {
    let col = merged.event(event)?;
    let mut intervals = detect_intervals(col);

    for iv in intervals.iter().filter(|iv| iv.is_truncated()) {
        log::warn!(
            "{event}: interval [{}, {}) touches the recording boundary; edge synthesised",
            iv.onset,
            iv.offset
        );
    }

    if let Some(gap) = merge_gap {
        if !(gap.is_finite() && gap >= 0.0) {
            return Err(Error::InvalidParameter(format!("merge gap must be >= 0, got {gap}")));
        }
        let before = intervals.len();
        intervals = merge_close_intervals(&intervals, gap * merged.fps);
        log::debug!("{event}: merged {before} interval(s) into {}", intervals.len());
    }
    Ok(intervals)
}

/// A time range `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl MergedRecord {
    /// Add (or overwrite) a boolean event column that is true on rows whose
    /// time falls inside any of `windows`. Used for externally scored
    /// events such as tones or shocks.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if a window has `start >= end`.
    pub fn add_event(&mut self, name: &str, windows: &[TimeWindow]) -> Result<()> {
        if let Some(w) = windows.iter().find(|w| !(w.start < w.end)) {
            return Err(Error::InvalidParameter(format!(
                "event '{name}': window start {} must precede end {}",
                w.start, w.end
            )));
        }
        let col: Vec<bool> = self
            .time
            .iter()
            .map(|&t| windows.iter().any(|w| t >= w.start && t < w.end))
            .collect();
        self.events.insert(name.to_string(), col);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(bits: &str) -> Vec<bool> {
        bits.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn pairs_rising_and_falling_edges() {
        let iv = detect_intervals(&mask("0011100110"));
        assert_eq!(iv, vec![EventInterval::new(2, 5), EventInterval::new(7, 9)]);
    }

    #[test]
    fn boundary_events_are_synthesised_and_flagged() {
        let iv = detect_intervals(&mask("1100011"));
        assert_eq!(iv.len(), 2);
        assert_eq!((iv[0].onset, iv[0].offset), (0, 2));
        assert!(iv[0].synthetic_onset && !iv[0].synthetic_offset);
        assert_eq!((iv[1].onset, iv[1].offset), (5, 7));
        assert!(!iv[1].synthetic_onset && iv[1].synthetic_offset);

        let all = detect_intervals(&mask("111"));
        assert_eq!(all.len(), 1);
        assert!(all[0].synthetic_onset && all[0].synthetic_offset);
        assert!(detect_intervals(&mask("000")).is_empty());
        assert!(detect_intervals(&[]).is_empty());
    }

    #[test]
    fn merge_gap_is_strict() {
        let iv = vec![EventInterval::new(0, 10), EventInterval::new(15, 20), EventInterval::new(30, 40)];
        // gap 5 is not < 5
        assert_eq!(merge_close_intervals(&iv, 5.0).len(), 3);
        let m = merge_close_intervals(&iv, 6.0);
        assert_eq!(m, vec![EventInterval::new(0, 20), EventInterval::new(30, 40)]);
        let all = merge_close_intervals(&iv, 100.0);
        assert_eq!(all, vec![EventInterval::new(0, 40)]);
    }

    #[test]
    fn intervals_are_well_formed() {
        let bits: Vec<bool> = (0..500).map(|i| (i * 7 % 13) < 5).collect();
        let iv = detect_intervals(&bits);
        for w in iv.windows(2) {
            assert!(w[0].offset < w[1].onset);
        }
        assert!(iv.iter().all(|i| i.onset < i.offset));
    }
}
