//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of the single-recording
//! pipeline, split per stage. All fields have defaults matching the fear
//! conditioning recordings the pipeline was built for (Doric 2-region
//! photometry at 100 Hz, DeepLabCut tracking at 30 fps).
//!
//! Configs are plain structs with `pub` fields, so struct-update syntax
//! works:
//!
//! ```
//! use fiberphot::config::{PipelineConfig, MergeConfig, TtlPolicy};
//!
//! let cfg = PipelineConfig {
//!     merge: MergeConfig { ttl_policy: TtlPolicy::Keep },
//!     ..PipelineConfig::default()
//! };
//! ```
//!
//! They also deserialize from JSON; missing fields fall back to defaults.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// Mapping from raw photometry column names to canonical
/// `"{Region}.signal"` / `"{Region}.control"` names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMap(pub BTreeMap<String, String>);

impl ChannelMap {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Iterate `(raw column, canonical name)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical channel names, in raw-column order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    /// Sorted distinct region prefixes (text before the first `.`).
    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = self
            .targets()
            .map(|t| t.split('.').next().unwrap_or(t).to_string())
            .collect();
        regions.sort();
        regions.dedup();
        regions
    }
}

impl Default for ChannelMap {
    /// Doric two-region layout: `AOut-1` excitation is the isosbestic
    /// control, `AOut-2` the calcium-dependent signal.
    fn default() -> Self {
        Self::new([
            ("AIn-1 - Dem (AOut-1)", "ACC.control"),
            ("AIn-1 - Dem (AOut-2)", "ACC.signal"),
            ("AIn-2 - Dem (AOut-1)", "ADN.control"),
            ("AIn-2 - Dem (AOut-2)", "ADN.signal"),
        ])
    }
}

/// Photometry loading: column names, binning and low-pass filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotometryConfig {
    pub channel_map: ChannelMap,

    /// Timestamp column, in seconds.
    ///
    /// Default: `"Time(s)"`.
    pub time_column: String,

    /// Digital marker column; a zero marks samples recorded while the
    /// system was not armed. Binned with `min`.
    ///
    /// Default: `"AOut-1"`.
    pub ttl_column: String,

    /// Bin width in seconds. Raw timestamps are rounded to this grid and
    /// averaged per bin.
    ///
    /// Default: `0.01` s (100 Hz).
    pub bin_size: f64,

    /// Butterworth low-pass cutoff in Hz.
    ///
    /// Default: `1.7` Hz.
    pub cutoff: f64,

    /// Nominal sampling rate after binning, in Hz.
    ///
    /// Default: `100.0`.
    pub fps: f64,

    /// Butterworth order (1 or 2).
    ///
    /// Default: `2`.
    pub filter_order: usize,
}

impl Default for PhotometryConfig {
    fn default() -> Self {
        Self {
            channel_map: ChannelMap::default(),
            time_column: "Time(s)".into(),
            ttl_column: "AOut-1".into(),
            bin_size: 0.01,
            cutoff: 1.7,
            fps: 100.0,
            filter_order: 2,
        }
    }
}

/// Centre statistic used by the z-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZScoreCenter {
    /// Robust to sharp transients; the documented default.
    #[default]
    Median,
    /// Second observed variant. Changes numeric output materially.
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Flat moving-average window applied before baseline removal.
    /// Values below 3 disable smoothing.
    ///
    /// Default: `10`.
    pub smooth_window: usize,

    pub center: ZScoreCenter,

    /// Normalise regions on the rayon pool instead of sequentially.
    pub parallel: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { smooth_window: 10, center: ZScoreCenter::Median, parallel: true }
    }
}

/// Pose-tracking loading and freezing detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Camera frame rate in Hz.
    ///
    /// Default: `30.0`.
    pub fps: f64,

    /// Body part used for head velocity.
    pub head: String,

    /// Body part used for base-of-tail velocity.
    pub base: String,

    /// Further body parts carried through as coordinates only.
    pub extra_parts: Vec<String>,

    /// Width of the box (sum) kernel applied to head and base coordinates.
    ///
    /// Default: `60`.
    pub position_kernel: usize,

    /// Width of the centred velocity-averaging window.
    ///
    /// Default: `5`.
    pub freeze_window: usize,

    /// A sample is immobile when its windowed mean velocity is below this.
    /// Unit: box-summed pixels per frame.
    ///
    /// Default: `6.0`.
    pub freeze_threshold: f64,

    /// Width of the box kernel used to suppress single-frame flicker.
    ///
    /// Default: `10`.
    pub flicker_kernel: usize,

    /// A sample is freezing when the flicker-box sum exceeds this.
    ///
    /// Default: `2.0`.
    pub flicker_threshold: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            head: "head".into(),
            base: "base tail".into(),
            extra_parts: vec!["middle tail".into()],
            position_kernel: 60,
            freeze_window: 5,
            freeze_threshold: 6.0,
            flicker_kernel: 10,
            flicker_threshold: 2.0,
        }
    }
}

/// What to do with rows whose TTL marker is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlPolicy {
    #[default]
    DropZero,
    Keep,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub ttl_policy: TtlPolicy,
}

/// Configuration for the full single-recording pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub photometry: PhotometryConfig,
    pub normalize: NormalizeConfig,
    pub behavior: BehaviorConfig,
    pub merge: MergeConfig,
}

impl PipelineConfig {
    /// Read a JSON config. Absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Stable textual fingerprint, used to key cached sessions.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_regions() {
        let map = ChannelMap::default();
        assert_eq!(map.regions(), vec!["ACC".to_string(), "ADN".to_string()]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{ "photometry": { "ttl_column": "DI/O-1" }, "merge": { "ttl_policy": "keep" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.photometry.ttl_column, "DI/O-1");
        assert_eq!(cfg.photometry.bin_size, 0.01);
        assert_eq!(cfg.merge.ttl_policy, TtlPolicy::Keep);
        assert_eq!(cfg.behavior.position_kernel, 60);
        assert_eq!(cfg.normalize.center, ZScoreCenter::Median);
    }

    #[test]
    fn channel_map_from_json_object() {
        let map: ChannelMap = serde_json::from_str(
            r#"{ "channel1_410": "ACC.control", "channel1_470": "ACC.signal" }"#,
        )
        .unwrap();
        assert_eq!(map.regions(), vec!["ACC".to_string()]);
        assert_eq!(map.targets().count(), 2);
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let a = PipelineConfig::default();
        let mut b = a.clone();
        b.photometry.cutoff = 2.0;
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), PipelineConfig::default().fingerprint());
    }
}
