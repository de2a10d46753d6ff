//! # fiberphot: fiber photometry and behavior alignment
//!
//! `fiberphot` turns a paired fiber-photometry recording and a DeepLabCut
//! pose-tracking export into aligned, event-locked neural epochs. Every
//! step is a plain function over in-memory arrays; the crate keeps no
//! global state.
//!
//! ## Pipeline overview
//!
//! ```text
//! recording.csv                          Behavior.csv
//!   │                                      │
//!   ├─ photometry::load_signal()           ├─ behavior::load_behavior()
//!   │    bin 10 ms, TTL = min per bin      │    box-smoothed head / base velocity
//!   │    Butterworth 1.7 Hz, filtfilt      │    freezing = mean(v, 5) < 6, de-flickered
//!   ├─ normalize::normalize()              │
//!   │    smooth, detrend, z-score          │
//!   │    zdFF = z_signal − z_control       │
//!   └──────────────┬───────────────────────┘
//!                  ├─ merge::merge()               centisecond join, TTL policy
//!                  ├─ events::get_event_intervals() freezing bouts [onset, offset)
//!                  ├─ epoch::get_epoch_data()      fixed windows around onset / offset
//!                  └─ aggregate::aggregate()       mean ± std per group and pooled
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use fiberphot::{process_session, get_event_intervals, get_epoch_data, aggregate};
//! use fiberphot::{EpochParams, PipelineConfig};
//!
//! let cfg = PipelineConfig::default();
//! let merged = process_session("m1/m1.csv", "m1/Behavior.csv", &cfg).unwrap();
//!
//! let bouts = get_event_intervals(&merged, "freezing", Some(1.0)).unwrap();
//! let params = EpochParams::new("ACC", 2.0, 2.0).with_filter(true);
//! let extraction = get_epoch_data(&merged, &bouts, &params).unwrap();
//!
//! let traces: Vec<_> = extraction.epochs.into_iter().map(|e| e.values).collect();
//! match aggregate(&traces).unwrap() {
//!     Some(agg) => println!("{} epochs, peak mean {:.2}", agg.n_epochs,
//!                           agg.mean.fold(f64::MIN, |a, &b| a.max(b))),
//!     None => println!("no epochs"),
//! }
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use fiberphot::config::{BehaviorConfig, MergeConfig, NormalizeConfig, PhotometryConfig};
//! use fiberphot::{load_behavior, load_signal, merge, normalize};
//!
//! let signal = load_signal("m1.csv", &PhotometryConfig::default()).unwrap();
//! let outcome = normalize(signal, &NormalizeConfig::default()).unwrap();
//! for (region, err) in &outcome.failed {
//!     eprintln!("{region}: {err}");
//! }
//! let behavior = load_behavior("Behavior.csv", &BehaviorConfig::default()).unwrap();
//! let merged = merge(outcome.frame, behavior, &MergeConfig::default()).unwrap();
//! println!("{} aligned rows at {} fps", merged.len(), merged.fps);
//! ```

pub mod aggregate;
pub mod behavior;
pub mod binning;
pub mod config;
pub mod epoch;
pub mod error;
pub mod events;
pub mod filter;
pub mod io;
pub mod merge;
pub mod normalize;
pub mod photometry;
pub mod session;

use std::path::Path;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config / errors
pub use config::{
    BehaviorConfig, ChannelMap, MergeConfig, NormalizeConfig, PhotometryConfig, PipelineConfig,
    TtlPolicy, ZScoreCenter,
};
pub use error::{Error, Result};

// loading
pub use behavior::{detect_freezing, load_behavior, movement_velocity, velocity, BehaviorFrame};
pub use binning::{bin_by_time, grid_key, Binned, Reduce};
pub use filter::{box_sum, butter_lowpass, filtfilt, lfilter, moving_average, IirCoefficients};
pub use photometry::{load_signal, ChannelFrame};

// normalisation
pub use normalize::{linear_baseline, normalize, normalize_region, zscore, NormalizeOutcome, RegionSignals};

// alignment and events
pub use events::{detect_intervals, get_event_intervals, merge_close_intervals, EventInterval, TimeWindow};
pub use merge::{merge, MergedRecord, FREEZING, VELOCITY};

// epochs and statistics
pub use aggregate::{
    aggregate, aggregate_groups, summarize_scalars, Aggregate, EpochGroups, GroupedAggregate,
    ScalarSummary,
};
pub use epoch::{
    get_epoch_average, get_epoch_data, Anchor, DropCounts, Epoch, EpochAverage, EpochExtraction,
    EpochParams,
};

// sessions
pub use session::{
    discover_sessions, group_epochs, process_batch, Assignment, Assignments, GroupedEpochs,
    SessionLayout, SessionPaths, SessionStore,
};

/// Run the single-recording pipeline: load and normalise the photometry,
/// load the tracking, and merge both.
///
/// # Pipeline steps
///
/// 1. [`load_signal`]: column rename, null-row drop, 10 ms binning,
///    Butterworth low-pass (zero-phase).
/// 2. [`normalize`]: zdFF per region. Regions with a degenerate channel are
///    logged and left out of the result.
/// 3. [`load_behavior`]: velocity and freezing from pose tracking.
/// 4. [`merge`]: centisecond join and TTL policy.
///
/// # Errors
///
/// Any error of the individual steps except per-region
/// [`Error::DegenerateSignal`], which only removes that region.
pub fn process_session(
    photometry: impl AsRef<Path>,
    behavior: impl AsRef<Path>,
    cfg: &PipelineConfig,
) -> Result<MergedRecord> {
    let signal = load_signal(photometry.as_ref(), &cfg.photometry)?;
    let outcome = normalize(signal, &cfg.normalize)?;
    for (region, err) in &outcome.failed {
        log::warn!("{}: region {region} left out: {err}", photometry.as_ref().display());
    }
    let tracking = load_behavior(behavior.as_ref(), &cfg.behavior)?;
    merge(outcome.frame, tracking, &cfg.merge)
}
