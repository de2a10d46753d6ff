//! Multi-mouse sessions: discovery, an explicit cache of processed
//! recordings, group assignments and grouped epoch collection.
//!
//! ```text
//! data_dir/
//!   m1/  m1.csv  Behavior.csv      → SessionPaths { mouse: "m1", .. }
//!   m2/  m2.csv  Behavior.csv
//! ```
//!
//! [`SessionStore`] owns the processed [`MergedRecord`]s. An entry is
//! reused while both source files keep their modification time and the
//! pipeline configuration is unchanged.
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::aggregate::EpochGroups;
use crate::config::PipelineConfig;
use crate::epoch::{get_epoch_average, get_epoch_data, EpochParams};
use crate::error::{Error, Result};
use crate::events::get_event_intervals;
use crate::merge::MergedRecord;
use crate::process_session;

// ── Discovery ─────────────────────────────────────────────────────────────────

/// File naming inside a session directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLayout {
    /// Photometry file is `{mouse}{photometry_suffix}`. Default: `".csv"`.
    pub photometry_suffix: String,
    /// Tracking file name. Default: `"Behavior.csv"`.
    pub behavior_file: String,
}

impl Default for SessionLayout {
    fn default() -> Self {
        Self {
            photometry_suffix: ".csv".into(),
            behavior_file: "Behavior.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionPaths {
    pub mouse: String,
    pub photometry: PathBuf,
    pub behavior: PathBuf,
}

/// Every sub-directory of `data_dir` holding both recordings, sorted by
/// mouse id. Directories missing a file are skipped with a warning.
pub fn discover_sessions(data_dir: impl AsRef<Path>, layout: &SessionLayout) -> Result<Vec<SessionPaths>> {
    let data_dir = data_dir.as_ref();
    let mut sessions = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let mouse = entry.file_name().to_string_lossy().into_owned();
        let dir = entry.path();
        let photometry = dir.join(format!("{mouse}{}", layout.photometry_suffix));
        let behavior = dir.join(&layout.behavior_file);
        if photometry.is_file() && behavior.is_file() {
            sessions.push(SessionPaths { mouse, photometry, behavior });
        } else {
            log::warn!("{}: missing photometry or behavior file, skipped", dir.display());
        }
    }
    sessions.sort_by(|a, b| a.mouse.cmp(&b.mouse));
    log::info!("{}: found {} session(s)", data_dir.display(), sessions.len());
    Ok(sessions)
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    photometry_mtime: SystemTime,
    behavior_mtime: SystemTime,
    fingerprint: String,
}

#[derive(Debug, Clone)]
struct CachedSession {
    paths: SessionPaths,
    key: CacheKey,
    record: MergedRecord,
}

fn cache_key(paths: &SessionPaths, fingerprint: &str) -> Result<CacheKey> {
    Ok(CacheKey {
        photometry_mtime: std::fs::metadata(&paths.photometry)?.modified()?,
        behavior_mtime: std::fs::metadata(&paths.behavior)?.modified()?,
        fingerprint: fingerprint.to_string(),
    })
}

/// Outcome of [`SessionStore::refresh`].
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub reloaded: Vec<String>,
    /// Entries whose reload failed; they are evicted.
    pub failed: Vec<(String, Error)>,
}

/// Processed recordings keyed by mouse id.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cfg: PipelineConfig,
    fingerprint: String,
    entries: BTreeMap<String, CachedSession>,
}

impl SessionStore {
    pub fn new(cfg: PipelineConfig) -> Self {
        let fingerprint = cfg.fingerprint();
        Self { cfg, fingerprint, entries: BTreeMap::new() }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Replace the configuration. Cached entries become stale and are
    /// reprocessed on the next access.
    pub fn set_config(&mut self, cfg: PipelineConfig) {
        self.fingerprint = cfg.fingerprint();
        self.cfg = cfg;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mice(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Cached record of `mouse`, without checking staleness.
    pub fn get(&self, mouse: &str) -> Option<&MergedRecord> {
        self.entries.get(mouse).map(|c| &c.record)
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &MergedRecord)> {
        self.entries.iter().map(|(m, c)| (m.as_str(), &c.record))
    }

    /// Return the cached record for `paths`, processing the recording when
    /// it is absent or stale.
    pub fn get_or_load(&mut self, paths: &SessionPaths) -> Result<&MergedRecord> {
        let key = cache_key(paths, &self.fingerprint)?;
        match self.entries.entry(paths.mouse.clone()) {
            Entry::Occupied(mut e) => {
                if e.get().key != key || e.get().paths != *paths {
                    log::debug!("{}: cache stale, reprocessing", paths.mouse);
                    let record = process_session(&paths.photometry, &paths.behavior, &self.cfg)?;
                    e.insert(CachedSession { paths: paths.clone(), key, record });
                }
                Ok(&e.into_mut().record)
            }
            Entry::Vacant(e) => {
                let record = process_session(&paths.photometry, &paths.behavior, &self.cfg)?;
                Ok(&e.insert(CachedSession { paths: paths.clone(), key, record }).record)
            }
        }
    }

    /// Reprocess every stale entry.
    pub fn refresh(&mut self) -> RefreshReport {
        let mut report = RefreshReport::default();
        let mice: Vec<String> = self.entries.keys().cloned().collect();
        for mouse in mice {
            let Some(cached) = self.entries.get(&mouse) else { continue };
            let paths = cached.paths.clone();
            let fresh = cache_key(&paths, &self.fingerprint)
                .map(|k| k == cached.key)
                .unwrap_or(false);
            if fresh {
                continue;
            }
            self.entries.remove(&mouse);
            match self.get_or_load(&paths) {
                Ok(_) => report.reloaded.push(mouse),
                Err(e) => {
                    log::warn!("{mouse}: reload failed: {e}");
                    report.failed.push((mouse, e));
                }
            }
        }
        report
    }

    /// Drop the entry for `mouse`; returns whether one existed.
    pub fn invalidate(&mut self, mouse: &str) -> bool {
        self.entries.remove(mouse).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Process every session independently. One failing recording never stops
/// the others; its error is returned in its slot.
pub fn process_batch(
    sessions: &[SessionPaths],
    cfg: &PipelineConfig,
) -> BTreeMap<String, Result<MergedRecord>> {
    sessions
        .iter()
        .map(|s| {
            let result = process_session(&s.photometry, &s.behavior, cfg);
            if let Err(e) = &result {
                log::warn!("{}: {e}", s.mouse);
            }
            (s.mouse.clone(), result)
        })
        .collect()
}

// ── Assignments ───────────────────────────────────────────────────────────────

/// Group of one mouse, as a bare label or with a display colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Assignment {
    Label(String),
    Detailed {
        group: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
}

impl Assignment {
    pub fn group(&self) -> &str {
        match self {
            Assignment::Label(g) | Assignment::Detailed { group: g, .. } => g,
        }
    }

    pub fn color(&self) -> Option<&str> {
        match self {
            Assignment::Label(_) => None,
            Assignment::Detailed { color, .. } => color.as_deref(),
        }
    }
}

/// Mouse id → condition group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignments(pub BTreeMap<String, Assignment>);

impl Assignments {
    /// Load from JSON; a missing file yields no assignments.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn assign(&mut self, mouse: impl Into<String>, assignment: Assignment) {
        self.0.insert(mouse.into(), assignment);
    }

    pub fn group_of(&self, mouse: &str) -> Option<&str> {
        self.0.get(mouse).map(Assignment::group)
    }

    /// Group label → mice, both sorted.
    pub fn groups(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (mouse, a) in &self.0 {
            out.entry(a.group().to_string()).or_default().push(mouse.clone());
        }
        out
    }
}

// ── Grouping ──────────────────────────────────────────────────────────────────

/// Epoch traces and per-epoch averages pooled by group.
#[derive(Debug)]
pub struct GroupedEpochs {
    pub traces: EpochGroups,
    pub averages: BTreeMap<String, Vec<f64>>,
    /// Mice that could not contribute (missing channel or event).
    pub skipped: Vec<(String, Error)>,
    /// Frame rate of the first contributing recording.
    pub fps: Option<f64>,
}

/// Extract epochs from every assigned mouse and pool them by group.
/// Every group in `assignments` appears in the output, possibly empty.
/// Unassigned mice are ignored.
pub fn group_epochs<'a, I>(
    records: I,
    assignments: &Assignments,
    event: &str,
    merge_gap: Option<f64>,
    params: &EpochParams,
) -> GroupedEpochs
where
    I: IntoIterator<Item = (&'a str, &'a MergedRecord)>,
{
    let mut traces: BTreeMap<String, Vec<_>> =
        assignments.groups().into_keys().map(|g| (g, Vec::new())).collect();
    let mut averages: BTreeMap<String, Vec<f64>> =
        traces.keys().map(|g| (g.clone(), Vec::new())).collect();
    let mut skipped = Vec::new();
    let mut fps = None;

    for (mouse, merged) in records {
        let Some(group) = assignments.group_of(mouse) else {
            log::debug!("{mouse}: no group assigned");
            continue;
        };
        let extracted = get_event_intervals(merged, event, merge_gap).and_then(|intervals| {
            let epochs = get_epoch_data(merged, &intervals, params)?;
            let avgs = get_epoch_average(merged, &intervals, params)?;
            Ok((epochs, avgs))
        });
        match extracted {
            Ok((epochs, avgs)) => {
                fps.get_or_insert(merged.fps);
                traces
                    .entry(group.to_string())
                    .or_default()
                    .extend(epochs.epochs.into_iter().map(|e| e.values));
                averages
                    .entry(group.to_string())
                    .or_default()
                    .extend(avgs.into_iter().map(|a| a.value));
            }
            Err(e) => {
                log::warn!("{mouse}: {e}");
                skipped.push((mouse.to_string(), e));
            }
        }
    }

    GroupedEpochs { traces: EpochGroups::Grouped(traces), averages, skipped, fps }
}
