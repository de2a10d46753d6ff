//! Epoch aggregation: pointwise mean / std across epochs, per group and
//! pooled.
//!
//! ```text
//! epochs  [E, T]  ── mean_axis(0) ──→  mean [T]
//!                 └─ std_axis(0, 0) ─→ std  [T]   (population, ddof = 0)
//! ```
//!
//! An empty collection yields `None` rather than a NaN trace, so "no data
//! for this group" stays distinguishable from a real zero.
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Mean and standard deviation traces over a set of equal-length epochs.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
    pub n_epochs: usize,
}

impl Aggregate {
    /// Samples per trace.
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Stack `epochs` into `[E, T]`.
pub fn stack_epochs(epochs: &[Array1<f64>]) -> Result<Array2<f64>> {
    let t = epochs.first().map_or(0, |e| e.len());
    if let Some(bad) = epochs.iter().find(|e| e.len() != t) {
        return Err(Error::LengthMismatch { expected: t, got: bad.len() });
    }
    let views: Vec<ArrayView1<f64>> = epochs.iter().map(|e| e.view()).collect();
    ndarray::stack(Axis(0), &views)
        .map_err(|e| Error::InvalidParameter(format!("cannot stack epochs: {e}")))
}

/// Pointwise mean and population std across `epochs`.
///
/// Returns `Ok(None)` when `epochs` is empty.
///
/// # Errors
///
/// [`Error::LengthMismatch`] if the epochs differ in length.
pub fn aggregate(epochs: &[Array1<f64>]) -> Result<Option<Aggregate>> {
    if epochs.is_empty() {
        return Ok(None);
    }
    let stacked = stack_epochs(epochs)?;
    let Some(mean) = stacked.mean_axis(Axis(0)) else {
        return Ok(None);
    };
    let std = stacked.std_axis(Axis(0), 0.0);
    Ok(Some(Aggregate { mean, std, n_epochs: epochs.len() }))
}

/// Epochs either as one flat collection or keyed by group label.
#[derive(Debug, Clone, PartialEq)]
pub enum EpochGroups {
    Ungrouped(Vec<Array1<f64>>),
    Grouped(BTreeMap<String, Vec<Array1<f64>>>),
}

impl EpochGroups {
    /// Every epoch, groups concatenated in label order.
    pub fn pooled(&self) -> Vec<Array1<f64>> {
        match self {
            EpochGroups::Ungrouped(epochs) => epochs.clone(),
            EpochGroups::Grouped(groups) => groups.values().flatten().cloned().collect(),
        }
    }
}

/// Per-group aggregates plus the aggregate of all epochs pooled.
/// `groups` is empty for [`EpochGroups::Ungrouped`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedAggregate {
    pub groups: BTreeMap<String, Option<Aggregate>>,
    pub overall: Option<Aggregate>,
}

pub fn aggregate_groups(epochs: &EpochGroups) -> Result<GroupedAggregate> {
    let mut groups = BTreeMap::new();
    if let EpochGroups::Grouped(map) = epochs {
        for (label, members) in map {
            let agg = aggregate(members)?;
            if agg.is_none() {
                log::warn!("group '{label}': no epochs");
            }
            groups.insert(label.clone(), agg);
        }
    }
    let overall = aggregate(&epochs.pooled())?;
    Ok(GroupedAggregate { groups, overall })
}

/// Per-epoch scalars of one group, e.g. time-averaged zdFF before vs after
/// freezing onset.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSummary {
    pub values: Vec<f64>,
    /// `None` for an empty group.
    pub mean: Option<f64>,
}

pub fn summarize_scalars(groups: &BTreeMap<String, Vec<f64>>) -> BTreeMap<String, ScalarSummary> {
    groups
        .iter()
        .map(|(label, values)| {
            let mean = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);
            (label.clone(), ScalarSummary { values: values.clone(), mean })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn mean_and_population_std() {
        let agg = aggregate(&[array![1.0, 2.0], array![3.0, 2.0]]).unwrap().unwrap();
        assert_eq!(agg.n_epochs, 2);
        assert_eq!(agg.mean, array![2.0, 2.0]);
        assert_abs_diff_eq!(agg.std[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(agg.std[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_is_none() {
        assert!(aggregate(&[]).unwrap().is_none());
    }

    #[test]
    fn unequal_lengths_error() {
        assert!(matches!(
            aggregate(&[array![1.0, 2.0], array![1.0]]),
            Err(Error::LengthMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn groups_and_overall() {
        let mut map = BTreeMap::new();
        map.insert("Recent".to_string(), vec![array![0.0, 0.0], array![2.0, 2.0]]);
        map.insert("Remote".to_string(), vec![array![4.0, 4.0]]);
        map.insert("Empty".to_string(), vec![]);
        let out = aggregate_groups(&EpochGroups::Grouped(map)).unwrap();

        assert_eq!(out.groups["Recent"].as_ref().unwrap().mean, array![1.0, 1.0]);
        assert!(out.groups["Empty"].is_none());
        let overall = out.overall.unwrap();
        assert_eq!(overall.n_epochs, 3);
        assert_eq!(overall.mean, array![2.0, 2.0]);
    }

    #[test]
    fn ungrouped_has_only_overall() {
        let out = aggregate_groups(&EpochGroups::Ungrouped(vec![array![1.0]])).unwrap();
        assert!(out.groups.is_empty());
        assert_eq!(out.overall.unwrap().mean, array![1.0]);
    }

    #[test]
    fn scalar_summaries() {
        let mut g = BTreeMap::new();
        g.insert("a".to_string(), vec![1.0, 3.0]);
        g.insert("b".to_string(), vec![]);
        let s = summarize_scalars(&g);
        assert_eq!(s["a"].mean, Some(2.0));
        assert_eq!(s["b"].mean, None);
    }
}
