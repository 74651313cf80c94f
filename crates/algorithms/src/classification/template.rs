//! Polarization feature template selection
//!
//! Compares how many non-outlier target and non-target pixels each cluster
//! attracted and keeps the clusters most dominated by the target class.

use pft_core::{ClassLabel, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::classifier::PixelLabel;

/// Default share of the K clusters retained in the template
pub const DEFAULT_RETENTION_FRACTION: f64 = 0.85;

/// Per-cluster occupancy of both classes, outliers excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCounts {
    target: Vec<u64>,
    non_target: Vec<u64>,
}

impl ClusterCounts {
    pub fn new(k: usize) -> Self {
        Self {
            target: vec![0; k],
            non_target: vec![0; k],
        }
    }

    pub fn k(&self) -> usize {
        self.target.len()
    }

    /// Count one labeled pixel; outliers are ignored
    pub fn record(&mut self, class: ClassLabel, label: PixelLabel) -> Result<()> {
        let Some(cluster) = label.cluster() else {
            return Ok(());
        };
        if cluster >= self.k() {
            return Err(Error::InvalidParameter {
                name: "label",
                value: cluster.to_string(),
                reason: format!("cluster id out of range 0..{}", self.k()),
            });
        }
        match class {
            ClassLabel::Target => self.target[cluster] += 1,
            ClassLabel::NonTarget => self.non_target[cluster] += 1,
        }
        Ok(())
    }

    /// Count every label of one class
    pub fn record_all<I>(&mut self, class: ClassLabel, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = PixelLabel>,
    {
        labels.into_iter().try_for_each(|label| self.record(class, label))
    }

    pub fn target(&self, cluster: usize) -> u64 {
        self.target[cluster]
    }

    pub fn non_target(&self, cluster: usize) -> u64 {
        self.non_target[cluster]
    }

    pub fn total(&self, cluster: usize) -> u64 {
        self.target[cluster] + self.non_target[cluster]
    }

    /// `countT / (countT + countN)`, `None` for clusters nobody landed in
    pub fn proportion(&self, cluster: usize) -> Option<f64> {
        let total = self.total(cluster);
        (total > 0).then(|| self.target[cluster] as f64 / total as f64)
    }
}

/// Selects template clusters from [`ClusterCounts`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateBuilder {
    retention_fraction: f64,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self {
            retention_fraction: DEFAULT_RETENTION_FRACTION,
        }
    }
}

impl TemplateBuilder {
    pub fn new(retention_fraction: f64) -> Result<Self> {
        validate_retention(retention_fraction)?;
        Ok(Self { retention_fraction })
    }

    pub fn retention_fraction(&self) -> f64 {
        self.retention_fraction
    }

    /// Number of template slots for `k` clusters: `ceil(k * retention)`
    pub fn slots(&self, k: usize) -> usize {
        // the small bias keeps exact products such as 100 * 0.85 from rounding up
        ((k as f64 * self.retention_fraction) - 1e-9).ceil().max(0.0) as usize
    }

    /// Rank clusters by target proportion (descending, ties by ascending id)
    /// and keep the top [`TemplateBuilder::slots`]. Clusters without members or
    /// without any target member are never selected.
    pub fn build(&self, counts: &ClusterCounts) -> Template {
        let k = counts.k();
        let proportions: Vec<Option<f64>> = (0..k).map(|c| counts.proportion(c)).collect();
        let excluded: Vec<usize> = (0..k).filter(|&c| proportions[c].is_none()).collect();

        let mut ranked: Vec<(usize, f64)> = proportions
            .iter()
            .enumerate()
            .filter_map(|(c, p)| p.map(|p| (c, p)))
            .filter(|&(c, _)| counts.target(c) > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.slots(k));

        let clusters: Vec<usize> = ranked.iter().map(|&(c, _)| c).collect();
        let mut membership = vec![false; k];
        for &c in &clusters {
            membership[c] = true;
        }

        let (sel_t, sel_all) = clusters.iter().fold((0u64, 0u64), |(t, a), &c| {
            (t + counts.target(c), a + counts.total(c))
        });
        let (all_t, all) = (0..k).fold((0u64, 0u64), |(t, a), c| {
            (t + counts.target(c), a + counts.total(c))
        });

        let template = Template {
            clusters,
            membership,
            proportions,
            counts: counts.clone(),
            excluded,
            contrast: ratio(sel_t, sel_all),
            global_target_fraction: ratio(all_t, all),
            retention_fraction: self.retention_fraction,
        };

        debug!(excluded = template.excluded.len(), "template ranking done");
        info!(
            selected = template.len(),
            k,
            contrast = template.contrast,
            global_target_fraction = template.global_target_fraction,
            "template built"
        );
        template
    }
}

pub(crate) fn validate_retention(retention_fraction: f64) -> Result<()> {
    if !(retention_fraction > 0.0 && retention_fraction <= 1.0) {
        return Err(Error::InvalidParameter {
            name: "retention_fraction",
            value: retention_fraction.to_string(),
            reason: "must lie in (0, 1]".into(),
        });
    }
    Ok(())
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// The frozen set of target-indicative clusters plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Selected clusters in rank order
    clusters: Vec<usize>,
    /// `membership[k]` is true iff cluster k is selected
    membership: Vec<bool>,
    proportions: Vec<Option<f64>>,
    counts: ClusterCounts,
    /// Clusters with no non-outlier members of either class
    excluded: Vec<usize>,
    contrast: f64,
    global_target_fraction: f64,
    retention_fraction: f64,
}

impl Template {
    /// Selected cluster ids, best first
    pub fn clusters(&self) -> &[usize] {
        &self.clusters
    }

    pub fn contains(&self, cluster: usize) -> bool {
        self.membership.get(cluster).copied().unwrap_or(false)
    }

    /// Whether a pixel label matches the template
    pub fn matches(&self, label: PixelLabel) -> bool {
        label.cluster().is_some_and(|c| self.contains(c))
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Number of clusters the template was built over
    pub fn k(&self) -> usize {
        self.membership.len()
    }

    /// Check that the per-cluster tables all cover `k` clusters and that the
    /// selection agrees with the membership flags
    pub fn check_shape(&self) -> Result<()> {
        let k = self.k();
        if self.proportions.len() != k || self.counts.k() != k || self.counts.non_target.len() != k {
            return Err(Error::Configuration(format!(
                "template tables disagree: {} flags, {} proportions, {} counts",
                k,
                self.proportions.len(),
                self.counts.k()
            )));
        }
        if let Some(&bad) = self.clusters.iter().chain(&self.excluded).find(|&&c| c >= k) {
            return Err(Error::Configuration(format!("template cluster {bad} out of range 0..{k}")));
        }
        if self.membership.iter().filter(|m| **m).count() != self.clusters.len()
            || self.clusters.iter().any(|&c| !self.membership[c])
        {
            return Err(Error::Configuration("template selection disagrees with its membership flags".into()));
        }
        Ok(())
    }

    pub fn proportion(&self, cluster: usize) -> Option<f64> {
        self.proportions.get(cluster).copied().flatten()
    }

    pub fn proportions(&self) -> &[Option<f64>] {
        &self.proportions
    }

    pub fn counts(&self) -> &ClusterCounts {
        &self.counts
    }

    pub fn excluded(&self) -> &[usize] {
        &self.excluded
    }

    /// Target share of the non-outlier pixels that fall in template clusters
    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    /// Target share of all non-outlier training pixels
    pub fn global_target_fraction(&self) -> f64 {
        self.global_target_fraction
    }

    pub fn retention_fraction(&self) -> f64 {
        self.retention_fraction
    }
}
