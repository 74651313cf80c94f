//! Region-level voting over connected foreground components
//!
//! Each connected foreground region is declared positive when the fraction of
//! its pixels matching the template reaches the decision threshold.

use pft_core::{Algorithm, Connectivity, Error, Mask, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::components::{label_components, BoundingBox};
use crate::morphology::{remove_small_holes, remove_small_objects};

/// Default minimum coverage for a positive region
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.3;

/// Optional cleanup of the matched mask before voting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchCleanup {
    /// Matched objects (8-connected) smaller than this are dropped
    pub min_object_area: usize,
    /// Enclosed unmatched holes (4-connected) smaller than this are filled
    pub max_hole_area: usize,
}

impl Default for MatchCleanup {
    fn default() -> Self {
        Self {
            min_object_area: 50,
            max_hole_area: 500,
        }
    }
}

/// Parameters for region decisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionParams {
    /// Minimum matched fraction for a positive region, in [0, 1]
    pub decision_threshold: f64,
    /// Connectivity used to split the foreground into regions
    pub connectivity: Connectivity,
    /// Cleanup applied to the matched mask first (disabled when `None`)
    pub cleanup: Option<MatchCleanup>,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            connectivity: Connectivity::Eight,
            cleanup: None,
        }
    }
}

impl RegionParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(Error::InvalidParameter {
                name: "decision_threshold",
                value: self.decision_threshold.to_string(),
                reason: "must lie in [0, 1]".into(),
            });
        }
        Ok(())
    }
}

/// Verdict for one connected foreground region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDecision {
    /// Component label in [1, regions]
    pub label: u32,
    pub pixel_count: usize,
    pub matched_count: usize,
    /// `matched_count / pixel_count`, 0 for an empty region
    pub coverage: f64,
    pub positive: bool,
    pub bbox: BoundingBox,
}

/// All region verdicts of one sample plus the union of positive regions
#[derive(Debug, Clone)]
pub struct RegionOutcome {
    pub decisions: Vec<RegionDecision>,
    pub positive_mask: Mask,
}

impl RegionOutcome {
    pub fn positive_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.positive).count()
    }
}

/// Coverage of a region, 0 when it has no pixels
pub fn coverage(matched: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64
    }
}

/// Vote every connected foreground region of `foreground` using `matched`.
///
/// Matched pixels outside the foreground never count toward any region.
pub fn decide_regions(foreground: &Mask, matched: &Mask, params: &RegionParams) -> Result<RegionOutcome> {
    params.validate()?;
    foreground.ensure_same_shape(matched)?;

    let cleaned;
    let matched = match params.cleanup {
        Some(cleanup) => {
            let objects = remove_small_objects(matched, cleanup.min_object_area, Connectivity::Eight);
            cleaned = remove_small_holes(&objects, cleanup.max_hole_area, Connectivity::Four);
            &cleaned
        }
        None => matched,
    };

    let regions = label_components(foreground, params.connectivity);
    let mut matched_counts = vec![0usize; regions.count()];
    for ((r, c), label) in regions.labels.indexed_iter() {
        if label != 0 && matched[(r, c)] {
            matched_counts[label as usize - 1] += 1;
        }
    }

    let decisions: Vec<RegionDecision> = regions
        .components
        .iter()
        .zip(&matched_counts)
        .map(|(component, &matched_count)| {
            let coverage = coverage(matched_count, component.area);
            RegionDecision {
                label: component.label,
                pixel_count: component.area,
                matched_count,
                coverage,
                positive: coverage >= params.decision_threshold,
                bbox: component.bbox,
            }
        })
        .collect();

    let positive: Vec<bool> = decisions.iter().map(|d| d.positive).collect();
    let positive_mask = regions.labels.map(|l| l != 0 && positive[l as usize - 1]);

    debug!(
        regions = decisions.len(),
        positive = positive.iter().filter(|p| **p).count(),
        threshold = params.decision_threshold,
        "region decisions"
    );

    Ok(RegionOutcome {
        decisions,
        positive_mask,
    })
}

/// Region decision stage as an [`Algorithm`]; input is `(foreground, matched)`.
#[derive(Debug, Clone, Default)]
pub struct RegionDecisionMaker;

impl Algorithm for RegionDecisionMaker {
    type Input = (Mask, Mask);
    type Output = RegionOutcome;
    type Params = RegionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "RegionDecision"
    }

    fn description(&self) -> &'static str {
        "Coverage vote of template-matched pixels over connected foreground regions"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (foreground, matched) = input;
        decide_regions(&foreground, &matched, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(mask: &mut Mask, r0: usize, c0: usize, side: usize) {
        for r in r0..r0 + side {
            for c in c0..c0 + side {
                mask.set(r, c, true).unwrap();
            }
        }
    }

    #[test]
    fn test_two_regions() {
        let mut foreground = Mask::filled(10, 10, false);
        square(&mut foreground, 0, 0, 4);
        square(&mut foreground, 6, 6, 4);

        // 5 of 16 in the first region, 4 of 16 in the second
        let mut matched = Mask::filled(10, 10, false);
        for c in 0..4 {
            matched.set(0, c, true).unwrap();
        }
        matched.set(1, 0, true).unwrap();
        for c in 6..10 {
            matched.set(9, c, true).unwrap();
        }

        let outcome = decide_regions(&foreground, &matched, &RegionParams::default()).unwrap();
        assert_eq!(outcome.decisions.len(), 2);
        assert_eq!(outcome.decisions[0].matched_count, 5);
        assert!(outcome.decisions[0].positive);
        assert!((outcome.decisions[1].coverage - 0.25).abs() < 1e-12);
        assert!(!outcome.decisions[1].positive);
        assert_eq!(outcome.positive_mask.count_true(), 16);
        assert!(outcome.positive_mask[(3, 3)]);
        assert!(!outcome.positive_mask[(7, 7)]);
        assert_eq!(outcome.positive_count(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let foreground = Mask::filled(1, 10, true);
        let mut matched = Mask::filled(1, 10, false);
        for c in 0..3 {
            matched.set(0, c, true).unwrap();
        }
        let outcome = decide_regions(&foreground, &matched, &RegionParams::default()).unwrap();
        assert!((outcome.decisions[0].coverage - 0.3).abs() < 1e-12);
        assert!(outcome.decisions[0].positive);
    }

    #[test]
    fn test_matched_outside_foreground_ignored() {
        let mut foreground = Mask::filled(5, 5, false);
        square(&mut foreground, 0, 0, 2);
        let mut matched = Mask::filled(5, 5, true);
        matched.set(0, 0, false).unwrap();
        matched.set(0, 1, false).unwrap();
        matched.set(1, 0, false).unwrap();

        let outcome = decide_regions(&foreground, &matched, &RegionParams::default()).unwrap();
        assert_eq!(outcome.decisions[0].matched_count, 1);
        assert!(!outcome.decisions[0].positive);
        assert!(!outcome.positive_mask.any());
    }

    #[test]
    fn test_empty_foreground() {
        let foreground = Mask::filled(4, 4, false);
        let outcome = RegionDecisionMaker
            .execute_default((foreground.clone(), foreground))
            .unwrap();
        assert!(outcome.decisions.is_empty());
        assert!(!outcome.positive_mask.any());
    }

    #[test]
    fn test_coverage_zero_total() {
        assert_eq!(coverage(0, 0), 0.0);
        assert_eq!(coverage(1, 4), 0.25);
    }

    #[test]
    fn test_monotone_in_matched_count() {
        let foreground = Mask::filled(4, 5, true);
        let mut matched = Mask::filled(4, 5, false);
        let mut last = 0.0;
        for i in 0..20 {
            matched.set(i / 5, i % 5, true).unwrap();
            let outcome = decide_regions(&foreground, &matched, &RegionParams::default()).unwrap();
            let cov = outcome.decisions[0].coverage;
            assert!(cov >= last);
            last = cov;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_cleanup_drops_isolated_matches() {
        let foreground = Mask::filled(20, 20, true);
        let mut matched = Mask::filled(20, 20, false);
        // a 10x10 matched block with speckle elsewhere
        square(&mut matched, 0, 0, 10);
        matched.set(15, 15, true).unwrap();

        let params = RegionParams {
            cleanup: Some(MatchCleanup::default()),
            ..Default::default()
        };
        let outcome = decide_regions(&foreground, &matched, &params).unwrap();
        assert_eq!(outcome.decisions[0].matched_count, 100);
    }

    #[test]
    fn test_invalid_threshold() {
        let params = RegionParams {
            decision_threshold: 1.5,
            ..Default::default()
        };
        let m = Mask::filled(2, 2, true);
        assert!(decide_regions(&m, &m, &params).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Mask::filled(2, 2, true);
        let b = Mask::filled(2, 3, true);
        assert!(decide_regions(&a, &b, &RegionParams::default()).is_err());
    }
}
