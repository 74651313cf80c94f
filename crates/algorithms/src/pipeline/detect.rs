//! Inference on one sample: classification, region vote, contour

use pft_core::{Mask, Result, Sample};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classification::{matched_mask, PixelLabeling};
use crate::contour::{generate_contour, ContourParams};
use crate::region::{decide_regions, RegionDecision, RegionParams};

use super::model::TrainedModel;

/// Parameters of the inference stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    pub region: RegionParams,
    pub contour: ContourParams,
}

impl DetectionParams {
    pub fn validate(&self) -> Result<()> {
        self.region.validate()?;
        self.contour.validate()
    }
}

/// Everything inferred for one sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Identifier of the classified sample
    pub sample: String,
    pub labeling: PixelLabeling,
    /// Foreground pixels whose label is a template cluster
    pub matched: Mask,
    pub regions: Vec<RegionDecision>,
    /// Union of the positive regions
    pub positive_mask: Mask,
    pub contour: Mask,
}

impl Detection {
    /// Whether any region was declared positive
    pub fn is_positive(&self) -> bool {
        self.regions.iter().any(|r| r.positive)
    }

    pub fn matched_count(&self) -> usize {
        self.matched.count_true()
    }
}

/// Run the inference stages of `model` on `sample`
pub fn detect(model: &TrainedModel, sample: &Sample, params: &DetectionParams) -> Result<Detection> {
    params.validate()?;

    let labeling = model.classify(sample)?;
    let matched = matched_mask(&labeling, model.template());
    let outcome = decide_regions(&sample.mask, &matched, &params.region)?;
    let contour = generate_contour(&outcome.positive_mask, &params.contour)?;

    debug!(
        sample = %sample.id,
        matched = matched.count_true(),
        regions = outcome.decisions.len(),
        positive = outcome.positive_count(),
        "detection"
    );

    Ok(Detection {
        sample: sample.id.clone(),
        labeling,
        matched,
        regions: outcome.decisions,
        positive_mask: outcome.positive_mask,
        contour,
    })
}
