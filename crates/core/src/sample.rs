//! Labeled and unlabeled measurement samples

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{FeatureCube, Mask};

/// Ground-truth class of a training sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassLabel {
    Target,
    NonTarget,
}

/// One measurement image: a feature vector per pixel plus a foreground mask.
///
/// Training samples carry a [`ClassLabel`] that applies to all their
/// foreground pixels; test samples leave it unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Caller-supplied identifier used in errors and logs
    pub id: String,
    pub features: FeatureCube,
    pub mask: Mask,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<ClassLabel>,
}

impl Sample {
    pub fn new(id: impl Into<String>, features: FeatureCube, mask: Mask) -> Self {
        Self {
            id: id.into(),
            features,
            mask,
            label: None,
        }
    }

    pub fn with_label(mut self, label: ClassLabel) -> Self {
        self.label = Some(label);
        self
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.shape()
    }

    pub fn channels(&self) -> usize {
        self.features.channels()
    }

    /// Number of foreground pixels
    pub fn foreground_count(&self) -> usize {
        self.mask.count_true()
    }

    /// Check that the sample can be fed to the pipeline.
    ///
    /// Fails with [`Error::Data`] when the feature grid and mask disagree in
    /// shape or the channel count is not `channels`, and with
    /// [`Error::InvalidFeature`] at the first non-finite foreground value.
    pub fn validate(&self, channels: usize) -> Result<()> {
        if self.features.shape() != self.mask.shape() {
            let (fr, fc) = self.features.shape();
            let (mr, mc) = self.mask.shape();
            return Err(Error::data(
                &self.id,
                format!("feature grid is {fr}x{fc} but mask is {mr}x{mc}"),
            ));
        }
        if self.features.channels() != channels {
            return Err(Error::data(
                &self.id,
                format!(
                    "expected {channels} channels, found {}",
                    self.features.channels()
                ),
            ));
        }
        if let Some((row, col, channel, value)) = self.first_non_finite() {
            return Err(Error::InvalidFeature {
                sample: self.id.clone(),
                row,
                col,
                channel,
                value,
            });
        }
        Ok(())
    }

    /// Like [`Sample::validate`] but also requires a class label
    pub fn validate_labeled(&self, channels: usize) -> Result<ClassLabel> {
        let label = self
            .label
            .ok_or_else(|| Error::data(&self.id, "training sample has no class label"))?;
        self.validate(channels)?;
        Ok(label)
    }

    /// Copy of the sample with every foreground pixel holding a non-finite value masked out
    pub fn mask_non_finite(&self) -> Sample {
        let mut mask = self.mask.clone();
        for ((row, col), fg) in self.mask.indexed_iter() {
            if fg && self.features.pixel(row, col).iter().any(|v| !v.is_finite()) {
                mask[(row, col)] = false;
            }
        }
        Sample {
            id: self.id.clone(),
            features: self.features.clone(),
            mask,
            label: self.label,
        }
    }

    fn first_non_finite(&self) -> Option<(usize, usize, usize, f64)> {
        self.mask
            .indexed_iter()
            .filter(|&(_, fg)| fg)
            .find_map(|((row, col), _)| {
                self.features
                    .pixel(row, col)
                    .iter()
                    .position(|v| !v.is_finite())
                    .map(|ch| (row, col, ch, self.features.pixel(row, col)[ch]))
            })
    }
}
