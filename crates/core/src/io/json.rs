//! JSON reading/writing
//!
//! Uses `serde_json` with buffered readers and writers.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{FeatureCube, Mask};
use crate::sample::{ClassLabel, Sample};

/// Flat on-disk representation of a [`Sample`].
///
/// `features` holds `rows * cols * channels` values, pixel-major
/// (all channels of pixel (0,0), then pixel (0,1), ...). `mask` holds
/// `rows * cols` flags in row-major order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleFile {
    pub id: String,
    pub rows: usize,
    pub cols: usize,
    pub channels: usize,
    pub features: Vec<f64>,
    pub mask: Vec<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<ClassLabel>,
}

impl SampleFile {
    /// Convert into a [`Sample`], reporting layout problems as [`Error::Data`]
    pub fn into_sample(self) -> Result<Sample> {
        let SampleFile {
            id,
            rows,
            cols,
            channels,
            features,
            mask,
            label,
        } = self;

        let pixels = rows
            .checked_mul(cols)
            .ok_or_else(|| Error::data(&id, format!("grid {rows}x{cols} is too large")))?;
        let values = pixels
            .checked_mul(channels)
            .ok_or_else(|| Error::data(&id, format!("grid {rows}x{cols}x{channels} is too large")))?;

        if mask.len() != pixels {
            return Err(Error::data(
                &id,
                format!("mask has {} values, expected {}", mask.len(), pixels),
            ));
        }
        if channels == 0 || features.len() != values {
            return Err(Error::data(
                &id,
                format!("feature grid has {} values, expected {}", features.len(), values),
            ));
        }

        let features = FeatureCube::from_vec(features, rows, cols, channels)?;
        let mask = Mask::from_vec(mask, rows, cols)?;
        Ok(Sample {
            id,
            features,
            mask,
            label,
        })
    }
}

impl From<&Sample> for SampleFile {
    fn from(sample: &Sample) -> Self {
        let (rows, cols) = sample.features.shape();
        SampleFile {
            id: sample.id.clone(),
            rows,
            cols,
            channels: sample.features.channels(),
            features: sample.features.view().iter().copied().collect(),
            mask: sample.mask.data().iter().copied().collect(),
            label: sample.label,
        }
    }
}

/// Read any JSON document
pub fn read_json<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write any serializable value as pretty JSON
pub fn write_json<T, P>(value: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Read a sample written as a [`SampleFile`]
pub fn read_sample<P: AsRef<Path>>(path: P) -> Result<Sample> {
    read_json::<SampleFile, _>(path)?.into_sample()
}

/// Write a sample as a [`SampleFile`]
pub fn write_sample<P: AsRef<Path>>(sample: &Sample, path: P) -> Result<()> {
    write_json(&SampleFile::from(sample), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_file_roundtrip() {
        let mut features = FeatureCube::uniform(2, 3, &[0.5, -1.0]);
        features.set_pixel(1, 2, &[9.0, 8.0]).unwrap();
        let mut mask = Mask::filled(2, 3, false);
        mask.set(1, 2, true).unwrap();
        let sample = Sample::new("roundtrip", features, mask).with_label(ClassLabel::NonTarget);

        let tmp = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        write_sample(&sample, tmp.path()).unwrap();
        let reloaded = read_sample(tmp.path()).unwrap();

        assert_eq!(reloaded, sample);
        assert_eq!(reloaded.features.pixel(1, 2).to_vec(), vec![9.0, 8.0]);
    }

    #[test]
    fn test_bad_layout_is_data_error() {
        let file = SampleFile {
            id: "broken".into(),
            rows: 2,
            cols: 2,
            channels: 3,
            features: vec![0.0; 11],
            mask: vec![true; 4],
            label: None,
        };
        assert!(matches!(file.into_sample(), Err(Error::Data { ref sample, .. }) if sample == "broken"));
    }

    #[test]
    fn test_oversized_dimensions_are_data_error() {
        let file = SampleFile {
            id: "huge".into(),
            rows: usize::MAX / 2,
            cols: 3,
            channels: 1,
            features: vec![],
            mask: vec![],
            label: None,
        };
        assert!(matches!(file.into_sample(), Err(Error::Data { ref sample, .. }) if sample == "huge"));

        let file = SampleFile {
            id: "deep".into(),
            rows: 1 << 20,
            cols: 1 << 20,
            channels: usize::MAX / 4,
            features: vec![],
            mask: vec![],
            label: None,
        };
        assert!(matches!(file.into_sample(), Err(Error::Data { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_sample("/nonexistent/path/sample.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
