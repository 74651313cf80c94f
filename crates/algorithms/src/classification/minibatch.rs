//! Mini-batch K-means
//!
//! Centroids are refined from small batches with a per-centroid learning rate
//! `1 / count`, so a fit only ever holds one batch plus the K x d centroid
//! matrix. Input can be an in-memory matrix or a replayable stream of batches
//! (one replay per epoch).

use ndarray::{s, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use pft_core::{Error, Result};

use super::codebook::{nearest_centroid, squared_distance, Codebook, FitSummary, QuantizerFit, VectorQuantizer};
use super::kmeans::{kmeans_plus_plus, KmeansParams};

/// Number of batches worth of vectors used to seed the centroids
const INIT_BATCHES: usize = 3;

/// Mini-batch K-means quantizer
#[derive(Debug, Clone, Default)]
pub struct MiniBatchKmeans {
    params: KmeansParams,
}

impl MiniBatchKmeans {
    pub fn new(params: KmeansParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KmeansParams {
        &self.params
    }

    /// Fit from a replayable stream of `n x d` batches.
    ///
    /// `batches` is called once to draw a random initialization sample from the
    /// whole stream and once per epoch; every call must yield the same vectors
    /// in the same order for the fit to be reproducible. Batches larger than the
    /// configured batch size are split.
    pub fn fit_stream<F, I>(&self, mut batches: F) -> Result<(Codebook, FitSummary)>
    where
        F: FnMut() -> I,
        I: IntoIterator<Item = Result<Array2<f64>>>,
    {
        let params = &self.params;
        params.validate()?;
        let batch_size = params.effective_batch_size();
        let init_size = (INIT_BATCHES * batch_size).max(params.k);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let (init, total) = reservoir_sample(batches(), init_size, &mut rng)?;
        params.validate_for(total)?;

        let mut state = MiniBatchState::new(kmeans_plus_plus(init.view(), params.k, &mut rng));
        drop(init);

        let mut summary = FitSummary {
            iterations: 0,
            converged: false,
        };

        for epoch in 0..params.max_iterations {
            summary.iterations = epoch + 1;
            let before = state.centroids.clone();

            for batch in batches() {
                let batch = batch?;
                if batch.ncols() != state.centroids.ncols() {
                    return Err(Error::InvalidParameter {
                        name: "batch",
                        value: format!("{} columns", batch.ncols()),
                        reason: format!("expected {} features", state.centroids.ncols()),
                    });
                }
                for chunk in batch.axis_chunks_iter(Axis(0), batch_size) {
                    state.step(chunk);
                }
            }

            let max_shift = state
                .centroids
                .outer_iter()
                .zip(before.outer_iter())
                .map(|(a, b)| squared_distance(a, b).sqrt())
                .fold(0.0_f64, f64::max);

            debug!(epoch = epoch + 1, max_shift, "mini-batch k-means epoch");
            if max_shift <= params.tolerance {
                summary.converged = true;
                break;
            }
        }

        Ok((Codebook::new(state.centroids)?, summary))
    }
}

impl VectorQuantizer for MiniBatchKmeans {
    fn k(&self) -> usize {
        self.params.k
    }

    fn fit(&self, data: ArrayView2<'_, f64>) -> Result<QuantizerFit> {
        let batch_size = self.params.effective_batch_size().max(1);
        let n = data.nrows();
        let (codebook, summary) = self.fit_stream(move || {
            (0..n).step_by(batch_size).map(move |start| {
                let end = (start + batch_size).min(n);
                Ok::<_, Error>(data.slice(s![start..end, ..]).to_owned())
            })
        })?;
        let assignment = codebook.predict_batch(data);
        Ok(QuantizerFit {
            codebook,
            assignment,
            summary,
        })
    }
}

/// Uniform random sample of up to `size` vectors from one pass over `batches`
/// (reservoir sampling), plus the total number of vectors seen.
fn reservoir_sample<I>(batches: I, size: usize, rng: &mut StdRng) -> Result<(Array2<f64>, usize)>
where
    I: IntoIterator<Item = Result<Array2<f64>>>,
{
    let mut dim: Option<usize> = None;
    let mut kept: Vec<f64> = Vec::new();
    let mut seen = 0usize;

    for batch in batches {
        let batch = batch?;
        let d = *dim.get_or_insert(batch.ncols());
        if batch.ncols() != d {
            return Err(Error::InvalidParameter {
                name: "batch",
                value: format!("{} columns", batch.ncols()),
                reason: format!("expected {d} features"),
            });
        }
        for row in batch.outer_iter() {
            if seen < size {
                kept.extend(row.iter().copied());
            } else {
                let slot = rng.random_range(0..=seen);
                if slot < size {
                    for (dst, &x) in kept[slot * d..(slot + 1) * d].iter_mut().zip(row) {
                        *dst = x;
                    }
                }
            }
            seen += 1;
        }
    }

    let d = dim.unwrap_or(0);
    let rows = seen.min(size);
    Ok((Array2::from_shape_vec((rows, d), kept)?, seen))
}

struct MiniBatchState {
    centroids: Array2<f64>,
    counts: Vec<u64>,
}

impl MiniBatchState {
    fn new(centroids: Array2<f64>) -> Self {
        let k = centroids.nrows();
        Self {
            centroids,
            counts: vec![0; k],
        }
    }

    /// Assign the batch against the current centroids, then pull each
    /// assigned centroid towards its members.
    fn step(&mut self, batch: ArrayView2<'_, f64>) {
        let labels: Vec<usize> = batch
            .outer_iter()
            .map(|row| nearest_centroid(self.centroids.view(), row).0)
            .collect();

        for (row, &label) in batch.outer_iter().zip(labels.iter()) {
            self.counts[label] += 1;
            let eta = 1.0 / self.counts[label] as f64;
            let mut centroid = self.centroids.row_mut(label);
            centroid.zip_mut_with(&row, |c, &x| *c += eta * (x - *c));
        }
    }
}
