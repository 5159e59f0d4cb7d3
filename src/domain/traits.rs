// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The dataset capability interface. The rest of the pipeline
// only ever sees this trait; concrete formats live in Layer 4
// and are chosen by name through the dataset registry.
//
// Implementations:
//   - RadioMl2016 -> one serialized blob keyed by (modulation, snr)
//   - MatlabV2    -> per-class MAT frame files with derived SNRs
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §17 (Object Oriented Patterns)

use ndarray::Array3;
use rand::rngs::StdRng;

use crate::domain::error::Result;
use crate::domain::sample::{DatasetPath, SplitIndices};

/// A dataset of labeled IQ frames that can be loaded from disk and
/// partitioned for training.
///
/// Contract:
///   - `load` is idempotent unless `force` is set
///   - the accessors fail with `NotLoaded` before the first `load`
///   - `split` memoizes its result; `force_resplit` recomputes it
///   - `split_indices` fails with `NotSplit` before the first `split`
pub trait RadioDataset: std::fmt::Debug {
    /// Registry tag of this dataset kind.
    fn name(&self) -> &'static str;

    /// Rank the loaded sample block must have. Verified by the
    /// orchestrator before any tensor is built; nothing is reshaped
    /// silently.
    fn expected_rank(&self) -> usize {
        3
    }

    /// Read the raw files and populate data, labels and SNRs.
    fn load(&mut self, path: &DatasetPath, force: bool) -> Result<()>;

    /// The N x T x 2 sample block.
    fn data(&self) -> Result<&Array3<f32>>;

    /// One class index per sample, each in [0, modulations().len()).
    fn labels(&self) -> Result<&[usize]>;

    /// Ordered class names; position defines the label encoding.
    fn modulations(&self) -> Result<&[String]>;

    /// One signal-to-noise ratio (dB) per sample.
    fn snrs_per_sample(&self) -> Result<&[i32]>;

    /// Partition samples into train/val/test, shuffling with the
    /// caller's random source. Components never reseed; the
    /// orchestrator is the single seeding point.
    fn split(
        &mut self,
        train_frac: f64,
        val_frac: f64,
        force_resplit: bool,
        rng: &mut StdRng,
    ) -> Result<&SplitIndices>;

    /// The memoized partition from the last `split` call.
    fn split_indices(&self) -> Result<&SplitIndices>;
}
