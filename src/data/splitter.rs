// ============================================================
// Layer 4 — Train/Validation/Test Splitter
// ============================================================
// Shuffles the sample indices [0, N) and cuts them into three
// disjoint slices:
//   - Training set:   updates model weights
//   - Validation set: measures generalisation during training
//   - Test set:       held out for the final evaluation
//
// Slice sizes are floor-based so the partition is exact:
//   |train| = floor(N * train_frac)
//   |val|   = floor(N * (train_frac + val_frac)) - |train|
//   |test|  = the remainder
//
// The shuffle uses the caller's random source. Splitting is a
// pure function of (N, fractions, RNG state at call time), which
// is what makes experiments reproducible from a single seed.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom,
// the standard unbiased shuffle algorithm.
//
// Reference: rand crate documentation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::domain::error::{PipelineError, Result};
use crate::domain::sample::SplitIndices;

/// Shuffle `[0, n)` and partition it at the cumulative fraction
/// boundaries. Fails with `InvalidSplitRatio` unless
/// `train_frac + val_frac < 1`.
///
/// Index order inside each slice is the shuffled order.
pub fn split_indices(
    n: usize,
    train_frac: f64,
    val_frac: f64,
    rng: &mut StdRng,
) -> Result<SplitIndices> {
    if train_frac + val_frac >= 1.0 {
        return Err(PipelineError::InvalidSplitRatio {
            train_frac,
            val_frac,
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    // Cumulative boundaries; floor keeps all three slices exact even
    // when the fractions don't divide N.
    let train_end = ((n as f64) * train_frac).floor() as usize;
    let val_end = ((n as f64) * (train_frac + val_frac)).floor() as usize;

    let test = indices.split_off(val_end);
    let val = indices.split_off(train_end);
    let train = indices;

    tracing::debug!(
        "Split {} samples: {} train / {} val / {} test",
        n,
        train.len(),
        val.len(),
        test.len(),
    );

    Ok(SplitIndices { train, val, test })
}
