// ============================================================
// Layer 3 — Sample Block and Split Types
// ============================================================
// The in-memory representation of a loaded radio dataset:
// a block of IQ frames plus the per-frame label and SNR.
//
// Shape convention (time-major, feature-last):
//   data[sample][time][0] = in-phase value
//   data[sample][time][1] = quadrature value
//
// Reference: O'Shea & West (2016), Radio ML Dataset Generation

use std::path::PathBuf;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

/// Where a dataset lives on disk. Most formats are a single file or
/// directory; some ship labels and data as a pair of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetPath {
    Single(PathBuf),
    Pair(PathBuf, PathBuf),
}

impl DatasetPath {
    /// The primary path: the single file/directory, or the first of a pair.
    pub fn primary(&self) -> &PathBuf {
        match self {
            Self::Single(p) => p,
            Self::Pair(p, _) => p,
        }
    }
}

/// A loaded block of N samples: data is N x T x 2, labels and SNRs are
/// one entry per sample. Labels index into the owning dataset's ordered
/// modulation list.
#[derive(Debug, Clone)]
pub struct RadioSamples {
    pub data: Array3<f32>,
    pub labels: Vec<usize>,
    pub snrs: Vec<i32>,
}

impl RadioSamples {
    pub fn len(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the structural invariants every loader must satisfy:
    /// equal lengths across data/labels/SNRs and every label in
    /// [0, n_classes).
    pub fn verify(&self, n_classes: usize) -> Result<()> {
        let n = self.len();
        if self.labels.len() != n || self.snrs.len() != n {
            return Err(PipelineError::InvalidConfiguration(format!(
                "sample count mismatch: {} frames, {} labels, {} snrs",
                n,
                self.labels.len(),
                self.snrs.len()
            )));
        }
        if let Some(&bad) = self.labels.iter().find(|&&l| l >= n_classes) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "label {bad} out of range for {n_classes} modulation classes"
            )));
        }
        Ok(())
    }
}

/// A three-way partition of sample indices. Index order inside each
/// slice is the shuffled order, not sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }
}
