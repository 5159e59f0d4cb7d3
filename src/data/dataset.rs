// ============================================================
// Layer 4 — Dataset State and Burn Adapter
// ============================================================
// Two things live here:
//
//   DatasetState — the loaded/split bookkeeping every concrete
//                  dataset kind shares. Holds the sample block
//                  and the memoized split, and turns premature
//                  accessor calls into NotLoaded / NotSplit.
//
//   FrameDataset — the bridge into Burn's DataLoader. Holds a
//                  materialized subset of frames (one split)
//                  and implements Burn's Dataset trait so the
//                  loader can call .get(index) and .len().
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use burn::data::dataset::Dataset;
use ndarray::{Array3, Axis};
use rand::rngs::StdRng;

use crate::data::splitter::split_indices;
use crate::domain::error::{PipelineError, Result};
use crate::domain::sample::{RadioSamples, SplitIndices};

// ─── DatasetState ─────────────────────────────────────────────────────────────

/// Shared load/split state for the concrete dataset kinds.
#[derive(Debug, Default)]
pub struct DatasetState {
    component: &'static str,
    samples: Option<RadioSamples>,
    modulations: Vec<String>,
    split: Option<SplitIndices>,
}

impl DatasetState {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            samples: None,
            modulations: Vec::new(),
            split: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.samples.is_some()
    }

    /// Store a freshly loaded block after checking its invariants
    /// against the class list that defines the label encoding.
    pub fn install(&mut self, samples: RadioSamples, modulations: Vec<String>) -> Result<()> {
        samples.verify(modulations.len())?;
        self.samples = Some(samples);
        self.modulations = modulations;
        self.split = None;
        Ok(())
    }

    fn samples(&self, what: &'static str) -> Result<&RadioSamples> {
        self.samples.as_ref().ok_or(PipelineError::NotLoaded {
            component: self.component,
            what,
        })
    }

    pub fn data(&self) -> Result<&Array3<f32>> {
        Ok(&self.samples("data")?.data)
    }

    pub fn labels(&self) -> Result<&[usize]> {
        Ok(&self.samples("labels")?.labels)
    }

    pub fn modulations(&self) -> Result<&[String]> {
        self.samples("modulations")?;
        Ok(&self.modulations)
    }

    pub fn snrs(&self) -> Result<&[i32]> {
        Ok(&self.samples("snrs_per_sample")?.snrs)
    }

    /// Compute the partition once and memoize it.
    pub fn split(
        &mut self,
        train_frac: f64,
        val_frac: f64,
        force_resplit: bool,
        rng: &mut StdRng,
    ) -> Result<&SplitIndices> {
        let n = self.samples("split")?.len();
        if self.split.is_none() || force_resplit {
            self.split = Some(split_indices(n, train_frac, val_frac, rng)?);
        }
        self.split_indices()
    }

    pub fn split_indices(&self) -> Result<&SplitIndices> {
        self.split.as_ref().ok_or(PipelineError::NotSplit {
            component: self.component,
        })
    }
}

// ─── FrameDataset ─────────────────────────────────────────────────────────────

/// One IQ frame with its class label, flattened time-major:
/// iq = [i0, q0, i1, q1, ...], so iq.len() = 2 * T.
#[derive(Debug, Clone)]
pub struct IqFrame {
    pub iq: Vec<f32>,
    pub label: usize,
}

/// A materialized subset of samples (one split) for Burn's DataLoader.
pub struct FrameDataset {
    frames: Vec<IqFrame>,
    time_steps: usize,
}

impl FrameDataset {
    /// Gather the frames named by `indices` out of the full block.
    pub fn from_indices(data: &Array3<f32>, labels: &[usize], indices: &[usize]) -> Self {
        let time_steps = data.shape()[1];
        let frames = indices
            .iter()
            .map(|&i| IqFrame {
                iq: data.index_axis(Axis(0), i).iter().copied().collect(),
                label: labels[i],
            })
            .collect();
        Self { frames, time_steps }
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    pub fn sample_count(&self) -> usize {
        self.frames.len()
    }
}

impl Dataset<IqFrame> for FrameDataset {
    fn get(&self, index: usize) -> Option<IqFrame> {
        self.frames.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}
