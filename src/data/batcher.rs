// ============================================================
// Layer 4 — IQ Frame Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<IqFrame> into
// one tensor batch for the forward pass.
//
// All frames in a dataset share the same length, so batching is
// a flatten-then-reshape:
//   [f1_t0_i, f1_t0_q, ..., fN_tT_q]  ->  [N, T, 2]
//
// Reference: Burn Book §4 (Batcher)

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::data::dataset::IqFrame;

/// A batch of IQ frames ready for the model.
#[derive(Debug, Clone)]
pub struct FrameBatch<B: Backend> {
    /// Time-major IQ samples, shape [batch_size, time_steps, 2]
    pub frames: Tensor<B, 3>,

    /// Class index per frame, shape [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

/// Holds the target device so tensors land where training runs.
/// Generic over the backend: the same batcher serves the autodiff
/// training loader and the plain validation loader.
#[derive(Clone, Debug)]
pub struct FrameBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> FrameBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<IqFrame, FrameBatch<B>> for FrameBatcher<B> {
    fn batch(&self, items: Vec<IqFrame>) -> FrameBatch<B> {
        let batch_size = items.len();
        // iq is time-major [t][channel], flattened; len = 2 * T
        let time_steps = items[0].iq.len() / 2;

        let flat: Vec<f32> = items.iter().flat_map(|s| s.iq.iter().copied()).collect();
        let frames = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, time_steps, 2]);

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        FrameBatch { frames, labels }
    }
}
