// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn-specific code lives in this layer. No other layer
// imports from burn directly except the thin data adapters.
//
// What's in this layer:
//
//   config.rs      — declarative, round-trippable topology
//                    descriptions (the model configurations)
//   cnn.rs         — 1-D convolutional classifier builder
//   transformer.rs — conv prelude + encoder-transformer builder
//   registry.rs    — model name -> builder dispatch (Network)
//   trainer.rs     — epoch loop: Adam, LR schedule, history
//   evaluator.rs   — confusion matrix, per-class/per-SNR accuracy
//
// Training runs on the autodiff ndarray backend; evaluation on
// the plain ndarray backend via model.valid(), which also turns
// dropout off.
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

use burn::nn::PaddingConfig1d;
use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::ml::config::Padding;

/// Declarative model configurations
pub mod config;

/// Convolutional classifier builder
pub mod cnn;

/// Encoder-transformer classifier builder
pub mod transformer;

/// Model name -> builder dispatch
pub mod registry;

/// Training loop with the learning-rate schedule
pub mod trainer;

/// Overall / per-class / per-SNR evaluation
pub mod evaluator;

/// Backend the training loop runs on.
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Backend for validation and final evaluation.
pub type EvalBackend = burn::backend::NdArray;

pub fn default_device() -> burn::backend::ndarray::NdArrayDevice {
    Default::default()
}

/// The one capability the rest of the pipeline needs from a built
/// network: frames in, class scores out.
pub trait Classifier<B: Backend>: Module<B> {
    /// Class logits for a batch of frames: [batch, T, 2] -> [batch, C]
    fn forward(&self, frames: Tensor<B, 3>) -> Tensor<B, 2>;

    /// Class probabilities (softmax over the logits).
    fn predict(&self, frames: Tensor<B, 3>) -> Tensor<B, 2> {
        softmax(self.forward(frames), 1)
    }
}

pub(crate) fn padding_config(padding: Padding) -> PaddingConfig1d {
    match padding {
        Padding::Same => PaddingConfig1d::Same,
        Padding::Valid => PaddingConfig1d::Valid,
    }
}
