// ============================================================
// Layer 5 — Model Builder Registry
// ============================================================
// Name -> builder dispatch. make_model checks that the
// configuration tag belongs to the requested model family, runs
// the matching builder, and wraps the result in Network so the
// rest of the pipeline can stay family-agnostic.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::domain::error::{PipelineError, Result};
use crate::ml::cnn::{self, CnnClassifier};
use crate::ml::config::{ModelConfig, CNN_1D_V01X, TRANSFORMER_V01X};
use crate::ml::transformer::{self, TransformerClassifier};
use crate::ml::Classifier;

/// A built network of either family. Thin dispatch wrapper: every
/// method forwards to the underlying module.
#[derive(Debug)]
pub enum Network<B: Backend> {
    Cnn(CnnClassifier<B>),
    Transformer(TransformerClassifier<B>),
}

impl<B: Backend> Network<B> {
    /// Total learned parameter count (sum over all tensors of the
    /// product of their shape dimensions).
    pub fn num_params(&self) -> usize {
        match self {
            Self::Cnn(m) => m.num_params(),
            Self::Transformer(m) => m.num_params(),
        }
    }

    /// Class logits, [batch, T, 2] -> [batch, C].
    pub fn forward(&self, frames: Tensor<B, 3>) -> Tensor<B, 2> {
        match self {
            Self::Cnn(m) => m.forward(frames),
            Self::Transformer(m) => m.forward(frames),
        }
    }

    /// Class probabilities, [batch, T, 2] -> [batch, C].
    pub fn predict(&self, frames: Tensor<B, 3>) -> Tensor<B, 2> {
        match self {
            Self::Cnn(m) => m.predict(frames),
            Self::Transformer(m) => m.predict(frames),
        }
    }
}

impl<B: AutodiffBackend> Network<B> {
    /// The inference view of a training network: inner backend,
    /// dropout off.
    pub fn valid(&self) -> Network<B::InnerBackend> {
        match self {
            Self::Cnn(m) => Network::Cnn(m.valid()),
            Self::Transformer(m) => Network::Transformer(m.valid()),
        }
    }
}

/// Build the model registered under `name` from `config`.
pub fn make_model<B: Backend>(
    name: &str,
    config: &ModelConfig,
    device: &B::Device,
) -> Result<Network<B>> {
    match name {
        CNN_1D_V01X => match config {
            ModelConfig::Cnn(c) => Ok(Network::Cnn(cnn::build(c, device)?)),
            other => Err(mismatch(name, other)),
        },
        TRANSFORMER_V01X => match config {
            ModelConfig::Transformer(c) => Ok(Network::Transformer(transformer::build(c, device)?)),
            other => Err(mismatch(name, other)),
        },
        other => Err(PipelineError::UnknownModel(other.to_string())),
    }
}

fn mismatch(model: &str, config: &ModelConfig) -> PipelineError {
    PipelineError::ConfigurationMismatch {
        model: model.to_string(),
        config: config.tag().to_string(),
    }
}
