// ============================================================
// Layer 5 — Convolutional Classifier
// ============================================================
// Builds the cnn_1d_v01x family: a stack of
//   Conv1d -> MaxPool1d -> BatchNorm -> ReLU
// stages over the time axis, a trailing average pool, then a
// dense head ending in n_classes logits.
//
// Frames arrive time-major [batch, T, 2]; the 1-D primitives are
// channel-major, so the forward pass transposes once on entry.
//
// The builder is a pure function from configuration to module:
// all shape arithmetic happens up front (config.flattened_len),
// so a configuration that validates always builds.

use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::nn::pool::{AvgPool1d, AvgPool1dConfig, MaxPool1d, MaxPool1dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::domain::error::Result;
use crate::ml::config::CnnConfig;
use crate::ml::{padding_config, Classifier};

/// One conv stage: convolution, pooling, normalization, activation.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv1d<B>,
    pool: MaxPool1d,
    norm: BatchNorm<B, 1>,
    activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.conv.forward(x);
        let x = self.pool.forward(x);
        let x = self.norm.forward(x);
        self.activation.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct CnnClassifier<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    avg_pool: AvgPool1d,
    dense: Vec<Linear<B>>,
    head: Linear<B>,
    activation: Relu,
}

/// Assemble a CnnClassifier from its configuration.
pub fn build<B: Backend>(config: &CnnConfig, device: &B::Device) -> Result<CnnClassifier<B>> {
    config.validate()?;

    let mut blocks = Vec::with_capacity(config.output_channels.len());
    let mut in_channels = config.input_shape.1;
    for stage in 0..config.output_channels.len() {
        let conv = Conv1dConfig::new(
            in_channels,
            config.output_channels[stage],
            config.kernel_sizes[stage],
        )
        .with_padding(padding_config(config.paddings[stage]))
        .init(device);
        let pool = MaxPool1dConfig::new(config.max_pool_sizes[stage])
            .with_stride(config.max_pool_strides[stage])
            .init();
        let norm = BatchNormConfig::new(config.output_channels[stage]).init(device);
        blocks.push(ConvBlock {
            conv,
            pool,
            norm,
            activation: Relu::new(),
        });
        in_channels = config.output_channels[stage];
    }

    let avg_pool = AvgPool1dConfig::new(config.avg_size)
        .with_stride(config.avg_size)
        .init();

    let mut dense = Vec::with_capacity(config.dense_sizes.len());
    let mut width = config.flattened_len()?;
    for &size in &config.dense_sizes {
        dense.push(LinearConfig::new(width, size).init(device));
        width = size;
    }
    let head = LinearConfig::new(width, config.n_classes).init(device);

    Ok(CnnClassifier {
        blocks,
        avg_pool,
        dense,
        head,
        activation: Relu::new(),
    })
}

impl<B: Backend> Classifier<B> for CnnClassifier<B> {
    fn forward(&self, frames: Tensor<B, 3>) -> Tensor<B, 2> {
        // [batch, T, 2] -> [batch, 2, T] for the channel-major primitives
        let mut x = frames.swap_dims(1, 2);
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = self.avg_pool.forward(x);
        let mut x = x.flatten::<2>(1, 2);
        for layer in &self.dense {
            x = self.activation.forward(layer.forward(x));
        }
        self.head.forward(x)
    }
}
