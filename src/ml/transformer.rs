// ============================================================
// Layer 5 — Encoder-Transformer Classifier
// ============================================================
// Builds the transformer_v01x family: a Conv1d+ReLU prelude lifts
// the 2-channel IQ stream to d_model channels, a stack of n
// encoder layers attends over the time axis, and an average-pooled
// dense head produces the class logits.
//
// The attention here is built from first principles rather than a
// framework block because the topology keys on separate per-head
// key and value dimensions (d_k, d_v) that are not tied to
// d_model / h:
//
//   heads   = reshape(linear(x))            per Q, K, V
//   scores  = Q K^T / sqrt(d_k)  (+ -1e9 * mask, when masked)
//   context = softmax(scores) V
//   out     = linear(concat heads)
//
// Reference: Vaswani et al. (2017) Attention Is All You Need

use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::nn::pool::{AvgPool1d, AvgPool1dConfig};
use burn::nn::{
    Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig, PaddingConfig1d,
    Relu,
};
use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::domain::error::Result;
use crate::ml::config::TransformerConfig;
use crate::ml::{padding_config, Classifier};

/// Dropout rate used throughout the encoder stack.
const ENCODER_DROPOUT: f64 = 0.1;

// ─── Multi-head self-attention ────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct MultiHeadSelfAttention<B: Backend> {
    query: Linear<B>,
    key: Linear<B>,
    value: Linear<B>,
    output: Linear<B>,
    n_heads: usize,
    d_k: usize,
    d_v: usize,
}

impl<B: Backend> MultiHeadSelfAttention<B> {
    fn new(h: usize, d_k: usize, d_v: usize, d_model: usize, device: &B::Device) -> Self {
        Self {
            query: LinearConfig::new(d_model, h * d_k).init(device),
            key: LinearConfig::new(d_model, h * d_k).init(device),
            value: LinearConfig::new(d_model, h * d_v).init(device),
            output: LinearConfig::new(h * d_v, d_model).init(device),
            n_heads: h,
            d_k,
            d_v,
        }
    }

    /// x: [batch, T, d_model]; mask (if any): [batch, heads, T, T]
    /// with 1 at positions to suppress.
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 4>>) -> Tensor<B, 3> {
        let [batch, seq_len, _] = x.dims();

        // Project, then split the last axis into heads: the head index
        // moves to dimension 1 so matmul batches over (batch, head).
        let q = self
            .query
            .forward(x.clone())
            .reshape([batch, seq_len, self.n_heads, self.d_k])
            .swap_dims(1, 2);
        let k = self
            .key
            .forward(x.clone())
            .reshape([batch, seq_len, self.n_heads, self.d_k])
            .swap_dims(1, 2);
        let v = self
            .value
            .forward(x)
            .reshape([batch, seq_len, self.n_heads, self.d_v])
            .swap_dims(1, 2);

        let mut scores = q
            .matmul(k.swap_dims(2, 3))
            .div_scalar((self.d_k as f32).sqrt());
        if let Some(mask) = mask {
            scores = scores + mask.mul_scalar(-1e9);
        }
        let attention = softmax(scores, 3);

        let context = attention
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch, seq_len, self.n_heads * self.d_v]);
        self.output.forward(context)
    }
}

// ─── Encoder layer ────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    attention: MultiHeadSelfAttention<B>,
    norm1: LayerNorm<B>,
    norm2: LayerNorm<B>,
    ff_expand: Linear<B>,
    ff_project: Linear<B>,
    dropout: Dropout,
    activation: Relu,
}

impl<B: Backend> EncoderLayer<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attention = self.attention.forward(x.clone(), None);
        let x = self.norm1.forward(x + attention);

        let ff = self
            .ff_project
            .forward(self.activation.forward(self.ff_expand.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ff))
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct TransformerClassifier<B: Backend> {
    prelude: Vec<Conv1d<B>>,
    input_dropout: Dropout,
    layers: Vec<EncoderLayer<B>>,
    avg_pool: AvgPool1d,
    dense: Vec<Linear<B>>,
    head: Linear<B>,
    activation: Relu,
}

/// Assemble a TransformerClassifier from its configuration.
pub fn build<B: Backend>(
    config: &TransformerConfig,
    device: &B::Device,
) -> Result<TransformerClassifier<B>> {
    config.validate()?;
    let enc = &config.encoder_layer;

    let mut prelude = Vec::with_capacity(config.prelude_channels.len());
    let mut in_channels = config.input_shape.1;
    for stage in 0..config.prelude_channels.len() {
        prelude.push(
            Conv1dConfig::new(
                in_channels,
                config.prelude_channels[stage],
                config.prelude_kernel_sizes[stage],
            )
            .with_padding(padding_config(config.prelude_paddings[stage]))
            .init(device),
        );
        in_channels = config.prelude_channels[stage];
    }

    let layers = (0..enc.n)
        .map(|_| EncoderLayer {
            attention: MultiHeadSelfAttention::new(enc.h, enc.d_k, enc.d_v, enc.d_model, device),
            norm1: LayerNormConfig::new(enc.d_model).init(device),
            norm2: LayerNormConfig::new(enc.d_model).init(device),
            ff_expand: LinearConfig::new(enc.d_model, enc.d_ff).init(device),
            ff_project: LinearConfig::new(enc.d_ff, enc.d_model).init(device),
            dropout: DropoutConfig::new(ENCODER_DROPOUT).init(),
            activation: Relu::new(),
        })
        .collect();

    let avg_pool = AvgPool1dConfig::new(config.avg_size)
        .with_stride(config.avg_size)
        .with_padding(PaddingConfig1d::Same)
        .init();

    let mut dense = Vec::with_capacity(config.dense_sizes.len());
    let mut width = config.flattened_len()?;
    for &size in &config.dense_sizes {
        dense.push(LinearConfig::new(width, size).init(device));
        width = size;
    }
    let head = LinearConfig::new(width, config.n_classes).init(device);

    Ok(TransformerClassifier {
        prelude,
        input_dropout: DropoutConfig::new(ENCODER_DROPOUT).init(),
        layers,
        avg_pool,
        dense,
        head,
        activation: Relu::new(),
    })
}

impl<B: Backend> Classifier<B> for TransformerClassifier<B> {
    fn forward(&self, frames: Tensor<B, 3>) -> Tensor<B, 2> {
        // Prelude runs channel-major
        let mut x = frames.swap_dims(1, 2);
        for conv in &self.prelude {
            x = self.activation.forward(conv.forward(x));
        }

        // Encoder attends time-major over d_model features
        let mut x = self.input_dropout.forward(x.swap_dims(1, 2));
        for layer in &self.layers {
            x = layer.forward(x);
        }

        let x = self.avg_pool.forward(x.swap_dims(1, 2));
        let mut x = x.flatten::<2>(1, 2);
        for layer in &self.dense {
            x = self.activation.forward(layer.forward(x));
        }
        self.head.forward(x)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::{EncoderLayerConfig, Padding};
    use crate::ml::EvalBackend;

    fn tiny_config() -> TransformerConfig {
        TransformerConfig {
            input_shape: (12, 2),
            n_classes: 3,
            prelude_channels: vec![8],
            prelude_kernel_sizes: vec![3],
            prelude_paddings: vec![Padding::Same],
            encoder_layer: EncoderLayerConfig {
                h: 2,
                d_k: 4,
                d_v: 5,
                d_model: 8,
                d_ff: 16,
                n: 2,
            },
            avg_size: 4,
            dense_sizes: vec![6],
        }
    }

    #[test]
    fn test_forward_shape_and_probabilities() {
        let device = Default::default();
        let model = build::<EvalBackend>(&tiny_config(), &device).unwrap();

        let frames = Tensor::<EvalBackend, 3>::random(
            [2, 12, 2],
            burn::tensor::Distribution::Default,
            &device,
        );
        let logits = model.forward(frames.clone());
        assert_eq!(logits.dims(), [2, 3]);

        let probs = model.predict(frames);
        let sums: Vec<f32> = probs.sum_dim(1).into_data().to_vec().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_attention_preserves_shape() {
        let device = Default::default();
        let attention = MultiHeadSelfAttention::<EvalBackend>::new(2, 4, 5, 8, &device);
        let x = Tensor::<EvalBackend, 3>::random(
            [3, 6, 8],
            burn::tensor::Distribution::Default,
            &device,
        );
        assert_eq!(attention.forward(x, None).dims(), [3, 6, 8]);
    }

    #[test]
    fn test_masked_positions_are_suppressed() {
        let device = Default::default();
        let attention = MultiHeadSelfAttention::<EvalBackend>::new(1, 4, 4, 4, &device);
        let x = Tensor::<EvalBackend, 3>::random(
            [1, 3, 4],
            burn::tensor::Distribution::Default,
            &device,
        );
        // Suppress everything except attending to position 0
        let mask_rows: Vec<f32> = vec![0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];
        let mask = Tensor::<EvalBackend, 1>::from_floats(mask_rows.as_slice(), &device)
            .reshape([1, 1, 3, 3]);

        let masked = attention.forward(x.clone(), Some(mask));
        // Every query attends only to key 0, so all rows agree
        let rows: Vec<f32> = masked.into_data().to_vec().unwrap();
        for feature in 0..4 {
            assert!((rows[feature] - rows[4 + feature]).abs() < 1e-5);
            assert!((rows[feature] - rows[8 + feature]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_empty_dense_stack_refused() {
        let mut config = tiny_config();
        config.dense_sizes = vec![];
        let device: <EvalBackend as Backend>::Device = Default::default();
        assert!(build::<EvalBackend>(&config, &device).is_err());
    }
}
