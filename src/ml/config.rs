// ============================================================
// Layer 5 — Model Configurations
// ============================================================
// Declarative, round-trippable descriptions of the network
// topologies. A configuration serializes to a mapping carrying a
// "name" tag plus all fields; deserialization dispatches on the
// tag. The builders in cnn.rs / transformer.rs consume these.
//
// The tag doubles as the model name in the builder registry, so
// a persisted experiment record can rebuild its exact network.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

pub const CNN_1D_V01X: &str = "cnn_1d_v01x";
pub const TRANSFORMER_V01X: &str = "transformer_v01x";

/// Convolution / pooling edge handling, serialized the way the
/// configurations spell it ("same" / "valid").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    Same,
    Valid,
}

/// A stack of 1-D conv stages followed by a dense classification
/// head. The five stage lists are parallel: entry i configures
/// stage i.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnnConfig {
    /// Per-sample shape (time_steps, features); features is 2 for IQ
    pub input_shape: (usize, usize),
    pub n_classes: usize,
    pub output_channels: Vec<usize>,
    pub kernel_sizes: Vec<usize>,
    pub paddings: Vec<Padding>,
    pub max_pool_sizes: Vec<usize>,
    pub max_pool_strides: Vec<usize>,
    /// Trailing average-pool size before the head
    pub avg_size: usize,
    /// Hidden dense sizes; may be empty
    pub dense_sizes: Vec<usize>,
}

/// Attention geometry of one encoder layer, plus the stack depth n.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderLayerConfig {
    /// Number of attention heads
    pub h: usize,
    /// Per-head key dimension
    pub d_k: usize,
    /// Per-head value dimension
    pub d_v: usize,
    /// Model (embedding) dimension
    pub d_model: usize,
    /// Feed-forward inner dimension
    pub d_ff: usize,
    /// Number of stacked encoder layers
    pub n: usize,
}

/// Convolutional prelude feeding a transformer-encoder stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerConfig {
    pub input_shape: (usize, usize),
    pub n_classes: usize,
    pub prelude_channels: Vec<usize>,
    pub prelude_kernel_sizes: Vec<usize>,
    pub prelude_paddings: Vec<Padding>,
    pub encoder_layer: EncoderLayerConfig,
    pub avg_size: usize,
    /// Hidden dense sizes; must be non-empty for this family
    pub dense_sizes: Vec<usize>,
}

/// A tagged model configuration. The serde tag field is the model
/// name, so `to_mapping` emits {"name": "...", ...} and
/// `from_mapping` dispatches on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum ModelConfig {
    #[serde(rename = "cnn_1d_v01x")]
    Cnn(CnnConfig),
    #[serde(rename = "transformer_v01x")]
    Transformer(TransformerConfig),
}

impl ModelConfig {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Cnn(_) => CNN_1D_V01X,
            Self::Transformer(_) => TRANSFORMER_V01X,
        }
    }

    pub fn input_shape(&self) -> (usize, usize) {
        match self {
            Self::Cnn(c) => c.input_shape,
            Self::Transformer(c) => c.input_shape,
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            Self::Cnn(c) => c.n_classes,
            Self::Transformer(c) => c.n_classes,
        }
    }

    /// The orchestrator overrides the user-supplied placeholder with
    /// the class count the dataset actually carries.
    pub fn set_n_classes(&mut self, n_classes: usize) {
        match self {
            Self::Cnn(c) => c.n_classes = n_classes,
            Self::Transformer(c) => c.n_classes = n_classes,
        }
    }

    /// Serialize to a mapping containing the `name` tag and all fields.
    pub fn to_mapping(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => unreachable!("a tagged struct serializes to a mapping"),
        }
    }

    /// Rebuild the variant identified by the mapping's `name` tag.
    pub fn from_mapping(mapping: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let tag = mapping
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if tag != CNN_1D_V01X && tag != TRANSFORMER_V01X {
            return Err(PipelineError::UnknownConfiguration(tag.to_string()));
        }
        Ok(serde_json::from_value(serde_json::Value::Object(
            mapping.clone(),
        ))?)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Cnn(c) => c.validate(),
            Self::Transformer(c) => c.validate(),
        }
    }
}

fn invalid(reason: String) -> PipelineError {
    PipelineError::InvalidConfiguration(reason)
}

/// Output length of a stride-1 1-D convolution.
pub(crate) fn conv_out_len(len: usize, kernel: usize, padding: Padding) -> usize {
    match padding {
        Padding::Same => len,
        Padding::Valid => (len + 1).saturating_sub(kernel),
    }
}

/// Output length of a 1-D pool.
pub(crate) fn pool_out_len(len: usize, kernel: usize, stride: usize, padding: Padding) -> usize {
    match padding {
        Padding::Same => len.div_ceil(stride),
        Padding::Valid => {
            if len < kernel {
                0
            } else {
                (len - kernel) / stride + 1
            }
        }
    }
}

impl CnnConfig {
    pub fn validate(&self) -> Result<()> {
        let n = self.output_channels.len();
        if n == 0 {
            return Err(invalid("cnn_1d_v01x needs at least one conv stage".into()));
        }
        if self.kernel_sizes.len() != n
            || self.paddings.len() != n
            || self.max_pool_sizes.len() != n
            || self.max_pool_strides.len() != n
        {
            return Err(invalid(format!(
                "cnn_1d_v01x stage lists must all have length {n}"
            )));
        }
        if self.n_classes < 2 {
            return Err(invalid(format!(
                "n_classes must be >= 2, got {}",
                self.n_classes
            )));
        }
        if self.input_shape.1 != 2 {
            return Err(invalid(format!(
                "input feature dimension must be 2 (IQ), got {}",
                self.input_shape.1
            )));
        }
        if self.avg_size == 0 {
            return Err(invalid("avg_size must be >= 1".into()));
        }
        self.flattened_len().map(|_| ())
    }

    /// Width of the flattened tensor entering the dense head, found by
    /// walking the time axis through every stage. Fails if any stage
    /// collapses the axis to nothing.
    pub(crate) fn flattened_len(&self) -> Result<usize> {
        let mut t = self.input_shape.0;
        for (stage, (((&kernel, &padding), &pool), &stride)) in self
            .kernel_sizes
            .iter()
            .zip(&self.paddings)
            .zip(&self.max_pool_sizes)
            .zip(&self.max_pool_strides)
            .enumerate()
        {
            if kernel == 0 || pool == 0 || stride == 0 {
                return Err(invalid(format!(
                    "stage {stage}: kernel, pool and stride must be >= 1"
                )));
            }
            t = conv_out_len(t, kernel, padding);
            t = pool_out_len(t, pool, stride, Padding::Valid);
            if t == 0 {
                return Err(invalid(format!(
                    "stage {stage} reduces the time axis to zero"
                )));
            }
        }
        t = pool_out_len(t, self.avg_size, self.avg_size, Padding::Valid);
        if t == 0 {
            return Err(invalid(format!(
                "avg_size {} larger than the remaining time axis",
                self.avg_size
            )));
        }
        Ok(t * self.output_channels[self.output_channels.len() - 1])
    }
}

impl TransformerConfig {
    pub fn validate(&self) -> Result<()> {
        let n = self.prelude_channels.len();
        if n == 0 {
            return Err(invalid(
                "transformer_v01x needs at least one prelude conv".into(),
            ));
        }
        if self.prelude_kernel_sizes.len() != n || self.prelude_paddings.len() != n {
            return Err(invalid(format!(
                "transformer_v01x prelude lists must all have length {n}"
            )));
        }
        if self.dense_sizes.is_empty() {
            return Err(invalid(
                "transformer_v01x needs a non-empty dense stack".into(),
            ));
        }
        if self.n_classes < 2 {
            return Err(invalid(format!(
                "n_classes must be >= 2, got {}",
                self.n_classes
            )));
        }
        if self.input_shape.1 != 2 {
            return Err(invalid(format!(
                "input feature dimension must be 2 (IQ), got {}",
                self.input_shape.1
            )));
        }
        let enc = &self.encoder_layer;
        if enc.h == 0 || enc.d_k == 0 || enc.d_v == 0 || enc.d_model == 0 || enc.d_ff == 0
            || enc.n == 0
        {
            return Err(invalid("encoder dimensions must all be >= 1".into()));
        }
        if self.prelude_channels[n - 1] != enc.d_model {
            return Err(invalid(format!(
                "last prelude channel count ({}) must equal d_model ({})",
                self.prelude_channels[n - 1],
                enc.d_model
            )));
        }
        if self.avg_size == 0 {
            return Err(invalid("avg_size must be >= 1".into()));
        }
        self.flattened_len().map(|_| ())
    }

    /// Width of the flattened tensor entering the dense head.
    pub(crate) fn flattened_len(&self) -> Result<usize> {
        let mut t = self.input_shape.0;
        for (stage, (&kernel, &padding)) in self
            .prelude_kernel_sizes
            .iter()
            .zip(&self.prelude_paddings)
            .enumerate()
        {
            if kernel == 0 {
                return Err(invalid(format!("prelude stage {stage}: kernel must be >= 1")));
            }
            t = conv_out_len(t, kernel, padding);
            if t == 0 {
                return Err(invalid(format!(
                    "prelude stage {stage} reduces the time axis to zero"
                )));
            }
        }
        // Trailing average pool runs with "same" padding
        let t = pool_out_len(t, self.avg_size, self.avg_size, Padding::Same);
        Ok(t * self.encoder_layer.d_model)
    }
}
