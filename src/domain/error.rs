// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the pipeline can surface, as one typed enum.
// Nothing is caught internally: errors propagate straight up
// to the CLI, which exits non-zero.
//
// Reference: Rust Book §9 (Error Handling)

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// train_frac + val_frac must leave room for a test slice.
    #[error("invalid split ratio: train_frac {train_frac} + val_frac {val_frac} must be < 1")]
    InvalidSplitRatio { train_frac: f64, val_frac: f64 },

    /// A dataset accessor was called before load().
    #[error("{component}: {what} accessed before load()")]
    NotLoaded {
        component: &'static str,
        what: &'static str,
    },

    /// Split indices were requested before split() was ever called.
    #[error("{component}: split indices requested before split()")]
    NotSplit { component: &'static str },

    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("unknown model configuration tag '{0}'")]
    UnknownConfiguration(String),

    /// A dataset constructor was invoked without a parameter it needs.
    #[error("dataset '{dataset}' requires parameter '{parameter}'")]
    MissingRequiredParameter {
        dataset: &'static str,
        parameter: &'static str,
    },

    /// The configuration tag does not belong to the requested model family.
    #[error("model '{model}' cannot be built from configuration '{config}'")]
    ConfigurationMismatch { model: String, config: String },

    /// A configuration is the right family but internally inconsistent
    /// (mismatched list lengths, impossible shapes, bad parameter values).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Loading a network was requested but the record has no weights path.
    #[error("weights requested but the experiment record has no weights path")]
    MissingWeightsPath,

    #[error("I/O failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dataset file parsed but its contents violate the expected layout.
    #[error("malformed dataset file '{path}': {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("serialization failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("weights recorder failure: {0}")]
    Recorder(String),
}

impl PipelineError {
    /// Attach a path to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for layout violations inside an otherwise readable file.
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
