use onnxfeed_core::FeedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("a run is already in progress")]
    Busy,

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("failed to load model: {0:#}")]
    Load(anyhow::Error),

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    /// The worker thread for a run died before returning a result.
    #[error("run aborted: {0}")]
    Panicked(String),

    #[error("model declares no inputs")]
    NoInputs,

    #[error("model has no input named `{name}` (available: {available})")]
    UnknownInput { name: String, available: String },
}
