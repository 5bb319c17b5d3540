//! Error types for exporting checkpoints

use detector_checkpoint::CheckpointError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SafeTensors error: {0}")]
    SafeTensors(#[from] safetensors::SafeTensorError),

    #[error("Malformed q8 artifact: {0}")]
    Malformed(String),

    #[error("Tensor {name} contains NaN or infinite values")]
    NonFinite { name: String },

    #[error("Tensor {name} is too large for the q8 layout")]
    TooLarge { name: String },
}

pub type Result<T> = std::result::Result<T, ExportError>;
