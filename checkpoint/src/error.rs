//! Error types for checkpoint loading

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported checkpoint format: {} (expected .pt, .pth, .bin or .safetensors)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("No tensors found in {}; save the model's state_dict instead of the module object", .0.display())]
    NoTensors(PathBuf),

    #[error("Failed to read tensors: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Tensor {name} has an invalid shape: {source}")]
    Shape {
        name: String,
        #[source]
        source: ndarray::ShapeError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CheckpointError>;
