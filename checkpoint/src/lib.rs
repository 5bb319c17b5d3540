//! Checkpoint loading for object-detection models.
//!
//! Reads PyTorch and SafeTensors checkpoints into an in-memory
//! [`Checkpoint`] that exporters can serialize into other formats.

pub mod error;
pub mod loader;
pub mod model;

pub use error::{CheckpointError, Result};
pub use loader::{CheckpointFormat, FileLoader, ModelLoader};
pub use model::Checkpoint;
