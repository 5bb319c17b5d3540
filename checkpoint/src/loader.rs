//! Checkpoint loaders.
//!
//! [`FileLoader`] picks a reader from the file extension and converts every
//! tensor to `f32` so downstream exporters see a single element type.

use crate::error::{CheckpointError, Result};
use crate::model::Checkpoint;
use candle_core::{DType, Device, Tensor};
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

/// Keys probed, in order, when a pickle archive has no tensors at its root.
const STATE_DICT_KEYS: [&str; 3] = ["state_dict", "model_state_dict", "model"];

/// Anything that can turn a path into a model handle.
pub trait ModelLoader {
    fn load(&self, path: &Path) -> Result<Checkpoint>;
}

/// On-disk checkpoint encodings understood by [`FileLoader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointFormat {
    /// PyTorch zip archive with a pickled tensor dictionary.
    Pickle,
    SafeTensors,
}

impl CheckpointFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("pt" | "pth" | "bin") => Ok(Self::Pickle),
            Some("safetensors") => Ok(Self::SafeTensors),
            _ => Err(CheckpointError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Default loader reading checkpoints from the local filesystem on CPU.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileLoader;

impl ModelLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<Checkpoint> {
        if !path.is_file() {
            return Err(CheckpointError::NotFound(path.to_path_buf()));
        }
        let format = CheckpointFormat::from_path(path)?;
        tracing::debug!(path = %path.display(), ?format, "reading checkpoint");

        let raw = match format {
            CheckpointFormat::Pickle => read_pickle(path)?,
            CheckpointFormat::SafeTensors => {
                candle_core::safetensors::load(path, &Device::Cpu)?.into_iter().collect()
            }
        };
        if raw.is_empty() {
            return Err(CheckpointError::NoTensors(path.to_path_buf()));
        }

        let mut tensors = Vec::with_capacity(raw.len());
        for (name, tensor) in raw {
            let array = to_array(&name, &tensor)?;
            tensors.push((name, array));
        }
        let checkpoint = Checkpoint::from_tensors(path, tensors);
        tracing::info!(
            path = %path.display(),
            tensors = checkpoint.len(),
            params = checkpoint.param_count(),
            "loaded checkpoint"
        );
        Ok(checkpoint)
    }
}

fn read_pickle(path: &Path) -> Result<Vec<(String, Tensor)>> {
    let root = candle_core::pickle::read_all_with_key(path, None)?;
    if !root.is_empty() {
        return Ok(root);
    }
    // A keyed read fails when the key is absent; move on to the next one.
    for key in STATE_DICT_KEYS {
        match candle_core::pickle::read_all_with_key(path, Some(key)) {
            Ok(nested) if !nested.is_empty() => {
                tracing::warn!(key, "no tensors at archive root, using nested state dict");
                return Ok(nested);
            }
            Ok(_) => tracing::debug!(key, "nested entry holds no tensors"),
            Err(e) => tracing::debug!(key, error = %e, "nested entry not readable"),
        }
    }
    Ok(Vec::new())
}

fn to_array(name: &str, tensor: &Tensor) -> Result<ArrayD<f32>> {
    let dims = tensor.dims().to_vec();
    let data = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    ArrayD::from_shape_vec(IxDyn(&dims), data).map_err(|source| CheckpointError::Shape {
        name: name.to_string(),
        source,
    })
}
