use ndarray::ArrayD;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// In-memory model handle produced by a loader.
///
/// Tensors are kept by name in sorted order so exports are deterministic.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    source: PathBuf,
    tensors: BTreeMap<String, ArrayD<f32>>, // name -> weights
}

impl Checkpoint {
    /// Build a checkpoint from already materialized tensors.
    pub fn from_tensors<P, I>(source: P, tensors: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = (String, ArrayD<f32>)>,
    {
        Self {
            source: source.into(),
            tensors: tensors.into_iter().collect(),
        }
    }

    /// Path the checkpoint was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn tensor_names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.tensors.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.tensors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of scalar parameters across all tensors.
    pub fn param_count(&self) -> u64 {
        self.tensors.values().map(|t| t.len() as u64).sum()
    }
}
