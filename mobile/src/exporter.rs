use crate::error::Result;
use crate::format::ExportFormat;
use crate::q8::{write_q8, QTensor};
use detector_checkpoint::Checkpoint;
use safetensors::{tensor::TensorView, Dtype};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Serializes a loaded model into a deployable artifact.
pub trait Exporter {
    /// Where an artifact goes when the caller does not pick a destination.
    fn default_destination(&self, model_path: &Path, format: ExportFormat) -> PathBuf;

    /// Write `model` to `destination` and return the path actually written.
    fn export(&self, model: &Checkpoint, format: ExportFormat, destination: &Path) -> Result<PathBuf>;
}

/// Exporter producing weight-only artifacts for the mobile app.
#[derive(Clone, Copy, Debug, Default)]
pub struct MobileExporter;

impl Exporter for MobileExporter {
    fn default_destination(&self, model_path: &Path, format: ExportFormat) -> PathBuf {
        let stem = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let name = format!("{stem}.mobile.{}", format.suffix());
        match model_path.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    fn export(&self, model: &Checkpoint, format: ExportFormat, destination: &Path) -> Result<PathBuf> {
        if let Some(dir) = destination.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        match format {
            ExportFormat::Q8 => export_q8(model, destination)?,
            ExportFormat::Safetensors => export_safetensors(model, destination)?,
        }
        tracing::info!(
            destination = %destination.display(),
            %format,
            tensors = model.len(),
            "exported model"
        );
        Ok(destination.to_path_buf())
    }
}

fn export_q8(model: &Checkpoint, destination: &Path) -> Result<()> {
    let tensors = model
        .iter()
        .map(|(name, t)| {
            let q = QTensor::from_array(name, t)?;
            tracing::debug!(name, shape = ?q.shape(), scale = q.scale(), "quantized tensor");
            Ok(q)
        })
        .collect::<Result<Vec<QTensor>>>()?;
    write_q8(destination, &tensors)
}

fn export_safetensors(model: &Checkpoint, destination: &Path) -> Result<()> {
    let buffers: Vec<(&str, Vec<usize>, Vec<u8>)> = model
        .iter()
        .map(|(name, t)| {
            let bytes = t.iter().flat_map(|v| v.to_le_bytes()).collect();
            (name, t.shape().to_vec(), bytes)
        })
        .collect();
    let views = buffers
        .iter()
        .map(|(name, shape, bytes)| Ok((*name, TensorView::new(Dtype::F32, shape.clone(), bytes)?)))
        .collect::<Result<Vec<_>>>()?;
    let metadata = HashMap::from([
        ("format".to_string(), "mobile-export".to_string()),
        ("source".to_string(), model.source().display().to_string()),
    ]);
    safetensors::serialize_to_file(views, &Some(metadata), destination)?;
    Ok(())
}
