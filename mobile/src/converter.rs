use crate::error::Result;
use crate::exporter::{Exporter, MobileExporter};
use crate::format::ExportFormat;
use detector_checkpoint::{FileLoader, ModelLoader};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory of the Android app that bundles model files.
pub const DEFAULT_ASSETS_DIR: &str = "app/src/main/assets";

/// Drives a single checkpoint to artifact conversion and reports on it.
pub struct ModelConverter<L = FileLoader, E = MobileExporter> {
    loader: L,
    exporter: E,
    format: ExportFormat,
    assets_dir: PathBuf,
}

impl Default for ModelConverter {
    fn default() -> Self {
        Self::new(FileLoader, MobileExporter)
    }
}

impl<L: ModelLoader, E: Exporter> ModelConverter<L, E> {
    pub fn new(loader: L, exporter: E) -> Self {
        Self {
            loader,
            exporter,
            format: ExportFormat::default(),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
        }
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Directory named in the copy instructions.
    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Destination used when `output_path` is not given.
    pub fn default_destination(&self, model_path: &Path) -> PathBuf {
        self.exporter.default_destination(model_path, self.format)
    }

    /// Convert and print progress to stdout.
    pub fn convert(&self, model_path: &Path, output_path: Option<&Path>) -> bool {
        self.convert_artifact(model_path, output_path).is_some()
    }

    /// Convert and print progress to `out`. Every failure is reported there
    /// and turned into `false`.
    pub fn convert_to<W: Write>(&self, model_path: &Path, output_path: Option<&Path>, out: &mut W) -> bool {
        self.convert_artifact_to(model_path, output_path, out).is_some()
    }

    /// Like [`convert`](Self::convert), returning the path the exporter wrote.
    pub fn convert_artifact(&self, model_path: &Path, output_path: Option<&Path>) -> Option<PathBuf> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.convert_artifact_to(model_path, output_path, &mut out)
    }

    pub fn convert_artifact_to<W: Write>(
        &self,
        model_path: &Path,
        output_path: Option<&Path>,
        out: &mut W,
    ) -> Option<PathBuf> {
        match self.run(model_path, output_path, out) {
            Ok(written) => {
                tracing::debug!(written = %written.display(), "conversion finished");
                Some(written)
            }
            Err(e) => {
                tracing::debug!(error = ?e, "conversion failed");
                let _ = writeln!(out, "Error converting model: {e}");
                None
            }
        }
    }

    fn run<W: Write>(&self, model_path: &Path, output_path: Option<&Path>, out: &mut W) -> Result<PathBuf> {
        writeln!(out, "Loading model from {}...", model_path.display())?;
        let model = self.loader.load(model_path)?;

        let destination = match output_path {
            Some(p) => p.to_path_buf(),
            None => self.default_destination(model_path),
        };

        writeln!(out, "Converting to {} format...", self.format)?;
        let written = self.exporter.export(&model, self.format, &destination)?;

        writeln!(out, "Model converted successfully!")?;
        writeln!(out, "{} model saved to: {}", self.format.label(), written.display())?;
        writeln!(out, "Please copy this file to: {}/", self.assets_dir.display())?;
        Ok(written)
    }
}

/// Convert `model_path` with the default loader, exporter and format.
pub fn convert(model_path: &Path, output_path: Option<&Path>) -> bool {
    <ModelConverter>::default().convert(model_path, output_path)
}

/// Copy an exported artifact into `assets_dir`, creating it when missing.
pub fn install_artifact(artifact: &Path, assets_dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(assets_dir)?;
    let name = artifact.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "artifact path has no file name")
    })?;
    let target = assets_dir.join(name);
    std::fs::copy(artifact, &target)?;
    tracing::info!(target = %target.display(), "installed artifact");
    Ok(target)
}
