//! Export object-detection checkpoints into artifacts the mobile app can
//! bundle as assets.

pub mod converter;
pub mod error;
pub mod exporter;
pub mod format;
pub mod q8;

pub use converter::{convert, install_artifact, ModelConverter, DEFAULT_ASSETS_DIR};
pub use error::{ExportError, Result};
pub use exporter::{Exporter, MobileExporter};
pub use format::ExportFormat;
pub use q8::{Q8Archive, QTensor};
