use clap::ValueEnum;
use std::fmt;

/// Serialized formats the exporter can produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Int8 weights with one scale per tensor.
    #[default]
    Q8,
    /// Full precision SafeTensors file.
    Safetensors,
}

impl ExportFormat {
    /// File extension of artifacts in this format.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Q8 => "q8",
            Self::Safetensors => "safetensors",
        }
    }

    /// Human readable name used in console output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Q8 => "Q8",
            Self::Safetensors => "SafeTensors",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
