use anyhow::Context;
use clap::Parser;
use detector_checkpoint::FileLoader;
use mobile_export::{install_artifact, ExportFormat, MobileExporter, ModelConverter, DEFAULT_ASSETS_DIR};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Convert a YOLO checkpoint into a mobile asset.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Checkpoint to convert
    #[arg(long, default_value = "glasses_weights.pt")]
    model: PathBuf,

    /// Output file for the exported model
    #[arg(long)]
    out: Option<PathBuf>,

    /// Export format
    #[arg(long, value_enum, default_value_t = ExportFormat::Q8)]
    format: ExportFormat,

    /// Asset directory of the Android app
    #[arg(long, default_value = DEFAULT_ASSETS_DIR)]
    assets_dir: PathBuf,

    /// Copy the exported file into the asset directory
    #[arg(long)]
    install: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if !args.model.exists() {
        println!("Error: Model file {} not found!", args.model.display());
        println!("Please ensure the model file is in the current directory.");
        std::process::exit(1);
    }

    println!("YOLO Model to Mobile Converter");
    println!("{}", "=".repeat(40));

    let converter = ModelConverter::new(FileLoader, MobileExporter)
        .with_format(args.format)
        .with_assets_dir(&args.assets_dir);
    let written = converter.convert_artifact(&args.model, args.out.as_deref());

    if let Some(artifact) = written {
        println!("\nNext steps:");
        println!(
            "1. Copy the converted .{} file to {}/",
            args.format.suffix(),
            args.assets_dir.display()
        );
        println!("2. Build and run the Android app");
        println!("3. The app will automatically load the model and start detecting glasses");

        if args.install {
            let installed = install_artifact(&artifact, &args.assets_dir).with_context(|| {
                format!(
                    "failed to copy {} into {}",
                    artifact.display(),
                    args.assets_dir.display()
                )
            })?;
            println!("Installed {}", installed.display());
        }
    } else {
        println!("\nConversion failed. Please check the error messages above.");
    }
    Ok(())
}
