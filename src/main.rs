// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qrscan::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "qrscan")]
#[command(about = "Scan, generate and decode QR codes")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/qrscan/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a QR code image
    Generate {
        /// Text to encode
        text: String,

        /// Output file path (default: ~/Pictures/qrscan/qr_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pixels per module
        #[arg(short, long)]
        definition: Option<f32>,

        /// Image drawn over the center of the code
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Overlay size as a fraction of the code size
        #[arg(long)]
        overlay_scale: Option<f32>,
    },

    /// Decode the QR codes in an image
    Decode {
        /// Image to decode
        image: PathBuf,

        /// Save a copy with the codes boxed in red
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a scan session on a virtual camera showing the given images
    Scan {
        /// Images (or directories of images) placed in front of the camera
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Outline detected codes on the preview
        #[arg(long)]
        draw_overlay: bool,

        /// Scan region in screen points: x,y,width,height
        #[arg(long, value_parser = cli::parse_region)]
        region: Option<qrscan::Rect>,

        /// Turn the torch on while scanning
        #[arg(long)]
        torch: bool,

        /// Stop after this many frames with detections (default: Ctrl+C)
        #[arg(short, long)]
        frames: Option<usize>,

        /// Save the rendered preview when the scan ends
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// List available cameras
    List {
        /// Images shown by the virtual back camera
        images: Vec<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=qrscan=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Generate {
            text,
            output,
            definition,
            overlay,
            overlay_scale,
        } => cli::generate(&config, &text, output, definition, overlay, overlay_scale),
        Commands::Decode { image, output } => cli::decode(&image, output),
        Commands::Scan {
            images,
            draw_overlay,
            region,
            torch,
            frames,
            snapshot,
        } => cli::scan(
            &config,
            cli::ScanOptions {
                images,
                draw_overlay: draw_overlay || config.scan.draw_overlay,
                region,
                torch,
                frames,
                snapshot,
            },
        ),
        Commands::List { images } => cli::list_cameras(&images),
    }
}
