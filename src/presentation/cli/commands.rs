//! CLI commands using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Linha - boleto digit line reader
///
/// Reads the digit line of a Brazilian bank slip from camera frames, a photo
/// or typed text, and accepts it only when every check digit matches.
#[derive(Parser)]
#[command(name = "linha")]
#[command(version)]
#[command(about = "Read and validate boleto digit lines", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a typed digit line (dots and spaces are ignored)
    Validate {
        /// The line, e.g. "34191.79001 01043.510047 ..."
        line: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List candidate digit lines found in recognized text
    Extract {
        /// Text file to read, or "-" for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recognize the digit line in a photo
    Ocr {
        /// Photo of the slip (JPEG or PNG)
        image: PathBuf,

        /// Width the photo is resized to before recognition (1500-2000)
        #[arg(long, default_value_t = 1800)]
        target_width: u32,

        /// Contrast multiplier
        #[arg(long, default_value_t = 1.5)]
        contrast: f32,

        /// Tesseract language
        #[arg(long, default_value = "por")]
        language: String,

        /// Tesseract page segmentation mode
        #[arg(long, default_value_t = 6)]
        psm: u8,
    },

    /// Run a full acquisition session over a directory of camera frames
    Scan {
        /// Directory of frame images, replayed in name order
        #[arg(short, long)]
        frames: PathBuf,

        /// Delay between frames in milliseconds
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,

        /// Loop over the frames until the session ends
        #[arg(long)]
        repeat: bool,

        /// JSON session options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Photo submitted for OCR if barcode scanning gives up
        #[arg(long)]
        image: Option<PathBuf>,

        /// Line typed in if every other strategy fails
        #[arg(long)]
        manual: Option<String>,

        /// Tesseract language
        #[arg(long, default_value = "por")]
        language: String,

        /// Tesseract page segmentation mode
        #[arg(long, default_value_t = 6)]
        psm: u8,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}
