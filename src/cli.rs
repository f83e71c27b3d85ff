use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cnnscope", about = "Send a WAV file to an audio CNN and visualize what it sees")]
pub struct Cli {
    /// Input audio file (.wav)
    pub input: Option<PathBuf>,

    /// Output image (PNG)
    #[arg(short, long, default_value = "analysis.png")]
    pub output: PathBuf,

    /// Also write the renderable scene description as JSON
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// Inference endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Config file (defaults to ./cnnscope.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, default_value_t = 1600)]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 1200)]
    pub height: u32,

    /// Maximum number of waveform points to draw
    #[arg(long, default_value_t = 1200)]
    pub waveform_width: usize,

    /// Color scale for activation layers
    #[arg(long, default_value = "inferno")]
    pub activation_scale: String,

    /// Color scale for the input spectrogram
    #[arg(long, default_value = "magma")]
    pub spectrogram_scale: String,

    /// Largest audio file accepted, in bytes
    #[arg(long)]
    pub max_payload: Option<usize>,

    /// Font file for labels (TTF/OTF)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Download the label font from a URL
    #[arg(long)]
    pub font_url: Option<String>,

    /// List available color scales and exit
    #[arg(long)]
    pub list_scales: bool,
}
