mod cli;
mod config;
mod error;
mod model;
mod pipeline;
mod present;
mod progress;
mod session;
mod transport;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::time::Duration;

use cli::Cli;
use config::Config;
use error::AnalysisError;
use pipeline::color::ColorScale;
use pipeline::{RenderOptions, Scene};
use present::compose::{compose, compose_error};
use present::ffmpeg::write_image;
use present::text::TextOverlay;
use progress::Spinning;
use session::driver::Session;
use session::source::{self, FsSource};
use session::state::Phase;
use transport::client::HttpBackend;
use transport::codec::AudioCodec;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if cli.list_scales {
        println!("Available color scales:");
        for scale in ColorScale::ALL {
            println!("  {}", scale.name);
        }
        return Ok(());
    }

    let cfg = match config::discover(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    // Merge: config values apply only when CLI is at its default
    if cli.width == config::default_width() { cli.width = cfg.output.width; }
    if cli.height == config::default_height() { cli.height = cfg.output.height; }
    if cli.waveform_width == config::default_waveform_width() {
        cli.waveform_width = cfg.render.waveform_width;
    }
    if cli.activation_scale == config::default_activation_scale() {
        cli.activation_scale = cfg.render.activation_scale;
    }
    if cli.spectrogram_scale == config::default_spectrogram_scale() {
        cli.spectrogram_scale = cfg.render.spectrogram_scale;
    }
    if cli.font.is_none() {
        cli.font = cfg.output.font;
    }
    if cli.font_url.is_none() {
        cli.font_url = cfg.output.font_url;
    }
    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| std::env::var(config::ENDPOINT_ENV).ok().filter(|e| !e.is_empty()))
        .unwrap_or(cfg.backend.endpoint);
    let max_payload = cli.max_payload.unwrap_or(cfg.backend.max_payload_bytes);
    present::canvas::check_size(cli.width, cli.height)?;

    log::info!("cnnscope - audio CNN visualizer");
    log::info!("Endpoint: {}", endpoint);
    log::info!("Output: {} ({}x{})", cli.output.display(), cli.width, cli.height);

    let backend = Spinning::new(HttpBackend::new(
        &endpoint,
        Duration::from_secs(cfg.backend.timeout_secs),
    )?);
    let options = RenderOptions {
        waveform_budget: cli.waveform_width,
        activation_scale: ColorScale::by_name_or(&cli.activation_scale, ColorScale::INFERNO),
        spectrogram_scale: ColorScale::by_name_or(&cli.spectrogram_scale, ColorScale::MAGMA),
    };
    let mut session = Session::new(&FsSource, &backend, AudioCodec::new(max_payload), options);

    // 1. Selection goes through the .wav filter
    let selection = cli
        .input
        .as_deref()
        .filter(|p| source::accepts(p))
        .map(|p| p.to_string_lossy().into_owned());
    if let Some(path) = cli.input.as_deref().filter(|_| selection.is_none()) {
        log::warn!("Not a .wav file: {}", path.display());
    }

    // 2. Drive the session to a terminal state
    if let Some(notice) = session.select(selection.as_deref()) {
        anyhow::bail!("{}", notice);
    }
    while offer_retry(session.state().error()) {
        session.retry();
    }
    anyhow::ensure!(
        !session.state().is_loading(),
        "Session stopped with request {:?} still in flight",
        session.state().live_token()
    );

    let shorter = cli.width.min(cli.height) as f32;
    let font_size = (shorter * 0.022).max(14.0);
    let overlay = TextOverlay::load(cli.font.as_deref(), cli.font_url.as_deref(), font_size);

    match &session.state().phase {
        Phase::Rendered { .. } => {
            let scene = session.scene().context("Rendered session has no scene")?;
            print_predictions(scene);

            // 3. Outputs
            let canvas = compose(scene, cli.width, cli.height, overlay.as_ref());
            write_image(&cli.output, &canvas)?;

            if let Some(ref path) = cli.scene {
                let json = serde_json::to_string_pretty(scene).context("Failed to serialize scene")?;
                std::fs::write(path, json)
                    .with_context(|| format!("Failed to write scene: {}", path.display()))?;
                log::info!("Wrote scene to {}", path.display());
            }

            log::info!("Done! Output: {}", cli.output.display());
            Ok(())
        }
        Phase::Failed { error } => {
            let canvas = compose_error(error, cli.width, cli.height, overlay.as_ref());
            if let Err(err) = write_image(&cli.output, &canvas) {
                log::warn!("Could not write error image: {:#}", err);
            }
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
        other => anyhow::bail!("Session stopped in unexpected state: {}", other.name()),
    }
}

/// Ask on an interactive terminal whether to resend after a transient failure.
fn offer_retry(error: Option<&AnalysisError>) -> bool {
    let Some(error) = error.filter(|e| e.is_retryable()) else {
        return false;
    };
    if !std::io::stdin().is_terminal() {
        return false;
    }
    eprint!("Request failed ({}). Retry? [y/N] ", error.kind());
    if std::io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match std::io::stdin().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn print_predictions(scene: &Scene) {
    println!("Top predictions:");
    for p in &scene.predictions {
        println!("  {:<24} {:>6.2}%", p.label, p.confidence * 100.0);
    }
}
