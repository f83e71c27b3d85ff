use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENDPOINT_ENV: &str = "CNNSCOPE_ENDPOINT";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_waveform_width")]
    pub waveform_width: usize,
    #[serde(default = "default_activation_scale")]
    pub activation_scale: String,
    #[serde(default = "default_spectrogram_scale")]
    pub spectrogram_scale: String,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default)]
    pub font_url: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            waveform_width: default_waveform_width(),
            activation_scale: default_activation_scale(),
            spectrogram_scale: default_spectrogram_scale(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            font: None,
            font_url: None,
        }
    }
}

pub fn default_endpoint() -> String { "http://127.0.0.1:8000/inference".into() }
fn default_timeout_secs() -> u64 { 120 }
pub fn default_max_payload_bytes() -> usize { 25 * 1024 * 1024 }
pub fn default_waveform_width() -> usize { 1200 }
pub fn default_activation_scale() -> String { "inferno".into() }
pub fn default_spectrogram_scale() -> String { "magma".into() }
pub fn default_width() -> u32 { 1600 }
pub fn default_height() -> u32 { 1200 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path first, then `./cnnscope.toml`, then the per-user config.
pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("cnnscope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("cnnscope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("cnnscope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.backend.endpoint, default_endpoint());
        assert_eq!(cfg.backend.max_payload_bytes, 25 * 1024 * 1024);
        assert_eq!(cfg.render.spectrogram_scale, "magma");
        assert!(cfg.output.font.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [backend]
            endpoint = "https://example.test/inference"

            [render]
            activation_scale = "grayscale"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.backend.endpoint, "https://example.test/inference");
        assert_eq!(cfg.backend.timeout_secs, 120);
        assert_eq!(cfg.render.activation_scale, "grayscale");
        assert_eq!(cfg.render.waveform_width, 1200);
        assert_eq!(cfg.output.width, 1600);
    }

    #[test]
    fn explicit_path_wins_discovery() {
        let path = Path::new("/tmp/somewhere/custom.toml");
        assert_eq!(discover(Some(path)), Some(path.to_path_buf()));
    }
}
