use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use std::path::Path;

pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn from_bytes(font_data: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font, font_size })
    }

    /// Load a label font from a local file or a URL. Labels are optional, so
    /// any failure is logged and yields `None`.
    pub fn load(path: Option<&Path>, url: Option<&str>, font_size: f32) -> Option<Self> {
        let bytes = match (path, url) {
            (Some(path), _) => std::fs::read(path)
                .with_context(|| format!("Failed to read font: {}", path.display())),
            (None, Some(url)) => load_font_from_url(url),
            (None, None) => return None,
        };

        match bytes.and_then(|b| Self::from_bytes(&b, font_size)) {
            Ok(overlay) => Some(overlay),
            Err(err) => {
                log::warn!("Labels disabled: {:#}", err);
                None
            }
        }
    }

    pub fn line_height(&self) -> u32 {
        (self.font_size * 1.2).ceil() as u32
    }

    /// Composite text onto an RGBA pixel buffer at the given position.
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        text: &str,
        x: u32,
        y: u32,
        color: [u8; 4],
    ) {
        let mut cursor_x = x as i32;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y as i32 + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }

                    let px = cursor_x + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }

                    let idx = ((py as u32 * width + px as u32) * 4) as usize;
                    if idx + 3 >= pixels.len() {
                        continue;
                    }

                    let a = alpha as f32 / 255.0 * (color[3] as f32 / 255.0);
                    let inv_a = 1.0 - a;
                    for c in 0..3 {
                        pixels[idx + c] = (color[c] as f32 * a + pixels[idx + c] as f32 * inv_a) as u8;
                    }
                    pixels[idx + 3] = 255;
                }
            }

            cursor_x += metrics.advance_width as i32;
        }
    }

    /// Measure the width of rendered text in pixels.
    pub fn measure_width(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        width.ceil() as u32
    }

    /// Longest prefix of `text` that fits in `max_width`, with an ellipsis
    /// when it had to be cut.
    pub fn fit(&self, text: &str, max_width: u32) -> String {
        if self.measure_width(text) <= max_width {
            return text.to_string();
        }
        let mut out = String::new();
        for ch in text.chars() {
            out.push(ch);
            if self.measure_width(&format!("{}...", out)) > max_width {
                out.pop();
                break;
            }
        }
        out.push_str("...");
        out
    }
}

pub fn load_font_from_url(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading font from {}", url);
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch font: {}", url))?
        .error_for_status()
        .with_context(|| format!("Font server refused: {}", url))?;
    let bytes = response.bytes().context("Failed to read font body")?;
    Ok(bytes.to_vec())
}
