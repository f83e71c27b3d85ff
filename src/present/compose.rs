//! Page layout: predictions, spectrogram, waveform, then the layer grid.

use super::canvas::{Canvas, Rect};
use super::text::TextOverlay;
use crate::error::AnalysisError;
use crate::pipeline::color::Color;
use crate::pipeline::Scene;

const BACKGROUND: Color = Color::rgb(250, 250, 249);
const PANEL: Color = Color::rgb(231, 229, 228);
const INK: [u8; 4] = [28, 25, 23, 255];
const MUTED_INK: [u8; 4] = [120, 113, 108, 255];
const BAR: Color = Color::rgb(68, 64, 60);
const WAVE: Color = Color::rgb(41, 37, 36);
const AXIS: Color = Color::rgb(168, 162, 158);
const ERROR_PANEL: Color = Color::rgb(254, 226, 226);
const ERROR_INK: [u8; 4] = [153, 27, 27, 255];

const MARGIN: u32 = 24;
const GAP: u32 = 12;

/// Vertical split of the page below the margins.
struct Layout {
    predictions: Rect,
    spectrogram: Rect,
    waveform: Rect,
    layers: Rect,
}

impl Layout {
    fn new(width: u32, height: u32) -> Self {
        let inner_w = width.saturating_sub(MARGIN * 2);
        let inner_h = height.saturating_sub(MARGIN * 2 + GAP * 3);
        let predictions_h = inner_h * 15 / 100;
        let spectrogram_h = inner_h * 22 / 100;
        let waveform_h = inner_h * 13 / 100;
        let layers_h = inner_h - predictions_h - spectrogram_h - waveform_h;

        let mut y = MARGIN;
        let mut take = |h: u32| {
            let rect = Rect::new(MARGIN, y, inner_w, h);
            y += h + GAP;
            rect
        };
        Layout {
            predictions: take(predictions_h),
            spectrogram: take(spectrogram_h),
            waveform: take(waveform_h),
            layers: take(layers_h),
        }
    }
}

/// Columns for `n` panels in a `w`x`h` area, aiming for square-ish cells.
fn grid_columns(n: usize, w: u32, h: u32) -> usize {
    if n == 0 {
        return 1;
    }
    let aspect = w.max(1) as f64 / h.max(1) as f64;
    let cols = (n as f64 * aspect).sqrt().ceil() as usize;
    cols.clamp(1, n)
}

pub fn compose(scene: &Scene, width: u32, height: u32, overlay: Option<&TextOverlay>) -> Canvas {
    let mut canvas = Canvas::new(width, height, BACKGROUND);
    let layout = Layout::new(width, height);

    draw_predictions(&mut canvas, scene, layout.predictions, overlay);

    let spec_body = titled(&mut canvas, layout.spectrogram, "Input spectrogram", overlay);
    canvas.blit_heatmap(&scene.spectrogram, spec_body, true);

    let wave_body = titled(&mut canvas, layout.waveform, "Waveform", overlay);
    canvas.fill_rect(wave_body, PANEL);
    canvas.draw_trace(&scene.waveform, wave_body.inset(2), WAVE, AXIS);

    draw_layers(&mut canvas, scene, layout.layers, overlay);
    canvas
}

/// Page shown instead of the visualization when the analysis failed.
pub fn compose_error(error: &AnalysisError, width: u32, height: u32, overlay: Option<&TextOverlay>) -> Canvas {
    let mut canvas = Canvas::new(width, height, BACKGROUND);
    let area = Rect::new(
        MARGIN,
        MARGIN,
        width.saturating_sub(MARGIN * 2),
        height.saturating_sub(MARGIN * 2),
    );
    canvas.fill_rect(area, ERROR_PANEL);

    if let Some(text) = overlay {
        let body = area.inset(GAP * 2);
        let message = text.fit(&error.to_string(), body.w);
        text.composite(&mut canvas.pixels, width, height, "Analysis failed", body.x, body.y, ERROR_INK);
        text.composite(
            &mut canvas.pixels,
            width,
            height,
            &message,
            body.x,
            body.y + text.line_height() + GAP,
            ERROR_INK,
        );
    }
    canvas
}

/// Draw a label above `rect` when a font is available and return the area
/// left for the body.
fn titled(canvas: &mut Canvas, rect: Rect, title: &str, overlay: Option<&TextOverlay>) -> Rect {
    let Some(text) = overlay else {
        return rect;
    };
    let line = text.line_height();
    if rect.h <= line * 2 {
        return rect;
    }
    let label = text.fit(title, rect.w);
    text.composite(&mut canvas.pixels, canvas.width, canvas.height, &label, rect.x, rect.y, MUTED_INK);
    Rect::new(rect.x, rect.y + line, rect.w, rect.h - line)
}

fn draw_predictions(canvas: &mut Canvas, scene: &Scene, rect: Rect, overlay: Option<&TextOverlay>) {
    let body = titled(canvas, rect, "Top predictions", overlay);
    let n = scene.predictions.len();
    if n == 0 || body.h == 0 {
        return;
    }
    let row_h = body.h / n as u32;
    let label_w = if overlay.is_some() { body.w / 3 } else { 0 };
    let bar_max = body.w.saturating_sub(label_w);

    for (i, p) in scene.predictions.iter().enumerate() {
        let y = body.y + i as u32 * row_h;
        let bar_h = (row_h * 6 / 10).max(1);
        canvas.fill_rect(Rect::new(body.x + label_w, y, bar_max, bar_h), PANEL);
        let filled = (bar_max as f32 * p.confidence.clamp(0.0, 1.0)).round() as u32;
        canvas.fill_rect(Rect::new(body.x + label_w, y, filled, bar_h), BAR);

        if let Some(text) = overlay {
            let label = format!("{}  {:.1}%", p.label.replace('_', " "), p.confidence * 100.0);
            let label = text.fit(&label, label_w.saturating_sub(GAP));
            text.composite(&mut canvas.pixels, canvas.width, canvas.height, &label, body.x, y, INK);
        }
    }
}

fn draw_layers(canvas: &mut Canvas, scene: &Scene, rect: Rect, overlay: Option<&TextOverlay>) {
    let body = titled(canvas, rect, "Convolutional layer outputs", overlay);
    let panels: Vec<(&str, _)> = scene
        .layers
        .iter()
        .flat_map(|g| g.members.iter().map(|(name, map)| (name.as_str(), map)))
        .collect();
    if panels.is_empty() {
        return;
    }

    let cols = grid_columns(panels.len(), body.w, body.h);
    let rows = panels.len().div_ceil(cols);
    let cell_w = body.w / cols as u32;
    let cell_h = body.h / rows as u32;

    for (i, (name, heatmap)) in panels.into_iter().enumerate() {
        let cell = Rect::new(
            body.x + (i % cols) as u32 * cell_w,
            body.y + (i / cols) as u32 * cell_h,
            cell_w.saturating_sub(GAP / 2),
            cell_h.saturating_sub(GAP / 2),
        );
        let area = titled(canvas, cell, name, overlay);
        canvas.fill_rect(area, PANEL);
        canvas.blit_heatmap(heatmap, area, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisResult, LayerActivations, Prediction, Tensor2D, Waveform};
    use crate::pipeline::{render_analysis, RenderOptions};

    fn scene() -> Scene {
        let mut layers = LayerActivations::new();
        for name in ["conv1", "layer1", "layer1.block0", "fc"] {
            layers
                .insert(name, Tensor2D::new([2, 2], vec![vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap())
                .unwrap();
        }
        let result = AnalysisResult {
            predictions: vec![Prediction { label: "dog_bark".into(), confidence: 0.9 }],
            layers,
            spectrogram: Tensor2D::new([4, 8], vec![vec![1.0; 8], vec![2.0; 8], vec![3.0; 8], vec![4.0; 8]]).unwrap(),
            waveform: Waveform {
                values: (0..100).map(|i| (i as f32 / 5.0).sin()).collect(),
                sample_rate: 100.0,
                duration: 1.0,
            },
        };
        render_analysis(&result, &RenderOptions::default())
    }

    #[test]
    fn layout_fits_inside_the_page() {
        let layout = Layout::new(800, 600);
        for rect in [layout.predictions, layout.spectrogram, layout.waveform, layout.layers] {
            assert!(rect.x + rect.w <= 800);
            assert!(rect.y + rect.h <= 600);
        }
        assert!(layout.spectrogram.y > layout.predictions.y);
        assert!(layout.layers.y > layout.waveform.y);
    }

    #[test]
    fn grid_is_roughly_square() {
        assert_eq!(grid_columns(0, 100, 100), 1);
        assert_eq!(grid_columns(1, 100, 100), 1);
        assert_eq!(grid_columns(4, 100, 100), 2);
        assert_eq!(grid_columns(3, 1000, 100), 3);
    }

    #[test]
    fn compose_without_font_draws_panels() {
        let scene = scene();
        let canvas = compose(&scene, 640, 480, None);
        assert_eq!(canvas.pixels.len(), 640 * 480 * 4);

        let layout = Layout::new(640, 480);
        // Spectrogram top row is its highest (flipped) row: the max value.
        let top = canvas.pixel(layout.spectrogram.x, layout.spectrogram.y);
        let expected = RenderOptions::default().spectrogram_scale.color(1.0).to_rgba(255);
        assert_eq!(top, expected);

        // Prediction bar starts filled at the left edge.
        let bar = canvas.pixel(layout.predictions.x, layout.predictions.y);
        assert_eq!(bar, BAR.to_rgba(255));
    }

    #[test]
    fn error_page_uses_error_panel() {
        let canvas = compose_error(&AnalysisError::NetworkFailure("refused".into()), 200, 100, None);
        assert_eq!(canvas.pixel(MARGIN, MARGIN), ERROR_PANEL.to_rgba(255));
        assert_eq!(canvas.pixel(0, 0), BACKGROUND.to_rgba(255));
    }
}
