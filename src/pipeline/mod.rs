pub mod catalog;
pub mod color;
pub mod normalize;
pub mod scene;

use serde::Serialize;

use crate::model::{sort_predictions, AnalysisResult, Prediction};
use catalog::LayerGroup;
use color::ColorScale;
use scene::{Heatmap, WaveformTrace};

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Maximum number of waveform points handed to the presentation layer
    pub waveform_budget: usize,
    pub activation_scale: ColorScale,
    pub spectrogram_scale: ColorScale,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            waveform_budget: 1200,
            activation_scale: ColorScale::INFERNO,
            spectrogram_scale: ColorScale::MAGMA,
        }
    }
}

/// Renderable description of one analysis.
#[derive(Clone, Debug, Serialize)]
pub struct Scene {
    pub predictions: Vec<Prediction>,
    pub spectrogram: Heatmap,
    pub waveform: WaveformTrace,
    pub layers: Vec<LayerGroup<Heatmap>>,
}

impl Scene {
    pub fn layer_count(&self) -> usize {
        self.layers.iter().map(|g| g.members.len()).sum()
    }
}

/// Normalize, order, then render a complete result.
pub fn render_analysis(result: &AnalysisResult, options: &RenderOptions) -> Scene {
    // 1. Normalize each tensor on its own range
    let normalized_layers = result.layers.map_tensors(normalize::normalize);
    let normalized_spectrogram = normalize::normalize(&result.spectrogram);

    // 2. Deterministic display order
    let ordered = catalog::order(&normalized_layers);

    // 3. Drawable primitives
    let heatmaps: Vec<(String, Heatmap)> = ordered
        .into_iter()
        .map(|(name, tensor)| {
            (
                name.to_string(),
                scene::heatmap(tensor, &options.activation_scale),
            )
        })
        .collect();

    let mut predictions = result.predictions.clone();
    sort_predictions(&mut predictions);

    Scene {
        predictions,
        spectrogram: scene::heatmap(&normalized_spectrogram, &options.spectrogram_scale),
        waveform: scene::trace(&result.waveform, options.waveform_budget),
        layers: catalog::group(heatmaps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerActivations, Tensor2D, Waveform};

    fn result() -> AnalysisResult {
        let mut layers = LayerActivations::new();
        layers
            .insert("fc1", Tensor2D::new([1, 2], vec![vec![5.0, 5.0]]).unwrap())
            .unwrap();
        layers
            .insert(
                "conv1",
                Tensor2D::new([2, 2], vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap(),
            )
            .unwrap();
        AnalysisResult {
            predictions: vec![
                Prediction { label: "rain".into(), confidence: 0.1 },
                Prediction { label: "dog_bark".into(), confidence: 0.8 },
            ],
            layers,
            spectrogram: Tensor2D::new([1, 3], vec![vec![-80.0, -40.0, 0.0]]).unwrap(),
            waveform: Waveform {
                values: vec![0.0, 0.5, -0.5, 0.25],
                sample_rate: 4.0,
                duration: 1.0,
            },
        }
    }

    #[test]
    fn scene_orders_layers_and_uses_both_scales() {
        let options = RenderOptions::default();
        let scene = render_analysis(&result(), &options);

        assert_eq!(scene.predictions[0].label, "dog_bark");
        assert_eq!(scene.layer_count(), 2);
        assert_eq!(scene.layers[0].parent, "conv1");
        assert_eq!(scene.layers[1].parent, "fc1");

        let conv = &scene.layers[0].members[0].1;
        assert_eq!(conv.cell(0, 0), options.activation_scale.color(0.0));
        assert_eq!(conv.cell(1, 1), options.activation_scale.color(1.0));

        // Constant layer lands on the midpoint color
        let fc = &scene.layers[1].members[0].1;
        assert_eq!(fc.cell(0, 0), options.activation_scale.color(0.5));

        assert_eq!(scene.spectrogram.cell(0, 0), options.spectrogram_scale.color(0.0));
        assert_eq!(scene.spectrogram.cell(0, 2), options.spectrogram_scale.color(1.0));
        assert_eq!(scene.waveform.points.len(), 4);
    }

    #[test]
    fn scene_serializes_to_json() {
        let scene = render_analysis(&result(), &RenderOptions::default());
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["layers"][0]["stage"], "convolutional");
        assert_eq!(json["spectrogram"]["cols"], 3);
    }
}
