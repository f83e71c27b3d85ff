use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AnalysisError;

/// Raw content of the selected audio file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioBytes(Vec<u8>);

impl AudioBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Transport-safe text form of [`AudioBytes`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EncodedAudio(String);

impl EncodedAudio {
    pub(crate) fn from_string(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// Probability in 0.0-1.0
    pub confidence: f32,
}

/// Stable sort by descending confidence. Equal confidences keep their
/// relative order.
pub fn sort_predictions(predictions: &mut [Prediction]) {
    predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

/// A two-dimensional grid with an explicit `[rows, cols]` shape.
///
/// Construction checks that `values` matches `shape`; every other component
/// relies on that.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tensor2D {
    shape: [usize; 2],
    values: Vec<Vec<f32>>,
}

impl Tensor2D {
    pub fn new(shape: [usize; 2], values: Vec<Vec<f32>>) -> Result<Self, AnalysisError> {
        let [rows, cols] = shape;
        if values.len() != rows {
            return Err(AnalysisError::malformed(format!(
                "shape declares {} rows but values has {}",
                rows,
                values.len()
            )));
        }
        if let Some((i, row)) = values.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(AnalysisError::malformed(format!(
                "row {} has {} values, shape declares {} columns",
                i,
                row.len(),
                cols
            )));
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    pub fn cols(&self) -> usize {
        self.shape[1]
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }

    pub fn values(&self) -> &[Vec<f32>] {
        &self.values
    }

    #[cfg(test)]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row][col]
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().flat_map(|row| row.iter().copied())
    }

    /// Apply `f` to every value, keeping the shape.
    pub fn map(&self, mut f: impl FnMut(f32) -> f32) -> Tensor2D {
        let values = self
            .values
            .iter()
            .map(|row| row.iter().map(|&v| f(v)).collect())
            .collect();
        Tensor2D {
            shape: self.shape,
            values,
        }
    }
}

/// Per-layer activations keyed by layer name.
///
/// Keyed storage means two responses carrying the same layers always
/// iterate identically, whatever order the transport delivered them in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerActivations(BTreeMap<String, Tensor2D>);

impl LayerActivations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor2D) -> Result<(), AnalysisError> {
        let name = name.into();
        if self.0.contains_key(&name) {
            return Err(AnalysisError::malformed(format!("duplicate layer '{}'", name)));
        }
        self.0.insert(name, tensor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor2D)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Transform every tensor, keeping the names.
    pub fn map_tensors(&self, mut f: impl FnMut(&Tensor2D) -> Tensor2D) -> LayerActivations {
        LayerActivations(self.0.iter().map(|(k, v)| (k.clone(), f(v))).collect())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Waveform {
    pub values: Vec<f32>,
    pub sample_rate: f32,
    /// Seconds
    pub duration: f32,
}

impl Waveform {
    /// Duration implied by the sample count, for comparison with `duration`.
    pub fn expected_duration(&self) -> f32 {
        self.values.len() as f32 / self.sample_rate
    }
}

/// A fully validated backend response.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResult {
    pub predictions: Vec<Prediction>,
    pub layers: LayerActivations,
    pub spectrogram: Tensor2D,
    pub waveform: Waveform,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_rejects_row_count_mismatch() {
        let err = Tensor2D::new([3, 2], vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn tensor_rejects_ragged_rows() {
        let err = Tensor2D::new([2, 2], vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn empty_tensor_is_valid() {
        let t = Tensor2D::new([0, 5], vec![]).unwrap();
        assert!(t.is_empty());
        let t = Tensor2D::new([2, 0], vec![vec![], vec![]]).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn duplicate_layer_names_rejected() {
        let t = Tensor2D::new([1, 1], vec![vec![0.0]]).unwrap();
        let mut layers = LayerActivations::new();
        layers.insert("conv1", t.clone()).unwrap();
        assert!(layers.insert("conv1", t).is_err());
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn prediction_sort_is_stable_and_descending() {
        let p = |label: &str, confidence: f32| Prediction {
            label: label.to_string(),
            confidence,
        };
        let mut preds = vec![p("rain", 0.2), p("dog", 0.5), p("wind", 0.2), p("cat", 0.1)];
        sort_predictions(&mut preds);
        let labels: Vec<&str> = preds.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["dog", "rain", "wind", "cat"]);
    }
}
