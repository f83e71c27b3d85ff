//! Backend wire format and the validation layer in front of the pipeline.
//!
//! Nothing deserialized here reaches the normalizer or renderer until it has
//! been turned into the typed model by [`parse_response`].

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AnalysisError;
use crate::model::{
    AnalysisResult, EncodedAudio, LayerActivations, Prediction, Tensor2D, Waveform,
};

/// Relative tolerance between the declared waveform duration and the one
/// implied by `values.len() / sample_rate`.
const DURATION_TOLERANCE: f32 = 0.05;

#[derive(Debug, Serialize)]
pub struct InferenceRequest<'a> {
    pub audio: &'a EncodedAudio,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    predictions: Vec<RawPrediction>,
    visualization: RawLayers,
    #[serde(alias = "input_spectogram")]
    input_spectrogram: RawTensor,
    waveform: RawWaveform,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    #[serde(rename = "class", alias = "label")]
    label: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawTensor {
    shape: Vec<i64>,
    values: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawWaveform {
    values: Vec<f64>,
    sample_rate: f64,
    duration: f64,
}

/// Layer entries in the order the transport delivered them, duplicates
/// included, so that validation can reject repeated names instead of
/// silently keeping the last one.
#[derive(Debug)]
struct RawLayers(Vec<(String, RawTensor)>);

impl<'de> Deserialize<'de> for RawLayers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LayersVisitor;

        impl<'de> Visitor<'de> for LayersVisitor {
            type Value = RawLayers;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of layer name to tensor")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawLayers, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, tensor)) = map.next_entry::<String, RawTensor>()? {
                    entries.push((name, tensor));
                }
                Ok(RawLayers(entries))
            }
        }

        deserializer.deserialize_map(LayersVisitor)
    }
}

/// Parse a successful (2xx) response body into a validated [`AnalysisResult`].
///
/// A body carrying an `error`/`detail` message and no predictions is a
/// backend-reported failure; anything else that does not fit the schema is
/// malformed.
pub fn parse_response(body: &str) -> Result<AnalysisResult, AnalysisError> {
    match serde_json::from_str::<RawResponse>(body) {
        Ok(raw) => validate(raw),
        Err(err) => {
            let value: serde_json::Value = serde_json::from_str(body)
                .map_err(|e| AnalysisError::malformed(format!("response is not JSON: {}", e)))?;
            if value.get("predictions").is_none() {
                if let Some(msg) = error_message(&value) {
                    return Err(AnalysisError::BackendError(msg));
                }
            }
            Err(AnalysisError::malformed(err.to_string()))
        }
    }
}

/// Pull a human-readable message out of an error payload, if there is one.
pub fn error_message(value: &serde_json::Value) -> Option<String> {
    ["error", "detail", "message"].iter().find_map(|key| {
        value.get(*key).map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
    })
}

fn validate(raw: RawResponse) -> Result<AnalysisResult, AnalysisError> {
    let predictions = raw
        .predictions
        .into_iter()
        .map(validate_prediction)
        .collect::<Result<Vec<_>, _>>()?;

    let mut layers = LayerActivations::new();
    for (name, tensor) in raw.visualization.0 {
        let tensor = validate_tensor(&tensor)
            .map_err(|e| AnalysisError::malformed(format!("layer '{}': {}", name, detail(e))))?;
        layers.insert(name, tensor)?;
    }

    let spectrogram = validate_tensor(&raw.input_spectrogram)
        .map_err(|e| AnalysisError::malformed(format!("input_spectrogram: {}", detail(e))))?;
    let waveform = validate_waveform(raw.waveform)?;

    Ok(AnalysisResult {
        predictions,
        layers,
        spectrogram,
        waveform,
    })
}

fn detail(err: AnalysisError) -> String {
    match err {
        AnalysisError::MalformedResponse(msg) => msg,
        other => other.to_string(),
    }
}

fn validate_prediction(raw: RawPrediction) -> Result<Prediction, AnalysisError> {
    if !(0.0..=1.0).contains(&raw.confidence) {
        return Err(AnalysisError::malformed(format!(
            "confidence {} for '{}' is outside 0-1",
            raw.confidence, raw.label
        )));
    }
    Ok(Prediction {
        label: raw.label,
        confidence: raw.confidence as f32,
    })
}

/// Collapse a rank >= 2 shape to `[rows, cols]`, where `cols` is the last
/// dimension and `rows` the product of the rest.
fn flatten_shape(shape: &[i64]) -> Result<[usize; 2], AnalysisError> {
    if shape.len() < 2 {
        return Err(AnalysisError::malformed(format!(
            "shape {:?} has rank {}, need at least 2",
            shape,
            shape.len()
        )));
    }
    let dims = shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AnalysisError::malformed(format!("shape {:?} has a negative dimension", shape)))?;

    let (leading, last) = dims.split_at(dims.len() - 1);
    let rows = leading
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| AnalysisError::malformed(format!("shape {:?} overflows", shape)))?;
    Ok([rows, last[0]])
}

fn validate_tensor(raw: &RawTensor) -> Result<Tensor2D, AnalysisError> {
    let shape = flatten_shape(&raw.shape)?;
    let values = raw
        .values
        .iter()
        .map(|row| row.iter().map(|&v| finite(v)).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;
    Tensor2D::new(shape, values)
}

fn validate_waveform(raw: RawWaveform) -> Result<Waveform, AnalysisError> {
    let sample_rate = finite(raw.sample_rate)?;
    if sample_rate <= 0.0 {
        return Err(AnalysisError::malformed(format!(
            "waveform sample_rate {} must be positive",
            raw.sample_rate
        )));
    }
    let duration = finite(raw.duration)?;
    if duration <= 0.0 {
        return Err(AnalysisError::malformed(format!(
            "waveform duration {} must be positive",
            raw.duration
        )));
    }
    let values = raw
        .values
        .into_iter()
        .map(finite)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AnalysisError::malformed(format!("waveform: {}", detail(e))))?;

    let waveform = Waveform {
        values,
        sample_rate,
        duration,
    };
    let expected = waveform.expected_duration();
    if (expected - duration).abs() > duration * DURATION_TOLERANCE {
        log::warn!(
            "Waveform duration {:.3}s does not match {} samples at {}Hz ({:.3}s)",
            duration,
            waveform.values.len(),
            sample_rate,
            expected
        );
    }
    Ok(waveform)
}

fn finite(v: f64) -> Result<f32, AnalysisError> {
    let v32 = v as f32;
    if v32.is_finite() {
        Ok(v32)
    } else {
        Err(AnalysisError::malformed(format!("non-finite value {}", v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(visualization: serde_json::Value) -> String {
        json!({
            "predictions": [
                {"class": "dog_bark", "confidence": 0.7},
                {"class": "siren", "confidence": 0.2},
                {"class": "rain", "confidence": 0.1}
            ],
            "visualization": visualization,
            "input_spectrogram": {"shape": [2, 3], "values": [[0, 1, 2], [3, 4, 5]]},
            "waveform": {"values": [0.0, 0.5, -0.5, 0.0], "sample_rate": 4, "duration": 1.0}
        })
        .to_string()
    }

    #[test]
    fn parses_well_formed_response() {
        let result = parse_response(&body(json!({
            "conv1": {"shape": [2, 2], "values": [[1, 2], [3, 4]]}
        })))
        .unwrap();

        assert_eq!(result.predictions.len(), 3);
        assert_eq!(result.predictions[0].label, "dog_bark");
        assert_eq!(result.layers.len(), 1);
        assert_eq!(result.spectrogram.shape(), [2, 3]);
        assert_eq!(result.waveform.sample_rate, 4.0);
    }

    #[test]
    fn rejects_values_disagreeing_with_shape() {
        let err = parse_response(&body(json!({
            "conv1": {"shape": [3, 2], "values": [[1, 2], [3, 4]]}
        })))
        .unwrap_err();
        match err {
            AnalysisError::MalformedResponse(msg) => assert!(msg.contains("conv1")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn flattens_rank_three_shapes() {
        let result = parse_response(&body(json!({
            "layer1": {"shape": [2, 1, 3], "values": [[1, 2, 3], [4, 5, 6]]}
        })))
        .unwrap();
        let (_, tensor) = result.layers.iter().next().unwrap();
        assert_eq!(tensor.shape(), [2, 3]);
    }

    #[test]
    fn rejects_rank_one_and_negative_shapes() {
        assert!(flatten_shape(&[4]).is_err());
        assert!(flatten_shape(&[]).is_err());
        assert!(flatten_shape(&[2, -1]).is_err());
        assert_eq!(flatten_shape(&[0, 7]).unwrap(), [0, 7]);
    }

    #[test]
    fn rejects_duplicate_layer_names() {
        let text = body(json!({})).replace(
            "\"visualization\":{}",
            "\"visualization\":{\"fc1\":{\"shape\":[1,1],\"values\":[[1]]},\"fc1\":{\"shape\":[1,1],\"values\":[[2]]}}",
        );
        assert!(matches!(
            parse_response(&text),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_bad_sample_rate() {
        let text = body(json!({})).replace("\"sample_rate\":4", "\"sample_rate\":-22050");
        assert!(matches!(
            parse_response(&text),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[test]
    fn duration_mismatch_is_not_fatal() {
        let text = body(json!({})).replace("\"duration\":1.0", "\"duration\":5.0");
        assert!(parse_response(&text).is_ok());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let text = body(json!({})).replace("0.7", "1.7");
        assert!(matches!(
            parse_response(&text),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[test]
    fn accepts_legacy_spectrogram_key() {
        let text = body(json!({})).replace("input_spectrogram", "input_spectogram");
        assert!(parse_response(&text).is_ok());
    }

    #[test]
    fn error_payload_is_a_backend_error() {
        let err = parse_response(r#"{"error": "could not decode audio"}"#).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::BackendError("could not decode audio".to_string())
        );
    }

    #[test]
    fn non_json_body_is_malformed() {
        assert!(matches!(
            parse_response("<html>502</html>"),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }
}
