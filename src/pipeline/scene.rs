//! Turns normalized numeric data into drawable primitives.
//!
//! Everything here is a pure transform; pixels are drawn by `present`.

use serde::Serialize;

use super::color::{Color, ColorScale};
use crate::model::{Tensor2D, Waveform};

/// Grid of colored cells, row-major.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Heatmap {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<Color>,
}

impl Heatmap {
    pub fn cell(&self, row: usize, col: usize) -> Color {
        self.cells[row * self.cols + col]
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Color every cell of an already-normalized tensor.
pub fn heatmap(normalized: &Tensor2D, scale: &ColorScale) -> Heatmap {
    Heatmap {
        rows: normalized.rows(),
        cols: normalized.cols(),
        cells: normalized.iter().map(|v| scale.color(v)).collect(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WavePoint {
    /// Sample index before decimation
    pub index: usize,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WaveformTrace {
    pub points: Vec<WavePoint>,
    /// Sample count before decimation
    pub source_len: usize,
    pub sample_rate: f32,
    pub duration: f32,
}

impl WaveformTrace {
    /// Largest absolute sample value, for vertical scaling.
    pub fn peak(&self) -> f32 {
        self.points.iter().map(|p| p.value.abs()).fold(0.0f32, f32::max)
    }
}

pub fn trace(waveform: &Waveform, budget: usize) -> WaveformTrace {
    WaveformTrace {
        points: decimate(&waveform.values, budget),
        source_len: waveform.values.len(),
        sample_rate: waveform.sample_rate,
        duration: waveform.duration,
    }
}

/// Reduce `values` to at most `budget` points while keeping every bucket's
/// minimum and maximum, emitted in sample order.
pub fn decimate(values: &[f32], budget: usize) -> Vec<WavePoint> {
    let budget = budget.max(2);
    if values.len() <= budget {
        return values
            .iter()
            .enumerate()
            .map(|(index, &value)| WavePoint { index, value })
            .collect();
    }

    let buckets = budget / 2;
    let mut points = Vec::with_capacity(buckets * 2);
    for bucket in 0..buckets {
        let (start, end) = bucket_bounds(values.len(), buckets, bucket);
        let slice = &values[start..end];

        let (mut lo, mut hi) = (0, 0);
        for (i, &v) in slice.iter().enumerate() {
            if v < slice[lo] {
                lo = i;
            }
            if v > slice[hi] {
                hi = i;
            }
        }

        let (first, second) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        points.push(WavePoint {
            index: start + first,
            value: slice[first],
        });
        if second != first {
            points.push(WavePoint {
                index: start + second,
                value: slice[second],
            });
        }
    }
    points
}

/// Half-open sample range of `bucket` when `len` samples are split into
/// `buckets` near-equal parts. Callers guarantee `len >= buckets`, so no
/// bucket is empty.
fn bucket_bounds(len: usize, buckets: usize, bucket: usize) -> (usize, usize) {
    (bucket * len / buckets, (bucket + 1) * len / buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heatmap_cells_follow_the_scale() {
        let t = Tensor2D::new([2, 2], vec![vec![0.0, 0.25], vec![0.75, 1.0]]).unwrap();
        let scale = ColorScale::GRAYSCALE;
        let map = heatmap(&t, &scale);
        assert_eq!((map.rows, map.cols), (2, 2));
        for i in 0..2 {
            for j in 0..2 {
                assert_eq!(map.cell(i, j), scale.color(t.get(i, j)));
            }
        }
    }

    #[test]
    fn empty_tensor_gives_empty_heatmap() {
        let t = Tensor2D::new([0, 4], vec![]).unwrap();
        assert!(heatmap(&t, &ColorScale::MAGMA).is_empty());
    }

    #[test]
    fn short_waveform_is_kept_whole() {
        let values = [0.1, -0.2, 0.3];
        let points = decimate(&values, 10);
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], WavePoint { index: 2, value: 0.3 });
    }

    #[test]
    fn decimation_preserves_bucket_extrema() {
        // Quiet noise with a handful of single-sample transients, the case
        // stride sampling gets wrong.
        let mut values: Vec<f32> = (0..10_007)
            .map(|i| ((i * 7919) % 101) as f32 / 1000.0 - 0.05)
            .collect();
        for &(i, v) in &[(13, 0.98), (4_999, -0.91), (10_006, 0.77), (7_300, 1.0)] {
            values[i] = v;
        }

        let budget = 300;
        let points = decimate(&values, budget);
        assert!(points.len() <= budget);
        assert!(points.windows(2).all(|w| w[0].index < w[1].index));

        let buckets = budget / 2;
        for bucket in 0..buckets {
            let (start, end) = bucket_bounds(values.len(), buckets, bucket);
            let input_max = values[start..end].iter().copied().fold(f32::MIN, f32::max);
            let input_min = values[start..end].iter().copied().fold(f32::MAX, f32::min);
            let in_bucket: Vec<f32> = points
                .iter()
                .filter(|p| (start..end).contains(&p.index))
                .map(|p| p.value)
                .collect();
            let output_max = in_bucket.iter().copied().fold(f32::MIN, f32::max);
            let output_min = in_bucket.iter().copied().fold(f32::MAX, f32::min);
            assert_eq!(output_max, input_max, "bucket {}", bucket);
            assert_eq!(output_min, input_min, "bucket {}", bucket);
        }

        let global_max = points.iter().map(|p| p.value).fold(f32::MIN, f32::max);
        assert_eq!(global_max, 1.0);
    }

    #[test]
    fn constant_bucket_emits_one_point() {
        let points = decimate(&[0.0; 8], 2);
        assert_eq!(points, vec![WavePoint { index: 0, value: 0.0 }]);
    }

    #[test]
    fn trace_reports_peak_and_source_length() {
        let waveform = Waveform {
            values: vec![0.0, -0.8, 0.4, 0.1],
            sample_rate: 4.0,
            duration: 1.0,
        };
        let t = trace(&waveform, 100);
        assert_eq!(t.source_len, 4);
        assert_eq!(t.peak(), 0.8);
    }
}
