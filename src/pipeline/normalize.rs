use crate::model::Tensor2D;

/// Value assigned to every cell of a constant tensor.
pub const MIDPOINT: f32 = 0.5;

/// Min-max normalize a single tensor into 0.0-1.0.
///
/// Each tensor is scaled on its own range, so a quiet layer is as readable
/// as a loud one. Constant tensors map to [`MIDPOINT`]; empty tensors come
/// back empty.
pub fn normalize(tensor: &Tensor2D) -> Tensor2D {
    let Some((min, max)) = value_range(tensor) else {
        return tensor.clone();
    };

    if max <= min {
        return tensor.map(|_| MIDPOINT);
    }
    // f64 keeps `max - min` finite across the whole f32 range.
    let (min, range) = (min as f64, max as f64 - min as f64);
    tensor.map(|v| ((v as f64 - min) / range).clamp(0.0, 1.0) as f32)
}

fn value_range(tensor: &Tensor2D) -> Option<(f32, f32)> {
    tensor.iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(values: Vec<Vec<f32>>) -> Tensor2D {
        let rows = values.len();
        let cols = values.first().map_or(0, |r| r.len());
        Tensor2D::new([rows, cols], values).unwrap()
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{} != {}", a, b);
    }

    #[test]
    fn scales_two_by_two_grid() {
        let out = normalize(&tensor(vec![vec![1.0, 2.0], vec![3.0, 4.0]]));
        assert_close(out.get(0, 0), 0.0);
        assert_close(out.get(0, 1), 0.333);
        assert_close(out.get(1, 0), 0.667);
        assert_close(out.get(1, 1), 1.0);
    }

    #[test]
    fn constant_tensor_maps_to_midpoint() {
        let out = normalize(&tensor(vec![vec![-3.5; 4]; 3]));
        assert!(out.iter().all(|v| v == MIDPOINT));
        assert_eq!(out.shape(), [3, 4]);
    }

    #[test]
    fn empty_tensor_stays_empty() {
        let empty = Tensor2D::new([0, 0], vec![]).unwrap();
        assert_eq!(normalize(&empty), empty);

        let no_cols = Tensor2D::new([3, 0], vec![vec![], vec![], vec![]]).unwrap();
        let out = normalize(&no_cols);
        assert_eq!(out.shape(), [3, 0]);
    }

    #[test]
    fn output_stays_in_unit_range_for_wide_inputs() {
        let inputs = [
            vec![vec![-1e30, 0.0, 1e30]],
            vec![vec![f32::MIN_POSITIVE, f32::MIN_POSITIVE * 2.0]],
            vec![vec![-80.0, -42.5], vec![-0.001, 12.0]],
            vec![vec![f32::MAX, f32::MIN]],
        ];
        for values in inputs {
            let out = normalize(&tensor(values));
            assert!(out.iter().all(|v| (0.0..=1.0).contains(&v)), "{:?}", out);
        }
    }

    #[test]
    fn layers_are_scaled_independently() {
        let small = normalize(&tensor(vec![vec![0.0, 0.01]]));
        let large = normalize(&tensor(vec![vec![0.0, 1000.0]]));
        assert_eq!(small.values(), large.values());
    }
}
