use ndarray::{s, Array1};

use crate::error::RigError;

/// Centered boxcar average over `window` samples. Near the edges the
/// effective window is truncated to what exists, so edge values are never
/// pulled toward zero by padding.
///
/// Even windows extend one sample further forward than backward.
pub fn moving_average(data: &Array1<f64>, window: usize) -> Result<Array1<f64>, RigError> {
    let n = data.len();
    if window == 0 || window > n {
        return Err(RigError::InvalidWindow { window, len: n });
    }
    if window == 1 {
        return Ok(data.clone());
    }
    let back = (window - 1) / 2;
    let forward = window / 2;
    let mut smoothed = Array1::<f64>::zeros(n);
    for i in 0..n {
        let lo = i.saturating_sub(back);
        let hi = (i + forward + 1).min(n);
        let segment = data.slice(s![lo..hi]);
        smoothed[i] = segment.sum() / segment.len() as f64;
    }
    Ok(smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_of_one_is_identity() {
        let data = Array1::from(vec![3.0, -1.0, 4.0, 1.5]);
        let smoothed = moving_average(&data, 1).unwrap();
        assert_eq!(smoothed, data);
    }

    #[test]
    fn rejects_zero_and_oversized_windows() {
        let data = Array1::from(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            moving_average(&data, 0),
            Err(RigError::InvalidWindow { window: 0, len: 3 })
        ));
        assert!(matches!(
            moving_average(&data, 4),
            Err(RigError::InvalidWindow { window: 4, len: 3 })
        ));
    }

    #[test]
    fn constant_signal_is_unchanged() {
        let data = Array1::from(vec![2.5; 7]);
        let smoothed = moving_average(&data, 5).unwrap();
        for &v in smoothed.iter() {
            assert!((v - 2.5).abs() < 1e-12);
        }
    }

    #[test]
    fn interior_averages_are_centered() {
        let data = Array1::from(vec![0.0, 0.0, 9.0, 0.0, 0.0]);
        let smoothed = moving_average(&data, 3).unwrap();
        assert!((smoothed[1] - 3.0).abs() < 1e-12);
        assert!((smoothed[2] - 3.0).abs() < 1e-12);
        assert!((smoothed[3] - 3.0).abs() < 1e-12);
        // The spike never leaks past its window.
        assert!(smoothed[0].abs() < 1e-12);
        assert!(smoothed[4].abs() < 1e-12);
    }

    #[test]
    fn full_window_reaches_global_mean_at_center_but_not_at_edges() {
        let data = Array1::from((1..=9).map(f64::from).collect::<Vec<_>>());
        let mean = 5.0;
        let smoothed = moving_average(&data, 9).unwrap();
        assert!((smoothed[4] - mean).abs() < 1e-12);
        // Edge windows truncate, so they keep a local flavour.
        assert!((smoothed[0] - 3.0).abs() < 1e-12); // mean of 1..=5
        assert!((smoothed[8] - 7.0).abs() < 1e-12); // mean of 5..=9
        assert!(smoothed[0] < mean && smoothed[8] > mean);
    }

    #[test]
    fn edges_truncate_rather_than_pad_with_zeros() {
        let data = Array1::from(vec![10.0, 10.0, 10.0, 10.0]);
        let smoothed = moving_average(&data, 3).unwrap();
        // Zero-padding would drag the first value to 20/3.
        assert!((smoothed[0] - 10.0).abs() < 1e-12);
        assert!((smoothed[3] - 10.0).abs() < 1e-12);
    }
}
