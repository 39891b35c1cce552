//! Robust statistics helpers shared by the profile and width estimators.

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0 for an empty slice.
pub fn std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| v - m).fold(0.0, |s, d| s + d * d) / values.len() as f64).sqrt()
}

/// Iterative sigma clipping.
///
/// Repeatedly excludes samples more than `sigma` standard deviations from the
/// mean of the currently retained samples, recomputing the statistics each
/// iteration, until nothing changes or `maxiters` is reached. Returns the
/// indices of the retained samples in ascending order.
pub fn sigma_clip(values: &[f64], sigma: f64, maxiters: usize) -> Vec<usize> {
    let mut retained: Vec<usize> = (0..values.len()).collect();
    for _ in 0..maxiters {
        let kept: Vec<f64> = retained.iter().map(|&i| values[i]).collect();
        let center = mean(&kept);
        let spread = std(&kept);
        let next: Vec<usize> = retained
            .iter()
            .copied()
            .filter(|&i| (values[i] - center).abs() <= sigma * spread)
            .collect();
        if next.len() == retained.len() {
            break;
        }
        retained = next;
    }
    retained
}

/// Median of a slice; 0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_clip_rejects_outlier() {
        let mut values = vec![10.0; 20];
        values.push(1000.0);
        let retained = sigma_clip(&values, 3.0, 3);
        assert_eq!(retained.len(), 20);
        assert!(!retained.contains(&20));
    }

    #[test]
    fn sigma_clip_keeps_constant_input() {
        let values = vec![5.0; 12];
        let retained = sigma_clip(&values, 1.0, 5);
        assert_eq!(retained.len(), 12);
    }

    #[test]
    fn sigma_clip_converges_before_maxiters() {
        let values = vec![1.0, 1.1, 0.9, 1.0, 50.0, 1.05];
        let retained = sigma_clip(&values, 1.0, 100);
        assert!(!retained.contains(&4));
        assert!(!retained.is_empty());
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }
}
