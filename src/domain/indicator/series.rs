//! Rolling-window primitives shared by the indicators.
//!
//! A window value is defined only when every element inside the window is
//! defined. Standard deviation is the sample estimate (n - 1 denominator).

/// num / den, undefined when den is zero or the quotient is not finite.
pub fn safe_div(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let q = num / den;
    q.is_finite().then_some(q)
}

/// values[i] / values[i - lag] - 1. Undefined for the first `lag` entries.
pub fn pct_change(values: &[f64], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if lag == 0 || i < lag {
                None
            } else {
                safe_div(values[i], values[i - lag]).map(|r| r - 1.0)
            }
        })
        .collect()
}

fn window(values: &[Option<f64>], end: usize, period: usize) -> Option<Vec<f64>> {
    if period == 0 || end + 1 < period {
        return None;
    }
    values[end + 1 - period..=end].iter().copied().collect()
}

pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| window(values, i, period).map(|w| w.iter().sum::<f64>() / period as f64))
        .collect()
}

pub fn rolling_std(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if period < 2 {
                return None;
            }
            let w = window(values, i, period)?;
            let mean = w.iter().sum::<f64>() / period as f64;
            let variance = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_div_zero_denominator() {
        assert_eq!(safe_div(1.0, 0.0), None);
        assert_eq!(safe_div(0.0, 0.0), None);
    }

    #[test]
    fn safe_div_overflow_is_undefined() {
        assert_eq!(safe_div(f64::MAX, 1e-300), None);
    }

    #[test]
    fn safe_div_regular() {
        assert_eq!(safe_div(6.0, 3.0), Some(2.0));
    }

    #[test]
    fn pct_change_lag_one() {
        let out = pct_change(&[100.0, 110.0, 99.0], 1);
        assert_eq!(out[0], None);
        assert!((out[1].unwrap() - 0.10).abs() < 1e-12);
        assert!((out[2].unwrap() - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn pct_change_from_zero_is_undefined() {
        let out = pct_change(&[0.0, 5.0], 1);
        assert_eq!(out[1], None);
    }

    #[test]
    fn rolling_mean_warmup_and_value() {
        let vals = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let out = rolling_mean(&vals, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 2.0).abs() < f64::EPSILON);
        assert!((out[3].unwrap() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rolling_mean_gap_poisons_window() {
        let vals = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let out = rolling_mean(&vals, 2);
        assert_eq!(out[1], None);
        assert_eq!(out[2], None);
        assert!((out[3].unwrap() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rolling_std_is_sample_estimate() {
        let vals: Vec<Option<f64>> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|v| Some(*v))
            .collect();
        let out = rolling_std(&vals, 8);
        // population std is 2.0, sample std is sqrt(32 / 7)
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((out[7].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn rolling_std_constant_is_zero() {
        let vals = vec![Some(5.0); 4];
        let out = rolling_std(&vals, 3);
        assert!((out[3].unwrap() - 0.0).abs() < f64::EPSILON);
    }
}
