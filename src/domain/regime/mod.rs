//! Regime model: fits a Gaussian HMM over standardised
//! {returns, range, volume_volatility} and labels the states.
//!
//! The state with the highest mean per-bar return is Bull, the lowest is Bear,
//! everything else is Neutral. Ties go to the lowest state id.

pub mod gaussian;
pub mod hmm;
pub mod labeling;

use chrono::NaiveDateTime;
use ndarray::Array2;

use crate::domain::error::RegimeTraderError;
use crate::domain::indicator::IndicatorRow;
use hmm::{FitReport, GaussianHmm, HmmConfig};
pub use labeling::{extreme_states, fill_states, label_for, RegimeLabel};

pub const MIN_FEATURE_ROWS: usize = 120;
pub const ROWS_PER_STATE: usize = 60;
pub const STD_FLOOR: f64 = 1e-8;
const FEATURE_NAMES: [&str; 3] = ["returns", "range", "volume_volatility"];

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeConfig {
    pub n_components: usize,
    pub random_state: u64,
    pub n_iter: usize,
    pub tol: f64,
    pub min_covar: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        RegimeConfig {
            n_components: 7,
            random_state: 42,
            n_iter: 500,
            tol: 1e-2,
            min_covar: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeAssignment {
    pub timestamp: NaiveDateTime,
    pub state_id: usize,
    pub label: RegimeLabel,
}

/// The fitted model and the statistics it was fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeModel {
    pub hmm: GaussianHmm,
    pub report: FitReport,
    pub n_states: usize,
    pub bull_state: usize,
    pub bear_state: usize,
    pub feature_rows: usize,
    pub feature_mean: [f64; 3],
    pub feature_std: [f64; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeFit {
    /// One assignment per input row, same order.
    pub assignments: Vec<RegimeAssignment>,
    pub model: RegimeModel,
}

/// K = max(2, min(requested, rows / 60)).
pub fn adaptive_state_count(requested: usize, rows: usize) -> usize {
    requested.min(rows / ROWS_PER_STATE).max(2)
}

/// Column means and sample standard deviations, with zero deviations
/// replaced by [`STD_FLOOR`].
pub fn standardize(features: &[[f64; 3]]) -> (Array2<f64>, [f64; 3], [f64; 3]) {
    let n = features.len();
    let mut mean = [0.0; 3];
    let mut std = [STD_FLOOR; 3];

    if n > 0 {
        for c in 0..3 {
            mean[c] = features.iter().map(|f| f[c]).sum::<f64>() / n as f64;
        }
    }
    if n > 1 {
        for c in 0..3 {
            let var = features.iter().map(|f| (f[c] - mean[c]).powi(2)).sum::<f64>()
                / (n - 1) as f64;
            let s = var.sqrt();
            if s == 0.0 {
                tracing::warn!(
                    "feature column {} has zero variance, flooring its scale to {}",
                    FEATURE_NAMES[c],
                    STD_FLOOR
                );
            } else {
                std[c] = s;
            }
        }
    }

    let mut scaled = Array2::<f64>::zeros((n, 3));
    for (t, f) in features.iter().enumerate() {
        for c in 0..3 {
            scaled[[t, c]] = (f[c] - mean[c]) / std[c];
        }
    }
    (scaled, mean, std)
}

/// Fit the regime model over `rows` and give every row a state and label.
///
/// Fails with [`RegimeTraderError::InsufficientData`] below
/// [`MIN_FEATURE_ROWS`] rows with a complete feature vector.
pub fn assign_regimes(
    rows: &[IndicatorRow],
    config: &RegimeConfig,
) -> Result<RegimeFit, RegimeTraderError> {
    let mut positions = Vec::new();
    let mut features = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if let Some(f) = row.features() {
            positions.push(i);
            features.push(f);
        }
    }

    if features.len() < MIN_FEATURE_ROWS {
        return Err(RegimeTraderError::InsufficientData {
            rows: features.len(),
            minimum: MIN_FEATURE_ROWS,
        });
    }

    let n_states = adaptive_state_count(config.n_components, features.len());
    let (scaled, feature_mean, feature_std) = standardize(&features);

    tracing::info!(
        "fitting {}-state regime model on {} feature rows",
        n_states,
        features.len()
    );
    let hmm_config = HmmConfig {
        n_states,
        n_iter: config.n_iter,
        tol: config.tol,
        min_covar: config.min_covar,
        seed: config.random_state,
    };
    let (hmm, report) = GaussianHmm::fit(&scaled, &hmm_config)?;
    if report.converged {
        tracing::info!(
            "regime model converged after {} iterations (log-likelihood {:.4})",
            report.iterations,
            report.log_likelihood
        );
    } else {
        tracing::warn!(
            "regime model did not converge within {} iterations, using last parameters",
            report.iterations
        );
    }

    let decoded = hmm.decode(&scaled);
    let mut sparse: Vec<Option<usize>> = vec![None; rows.len()];
    for (&pos, &state) in positions.iter().zip(decoded.iter()) {
        sparse[pos] = Some(state);
    }
    let states = fill_states(&sparse).ok_or(RegimeTraderError::InsufficientData {
        rows: 0,
        minimum: MIN_FEATURE_ROWS,
    })?;

    let returns: Vec<Option<f64>> = rows.iter().map(|r| r.returns).collect();
    let (bull_state, bear_state) = extreme_states(&states, &returns, n_states);
    tracing::debug!("bull state {}, bear state {}", bull_state, bear_state);

    let assignments = rows
        .iter()
        .zip(states.iter())
        .map(|(row, &state_id)| RegimeAssignment {
            timestamp: row.bar.timestamp,
            state_id,
            label: label_for(state_id, bull_state, bear_state),
        })
        .collect();

    Ok(RegimeFit {
        assignments,
        model: RegimeModel {
            hmm,
            report,
            n_states,
            bull_state,
            bear_state,
            feature_rows: features.len(),
            feature_mean,
            feature_std,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn adaptive_state_count_bounds() {
        assert_eq!(adaptive_state_count(7, 120), 2);
        assert_eq!(adaptive_state_count(7, 179), 2);
        assert_eq!(adaptive_state_count(7, 180), 3);
        assert_eq!(adaptive_state_count(7, 10_000), 7);
        assert_eq!(adaptive_state_count(1, 10_000), 2);
    }

    #[test]
    fn standardize_zero_mean_unit_variance() {
        let features = vec![[1.0, 10.0, 5.0], [2.0, 20.0, 5.0], [3.0, 30.0, 5.0]];
        let (scaled, mean, std) = standardize(&features);
        assert!((mean[0] - 2.0).abs() < 1e-12);
        assert!((std[0] - 1.0).abs() < 1e-12);
        assert!((std[1] - 10.0).abs() < 1e-12);
        assert!((scaled[[0, 0]] + 1.0).abs() < 1e-12);
        assert!((scaled[[2, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn standardize_floors_zero_variance_column() {
        let features = vec![[1.0, 10.0, 5.0], [2.0, 20.0, 5.0]];
        let (scaled, _, std) = standardize(&features);
        assert_eq!(std[2], STD_FLOOR);
        assert!(scaled.column(2).iter().all(|v| *v == 0.0));
    }

    fn rows_with_features(count: usize, leading_gap: usize) -> Vec<IndicatorRow> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..count + leading_gap)
            .map(|i| {
                let x = i as f64;
                let defined = i >= leading_gap;
                let regime = if (i / 30) % 2 == 0 { 1.0 } else { -1.0 };
                let ret = regime * 0.01 + (x * 1.3).sin() * 0.002;
                IndicatorRow {
                    bar: Bar {
                        timestamp: start + Duration::hours(i as i64),
                        open: 100.0,
                        high: 101.0,
                        low: 99.0,
                        close: 100.0,
                        volume: 1000.0,
                    },
                    returns: defined.then_some(ret),
                    range: defined.then_some(0.02 + (x * 0.7).cos().abs() * 0.01),
                    volume_volatility: defined.then_some(0.3 + (x * 2.1).sin() * 0.1),
                    rsi: None,
                    momentum: None,
                    volatility: None,
                    adx: None,
                    ema50: None,
                    ema200: None,
                    macd: None,
                    macd_signal: None,
                }
            })
            .collect()
    }

    #[test]
    fn assign_regimes_rejects_119_feature_rows() {
        let rows = rows_with_features(MIN_FEATURE_ROWS - 1, 0);
        match assign_regimes(&rows, &RegimeConfig::default()) {
            Err(RegimeTraderError::InsufficientData { rows, minimum }) => {
                assert_eq!(rows, 119);
                assert_eq!(minimum, 120);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn assign_regimes_accepts_120_feature_rows() {
        let rows = rows_with_features(MIN_FEATURE_ROWS, 0);
        let fit = assign_regimes(&rows, &RegimeConfig::default()).unwrap();
        assert_eq!(fit.assignments.len(), 120);
        assert_eq!(fit.model.n_states, 2);
        assert_eq!(fit.model.feature_rows, 120);
    }

    #[test]
    fn assign_regimes_backfills_rows_without_features() {
        let rows = rows_with_features(150, 10);
        let fit = assign_regimes(&rows, &RegimeConfig::default()).unwrap();
        assert_eq!(fit.assignments.len(), 160);
        assert_eq!(fit.assignments[0].state_id, fit.assignments[10].state_id);
        for (a, r) in fit.assignments.iter().zip(rows.iter()) {
            assert_eq!(a.timestamp, r.bar.timestamp);
            assert!(a.state_id < fit.model.n_states);
        }
    }

    #[test]
    fn assign_regimes_labels_extremes() {
        let rows = rows_with_features(240, 0);
        let fit = assign_regimes(&rows, &RegimeConfig::default()).unwrap();
        let bull = fit.model.bull_state;
        let bear = fit.model.bear_state;
        for a in &fit.assignments {
            let expected = label_for(a.state_id, bull, bear);
            assert_eq!(a.label, expected);
        }
        assert!(fit.assignments.iter().any(|a| a.label == RegimeLabel::Bear));
    }

    #[test]
    fn assign_regimes_is_deterministic() {
        let rows = rows_with_features(200, 5);
        let a = assign_regimes(&rows, &RegimeConfig::default()).unwrap();
        let b = assign_regimes(&rows, &RegimeConfig::default()).unwrap();
        assert_eq!(a, b);
    }
}
