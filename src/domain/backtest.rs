//! Backtest pipeline: validate bars, compute indicators, fit regimes, drop
//! incomplete rows, simulate, then reduce to metrics.

use crate::domain::error::RegimeTraderError;
use crate::domain::indicator::{compute_indicators, Indicators};
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::{validate_bars, Bar};
use crate::domain::position::Trade;
use crate::domain::regime::{assign_regimes, RegimeConfig, RegimeLabel, RegimeModel};
use crate::domain::simulator::{simulate, LabeledBar, Signal, SimulationConfig};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestConfig {
    pub simulation: SimulationConfig,
    pub regime: RegimeConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultBar {
    pub bar: Bar,
    pub indicators: Indicators,
    pub state_id: usize,
    pub label: RegimeLabel,
    pub votes: u8,
    pub equity: f64,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub bars: Vec<ResultBar>,
    pub trades: Vec<Trade>,
    pub metrics: Metrics,
    pub bull_state: usize,
    pub bear_state: usize,
    pub model: RegimeModel,
}

pub fn run_backtest(
    bars: &[Bar],
    config: &BacktestConfig,
) -> Result<BacktestResult, RegimeTraderError> {
    validate_bars(bars)?;

    let rows = compute_indicators(bars);
    tracing::info!("computed indicators for {} bars", rows.len());

    let fit = assign_regimes(&rows, &config.regime)?;

    let labeled: Vec<LabeledBar> = rows
        .iter()
        .zip(fit.assignments.iter())
        .filter_map(|(row, assignment)| {
            row.complete().map(|indicators| LabeledBar {
                bar: row.bar.clone(),
                indicators,
                state_id: assignment.state_id,
                label: assignment.label,
            })
        })
        .collect();
    tracing::info!(
        "{} of {} bars have every indicator defined",
        labeled.len(),
        rows.len()
    );
    if labeled.is_empty() {
        tracing::warn!("no bars left to simulate after dropping incomplete rows");
    }

    let sim = simulate(&labeled, &config.simulation);
    tracing::info!(
        "simulation finished with {} trades, ending capital {:.2}",
        sim.trades.len(),
        sim.ending_capital
    );

    let closes: Vec<f64> = labeled.iter().map(|b| b.bar.close).collect();
    let equity: Vec<f64> = sim.outcomes.iter().map(|o| o.equity).collect();
    let metrics = Metrics::compute(
        config.simulation.initial_capital,
        sim.ending_capital,
        &closes,
        &equity,
        &sim.trades,
    );

    let result_bars = labeled
        .into_iter()
        .zip(sim.outcomes)
        .map(|(lb, outcome)| ResultBar {
            bar: lb.bar,
            indicators: lb.indicators,
            state_id: lb.state_id,
            label: lb.label,
            votes: outcome.vote.count(),
            equity: outcome.equity,
            signal: outcome.signal,
        })
        .collect();

    Ok(BacktestResult {
        bars: result_bars,
        trades: sim.trades,
        metrics,
        bull_state: fit.model.bull_state,
        bear_state: fit.model.bear_state,
        model: fit.model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_bars(count: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..count)
            .map(|i| {
                let x = i as f64;
                let close = 100.0 + x * 0.05 + (x * 0.21).sin() * 4.0;
                Bar {
                    timestamp: start + Duration::hours(i as i64),
                    open: close,
                    high: close + 0.5 + (x * 0.37).cos().abs(),
                    low: close - 0.5 - (x * 0.53).sin().abs(),
                    close,
                    volume: 1000.0 + (x * 1.3).sin() * 400.0,
                }
            })
            .collect()
    }

    #[test]
    fn config_defaults() {
        let c = BacktestConfig::default();
        assert!((c.simulation.initial_capital - 10_000.0).abs() < f64::EPSILON);
        assert!((c.simulation.leverage - 2.5).abs() < f64::EPSILON);
        assert_eq!(c.simulation.min_entry_votes, 7);
        assert_eq!(c.simulation.cooldown_hours, 48);
        assert_eq!(c.regime.n_components, 7);
        assert_eq!(c.regime.random_state, 42);
    }

    #[test]
    fn rejects_invalid_bars_before_fitting() {
        let mut bars = make_bars(200);
        bars[50].close = -1.0;
        let err = run_backtest(&bars, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, RegimeTraderError::InvalidInput { .. }));
    }

    #[test]
    fn short_history_is_insufficient() {
        let err = run_backtest(&make_bars(100), &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, RegimeTraderError::InsufficientData { .. }));
    }

    #[test]
    fn result_bars_are_the_complete_rows() {
        let bars = make_bars(300);
        let result = run_backtest(&bars, &BacktestConfig::default()).unwrap();
        let complete = compute_indicators(&bars)
            .iter()
            .filter(|r| r.complete().is_some())
            .count();
        assert_eq!(result.bars.len(), complete);
        assert!(result.bars.iter().all(|b| b.equity >= 0.0));
        assert_eq!(result.metrics.total_trades, result.trades.len());
        assert!(result.metrics.max_drawdown <= 0.0);
    }
}
