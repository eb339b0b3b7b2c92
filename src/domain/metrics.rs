//! Headline performance metrics over the equity curve and trade log.

use serde::Serialize;

use super::position::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub initial_capital: f64,
    pub ending_capital: f64,
    pub total_return: f64,
    pub buy_hold_return: f64,
    pub alpha: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
}

impl Metrics {
    pub fn compute(
        initial_capital: f64,
        ending_capital: f64,
        closes: &[f64],
        equity_curve: &[f64],
        trades: &[Trade],
    ) -> Self {
        let total_return = if initial_capital > 0.0 {
            ending_capital / initial_capital - 1.0
        } else {
            0.0
        };

        let buy_hold_return = match (closes.first(), closes.last()) {
            (Some(first), Some(last)) if closes.len() >= 2 && *first > 0.0 => last / first - 1.0,
            _ => 0.0,
        };

        let win_rate = if trades.is_empty() {
            0.0
        } else {
            trades.iter().filter(|t| t.pnl > 0.0).count() as f64 / trades.len() as f64
        };

        Metrics {
            initial_capital,
            ending_capital,
            total_return,
            buy_hold_return,
            alpha: total_return - buy_hold_return,
            win_rate,
            max_drawdown: compute_max_drawdown(equity_curve),
            total_trades: trades.len(),
        }
    }

    /// Name/value pairs in reporting order.
    pub fn as_pairs(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("initial_capital", self.initial_capital),
            ("ending_capital", self.ending_capital),
            ("total_return", self.total_return),
            ("buy_hold_return", self.buy_hold_return),
            ("alpha", self.alpha),
            ("win_rate", self.win_rate),
            ("max_drawdown", self.max_drawdown),
            ("total_trades", self.total_trades as f64),
        ]
    }
}

/// Most negative `equity / running_peak - 1`; zero for a curve that never
/// dips below its peak.
pub fn compute_max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = equity / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}
