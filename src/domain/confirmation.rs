//! Confirmation voter: eight binary checks on a single bar's indicators.
//!
//! Each check is worth one vote. Votes never depend on any other bar.

use serde::Serialize;

use crate::domain::indicator::Indicators;

pub const MAX_VOTES: u8 = 8;
pub const RSI_CEILING: f64 = 90.0;
pub const MOMENTUM_FLOOR: f64 = 0.01;
pub const VOLATILITY_CEILING: f64 = 6.0;
pub const ADX_FLOOR: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfirmationVote {
    pub rsi_not_overbought: bool,
    pub momentum_positive: bool,
    pub volatility_contained: bool,
    pub trend_strong: bool,
    pub above_ema50: bool,
    pub above_ema200: bool,
    pub ema50_above_ema200: bool,
    pub macd_above_signal: bool,
}

impl ConfirmationVote {
    pub fn evaluate(close: f64, ind: &Indicators) -> Self {
        ConfirmationVote {
            rsi_not_overbought: ind.rsi < RSI_CEILING,
            momentum_positive: ind.momentum > MOMENTUM_FLOOR,
            volatility_contained: ind.volatility < VOLATILITY_CEILING,
            trend_strong: ind.adx > ADX_FLOOR,
            above_ema50: close > ind.ema50,
            above_ema200: close > ind.ema200,
            ema50_above_ema200: ind.ema50 > ind.ema200,
            macd_above_signal: ind.macd > ind.macd_signal,
        }
    }

    pub fn checks(&self) -> [(&'static str, bool); 8] {
        [
            ("rsi < 90", self.rsi_not_overbought),
            ("momentum > 0.01", self.momentum_positive),
            ("volatility < 6", self.volatility_contained),
            ("adx > 25", self.trend_strong),
            ("close > ema50", self.above_ema50),
            ("close > ema200", self.above_ema200),
            ("ema50 > ema200", self.ema50_above_ema200),
            ("macd > signal", self.macd_above_signal),
        ]
    }

    pub fn count(&self) -> u8 {
        self.checks().iter().filter(|(_, passed)| *passed).count() as u8
    }
}
