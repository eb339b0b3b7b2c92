//! Technical indicator engine.
//!
//! [`compute_indicators`] maps a bar series onto an [`IndicatorRow`] series of
//! identical length and order. Every value depends only on bars at or before
//! its own timestamp. Values inside a rolling warmup, or produced by a zero
//! denominator, are `None`.

pub mod adx;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod series;

use serde::Serialize;

use crate::domain::ohlcv::Bar;
use adx::calculate_adx;
use ema::calculate_ema;
use macd::{calculate_macd, DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use rsi::calculate_rsi;
use series::{pct_change, rolling_std, safe_div};

pub const VOLUME_VOLATILITY_WINDOW: usize = 24;
pub const RSI_PERIOD: usize = 14;
pub const MOMENTUM_LAG: usize = 12;
pub const VOLATILITY_WINDOW: usize = 24;
pub const ADX_PERIOD: usize = 14;
pub const EMA_FAST_SPAN: usize = 50;
pub const EMA_SLOW_SPAN: usize = 200;

/// A bar extended with derived fields, any of which may be undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub bar: Bar,
    pub returns: Option<f64>,
    pub range: Option<f64>,
    pub volume_volatility: Option<f64>,
    pub rsi: Option<f64>,
    pub momentum: Option<f64>,
    pub volatility: Option<f64>,
    pub adx: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
}

/// The fully defined indicator set of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indicators {
    pub returns: f64,
    pub range: f64,
    pub volume_volatility: f64,
    pub rsi: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub adx: f64,
    pub ema50: f64,
    pub ema200: f64,
    pub macd: f64,
    pub macd_signal: f64,
}

impl IndicatorRow {
    /// The regime model's feature vector: returns, range, volume volatility.
    pub fn features(&self) -> Option<[f64; 3]> {
        Some([self.returns?, self.range?, self.volume_volatility?])
    }

    /// All indicators, or `None` if any of them is undefined.
    pub fn complete(&self) -> Option<Indicators> {
        Some(Indicators {
            returns: self.returns?,
            range: self.range?,
            volume_volatility: self.volume_volatility?,
            rsi: self.rsi?,
            momentum: self.momentum?,
            volatility: self.volatility?,
            adx: self.adx?,
            ema50: self.ema50?,
            ema200: self.ema200?,
            macd: self.macd?,
            macd_signal: self.macd_signal?,
        })
    }
}

pub fn compute_indicators(bars: &[Bar]) -> Vec<IndicatorRow> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let returns = pct_change(&closes, 1);
    let volume_volatility = rolling_std(&pct_change(&volumes, 1), VOLUME_VOLATILITY_WINDOW);
    let rsi = calculate_rsi(&closes, RSI_PERIOD);
    let momentum = pct_change(&closes, MOMENTUM_LAG);
    let volatility: Vec<Option<f64>> = rolling_std(&returns, VOLATILITY_WINDOW)
        .into_iter()
        .map(|v| v.map(|s| s * 100.0))
        .collect();
    let adx = calculate_adx(bars, ADX_PERIOD);
    let ema50 = calculate_ema(&closes, EMA_FAST_SPAN);
    let ema200 = calculate_ema(&closes, EMA_SLOW_SPAN);
    let macd = calculate_macd(&closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            bar: bar.clone(),
            returns: returns[i],
            range: safe_div(bar.high - bar.low, bar.close),
            volume_volatility: volume_volatility[i],
            rsi: rsi[i],
            momentum: momentum[i],
            volatility: volatility[i],
            adx: adx[i],
            ema50: ema50.get(i).copied(),
            ema200: ema200.get(i).copied(),
            macd: macd.line.get(i).copied(),
            macd_signal: macd.signal.get(i).copied(),
        })
        .collect()
}
