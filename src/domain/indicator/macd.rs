//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(close, fast) - EMA(close, slow)
//! Signal Line = EMA(MACD Line, signal)
//!
//! Both EMAs seed on the first value, so the lines are defined from bar 0.

use super::ema::calculate_ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdLines {
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal = calculate_ema(&line, signal);

    MacdLines { line, signal }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_flat_prices_are_zero() {
        let lines = calculate_macd(&[50.0; 40], DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        assert_eq!(lines.line.len(), 40);
        assert!(lines.line.iter().all(|v| v.abs() < 1e-12));
        assert!(lines.signal.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn macd_rising_prices_line_above_signal() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let lines = calculate_macd(&closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        assert!(lines.line[59] > 0.0);
        assert!(lines.line[59] > lines.signal[59]);
    }

    #[test]
    fn macd_line_is_ema_difference() {
        let closes = [10.0, 12.0, 11.0, 15.0, 14.0];
        let lines = calculate_macd(&closes, 2, 4, 3);
        let fast = calculate_ema(&closes, 2);
        let slow = calculate_ema(&closes, 4);
        for i in 0..closes.len() {
            assert!((lines.line[i] - (fast[i] - slow[i])).abs() < 1e-12);
        }
        assert!((lines.signal[0] - lines.line[0]).abs() < 1e-12);
    }

    #[test]
    fn macd_empty_input() {
        let lines = calculate_macd(&[], DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        assert!(lines.line.is_empty());
        assert!(lines.signal.is_empty());
    }
}
