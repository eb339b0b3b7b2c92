//! RSI (Relative Strength Index) with simple rolling averages.
//!
//! gain = max(delta, 0), loss = max(-delta, 0), with the first bar's delta
//! counted as zero. RS = mean(gain, n) / mean(loss, n), RSI = 100 - 100/(1+RS).
//! Undefined when the average loss is zero.

use super::series::{rolling_mean, safe_div};

pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());

    for i in 0..closes.len() {
        let delta = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
        gains.push(Some(delta.max(0.0)));
        losses.push(Some((-delta).max(0.0)));
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(g, l)| {
            let rs = safe_div((*g)?, (*l)?)?;
            Some(100.0 - 100.0 / (1.0 + rs))
        })
        .collect()
}
