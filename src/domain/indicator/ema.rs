//! Exponential Moving Average.
//!
//! k = 2/(span+1), EMA[0] = X[0], EMA[i] = X[i]*k + EMA[i-1]*(1-k).
//! No bias adjustment and no warmup: the first value seeds the series.

pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return Vec::new();
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);

    for &x in &values[1..] {
        ema = x * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}
