//! ADX (Average Directional Index).
//!
//! +DM = high diff, kept only when it exceeds -DM and is positive.
//! -DM = negative low diff, kept only when it exceeds the filtered +DM and is
//! positive. The first bar has no diff and contributes zero to both.
//! +DI/-DI = 100 * mean(DM, n) / mean(TR, n); DX = 100*|+DI - -DI|/(+DI + -DI);
//! ADX = mean(DX, n). Zero denominators and non-finite ratios are undefined.

use super::series::{rolling_mean, safe_div};
use crate::domain::ohlcv::Bar;

pub fn calculate_adx(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let n = bars.len();
    let mut plus_dm = Vec::with_capacity(n);
    let mut minus_dm = Vec::with_capacity(n);
    let mut tr = Vec::with_capacity(n);

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            plus_dm.push(Some(0.0));
            minus_dm.push(Some(0.0));
            tr.push(Some(bar.true_range(None)));
            continue;
        }
        let prev = &bars[i - 1];
        let up = bar.high - prev.high;
        let down = prev.low - bar.low;

        let plus = if up > down && up > 0.0 { up } else { 0.0 };
        let minus = if down > plus && down > 0.0 { down } else { 0.0 };

        plus_dm.push(Some(plus));
        minus_dm.push(Some(minus));
        tr.push(Some(bar.true_range(Some(prev.close))));
    }

    let atr = rolling_mean(&tr, period);
    let plus_mean = rolling_mean(&plus_dm, period);
    let minus_mean = rolling_mean(&minus_dm, period);

    let dx: Vec<Option<f64>> = (0..n)
        .map(|i| {
            let atr = atr[i]?;
            let plus_di = 100.0 * safe_div(plus_mean[i]?, atr)?;
            let minus_di = 100.0 * safe_div(minus_mean[i]?, atr)?;
            safe_div(100.0 * (plus_di - minus_di).abs(), plus_di + minus_di)
        })
        .collect();

    rolling_mean(&dx, period)
}
