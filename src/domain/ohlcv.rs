//! OHLCV bar representation and ingestion checks.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::error::RegimeTraderError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|).
    /// Without a previous close only high - low is available.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let hl = self.high - self.low;
        match prev_close {
            Some(prev) => {
                let hc = (self.high - prev).abs();
                let lc = (self.low - prev).abs();
                hl.max(hc).max(lc)
            }
            None => hl,
        }
    }
}

/// Reject a bar series that would corrupt downstream state: non-finite or
/// non-positive prices, negative volume, and timestamps that are not
/// strictly increasing.
pub fn validate_bars(bars: &[Bar]) -> Result<(), RegimeTraderError> {
    for (i, bar) in bars.iter().enumerate() {
        for (name, value) in [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(RegimeTraderError::InvalidInput {
                    reason: format!(
                        "bar {} ({}): {} must be a positive finite number, got {}",
                        i, bar.timestamp, name, value
                    ),
                });
            }
        }

        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(RegimeTraderError::InvalidInput {
                reason: format!(
                    "bar {} ({}): volume must be a non-negative finite number, got {}",
                    i, bar.timestamp, bar.volume
                ),
            });
        }

        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(RegimeTraderError::InvalidInput {
                reason: format!(
                    "timestamps must be strictly increasing: bar {} ({}) follows {}",
                    i,
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample_bar() -> Bar {
        Bar {
            timestamp: ts(0),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(Some(100.0)) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(Some(70.0)) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_without_previous_close() {
        let bar = sample_bar();
        assert!((bar.true_range(None) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_accepts_increasing_series() {
        let mut second = sample_bar();
        second.timestamp = ts(1);
        assert!(validate_bars(&[sample_bar(), second]).is_ok());
    }

    #[test]
    fn validate_accepts_empty_series() {
        assert!(validate_bars(&[]).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_timestamp() {
        let err = validate_bars(&[sample_bar(), sample_bar()]).unwrap_err();
        assert!(matches!(err, RegimeTraderError::InvalidInput { .. }));
    }

    #[test]
    fn validate_rejects_decreasing_timestamp() {
        let mut first = sample_bar();
        first.timestamp = ts(5);
        let err = validate_bars(&[first, sample_bar()]).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn validate_rejects_zero_close() {
        let mut bar = sample_bar();
        bar.close = 0.0;
        let err = validate_bars(&[bar]).unwrap_err();
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn validate_rejects_nan_high() {
        let mut bar = sample_bar();
        bar.high = f64::NAN;
        assert!(validate_bars(&[bar]).is_err());
    }

    #[test]
    fn validate_rejects_negative_volume() {
        let mut bar = sample_bar();
        bar.volume = -1.0;
        let err = validate_bars(&[bar]).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn validate_allows_zero_volume() {
        let mut bar = sample_bar();
        bar.volume = 0.0;
        assert!(validate_bars(&[bar]).is_ok());
    }
}
