#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regimetrader::domain::error::RegimeTraderError;
pub use regimetrader::domain::ohlcv::Bar;
use regimetrader::ports::data_port::DataPort;
use std::fmt::Write as _;
use std::process::ExitCode;

/// Rows of warmup before the regime features are defined.
pub const FEATURE_WARMUP: usize = 24;

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly bars that alternate between calm uptrends and volatile selloffs.
pub fn regime_bars(count: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut close = 20_000.0_f64;
    (0..count)
        .map(|i| {
            let bullish = (i / 90) % 3 != 2;
            let (drift, noise, spread) = if bullish {
                (0.002, 0.003, 0.004)
            } else {
                (-0.006, 0.012, 0.02)
            };
            let open = close;
            close = (close * (1.0 + drift + rng.gen_range(-noise..noise))).max(1.0);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..spread));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..spread));
            let volume = if bullish {
                rng.gen_range(800.0..1_200.0)
            } else {
                rng.gen_range(1_500.0..4_000.0)
            };
            Bar {
                timestamp: start_time() + Duration::hours(i as i64),
                open,
                high,
                low,
                close,
                volume,
            }
        })
        .collect()
}

/// Number of bars that yields exactly `rows` regime feature rows.
pub fn bars_for_feature_rows(rows: usize) -> usize {
    rows + FEATURE_WARMUP
}

pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        )
        .unwrap();
    }
    out
}

pub struct MockDataPort {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self) -> Result<Vec<Bar>, RegimeTraderError> {
        match &self.error {
            Some(reason) => Err(RegimeTraderError::Data {
                reason: reason.clone(),
            }),
            None => Ok(self.bars.clone()),
        }
    }
}

/// `ExitCode` has no `PartialEq`, so compare through `Debug`.
pub fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

pub fn exit_code_eq(code: ExitCode, expected: u8) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::from(expected))
}
