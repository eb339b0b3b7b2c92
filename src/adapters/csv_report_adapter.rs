//! CSV report adapter: `bars.csv`, `trades.csv` and `metrics.csv` in one directory.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::domain::backtest::{BacktestResult, ResultBar};
use crate::domain::error::RegimeTraderError;
use crate::ports::report_port::ReportPort;

pub const BARS_FILE: &str = "bars.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const METRICS_FILE: &str = "metrics.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct BarRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    returns: f64,
    range: f64,
    volume_volatility: f64,
    rsi: f64,
    momentum: f64,
    volatility: f64,
    adx: f64,
    ema50: f64,
    ema200: f64,
    macd: f64,
    macd_signal: f64,
    regime_state: usize,
    regime: String,
    votes: u8,
    equity: f64,
    signal: String,
}

impl From<&ResultBar> for BarRecord {
    fn from(rb: &ResultBar) -> Self {
        let ind = &rb.indicators;
        BarRecord {
            timestamp: rb.bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            open: rb.bar.open,
            high: rb.bar.high,
            low: rb.bar.low,
            close: rb.bar.close,
            volume: rb.bar.volume,
            returns: ind.returns,
            range: ind.range,
            volume_volatility: ind.volume_volatility,
            rsi: ind.rsi,
            momentum: ind.momentum,
            volatility: ind.volatility,
            adx: ind.adx,
            ema50: ind.ema50,
            ema200: ind.ema200,
            macd: ind.macd,
            macd_signal: ind.macd_signal,
            regime_state: rb.state_id,
            regime: rb.label.to_string(),
            votes: rb.votes,
            equity: rb.equity,
            signal: rb.signal.to_string(),
        }
    }
}

#[derive(Serialize)]
struct MetricRecord {
    metric: &'static str,
    value: f64,
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> RegimeTraderError {
    RegimeTraderError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

fn write_records<T: Serialize>(
    path: &Path,
    records: impl IntoIterator<Item = T>,
) -> Result<(), RegimeTraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    for record in records {
        wtr.serialize(record).map_err(|e| report_err(path, e))?;
    }
    wtr.flush().map_err(|e| report_err(path, e))?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), RegimeTraderError> {
        fs::create_dir_all(output_dir).map_err(|e| report_err(output_dir, e))?;

        write_records(
            &output_dir.join(BARS_FILE),
            result.bars.iter().map(BarRecord::from),
        )?;

        let trades_path = output_dir.join(TRADES_FILE);
        if result.trades.is_empty() {
            // serialize() writes headers lazily, so an empty log needs them by hand
            let mut wtr =
                csv::Writer::from_path(&trades_path).map_err(|e| report_err(&trades_path, e))?;
            wtr.write_record([
                "entry_time",
                "exit_time",
                "entry_price",
                "exit_price",
                "entry_votes",
                "exit_reason",
                "pnl",
                "return_pct",
            ])
            .map_err(|e| report_err(&trades_path, e))?;
            wtr.flush().map_err(|e| report_err(&trades_path, e))?;
        } else {
            write_records(&trades_path, result.trades.iter())?;
        }

        write_records(
            &output_dir.join(METRICS_FILE),
            result
                .metrics
                .as_pairs()
                .into_iter()
                .map(|(metric, value)| MetricRecord { metric, value }),
        )?;

        tracing::info!("wrote CSV reports to {}", output_dir.display());
        Ok(())
    }
}
