//! Report output port.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::RegimeTraderError;

/// Port for writing backtest results somewhere outside the process.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), RegimeTraderError>;
}
