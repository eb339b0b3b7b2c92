//! Bar source port.

use chrono::NaiveDateTime;

use crate::domain::error::RegimeTraderError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// The full bar series, oldest first, duplicates already resolved.
    fn fetch_bars(&self) -> Result<Vec<Bar>, RegimeTraderError>;

    /// First timestamp, last timestamp and bar count, or `None` when empty.
    fn data_range(
        &self,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, RegimeTraderError> {
        let bars = self.fetch_bars()?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }
}
