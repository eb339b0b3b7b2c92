//! Memoized backtest results keyed by parameters and a data fingerprint.
//!
//! A result is reused only for the exact same parameters and bar series.
//! Invalidation drops every entry at once.

use std::collections::HashMap;
use std::sync::Arc;

use super::backtest::{run_backtest, BacktestConfig, BacktestResult};
use super::error::RegimeTraderError;
use super::ohlcv::Bar;

/// BLAKE3 over every bar's timestamp and OHLCV values, hex encoded.
pub fn data_fingerprint(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp_micros().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Floats are keyed by their bit patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    initial_capital: u64,
    leverage: u64,
    min_entry_votes: u8,
    cooldown_hours: i64,
    n_components: usize,
    random_state: u64,
    n_iter: usize,
    tol: u64,
    min_covar: u64,
    data_fingerprint: String,
}

impl CacheKey {
    pub fn new(config: &BacktestConfig, data_fingerprint: String) -> Self {
        let sim = &config.simulation;
        let regime = &config.regime;
        CacheKey {
            initial_capital: sim.initial_capital.to_bits(),
            leverage: sim.leverage.to_bits(),
            min_entry_votes: sim.min_entry_votes,
            cooldown_hours: sim.cooldown_hours,
            n_components: regime.n_components,
            random_state: regime.random_state,
            n_iter: regime.n_iter,
            tol: regime.tol.to_bits(),
            min_covar: regime.min_covar.to_bits(),
            data_fingerprint,
        }
    }

    pub fn data_fingerprint(&self) -> &str {
        &self.data_fingerprint
    }
}

#[derive(Debug, Default)]
pub struct BacktestCache {
    entries: HashMap<CacheKey, Arc<BacktestResult>>,
}

impl BacktestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<BacktestResult>> {
        self.entries.get(key).cloned()
    }

    /// Return the cached result for these inputs, running the backtest on a
    /// miss. Errors are returned and nothing is stored.
    pub fn get_or_run(
        &mut self,
        bars: &[Bar],
        config: &BacktestConfig,
    ) -> Result<Arc<BacktestResult>, RegimeTraderError> {
        let key = CacheKey::new(config, data_fingerprint(bars));
        if let Some(hit) = self.get(&key) {
            tracing::debug!("backtest cache hit for {}", &key.data_fingerprint()[..12]);
            return Ok(hit);
        }

        let result = Arc::new(run_backtest(bars, config)?);
        self.entries.insert(key, Arc::clone(&result));
        Ok(result)
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
