//! Open leveraged position and closed trade records.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub entry_capital: f64,
    pub entry_votes: u8,
}

impl Position {
    /// Leveraged percentage move since entry, as a fraction.
    pub fn leveraged_return(&self, price: f64, leverage: f64) -> f64 {
        leverage * (price / self.entry_price - 1.0)
    }

    /// Mark-to-market equity, floored at zero.
    pub fn marked_equity(&self, price: f64, leverage: f64) -> f64 {
        (self.entry_capital * (1.0 + self.leveraged_return(price, leverage))).max(0.0)
    }

    pub fn close(
        self,
        exit_time: NaiveDateTime,
        exit_price: f64,
        leverage: f64,
        reason: ExitReason,
    ) -> Trade {
        let equity = self.marked_equity(exit_price, leverage);
        let pnl = equity - self.entry_capital;
        Trade {
            entry_time: self.entry_time,
            exit_time,
            entry_price: self.entry_price,
            exit_price,
            entry_votes: self.entry_votes,
            exit_reason: reason,
            pnl,
            return_pct: pnl / self.entry_capital * 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    #[serde(rename = "Regime flipped to Bear/Crash")]
    RegimeFlip,
    #[serde(rename = "End of backtest")]
    EndOfBacktest,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::RegimeFlip => write!(f, "Regime flipped to Bear/Crash"),
            ExitReason::EndOfBacktest => write!(f, "End of backtest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_votes: u8,
    pub exit_reason: ExitReason,
    pub pnl: f64,
    pub return_pct: f64,
}
