//! Trade simulator: a Flat/Long state machine stepped once per bar.
//!
//! Per bar: vote, mark the open position, exit on a Bear regime (starting the
//! cooldown), enter on a Bull regime with enough votes, record equity. Any
//! position still open after the last bar is closed at its close.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use crate::domain::confirmation::ConfirmationVote;
use crate::domain::indicator::Indicators;
use crate::domain::ohlcv::Bar;
use crate::domain::position::{ExitReason, Position, Trade};
use crate::domain::regime::RegimeLabel;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    pub leverage: f64,
    pub min_entry_votes: u8,
    pub cooldown_hours: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 10_000.0,
            leverage: 2.5,
            min_entry_votes: 7,
            cooldown_hours: 48,
        }
    }
}

/// A bar with complete indicators and its regime.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledBar {
    pub bar: Bar,
    pub indicators: Indicators,
    pub state_id: usize,
    pub label: RegimeLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    Long,
    Cash,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "Long"),
            Signal::Cash => write!(f, "Cash"),
        }
    }
}

/// What the simulator recorded for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarOutcome {
    pub vote: ConfirmationVote,
    pub equity: f64,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub outcomes: Vec<BarOutcome>,
    pub trades: Vec<Trade>,
    pub ending_capital: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum PositionState {
    Flat,
    Long(Position),
}

/// Mutable context threaded through [`Simulator::step`].
#[derive(Debug)]
pub struct Simulator<'a> {
    config: &'a SimulationConfig,
    state: PositionState,
    capital: f64,
    cooldown_until: Option<NaiveDateTime>,
    last_bar: Option<(NaiveDateTime, f64)>,
    trades: Vec<Trade>,
}

impl<'a> Simulator<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Simulator {
            config,
            state: PositionState::Flat,
            capital: config.initial_capital,
            cooldown_until: None,
            last_bar: None,
            trades: Vec::new(),
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self.state, PositionState::Long(_))
    }

    fn in_cooldown(&self, ts: NaiveDateTime) -> bool {
        self.cooldown_until.is_some_and(|until| ts < until)
    }

    pub fn step(&mut self, labeled: &LabeledBar) -> BarOutcome {
        let ts = labeled.bar.timestamp;
        let close = labeled.bar.close;
        let leverage = self.config.leverage;
        let vote = ConfirmationVote::evaluate(close, &labeled.indicators);
        let votes = vote.count();
        self.last_bar = Some((ts, close));

        let marked = match &self.state {
            PositionState::Long(pos) => pos.marked_equity(close, leverage),
            PositionState::Flat => self.capital,
        };

        if labeled.label == RegimeLabel::Bear {
            if let PositionState::Long(pos) =
                std::mem::replace(&mut self.state, PositionState::Flat)
            {
                let trade = pos.close(ts, close, leverage, ExitReason::RegimeFlip);
                tracing::debug!("exit at {} on {} (pnl {:.2})", ts, close, trade.pnl);
                self.capital = marked;
                self.cooldown_until = Some(cooldown_end(ts, self.config.cooldown_hours));
                self.trades.push(trade);
            }
        }

        let can_enter = !self.is_long() && !self.in_cooldown(ts);
        if can_enter && labeled.label == RegimeLabel::Bull && votes >= self.config.min_entry_votes {
            tracing::debug!("entry at {} on {} with {} votes", ts, close, votes);
            self.state = PositionState::Long(Position {
                entry_price: close,
                entry_time: ts,
                entry_capital: self.capital,
                entry_votes: votes,
            });
        }

        let (equity, signal) = match &self.state {
            PositionState::Long(_) => (marked, Signal::Long),
            PositionState::Flat => (self.capital, Signal::Cash),
        };
        BarOutcome {
            vote,
            equity,
            signal,
        }
    }

    /// Force-close any open position at the last seen close.
    pub fn finish(mut self) -> (Vec<Trade>, f64) {
        if let (PositionState::Long(pos), Some((ts, close))) = (
            std::mem::replace(&mut self.state, PositionState::Flat),
            self.last_bar,
        ) {
            let equity = pos.marked_equity(close, self.config.leverage);
            let trade = pos.close(ts, close, self.config.leverage, ExitReason::EndOfBacktest);
            tracing::debug!("closing open position at end of data (pnl {:.2})", trade.pnl);
            self.capital = equity;
            self.trades.push(trade);
        }
        (self.trades, self.capital)
    }
}

/// End of the re-entry block after an exit at `ts`. A cooldown that runs past
/// the representable range blocks re-entry for the rest of the series.
fn cooldown_end(ts: NaiveDateTime, hours: i64) -> NaiveDateTime {
    Duration::try_hours(hours)
        .and_then(|d| ts.checked_add_signed(d))
        .unwrap_or(NaiveDateTime::MAX)
}

pub fn simulate(bars: &[LabeledBar], config: &SimulationConfig) -> Simulation {
    let mut sim = Simulator::new(config);
    let outcomes = bars.iter().map(|b| sim.step(b)).collect();
    let (trades, ending_capital) = sim.finish();
    Simulation {
        outcomes,
        trades,
        ending_capital,
    }
}
