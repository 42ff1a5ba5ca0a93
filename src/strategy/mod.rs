pub mod dca;
pub mod dual_thrust;
pub mod indicators;
pub mod macd_rsi;
pub mod sma_crossover;

use crate::config::StrategyParams;
use crate::data::Bar;
use crate::risk::Direction;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

pub use dca::DcaStrategy;
pub use dual_thrust::DualThrustStrategy;
pub use macd_rsi::MacdRsiStrategy;
pub use sma_crossover::SmaCrossoverStrategy;

//what a strategy wants for one symbol on the current bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Hold,
    Enter(Direction),
    Exit,
}

//strategy interface that all strategies must implement
//the decision loop owns position state, strategies only read history
pub trait Strategy: Send {
    //returns the strategy name
    fn name(&self) -> &str;

    //bars of history needed before signals are produced
    fn warmup(&self) -> usize;

    //called on each new bar with the symbol's history, current bar last
    fn on_bar(&mut self, history: &SymbolHistory) -> Signal;

    //optional notional cap for a new entry
    fn entry_budget(&self, _symbol: &str) -> Option<f64> {
        None
    }

    //called after an entry order for the symbol was accepted
    fn on_entry_submitted(&mut self, _symbol: &str, _timestamp: DateTime<Utc>) {}
}

//bar history of one symbol (ring buffer with limited lookback)
#[derive(Debug, Clone)]
pub struct SymbolHistory {
    pub symbol: String,
    bar_history: VecDeque<Bar>,
    max_history: usize,
}

impl SymbolHistory {
    pub fn new(symbol: String, max_history: usize) -> Self {
        let max_history = max_history.max(1);
        SymbolHistory {
            symbol,
            bar_history: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    //adds a bar to the history
    pub fn push_bar(&mut self, bar: Bar) {
        if self.bar_history.len() >= self.max_history {
            self.bar_history.pop_front();
        }
        self.bar_history.push_back(bar);
    }

    //returns the last n bars (oldest first)
    pub fn get_bars(&self, n: usize) -> Vec<&Bar> {
        let start = self.bar_history.len().saturating_sub(n);
        self.bar_history.range(start..).collect()
    }

    //returns the most recent bar
    pub fn last_bar(&self) -> Option<&Bar> {
        self.bar_history.back()
    }

    //returns the close prices for the last n bars
    pub fn closes(&self, n: usize) -> Vec<f64> {
        self.get_bars(n).iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self, n: usize) -> Vec<f64> {
        self.get_bars(n).iter().map(|b| b.volume).collect()
    }

    //returns the number of bars in history
    pub fn bar_count(&self) -> usize {
        self.bar_history.len()
    }

    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.last_bar().map(|b| b.timestamp)
    }
}

//builds the configured strategy
pub fn build_strategy(params: &StrategyParams) -> Box<dyn Strategy> {
    match params {
        StrategyParams::SmaCrossover(p) => Box::new(SmaCrossoverStrategy::new(p.clone())),
        StrategyParams::MacdRsi(p) => Box::new(MacdRsiStrategy::new(p.clone())),
        StrategyParams::DualThrust(p) => Box::new(DualThrustStrategy::new(p.clone())),
        StrategyParams::Dca(p) => Box::new(DcaStrategy::new(p.clone())),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SymbolHistory;
    use crate::data::Bar;
    use chrono::{Duration, TimeZone, Utc};

    //history of daily bars with open = close and a 1% range
    pub fn history_from_closes(closes: &[f64]) -> SymbolHistory {
        let mut history = SymbolHistory::new("SPY".to_string(), 500);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, &c) in closes.iter().enumerate() {
            let ts = start + Duration::days(i as i64);
            history.push_bar(Bar::new(ts, c, c * 1.01, c * 0.99, c, 1_000.0, "SPY".into()).unwrap());
        }
        history
    }
}
