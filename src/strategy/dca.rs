use crate::config::DcaParams;
use crate::risk::Direction;
use crate::strategy::{Signal, Strategy, SymbolHistory};
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;

//fixed-amount contribution per symbol, signalled monthly
//the first bar of a symbol always signals, later months wait for invest_day
//positions never add, so only a flat symbol buys: one contribution per position,
//after which the holding rides until a risk exit frees the symbol again
#[derive(Debug, Clone)]
pub struct DcaStrategy {
    params: DcaParams,

    //(year, month) of the last accepted contribution
    last_invested: HashMap<String, (i32, u32)>,
}

impl DcaStrategy {
    pub fn new(params: DcaParams) -> Self {
        DcaStrategy {
            params,
            last_invested: HashMap::new(),
        }
    }

    fn is_invest_day(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        match self.last_invested.get(symbol) {
            None => true,
            Some(&(year, month)) => {
                let same_month = now.year() == year && now.month() == month;
                !same_month && now.day() >= self.params.invest_day
            }
        }
    }
}

impl Strategy for DcaStrategy {
    fn name(&self) -> &str {
        "DCA"
    }

    fn warmup(&self) -> usize {
        1
    }

    fn on_bar(&mut self, history: &SymbolHistory) -> Signal {
        match history.current_time() {
            Some(now) if self.is_invest_day(&history.symbol, now) => {
                Signal::Enter(Direction::Long)
            }
            _ => Signal::Hold,
        }
    }

    fn entry_budget(&self, _symbol: &str) -> Option<f64> {
        Some(self.params.invest_amount)
    }

    fn on_entry_submitted(&mut self, symbol: &str, timestamp: DateTime<Utc>) {
        self.last_invested
            .insert(symbol.to_string(), (timestamp.year(), timestamp.month()));
    }
}
