use crate::risk::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//reason a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitType {
    StopLoss,
    TakeProfit,
    Signal,
}

impl ExitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitType::StopLoss => "stop_loss",
            ExitType::TakeProfit => "take_profit",
            ExitType::Signal => "signal",
        }
    }
}

impl fmt::Display for ExitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//a trade that has been entered but not yet exited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub symbol: String,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub size: u64,
    pub direction: Direction,

    //entry commission so far, exit commission is added on close
    pub commission: f64,

    //best trade value seen while open, used for the intra-trade drawdown
    pub peak_value: f64,
    pub max_drawdown_pct: f64,
}

impl OpenTrade {
    pub fn new(
        symbol: String,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        size: u64,
        direction: Direction,
        commission: f64,
    ) -> Self {
        OpenTrade {
            symbol,
            entry_time,
            entry_price,
            size,
            direction,
            commission,
            peak_value: entry_price * size as f64,
            max_drawdown_pct: 0.0,
        }
    }

    //value of the trade at a price: notional for longs, entry notional plus
    //the open gain for shorts
    pub fn value_at(&self, price: f64) -> f64 {
        let size = self.size as f64;
        match self.direction {
            Direction::Long => price * size,
            Direction::Short => (2.0 * self.entry_price - price) * size,
        }
    }

    //updates the peak value and the worst drawdown from it
    pub fn mark(&mut self, price: f64) {
        let value = self.value_at(price);
        if value > self.peak_value {
            self.peak_value = value;
        }

        if self.peak_value > 0.0 {
            let drawdown = (self.peak_value - value) / self.peak_value * 100.0;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }

    //gross pnl at an exit price, before commission
    pub fn gross_pnl(&self, exit_price: f64) -> f64 {
        let size = self.size as f64;
        match self.direction {
            Direction::Long => (exit_price - self.entry_price) * size,
            Direction::Short => (self.entry_price - exit_price) * size,
        }
    }
}

//a completed round trip, never mutated after it is logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub size: u64,
    pub direction: Direction,
    pub commission: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_type: ExitType,
    pub pnl: f64,
    pub holding_days: i64,
    pub max_drawdown_pct: f64,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn open(direction: Direction) -> OpenTrade {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        OpenTrade::new("QQQ".to_string(), t, 100.0, 10, direction, 1.0)
    }

    #[test]
    fn gross_pnl_flips_for_shorts() {
        assert_eq!(open(Direction::Long).gross_pnl(110.0), 100.0);
        assert_eq!(open(Direction::Short).gross_pnl(110.0), -100.0);
    }

    #[test]
    fn mark_tracks_drawdown_from_peak() {
        let mut trade = open(Direction::Long);
        trade.mark(120.0);
        trade.mark(90.0);
        trade.mark(110.0);

        assert_eq!(trade.peak_value, 1200.0);
        assert!((trade.max_drawdown_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn short_value_rises_as_price_falls() {
        let trade = open(Direction::Short);
        assert_eq!(trade.value_at(90.0), 1100.0);
    }

    #[test]
    fn exit_type_serializes_snake_case() {
        let json = serde_json::to_string(&ExitType::TakeProfit).unwrap();
        assert_eq!(json, "\"take_profit\"");
        assert_eq!(ExitType::StopLoss.to_string(), "stop_loss");
    }
}
