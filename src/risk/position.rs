use crate::engine::execution::OrderSide;
use serde::{Deserialize, Serialize};
use std::fmt;

//direction of an open position
//serialized as the side of the opening order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "buy")]
    Long,
    #[serde(rename = "sell")]
    Short,
}

impl Direction {
    //+1 for long, -1 for short
    pub fn sign(&self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    pub fn opening_side(&self) -> OrderSide {
        match self {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }

    pub fn closing_side(&self) -> OrderSide {
        match self {
            Direction::Long => OrderSide::Sell,
            Direction::Short => OrderSide::Buy,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("buy"),
            Direction::Short => f.write_str("sell"),
        }
    }
}

//exit thresholds for one open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPosition {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,

    //baseline percentages for this position
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,

    pub stop_loss_price: f64,
    pub take_profit_price: f64,

    //best price since entry: highest for longs, lowest for shorts
    pub watermark: f64,
}

impl TrackedPosition {
    pub fn open(
        symbol: String,
        direction: Direction,
        entry_price: f64,
        stop_loss_pct: f64,
        take_profit_pct: f64,
    ) -> Self {
        let mut position = TrackedPosition {
            symbol,
            direction,
            entry_price,
            stop_loss_pct,
            take_profit_pct,
            stop_loss_price: 0.0,
            take_profit_price: 0.0,
            watermark: entry_price,
        };
        position.set_stop_loss_pct(stop_loss_pct);
        position.set_take_profit_pct(take_profit_pct);
        position
    }

    pub fn set_stop_loss_pct(&mut self, pct: f64) {
        self.stop_loss_pct = pct;
        self.stop_loss_price = self.adverse_price(pct);
    }

    pub fn set_take_profit_pct(&mut self, pct: f64) {
        self.take_profit_pct = pct;
        self.take_profit_price = self.favorable_price(pct);
    }

    //price that is `pct` in the position's favour from entry
    pub fn favorable_price(&self, pct: f64) -> f64 {
        match self.direction {
            Direction::Long => self.entry_price * (1.0 + pct),
            Direction::Short => self.entry_price * (1.0 - pct),
        }
    }

    //price that is `pct` against the position from entry
    pub fn adverse_price(&self, pct: f64) -> f64 {
        match self.direction {
            Direction::Long => self.entry_price * (1.0 - pct),
            Direction::Short => self.entry_price * (1.0 + pct),
        }
    }

    //moves the watermark toward the favourable excursion only
    pub fn update_watermark(&mut self, price: f64) {
        self.watermark = match self.direction {
            Direction::Long => self.watermark.max(price),
            Direction::Short => self.watermark.min(price),
        };
    }

    pub fn trailing_stop_price(&self, trail_pct: f64) -> f64 {
        match self.direction {
            Direction::Long => self.watermark * (1.0 - trail_pct),
            Direction::Short => self.watermark * (1.0 + trail_pct),
        }
    }

    //true when price has crossed a stop level against the position
    pub fn crossed_stop(&self, stop: f64, price: f64) -> bool {
        match self.direction {
            Direction::Long => price <= stop,
            Direction::Short => price >= stop,
        }
    }

    //true when price has reached the take-profit target
    pub fn reached_target(&self, price: f64) -> bool {
        match self.direction {
            Direction::Long => price >= self.take_profit_price,
            Direction::Short => price <= self.take_profit_price,
        }
    }

    //true when stop `a` sits closer to the watermark than stop `b`
    pub fn is_tighter(&self, a: f64, b: f64) -> bool {
        match self.direction {
            Direction::Long => a > b,
            Direction::Short => a < b,
        }
    }

    pub fn highest_price_since_entry(&self) -> Option<f64> {
        match self.direction {
            Direction::Long => Some(self.watermark),
            Direction::Short => None,
        }
    }

    pub fn lowest_price_since_entry(&self) -> Option<f64> {
        match self.direction {
            Direction::Long => None,
            Direction::Short => Some(self.watermark),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn long_thresholds_from_entry() {
        let p = TrackedPosition::open("SPY".to_string(), Direction::Long, 100.0, 0.1, 0.2);
        assert_relative_eq!(p.stop_loss_price, 90.0, epsilon = 1e-9);
        assert_relative_eq!(p.take_profit_price, 120.0, epsilon = 1e-9);
        assert_eq!(p.highest_price_since_entry(), Some(100.0));
        assert_eq!(p.lowest_price_since_entry(), None);
    }

    #[test]
    fn short_thresholds_are_mirrored() {
        let p = TrackedPosition::open("SPY".to_string(), Direction::Short, 100.0, 0.1, 0.2);
        assert_relative_eq!(p.stop_loss_price, 110.0, epsilon = 1e-9);
        assert_relative_eq!(p.take_profit_price, 80.0, epsilon = 1e-9);
        assert!(p.crossed_stop(p.stop_loss_price, 111.0));
        assert!(p.reached_target(79.0));
    }

    #[test]
    fn watermark_only_moves_favourably() {
        let mut long = TrackedPosition::open("A".to_string(), Direction::Long, 50.0, 0.1, 0.2);
        long.update_watermark(55.0);
        long.update_watermark(52.0);
        assert_eq!(long.watermark, 55.0);

        let mut short = TrackedPosition::open("B".to_string(), Direction::Short, 50.0, 0.1, 0.2);
        short.update_watermark(45.0);
        short.update_watermark(48.0);
        assert_eq!(short.watermark, 45.0);
    }

    #[test]
    fn direction_sides() {
        assert_eq!(Direction::Long.opening_side(), OrderSide::Buy);
        assert_eq!(Direction::Short.closing_side(), OrderSide::Buy);
        assert_eq!(Direction::Short.to_string(), "sell");
        assert_eq!(serde_json::to_string(&Direction::Long).unwrap(), "\"buy\"");
    }
}
