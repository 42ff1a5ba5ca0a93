use crate::engine::execution::{Fill, OrderSide, TradeEvent};
use crate::portfolio::position::Holding;
use std::collections::HashMap;

//cash account holding equity positions
#[derive(Debug, Clone)]
pub struct Account {
    //current cash (sale proceeds in, purchases and commissions out)
    pub cash: f64,

    //current total equity (cash + market value of holdings)
    pub equity: f64,

    //holdings by symbol
    pub holdings: HashMap<String, Holding>,

    //complete fill log
    pub trade_log: Vec<Fill>,

    pub total_commission: f64,
}

impl Account {
    //creates a new account with initial balance
    pub fn new(initial_balance: f64) -> Self {
        Account {
            cash: initial_balance,
            equity: initial_balance,
            holdings: HashMap::new(),
            trade_log: Vec::new(),
            total_commission: 0.0,
        }
    }

    //processes a fill and updates the account
    //returns the round trip summary when the fill flattens or reverses a holding
    pub fn process_fill(&mut self, fill: Fill) -> Option<TradeEvent> {
        let notional = fill.notional_value();
        match fill.side {
            OrderSide::Buy => self.cash -= notional + fill.commission,
            OrderSide::Sell => self.cash += notional - fill.commission,
        }
        self.total_commission += fill.commission;

        let holding = self
            .holdings
            .entry(fill.symbol.clone())
            .or_insert_with(|| Holding::new(fill.symbol.clone()));

        let before = holding.net_qty;
        holding.trip_commission += fill.commission;
        holding.update_with_fill(fill.signed_qty(), fill.price);

        let closed = before != 0 && (holding.is_flat() || holding.net_qty.signum() != before.signum());
        let event = if closed {
            let event = TradeEvent {
                symbol: fill.symbol.clone(),
                timestamp: fill.timestamp,
                pnl: holding.trip_pnl,
                pnl_net: holding.trip_pnl - holding.trip_commission,
            };
            holding.trip_pnl = 0.0;
            holding.trip_commission = 0.0;
            Some(event)
        } else {
            None
        };

        //log the fill
        self.trade_log.push(fill);
        event
    }

    //updates total equity based on current market prices
    pub fn update_equity(&mut self, prices: &HashMap<String, f64>) {
        let market_value: f64 = self
            .holdings
            .iter()
            .filter_map(|(symbol, holding)| prices.get(symbol).map(|&p| holding.market_value(p)))
            .sum();

        self.equity = self.cash + market_value;
    }

    //signed share count, 0 when flat
    pub fn position_size(&self, symbol: &str) -> i64 {
        self.holdings.get(symbol).map(|h| h.net_qty).unwrap_or(0)
    }

    //gross exposure at the given prices
    pub fn position_value(&self, prices: &HashMap<String, f64>) -> f64 {
        self.holdings
            .iter()
            .filter_map(|(symbol, holding)| {
                prices.get(symbol).map(|&p| holding.market_value(p).abs())
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn fill(id: u64, side: OrderSide, size: u64, price: f64, commission: f64) -> Fill {
        Fill {
            id,
            order_id: id,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            symbol: "SPY".into(),
            size,
            side,
            price,
            commission,
            position_after: 0,
        }
    }

    #[test]
    fn round_trip_moves_cash_and_reports_event() {
        let mut account = Account::new(10_000.0);

        assert!(account.process_fill(fill(1, OrderSide::Buy, 10, 100.0, 1.0)).is_none());
        assert_relative_eq!(account.cash, 10_000.0 - 1_000.0 - 1.0);
        assert_eq!(account.position_size("SPY"), 10);

        let prices = HashMap::from([("SPY".to_string(), 105.0)]);
        account.update_equity(&prices);
        assert_relative_eq!(account.equity, 8_999.0 + 1_050.0);
        assert_relative_eq!(account.position_value(&prices), 1_050.0);

        let event = account
            .process_fill(fill(2, OrderSide::Sell, 10, 110.0, 1.1))
            .unwrap();
        assert_relative_eq!(event.pnl, 100.0);
        assert_relative_eq!(event.pnl_net, 100.0 - 2.1);
        assert_relative_eq!(account.cash, 10_000.0 + 100.0 - 2.1);
        assert_relative_eq!(account.total_commission, 2.1);
        assert_eq!(account.trade_log.len(), 2);
    }

    #[test]
    fn short_sale_credits_cash() {
        let mut account = Account::new(1_000.0);
        account.process_fill(fill(1, OrderSide::Sell, 5, 100.0, 0.0));
        assert_relative_eq!(account.cash, 1_500.0);

        let prices = HashMap::from([("SPY".to_string(), 90.0)]);
        account.update_equity(&prices);
        assert_relative_eq!(account.equity, 1_050.0);
        assert_relative_eq!(account.position_value(&prices), 450.0);
    }
}
