#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use tradeguard::prelude::*;

pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap() + Duration::days(n)
}

//bar with a 1% band around open and close
pub fn make_bar(symbol: &str, timestamp: DateTime<Utc>, open: f64, close: f64) -> Bar {
    let high = open.max(close) * 1.01;
    let low = open.min(close) * 0.99;
    Bar::new(timestamp, open, high, low, close, 1_000.0, symbol.to_string()).unwrap()
}

//one bar per day with open equal to close
pub fn daily_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(symbol, day(i as i64), c, c))
        .collect()
}

//strategy that replays fixed signals keyed by symbol and bar timestamp
pub struct ScriptedStrategy {
    signals: HashMap<(String, DateTime<Utc>), Signal>,
    budget: Option<f64>,
    pub submitted: Vec<(String, DateTime<Utc>)>,
}

impl ScriptedStrategy {
    pub fn new() -> Self {
        ScriptedStrategy {
            signals: HashMap::new(),
            budget: None,
            submitted: Vec::new(),
        }
    }

    pub fn at(mut self, symbol: &str, timestamp: DateTime<Utc>, signal: Signal) -> Self {
        self.signals.insert((symbol.to_string(), timestamp), signal);
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn warmup(&self) -> usize {
        1
    }

    fn on_bar(&mut self, history: &SymbolHistory) -> Signal {
        let Some(timestamp) = history.current_time() else {
            return Signal::Hold;
        };
        self.signals
            .get(&(history.symbol.clone(), timestamp))
            .copied()
            .unwrap_or(Signal::Hold)
    }

    fn entry_budget(&self, _symbol: &str) -> Option<f64> {
        self.budget
    }

    fn on_entry_submitted(&mut self, symbol: &str, timestamp: DateTime<Utc>) {
        self.submitted.push((symbol.to_string(), timestamp));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    pub id: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub size: u64,
}

//broker that accepts every order and never fills on its own, cancels are recorded
//tests drive fills through the decision loop callbacks
pub struct MockBroker {
    pub cash: f64,
    pub portfolio_value: f64,
    pub positions: HashMap<String, i64>,
    pub orders: Vec<SubmittedOrder>,
    pub cancelled: Vec<u64>,
    next_id: u64,
}

impl MockBroker {
    pub fn new(cash: f64) -> Self {
        MockBroker {
            cash,
            portfolio_value: cash,
            positions: HashMap::new(),
            orders: Vec::new(),
            cancelled: Vec::new(),
            next_id: 1,
        }
    }

    pub fn set_position(&mut self, symbol: &str, qty: i64) {
        self.positions.insert(symbol.to_string(), qty);
    }

    pub fn last_order(&self) -> &SubmittedOrder {
        self.orders.last().expect("no order submitted")
    }

    //fill of the latest order at a price, without touching positions
    pub fn fill_last(&self, timestamp: DateTime<Utc>, price: f64, position_after: i64) -> Fill {
        let order = self.last_order();
        Fill {
            id: order.id,
            order_id: order.id,
            timestamp,
            symbol: order.symbol.clone(),
            size: order.size,
            side: order.side,
            price,
            commission: 0.0,
            position_after,
        }
    }

    fn submit(&mut self, symbol: &str, side: OrderSide, size: u64) -> OrderTicket {
        let id = self.next_id;
        self.next_id += 1;
        self.orders.push(SubmittedOrder {
            id,
            symbol: symbol.to_string(),
            side,
            size,
        });
        OrderTicket::Accepted(id)
    }
}

impl Broker for MockBroker {
    fn cash(&self) -> f64 {
        self.cash
    }

    fn portfolio_value(&self) -> f64 {
        self.portfolio_value
    }

    fn position_size(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    fn submit_buy(
        &mut self,
        _timestamp: DateTime<Utc>,
        symbol: &str,
        size: u64,
    ) -> Result<OrderTicket, BrokerError> {
        Ok(self.submit(symbol, OrderSide::Buy, size))
    }

    fn submit_sell(
        &mut self,
        _timestamp: DateTime<Utc>,
        symbol: &str,
        size: u64,
    ) -> Result<OrderTicket, BrokerError> {
        Ok(self.submit(symbol, OrderSide::Sell, size))
    }

    fn cancel_order(&mut self, order_id: u64) -> bool {
        let known = self.orders.iter().any(|o| o.id == order_id);
        if !known || self.cancelled.contains(&order_id) {
            return false;
        }
        self.cancelled.push(order_id);
        true
    }
}

pub fn risk_manager(max_position_size: f64) -> RiskManager {
    RiskManager::new(RiskConfig {
        max_position_size,
        ..RiskConfig::default()
    })
    .unwrap()
}

pub fn engine_config(initial_balance: f64, max_position_size: f64) -> BacktestConfig {
    BacktestConfig {
        initial_balance,
        commission_rate: 0.0,
        slippage_pct: 0.0,
        risk: RiskConfig {
            max_position_size,
            ..RiskConfig::default()
        },
        ..BacktestConfig::default()
    }
}
