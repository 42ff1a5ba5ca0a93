use crate::data::Bar;
use crate::portfolio::Account;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

//order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    //converts to quantity sign (Buy = +1, Sell = -1)
    pub fn to_qty_sign(&self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

//market order waiting for the next bar of its symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub size: u64,
    pub side: OrderSide,
}

impl Order {
    pub fn market(
        id: u64,
        timestamp: DateTime<Utc>,
        symbol: String,
        size: u64,
        side: OrderSide,
    ) -> Self {
        Order {
            id,
            timestamp,
            symbol,
            size,
            side,
        }
    }

    //returns the signed quantity (positive for buy, negative for sell)
    pub fn signed_qty(&self) -> i64 {
        self.size as i64 * self.side.to_qty_sign()
    }
}

//represents a filled order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub id: u64,
    pub order_id: u64,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub size: u64,
    pub side: OrderSide,

    //execution price including slippage
    pub price: f64,
    pub commission: f64,

    //signed holding once this fill is applied
    pub position_after: i64,
}

impl Fill {
    pub fn signed_qty(&self) -> i64 {
        self.size as i64 * self.side.to_qty_sign()
    }

    //returns the notional value of the fill
    pub fn notional_value(&self) -> f64 {
        self.price * self.size as f64
    }
}

//why the broker refused an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    ZeroSize,
    InsufficientCash { required: f64, available: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ZeroSize => f.write_str("zero size"),
            RejectReason::InsufficientCash {
                required,
                available,
            } => write!(f, "insufficient cash: need {:.2}, have {:.2}", required, available),
        }
    }
}

//round trip completed by a fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,

    //gross and after-commission pnl
    pub pnl: f64,
    pub pnl_net: f64,
}

//notifications delivered back to the decision loop
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    Filled(Fill),
    Rejected {
        order_id: u64,
        symbol: String,
        reason: RejectReason,
    },
    TradeClosed(TradeEvent),
}

//outcome of an order submission
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTicket {
    Accepted(u64),
    Rejected(RejectReason),
}

//failures outside the modeled rejection set, these halt a run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    #[error("no market data seen for {0}")]
    UnknownSymbol(String),
    #[error("invalid fill price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },
}

//primitives the decision loop needs from a broker
pub trait Broker {
    fn cash(&self) -> f64;

    fn portfolio_value(&self) -> f64;

    //signed share count, 0 when flat
    fn position_size(&self, symbol: &str) -> i64;

    fn submit_buy(
        &mut self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        size: u64,
    ) -> Result<OrderTicket, BrokerError>;

    fn submit_sell(
        &mut self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        size: u64,
    ) -> Result<OrderTicket, BrokerError>;

    //withdraws an order that has not filled yet, false when it is unknown
    fn cancel_order(&mut self, order_id: u64) -> bool;
}

//simulates order execution against bars
//market orders fill at the open of the next bar of their symbol
pub struct SimulatedBroker {
    account: Account,
    commission_rate: f64,
    slippage_pct: f64,
    next_order_id: u64,
    next_fill_id: u64,
    pending_orders: Vec<Order>,
    last_prices: HashMap<String, f64>,
}

impl SimulatedBroker {
    pub fn new(initial_cash: f64, commission_rate: f64, slippage_pct: f64) -> Self {
        SimulatedBroker {
            account: Account::new(initial_cash),
            commission_rate,
            slippage_pct,
            next_order_id: 1,
            next_fill_id: 1,
            pending_orders: Vec::new(),
            last_prices: HashMap::new(),
        }
    }

    pub fn fills(&self) -> &[Fill] {
        &self.account.trade_log
    }

    //commission charged across all fills
    pub fn total_commission(&self) -> f64 {
        self.account.total_commission
    }

    fn submit(
        &mut self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        size: u64,
        side: OrderSide,
    ) -> Result<OrderTicket, BrokerError> {
        if !self.last_prices.contains_key(symbol) {
            return Err(BrokerError::UnknownSymbol(symbol.to_string()));
        }
        if size == 0 {
            return Ok(OrderTicket::Rejected(RejectReason::ZeroSize));
        }

        let order = Order::market(self.next_order_id, timestamp, symbol.to_string(), size, side);
        self.next_order_id += 1;
        let id = order.id;
        self.pending_orders.push(order);
        Ok(OrderTicket::Accepted(id))
    }

    //execution price after slippage
    fn slipped(&self, price: f64, side: OrderSide) -> f64 {
        match side {
            OrderSide::Buy => price * (1.0 + self.slippage_pct),
            OrderSide::Sell => price * (1.0 - self.slippage_pct),
        }
    }

    //fills or rejects one order at a base price
    fn execute(
        &mut self,
        order: Order,
        base_price: f64,
        timestamp: DateTime<Utc>,
        events: &mut Vec<BrokerEvent>,
    ) -> Result<(), BrokerError> {
        if !base_price.is_finite() || base_price <= 0.0 {
            return Err(BrokerError::InvalidPrice {
                symbol: order.symbol,
                price: base_price,
            });
        }

        let price = self.slipped(base_price, order.side);
        if price <= 0.0 {
            return Err(BrokerError::InvalidPrice {
                symbol: order.symbol,
                price,
            });
        }
        let notional = price * order.size as f64;
        let commission = notional * self.commission_rate;

        let current = self.account.position_size(&order.symbol);
        let position_after = current + order.signed_qty();

        //orders that grow exposure need the cash up front
        if position_after.abs() > current.abs() {
            let required = notional + commission;
            if required > self.account.cash {
                tracing::warn!(
                    symbol = %order.symbol,
                    order_id = order.id,
                    required,
                    available = self.account.cash,
                    "order rejected for insufficient cash"
                );
                events.push(BrokerEvent::Rejected {
                    order_id: order.id,
                    symbol: order.symbol,
                    reason: RejectReason::InsufficientCash {
                        required,
                        available: self.account.cash,
                    },
                });
                return Ok(());
            }
        }

        let fill = Fill {
            id: self.next_fill_id,
            order_id: order.id,
            timestamp,
            symbol: order.symbol,
            size: order.size,
            side: order.side,
            price,
            commission,
            position_after,
        };
        self.next_fill_id += 1;

        events.push(BrokerEvent::Filled(fill.clone()));
        if let Some(closed) = self.account.process_fill(fill) {
            events.push(BrokerEvent::TradeClosed(closed));
        }
        Ok(())
    }

    //fills pending orders for the bar's symbol at its open
    pub fn process_bar(&mut self, bar: &Bar) -> Result<Vec<BrokerEvent>, BrokerError> {
        let (ready, waiting): (Vec<Order>, Vec<Order>) = self
            .pending_orders
            .drain(..)
            .partition(|order| order.symbol == bar.symbol);
        self.pending_orders = waiting;

        let mut events = Vec::new();
        for order in ready {
            self.execute(order, bar.open, bar.timestamp, &mut events)?;
        }
        Ok(events)
    }

    //records the bar's close and revalues the account
    pub fn mark_to_market(&mut self, bar: &Bar) {
        self.last_prices.insert(bar.symbol.clone(), bar.close);
        self.account.update_equity(&self.last_prices);
    }

    //fills everything still pending at the last known close
    pub fn flush(&mut self, timestamp: DateTime<Utc>) -> Result<Vec<BrokerEvent>, BrokerError> {
        let mut events = Vec::new();
        for order in std::mem::take(&mut self.pending_orders) {
            let price = self
                .last_prices
                .get(&order.symbol)
                .copied()
                .ok_or_else(|| BrokerError::UnknownSymbol(order.symbol.clone()))?;
            self.execute(order, price, timestamp, &mut events)?;
        }
        self.account.update_equity(&self.last_prices);
        Ok(events)
    }

    //gross exposure at the last known prices
    pub fn position_value(&self) -> f64 {
        self.account.position_value(&self.last_prices)
    }
}

impl Broker for SimulatedBroker {
    fn cash(&self) -> f64 {
        self.account.cash
    }

    fn portfolio_value(&self) -> f64 {
        self.account.equity
    }

    fn position_size(&self, symbol: &str) -> i64 {
        self.account.position_size(symbol)
    }

    fn submit_buy(
        &mut self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        size: u64,
    ) -> Result<OrderTicket, BrokerError> {
        self.submit(timestamp, symbol, size, OrderSide::Buy)
    }

    fn submit_sell(
        &mut self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        size: u64,
    ) -> Result<OrderTicket, BrokerError> {
        self.submit(timestamp, symbol, size, OrderSide::Sell)
    }

    fn cancel_order(&mut self, order_id: u64) -> bool {
        let before = self.pending_orders.len();
        self.pending_orders.retain(|order| order.id != order_id);
        self.pending_orders.len() != before
    }
}
