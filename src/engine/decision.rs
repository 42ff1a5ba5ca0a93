use crate::data::Bar;
use crate::engine::execution::{
    Broker, BrokerError, BrokerEvent, Fill, OrderSide, OrderTicket, RejectReason, TradeEvent,
};
use crate::ledger::{ExitType, OrderMetric};
use crate::risk::{Direction, ExitSignal, RiskControl, SizingRequest, TrendStrength};
use crate::strategy::{indicators, Signal, Strategy, SymbolHistory};
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use std::collections::HashMap;

//minimum bars of history kept per symbol
const MIN_HISTORY: usize = 250;

//per-symbol position state, no pyramiding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolState {
    Flat,
    Open(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Open(Direction),
    Close(ExitType),
}

#[derive(Debug, Clone)]
struct InFlight {
    order_id: u64,
    intent: Intent,
}

//per-bar orchestration of exits and entries across symbols
//fills and rejections come back through the on_* callbacks
pub struct DecisionLoop<R: RiskControl> {
    risk: R,
    ledger: OrderMetric,
    strategy: Box<dyn Strategy>,
    history_len: usize,

    //first-seen symbol order keeps the per-bar passes deterministic
    histories: IndexMap<String, SymbolHistory>,
    states: HashMap<String, SymbolState>,

    //at most one order in flight per symbol
    in_flight: HashMap<String, InFlight>,

    current_day: Option<NaiveDate>,
}

impl<R: RiskControl> DecisionLoop<R> {
    pub fn new(risk: R, strategy: Box<dyn Strategy>) -> Self {
        let trend_needs = risk
            .trend_periods()
            .map(|(rsi_period, volume_period)| (rsi_period + 1).max(volume_period))
            .unwrap_or(0);
        let history_len = (strategy.warmup().max(trend_needs) * 4).max(MIN_HISTORY);

        DecisionLoop {
            risk,
            ledger: OrderMetric::new(),
            strategy,
            history_len,
            histories: IndexMap::new(),
            states: HashMap::new(),
            in_flight: HashMap::new(),
            current_day: None,
        }
    }

    pub fn risk(&self) -> &R {
        &self.risk
    }

    pub fn ledger(&self) -> &OrderMetric {
        &self.ledger
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn state(&self, symbol: &str) -> SymbolState {
        self.states.get(symbol).copied().unwrap_or(SymbolState::Flat)
    }

    pub fn has_order_in_flight(&self, symbol: &str) -> bool {
        self.in_flight.contains_key(symbol)
    }

    pub fn into_ledger(self) -> OrderMetric {
        self.ledger
    }

    //processes all bars sharing one timestamp
    //reset daily cash on a new day, then exits for open symbols, then entries
    pub fn on_bar<B: Broker>(
        &mut self,
        timestamp: DateTime<Utc>,
        bars: &[Bar],
        broker: &mut B,
    ) -> Result<(), BrokerError> {
        let day = timestamp.date_naive();
        if self.current_day != Some(day) {
            self.risk.reset_daily_cash();
            self.current_day = Some(day);
            tracing::debug!(%day, "daily cash budget reset");
        }

        let history_len = self.history_len;
        let mut signals = Vec::with_capacity(bars.len());
        for bar in bars {
            let history = self
                .histories
                .entry(bar.symbol.clone())
                .or_insert_with(|| SymbolHistory::new(bar.symbol.clone(), history_len));
            history.push_bar(bar.clone());
            signals.push(self.strategy.on_bar(history));
        }

        //exits
        for (bar, signal) in bars.iter().zip(&signals) {
            self.ledger.mark_price(&bar.symbol, bar.close);

            let SymbolState::Open(direction) = self.state(&bar.symbol) else {
                continue;
            };
            if self.has_order_in_flight(&bar.symbol) {
                continue;
            }

            let trend = self.trend_strength(&bar.symbol);
            let exit = self.risk.check_exit_signals(&bar.symbol, bar.close, trend);

            let exit_type = match (exit, signal) {
                (ExitSignal::StopLoss { trigger, threshold }, _) => {
                    tracing::info!(
                        symbol = %bar.symbol,
                        %timestamp,
                        price = bar.close,
                        threshold,
                        ?trigger,
                        "stop loss triggered"
                    );
                    ExitType::StopLoss
                }
                (ExitSignal::TakeProfit { threshold }, _) => {
                    tracing::info!(
                        symbol = %bar.symbol,
                        %timestamp,
                        price = bar.close,
                        threshold,
                        "take profit triggered"
                    );
                    ExitType::TakeProfit
                }
                (ExitSignal::Hold, Signal::Exit) => ExitType::Signal,
                (ExitSignal::Hold, Signal::Enter(wanted)) if *wanted != direction => {
                    ExitType::Signal
                }
                (ExitSignal::Hold, _) => continue,
            };

            self.submit_close(timestamp, &bar.symbol, bar.close, direction, exit_type, broker)?;
        }

        //entries, capital freed by exits above is still held until they fill
        let mut position_value = self.position_value(broker);
        for (bar, signal) in bars.iter().zip(&signals) {
            let Signal::Enter(direction) = *signal else {
                continue;
            };
            if self.state(&bar.symbol) != SymbolState::Flat || self.has_order_in_flight(&bar.symbol)
            {
                continue;
            }

            let request = SizingRequest {
                available_cash: broker.cash(),
                current_price: bar.close,
                total_portfolio_value: broker.portfolio_value(),
                current_total_position_value: position_value,
                max_position_fraction: self.risk.max_position_fraction(),
                max_notional: self.strategy.entry_budget(&bar.symbol),
            };
            let size = self.risk.get_position_size(&request);
            if size == 0 {
                tracing::debug!(symbol = %bar.symbol, %timestamp, price = bar.close, "entry signal sized to zero");
                continue;
            }

            let ticket = submit(broker, direction.opening_side(), timestamp, &bar.symbol, size)?;
            match ticket {
                OrderTicket::Accepted(order_id) => {
                    tracing::info!(
                        symbol = %bar.symbol,
                        %timestamp,
                        price = bar.close,
                        size,
                        %direction,
                        "entry order submitted"
                    );
                    self.in_flight.insert(
                        bar.symbol.clone(),
                        InFlight {
                            order_id,
                            intent: Intent::Open(direction),
                        },
                    );
                    self.strategy.on_entry_submitted(&bar.symbol, timestamp);
                    position_value += size as f64 * bar.close;
                }
                OrderTicket::Rejected(reason) => {
                    tracing::warn!(symbol = %bar.symbol, %timestamp, size, %reason, "entry order rejected");
                }
            }
        }

        Ok(())
    }

    //withdraws pending entries, then closes every open position with a signal exit
    pub fn on_end<B: Broker>(
        &mut self,
        timestamp: DateTime<Utc>,
        broker: &mut B,
    ) -> Result<(), BrokerError> {
        let entries: Vec<(String, u64)> = self
            .in_flight
            .iter()
            .filter(|(_, pending)| matches!(pending.intent, Intent::Open(_)))
            .map(|(symbol, pending)| (symbol.clone(), pending.order_id))
            .collect();

        for (symbol, order_id) in entries {
            let cancelled = broker.cancel_order(order_id);
            self.in_flight.remove(&symbol);
            tracing::info!(symbol = %symbol, order_id, cancelled, "pending entry withdrawn at end of run");
        }

        let open: Vec<(String, Direction)> = self
            .histories
            .keys()
            .filter_map(|symbol| match self.state(symbol) {
                SymbolState::Open(direction) => Some((symbol.clone(), direction)),
                SymbolState::Flat => None,
            })
            .collect();

        for (symbol, direction) in open {
            if self.has_order_in_flight(&symbol) {
                continue;
            }

            let price = self
                .histories
                .get(&symbol)
                .and_then(|h| h.last_bar())
                .map(|b| b.close)
                .unwrap_or(0.0);
            self.submit_close(timestamp, &symbol, price, direction, ExitType::Signal, broker)?;
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: &BrokerEvent) {
        match event {
            BrokerEvent::Filled(fill) => self.on_order_filled(fill),
            BrokerEvent::Rejected {
                order_id,
                symbol,
                reason,
            } => self.on_order_rejected(*order_id, symbol, reason),
            BrokerEvent::TradeClosed(trade) => self.on_trade_closed(trade),
        }
    }

    pub fn on_order_filled(&mut self, fill: &Fill) {
        let Some(pending) = self.take_in_flight(&fill.symbol, fill.order_id) else {
            tracing::warn!(symbol = %fill.symbol, order_id = fill.order_id, "fill for an unknown order, skipped");
            return;
        };

        match pending.intent {
            Intent::Open(direction) => self.record_entry(fill, direction),
            Intent::Close(exit_type) => self.record_exit(fill, exit_type),
        }
    }

    pub fn on_order_rejected(&mut self, order_id: u64, symbol: &str, reason: &RejectReason) {
        let pending = self.take_in_flight(symbol, order_id);
        tracing::warn!(
            symbol,
            order_id,
            %reason,
            intent = ?pending.map(|p| p.intent),
            "order rejected"
        );
    }

    pub fn on_trade_closed(&mut self, trade: &TradeEvent) {
        tracing::info!(
            symbol = %trade.symbol,
            timestamp = %trade.timestamp,
            pnl = trade.pnl,
            pnl_net = trade.pnl_net,
            "trade closed"
        );
    }

    fn record_entry(&mut self, fill: &Fill, direction: Direction) {
        if let Err(err) = self.risk.add_position(&fill.symbol, fill.price, direction) {
            tracing::warn!(symbol = %fill.symbol, error = %err, "entry fill skipped");
            return;
        }

        if let Err(err) = self.ledger.on_trade_entry(
            &fill.symbol,
            fill.timestamp,
            fill.price,
            fill.size,
            direction,
            fill.commission,
        ) {
            tracing::warn!(symbol = %fill.symbol, error = %err, "entry not recorded in ledger");
        }

        self.states
            .insert(fill.symbol.clone(), SymbolState::Open(direction));
        tracing::info!(
            symbol = %fill.symbol,
            timestamp = %fill.timestamp,
            price = fill.price,
            size = fill.size,
            %direction,
            "entry filled"
        );
    }

    fn record_exit(&mut self, fill: &Fill, exit_type: ExitType) {
        if fill.position_after != 0 {
            tracing::warn!(
                symbol = %fill.symbol,
                timestamp = %fill.timestamp,
                size = fill.size,
                residual = fill.position_after,
                "closing fill left a residual position, skipped"
            );
            return;
        }

        self.risk.remove_position(&fill.symbol);
        self.states.insert(fill.symbol.clone(), SymbolState::Flat);

        if let Some(trade) = self.ledger.on_trade_exit(
            &fill.symbol,
            fill.timestamp,
            fill.price,
            fill.commission,
            exit_type,
        ) {
            tracing::info!(
                symbol = %trade.symbol,
                timestamp = %trade.exit_time,
                price = trade.exit_price,
                size = trade.size,
                %exit_type,
                pnl = trade.pnl,
                "exit filled"
            );
        }
    }

    fn submit_close<B: Broker>(
        &mut self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        price: f64,
        direction: Direction,
        exit_type: ExitType,
        broker: &mut B,
    ) -> Result<(), BrokerError> {
        let held = broker.position_size(symbol);
        if held == 0 || held.signum() != direction.sign() {
            tracing::warn!(symbol, %timestamp, held, %direction, "broker position does not match open state");
            return Ok(());
        }

        let size = held.unsigned_abs();
        match submit(broker, direction.closing_side(), timestamp, symbol, size)? {
            OrderTicket::Accepted(order_id) => {
                tracing::info!(symbol, %timestamp, price, size, %exit_type, "exit order submitted");
                self.in_flight.insert(
                    symbol.to_string(),
                    InFlight {
                        order_id,
                        intent: Intent::Close(exit_type),
                    },
                );
            }
            OrderTicket::Rejected(reason) => {
                tracing::warn!(symbol, %timestamp, size, %reason, "exit order rejected");
            }
        }
        Ok(())
    }

    fn take_in_flight(&mut self, symbol: &str, order_id: u64) -> Option<InFlight> {
        match self.in_flight.get(symbol) {
            Some(pending) if pending.order_id == order_id => self.in_flight.remove(symbol),
            _ => None,
        }
    }

    //gross exposure at the latest closes seen
    fn position_value<B: Broker>(&self, broker: &B) -> f64 {
        self.histories
            .iter()
            .filter_map(|(symbol, history)| {
                let held = broker.position_size(symbol);
                let last = history.last_bar()?;
                Some(held.unsigned_abs() as f64 * last.close)
            })
            .sum()
    }

    fn trend_strength(&self, symbol: &str) -> Option<TrendStrength> {
        let (rsi_period, volume_period) = self.risk.trend_periods()?;
        let history = self.histories.get(symbol)?;
        let rsi = indicators::rsi(&history.closes(rsi_period + 1), rsi_period)?;
        let volume_ratio =
            indicators::volume_ratio(&history.volumes(volume_period), volume_period)?;
        Some(TrendStrength { rsi, volume_ratio })
    }
}

fn submit<B: Broker>(
    broker: &mut B,
    side: OrderSide,
    timestamp: DateTime<Utc>,
    symbol: &str,
    size: u64,
) -> Result<OrderTicket, BrokerError> {
    match side {
        OrderSide::Buy => broker.submit_buy(timestamp, symbol, size),
        OrderSide::Sell => broker.submit_sell(timestamp, symbol, size),
    }
}
