pub mod record;
pub mod stats;

pub use record::{ExitType, OpenTrade, TradeRecord};
pub use stats::{ExitTypeCounts, LedgerMetrics, SymbolStats};

use crate::risk::Direction;
use chrono::{DateTime, Utc};
use stats::Aggregates;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("{symbol} already has an active trade entered at {entry_price}")]
    DuplicateEntry { symbol: String, entry_price: f64 },
    #[error("invalid entry for {symbol}: price {price}, size {size}")]
    InvalidEntry { symbol: String, price: f64, size: u64 },
}

//append-only record of trade lifecycles and the statistics derived from them
#[derive(Debug, Clone, Default)]
pub struct OrderMetric {
    trades: Vec<TradeRecord>,
    active: HashMap<String, OpenTrade>,
    aggregates: Aggregates,
}

impl OrderMetric {
    pub fn new() -> Self {
        Self::default()
    }

    //records an entry fill
    //a second entry for a symbol with an active trade is rejected and the
    //original entry kept
    pub fn on_trade_entry(
        &mut self,
        symbol: &str,
        entry_time: DateTime<Utc>,
        entry_price: f64,
        size: u64,
        direction: Direction,
        commission: f64,
    ) -> Result<(), LedgerError> {
        if let Some(existing) = self.active.get(symbol) {
            return Err(LedgerError::DuplicateEntry {
                symbol: symbol.to_string(),
                entry_price: existing.entry_price,
            });
        }

        if !entry_price.is_finite() || entry_price <= 0.0 || size == 0 {
            return Err(LedgerError::InvalidEntry {
                symbol: symbol.to_string(),
                price: entry_price,
                size,
            });
        }

        let trade = OpenTrade::new(
            symbol.to_string(),
            entry_time,
            entry_price,
            size,
            direction,
            commission,
        );
        self.active.insert(symbol.to_string(), trade);
        Ok(())
    }

    //marks an active trade to the latest price for drawdown tracking
    pub fn mark_price(&mut self, symbol: &str, price: f64) {
        if let Some(trade) = self.active.get_mut(symbol) {
            trade.mark(price);
        }
    }

    //records an exit fill, returns the finalized trade
    //no-op when the symbol has no active trade
    pub fn on_trade_exit(
        &mut self,
        symbol: &str,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        commission: f64,
        exit_type: ExitType,
    ) -> Option<&TradeRecord> {
        let mut open = self.active.remove(symbol)?;
        open.mark(exit_price);

        let total_commission = open.commission + commission;
        let pnl = open.gross_pnl(exit_price) - total_commission;

        let mut holding_days = (exit_time - open.entry_time).num_days();
        if holding_days < 0 {
            tracing::warn!(
                symbol,
                entry = %open.entry_time,
                exit = %exit_time,
                "exit recorded before entry, holding period clamped to zero"
            );
            holding_days = 0;
        }

        let record = TradeRecord {
            symbol: open.symbol,
            entry_time: open.entry_time,
            entry_price: open.entry_price,
            size: open.size,
            direction: open.direction,
            commission: total_commission,
            exit_time,
            exit_price,
            exit_type,
            pnl,
            holding_days,
            max_drawdown_pct: open.max_drawdown_pct,
        };

        self.aggregates.apply(&record);
        self.trades.push(record);
        self.trades.last()
    }

    pub fn get_metrics(&self) -> LedgerMetrics {
        LedgerMetrics::from_aggregates(&self.aggregates, &self.trades)
    }

    //finalized trades in exit order
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn active_trade(&self, symbol: &str) -> Option<&OpenTrade> {
        self.active.get(symbol)
    }

    pub fn has_active_trade(&self, symbol: &str) -> bool {
        self.active.contains_key(symbol)
    }

    pub fn holding_periods(&self) -> &[i64] {
        &self.aggregates.holding_periods
    }
}
