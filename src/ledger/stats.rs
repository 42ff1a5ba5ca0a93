use crate::ledger::record::{ExitType, TradeRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

//histogram of exit reasons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitTypeCounts {
    pub stop_loss: usize,
    pub take_profit: usize,
    pub signal: usize,
}

impl ExitTypeCounts {
    pub fn record(&mut self, exit_type: ExitType) {
        match exit_type {
            ExitType::StopLoss => self.stop_loss += 1,
            ExitType::TakeProfit => self.take_profit += 1,
            ExitType::Signal => self.signal += 1,
        }
    }

    pub fn get(&self, exit_type: ExitType) -> usize {
        match exit_type {
            ExitType::StopLoss => self.stop_loss,
            ExitType::TakeProfit => self.take_profit,
            ExitType::Signal => self.signal,
        }
    }

    pub fn total(&self) -> usize {
        self.stop_loss + self.take_profit + self.signal
    }
}

//running totals folded over finalized trades
//both the live ledger and a replay of the trade log go through apply()
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Aggregates {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub total_commission: f64,
    pub holding_periods: Vec<i64>,
    pub max_drawdown_pct: f64,
    pub exit_types: ExitTypeCounts,
}

impl Aggregates {
    pub fn apply(&mut self, trade: &TradeRecord) {
        self.total_trades += 1;
        self.total_pnl += trade.pnl;
        self.total_commission += trade.commission;

        //zero pnl counts as a loss
        if trade.is_win() {
            self.winning_trades += 1;
            self.gross_profit += trade.pnl;
            self.max_profit = self.max_profit.max(trade.pnl);
        } else {
            self.losing_trades += 1;
            self.gross_loss += trade.pnl;
            self.max_loss = self.max_loss.min(trade.pnl);
        }

        self.holding_periods.push(trade.holding_days);
        self.max_drawdown_pct = self.max_drawdown_pct.max(trade.max_drawdown_pct);
        self.exit_types.record(trade.exit_type);
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        self.winning_trades as f64 / self.total_trades as f64 * 100.0
    }

    pub fn avg_holding_period(&self) -> f64 {
        if self.holding_periods.is_empty() {
            return 0.0;
        }
        self.holding_periods.iter().sum::<i64>() as f64 / self.holding_periods.len() as f64
    }

    pub fn profit_factor(&self) -> f64 {
        let losses = self.gross_loss.abs();
        if losses > 0.0 {
            self.gross_profit / losses
        } else if self.gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }
}

//per-symbol breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub total_commission: f64,
    pub max_drawdown_pct: f64,
}

impl From<&Aggregates> for SymbolStats {
    fn from(agg: &Aggregates) -> Self {
        SymbolStats {
            total_trades: agg.total_trades,
            winning_trades: agg.winning_trades,
            losing_trades: agg.losing_trades,
            win_rate: agg.win_rate(),
            total_pnl: agg.total_pnl,
            max_profit: agg.max_profit,
            max_loss: agg.max_loss,
            total_commission: agg.total_commission,
            max_drawdown_pct: agg.max_drawdown_pct,
        }
    }
}

//snapshot of ledger statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub total_commission: f64,
    pub profit_factor: f64,
    pub avg_holding_period: f64,
    pub exit_types: ExitTypeCounts,
    pub symbols: IndexMap<String, SymbolStats>,
}

impl LedgerMetrics {
    //rebuilds the snapshot from a trade log starting from an empty ledger
    pub fn replay(trades: &[TradeRecord]) -> Self {
        let mut aggregates = Aggregates::default();
        for trade in trades {
            aggregates.apply(trade);
        }
        Self::from_aggregates(&aggregates, trades)
    }

    pub(crate) fn from_aggregates(aggregates: &Aggregates, trades: &[TradeRecord]) -> Self {
        if aggregates.total_trades == 0 {
            return LedgerMetrics::default();
        }

        LedgerMetrics {
            total_trades: aggregates.total_trades,
            winning_trades: aggregates.winning_trades,
            losing_trades: aggregates.losing_trades,
            win_rate: aggregates.win_rate(),
            total_pnl: aggregates.total_pnl,
            max_profit: aggregates.max_profit,
            max_loss: aggregates.max_loss,
            total_commission: aggregates.total_commission,
            profit_factor: aggregates.profit_factor(),
            avg_holding_period: aggregates.avg_holding_period(),
            exit_types: aggregates.exit_types,
            symbols: per_symbol(trades),
        }
    }
}

//groups the log by symbol in first-traded order
fn per_symbol(trades: &[TradeRecord]) -> IndexMap<String, SymbolStats> {
    let mut grouped: IndexMap<String, Aggregates> = IndexMap::new();
    for trade in trades {
        grouped
            .entry(trade.symbol.clone())
            .or_default()
            .apply(trade);
    }

    grouped
        .iter()
        .map(|(symbol, agg)| (symbol.clone(), SymbolStats::from(agg)))
        .collect()
}
