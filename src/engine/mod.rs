pub mod backtest;
pub mod decision;
pub mod execution;
pub mod sweep;

pub use backtest::{BacktestConfig, BacktestEngine, BacktestResult, EngineError};
pub use decision::{DecisionLoop, SymbolState};
pub use execution::{
    Broker, BrokerError, BrokerEvent, Fill, Order, OrderSide, OrderTicket, RejectReason,
    SimulatedBroker, TradeEvent,
};
pub use sweep::{best_by_sharpe, risk_grid, run_sweep, sweep_table, SweepResult};
