//risk-managed position sizing, exit signals and trade bookkeeping for equity backtests

pub mod config;
pub mod data;
pub mod engine;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod portfolio;
pub mod risk;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        BacktestConfiguration, ConfigError, DcaParams, DualThrustParams, DynamicTakeProfit,
        MacdRsiParams, RiskConfig, SmaParams, StrategyParams, StrategyType,
    };
    pub use crate::data::{adjust_bars, load_bars, load_dividends, load_splits, Bar};
    pub use crate::engine::{
        BacktestConfig, BacktestEngine, BacktestResult, Broker, BrokerError, BrokerEvent,
        DecisionLoop, EngineError, Fill, OrderSide, OrderTicket, SimulatedBroker, SymbolState,
    };
    pub use crate::ledger::{ExitType, LedgerError, LedgerMetrics, OrderMetric, TradeRecord};
    pub use crate::metrics::{EquityPoint, PerformanceSummary};
    pub use crate::portfolio::{Account, Holding};
    pub use crate::risk::{
        Direction, ExitSignal, RiskControl, RiskError, RiskManager, SizingRequest, StopTrigger,
        TrendStrength,
    };
    pub use crate::strategy::{build_strategy, Signal, Strategy, SymbolHistory};
}
