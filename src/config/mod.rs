pub mod backtest_config;
pub mod risk_config;

pub use backtest_config::{
    BacktestConfiguration, DcaParams, DualThrustParams, MacdRsiParams, SmaParams,
    StrategyParams, StrategyType,
};
pub use risk_config::{DynamicTakeProfit, RiskConfig};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a non-negative finite percentage, got {value}")]
    InvalidPercentage { field: &'static str, value: f64 },
    #[error("{field} must be in (0, 1], got {value}")]
    InvalidFraction { field: &'static str, value: f64 },
    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
    #[error("no symbols configured")]
    EmptySymbols,
}
