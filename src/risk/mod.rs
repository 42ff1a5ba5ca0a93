pub mod manager;
pub mod position;

pub use manager::RiskManager;
pub use position::{Direction, TrackedPosition};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("invalid entry price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },
    #[error("{symbol} is already tracked with entry price {entry_price}")]
    AlreadyTracked { symbol: String, entry_price: f64 },
    #[error("invalid {field} for {symbol}: {value}")]
    InvalidParameter {
        symbol: String,
        field: &'static str,
        value: f64,
    },
}

//which stop fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopTrigger {
    Fixed,
    Trailing,
}

//result of an exit check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitSignal {
    Hold,
    StopLoss { trigger: StopTrigger, threshold: f64 },
    TakeProfit { threshold: f64 },
}

impl ExitSignal {
    //ledger exit type, none when holding
    pub fn exit_type(&self) -> Option<crate::ledger::ExitType> {
        use crate::ledger::ExitType;
        match self {
            ExitSignal::Hold => None,
            ExitSignal::StopLoss { .. } => Some(ExitType::StopLoss),
            ExitSignal::TakeProfit { .. } => Some(ExitType::TakeProfit),
        }
    }
}

//auxiliary trend inputs for the dynamic take-profit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendStrength {
    pub rsi: f64,
    //latest volume over its moving average
    pub volume_ratio: f64,
}

//inputs for a sizing decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRequest {
    pub available_cash: f64,
    pub current_price: f64,
    pub total_portfolio_value: f64,
    pub current_total_position_value: f64,
    pub max_position_fraction: f64,

    //optional notional cap for this entry (scheduled contributions)
    pub max_notional: Option<f64>,
}

//interface the decision loop drives
pub trait RiskControl {
    fn add_position(
        &mut self,
        symbol: &str,
        entry_price: f64,
        direction: Direction,
    ) -> Result<(), RiskError>;

    fn remove_position(&mut self, symbol: &str);

    fn check_exit_signals(
        &mut self,
        symbol: &str,
        current_price: f64,
        trend: Option<TrendStrength>,
    ) -> ExitSignal;

    fn get_position_size(&mut self, request: &SizingRequest) -> u64;

    fn reset_daily_cash(&mut self);

    //maximum fraction of portfolio value allowed in positions
    fn max_position_fraction(&self) -> f64;

    //(rsi period, volume period) when exits want trend inputs
    fn trend_periods(&self) -> Option<(usize, usize)> {
        None
    }
}
