use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

//trend-strength bonus applied to the take-profit target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicTakeProfit {
    //rsi above this counts as a strong trend
    pub rsi_threshold: f64,

    //volume over its moving average above this counts as a surge
    pub volume_multiplier: f64,

    //added to the take-profit percentage per strong condition
    pub trend_bonus: f64,

    pub rsi_period: usize,
    pub volume_period: usize,
}

impl Default for DynamicTakeProfit {
    fn default() -> Self {
        DynamicTakeProfit {
            rsi_threshold: 70.0,
            volume_multiplier: 1.5,
            trend_bonus: 0.1,
            rsi_period: 14,
            volume_period: 20,
        }
    }
}

//risk settings for one backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,

    //maximum fraction of portfolio value held in positions
    pub max_position_size: f64,

    pub trailing_stop_pct: Option<f64>,
    pub dynamic_take_profit: Option<DynamicTakeProfit>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            stop_loss_pct: 0.1,
            take_profit_pct: 0.2,
            max_position_size: 0.3,
            trailing_stop_pct: None,
            dynamic_take_profit: None,
        }
    }
}

fn check_pct(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidPercentage { field, value });
    }
    Ok(())
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_pct("stop_loss_pct", self.stop_loss_pct)?;
        check_pct("take_profit_pct", self.take_profit_pct)?;

        //a stop at or beyond 100% would sit at or below zero for longs
        if self.stop_loss_pct >= 1.0 {
            return Err(ConfigError::InvalidPercentage {
                field: "stop_loss_pct",
                value: self.stop_loss_pct,
            });
        }

        if !self.max_position_size.is_finite()
            || self.max_position_size <= 0.0
            || self.max_position_size > 1.0
        {
            return Err(ConfigError::InvalidFraction {
                field: "max_position_size",
                value: self.max_position_size,
            });
        }

        if let Some(trail) = self.trailing_stop_pct {
            check_pct("trailing_stop_pct", trail)?;
            if trail == 0.0 || trail >= 1.0 {
                return Err(ConfigError::InvalidFraction {
                    field: "trailing_stop_pct",
                    value: trail,
                });
            }
        }

        if let Some(dynamic) = &self.dynamic_take_profit {
            check_pct("trend_bonus", dynamic.trend_bonus)?;
            if !(0.0..=100.0).contains(&dynamic.rsi_threshold) {
                return Err(ConfigError::InvalidParameter {
                    field: "rsi_threshold",
                    reason: format!("{} is outside 0..=100", dynamic.rsi_threshold),
                });
            }
            if !dynamic.volume_multiplier.is_finite() || dynamic.volume_multiplier <= 0.0 {
                return Err(ConfigError::InvalidParameter {
                    field: "volume_multiplier",
                    reason: format!("{} must be positive", dynamic.volume_multiplier),
                });
            }
            if dynamic.rsi_period == 0 || dynamic.volume_period == 0 {
                return Err(ConfigError::InvalidParameter {
                    field: "dynamic_take_profit",
                    reason: "indicator periods must be non-zero".to_string(),
                });
            }
        }

        Ok(())
    }
}
