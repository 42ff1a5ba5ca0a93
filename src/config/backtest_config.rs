use crate::config::{ConfigError, RiskConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

//strategy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    SmaCrossover,
    MacdRsi,
    DualThrust,
    Dca,
}

impl StrategyType {
    //parse strategy type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sma" | "sma_crossover" => Some(StrategyType::SmaCrossover),
            "macd" | "macd_rsi" => Some(StrategyType::MacdRsi),
            "dual_thrust" | "dualthrust" => Some(StrategyType::DualThrust),
            "dca" => Some(StrategyType::Dca),
            _ => None,
        }
    }
}

//sma crossover strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmaParams {
    pub fast_window: usize,
    pub slow_window: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        SmaParams {
            fast_window: 10,
            slow_window: 30,
        }
    }
}

//macd / rsi strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdRsiParams {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub rsi_upper: f64,
    pub rsi_lower: f64,
}

impl Default for MacdRsiParams {
    fn default() -> Self {
        MacdRsiParams {
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            rsi_upper: 70.0,
            rsi_lower: 30.0,
        }
    }
}

//dual thrust breakout parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualThrustParams {
    pub n_days: usize,
    pub k1: f64,
    pub k2: f64,

    //open shorts on a downside break instead of only closing longs
    pub allow_short: bool,
}

impl Default for DualThrustParams {
    fn default() -> Self {
        DualThrustParams {
            n_days: 5,
            k1: 0.5,
            k2: 0.5,
            allow_short: false,
        }
    }
}

//dollar-cost averaging parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcaParams {
    //day of month on or after which the monthly contribution is made
    pub invest_day: u32,
    pub invest_amount: f64,
}

impl Default for DcaParams {
    fn default() -> Self {
        DcaParams {
            invest_day: 1,
            invest_amount: 2000.0,
        }
    }
}

//strategy-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyParams {
    SmaCrossover(SmaParams),
    MacdRsi(MacdRsiParams),
    DualThrust(DualThrustParams),
    Dca(DcaParams),
}

impl StrategyParams {
    //default parameters for a strategy type
    pub fn defaults(strategy_type: StrategyType) -> Self {
        match strategy_type {
            StrategyType::SmaCrossover => StrategyParams::SmaCrossover(SmaParams::default()),
            StrategyType::MacdRsi => StrategyParams::MacdRsi(MacdRsiParams::default()),
            StrategyType::DualThrust => StrategyParams::DualThrust(DualThrustParams::default()),
            StrategyType::Dca => StrategyParams::Dca(DcaParams::default()),
        }
    }

    pub fn strategy_type(&self) -> StrategyType {
        match self {
            StrategyParams::SmaCrossover(_) => StrategyType::SmaCrossover,
            StrategyParams::MacdRsi(_) => StrategyType::MacdRsi,
            StrategyParams::DualThrust(_) => StrategyType::DualThrust,
            StrategyParams::Dca(_) => StrategyType::Dca,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| ConfigError::InvalidParameter {
            field,
            reason: reason.to_string(),
        };

        match self {
            StrategyParams::SmaCrossover(p) => {
                if p.fast_window == 0 || p.fast_window >= p.slow_window {
                    return Err(invalid(
                        "fast_window",
                        "must be non-zero and shorter than slow_window",
                    ));
                }
            }
            StrategyParams::MacdRsi(p) => {
                if p.macd_fast == 0 || p.macd_fast >= p.macd_slow || p.macd_signal == 0 {
                    return Err(invalid("macd_fast", "need 0 < fast < slow and signal > 0"));
                }
                if p.rsi_period == 0 {
                    return Err(invalid("rsi_period", "must be non-zero"));
                }
                if p.rsi_lower >= p.rsi_upper {
                    return Err(invalid("rsi_lower", "must be below rsi_upper"));
                }
            }
            StrategyParams::DualThrust(p) => {
                if p.n_days == 0 {
                    return Err(invalid("n_days", "must be non-zero"));
                }
                if !p.k1.is_finite() || !p.k2.is_finite() || p.k1 < 0.0 || p.k2 < 0.0 {
                    return Err(invalid("k1", "band multipliers must be non-negative"));
                }
            }
            StrategyParams::Dca(p) => {
                if !(1..=31).contains(&p.invest_day) {
                    return Err(invalid("invest_day", "must be a day of month 1-31"));
                }
                if !p.invest_amount.is_finite() || p.invest_amount <= 0.0 {
                    return Err(invalid("invest_amount", "must be positive"));
                }
            }
        }
        Ok(())
    }
}

//complete backtest configuration, created once per run and not mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfiguration {
    //either a csv with a symbol column or a directory of SYMBOL.day.csv files
    pub data_path: PathBuf,
    pub symbols: Vec<String>,

    //account settings
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub slippage_pct: f64,

    //annual risk-free rate for the sharpe ratio
    pub risk_free_rate: f64,

    pub risk: RiskConfig,
    pub strategy: StrategyParams,

    //optional output paths
    pub output_equity_csv: Option<PathBuf>,
    pub output_trades_csv: Option<PathBuf>,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            data_path: PathBuf::from("data"),
            symbols: vec!["SPY".to_string(), "QQQ".to_string()],
            initial_cash: 100000.0,
            commission_rate: 0.001,
            slippage_pct: 0.0,
            risk_free_rate: 0.04,
            risk: RiskConfig::default(),
            strategy: StrategyParams::MacdRsi(MacdRsiParams::default()),
            output_equity_csv: None,
            output_trades_csv: None,
        }
    }
}

impl BacktestConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::EmptySymbols);
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                field: "initial_cash",
                reason: format!("{} must be positive", self.initial_cash),
            });
        }
        if !self.commission_rate.is_finite() || self.commission_rate < 0.0 {
            return Err(ConfigError::InvalidPercentage {
                field: "commission_rate",
                value: self.commission_rate,
            });
        }
        if !self.slippage_pct.is_finite() || self.slippage_pct < 0.0 {
            return Err(ConfigError::InvalidPercentage {
                field: "slippage_pct",
                value: self.slippage_pct,
            });
        }
        //a full price of slippage would sell at zero or below
        if self.slippage_pct >= 1.0 {
            return Err(ConfigError::InvalidParameter {
                field: "slippage_pct",
                reason: format!("{} must be below 1", self.slippage_pct),
            });
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::InvalidParameter {
                field: "risk_free_rate",
                reason: "must be finite".to_string(),
            });
        }

        self.risk.validate()?;
        self.strategy.validate()
    }

    //load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
