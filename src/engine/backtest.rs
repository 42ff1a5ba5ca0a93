use crate::config::{BacktestConfiguration, ConfigError, RiskConfig, StrategyParams};
use crate::data::Bar;
use crate::engine::decision::DecisionLoop;
use crate::engine::execution::{Broker, BrokerError, Fill, SimulatedBroker};
use crate::ledger::{LedgerMetrics, TradeRecord};
use crate::metrics::{calculate_equity_curve, EquityPoint, EquitySample, PerformanceSummary};
use crate::risk::{RiskControl, RiskManager};
use crate::strategy::{build_strategy, Strategy};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no bars to replay")]
    NoData,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

//result of a backtest
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: String,
    pub performance: PerformanceSummary,
    pub metrics: LedgerMetrics,
    pub trades: Vec<TradeRecord>,
    pub fills: Vec<Fill>,

    //commission charged by the broker, matches the ledger once every trade is closed
    pub commission_paid: f64,
    pub equity_curve: Vec<EquityPoint>,
}

//configuration for a backtest
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    pub commission_rate: f64,
    pub slippage_pct: f64,
    pub risk_free_rate: f64,
    pub risk: RiskConfig,
    pub strategy: StrategyParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig::from(&BacktestConfiguration::default())
    }
}

impl From<&BacktestConfiguration> for BacktestConfig {
    fn from(config: &BacktestConfiguration) -> Self {
        BacktestConfig {
            initial_balance: config.initial_cash,
            commission_rate: config.commission_rate,
            slippage_pct: config.slippage_pct,
            risk_free_rate: config.risk_free_rate,
            risk: config.risk.clone(),
            strategy: config.strategy.clone(),
        }
    }
}

//main backtest engine, replays bars grouped by timestamp
pub struct BacktestEngine {
    config: BacktestConfig,
    timeline: Vec<(DateTime<Utc>, Vec<Bar>)>,
}

impl BacktestEngine {
    //creates a new backtest engine
    pub fn new(config: BacktestConfig, bars: Vec<Bar>) -> Self {
        let mut grouped: BTreeMap<DateTime<Utc>, Vec<Bar>> = BTreeMap::new();
        for bar in bars {
            grouped.entry(bar.timestamp).or_default().push(bar);
        }

        BacktestEngine {
            config,
            timeline: grouped.into_iter().collect(),
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    //number of distinct timestamps
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    //runs the backtest with the configured risk manager and strategy
    pub fn run(&self) -> Result<BacktestResult, EngineError> {
        self.run_with_risk(self.config.risk.clone())
    }

    //runs with a different risk configuration over the same data
    pub fn run_with_risk(&self, risk: RiskConfig) -> Result<BacktestResult, EngineError> {
        let manager = RiskManager::new(risk)?;
        self.run_with(manager, build_strategy(&self.config.strategy))
    }

    pub fn run_with<R: RiskControl>(
        &self,
        risk: R,
        strategy: Box<dyn Strategy>,
    ) -> Result<BacktestResult, EngineError> {
        let Some(last_timestamp) = self.timeline.last().map(|(t, _)| *t) else {
            return Err(EngineError::NoData);
        };

        let mut broker = SimulatedBroker::new(
            self.config.initial_balance,
            self.config.commission_rate,
            self.config.slippage_pct,
        );
        let mut decisions = DecisionLoop::new(risk, strategy);
        let mut samples = Vec::with_capacity(self.timeline.len());

        tracing::info!(
            strategy = decisions.strategy_name(),
            timestamps = self.timeline.len(),
            "starting backtest"
        );

        //main backtest loop
        for (timestamp, bars) in &self.timeline {
            //orders from earlier bars fill at this bar's open
            let mut events = Vec::new();
            for bar in bars {
                events.extend(broker.process_bar(bar)?);
            }
            for bar in bars {
                broker.mark_to_market(bar);
            }
            for event in &events {
                decisions.handle_event(event);
            }

            decisions.on_bar(*timestamp, bars, &mut broker)?;
            samples.push(snapshot(*timestamp, &broker));
        }

        //withdraw pending entries and close what is still open at the last close
        decisions.on_end(last_timestamp, &mut broker)?;
        for event in broker.flush(last_timestamp)? {
            decisions.handle_event(&event);
        }
        if let Some(last) = samples.last_mut() {
            *last = snapshot(last_timestamp, &broker);
        }

        let equity_curve = calculate_equity_curve(&samples, self.config.initial_balance);
        let performance = PerformanceSummary::from_equity_curve(
            &equity_curve,
            self.config.initial_balance,
            self.config.risk_free_rate,
        );

        let strategy = decisions.strategy_name().to_string();
        let fills = broker.fills().to_vec();
        let commission_paid = broker.total_commission();
        let ledger = decisions.into_ledger();

        tracing::info!(
            strategy = %strategy,
            trades = ledger.trades().len(),
            final_equity = performance.final_balance,
            "backtest finished"
        );

        Ok(BacktestResult {
            strategy,
            performance,
            metrics: ledger.get_metrics(),
            trades: ledger.trades().to_vec(),
            fills,
            commission_paid,
            equity_curve,
        })
    }
}

fn snapshot(timestamp: DateTime<Utc>, broker: &SimulatedBroker) -> EquitySample {
    EquitySample {
        timestamp,
        equity: broker.portfolio_value(),
        cash: broker.cash(),
        position_value: broker.position_value(),
    }
}
