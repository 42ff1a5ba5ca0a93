use crate::config::RiskConfig;
use crate::engine::backtest::{BacktestEngine, EngineError};
use crate::ledger::LedgerMetrics;
use crate::metrics::PerformanceSummary;
use prettytable::{Cell, Row, Table};
use rayon::prelude::*;

//outcome of one risk setting
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub risk: RiskConfig,
    pub performance: PerformanceSummary,
    pub metrics: LedgerMetrics,
}

//every stop-loss / take-profit combination on top of a base config
pub fn risk_grid(base: &RiskConfig, stop_losses: &[f64], take_profits: &[f64]) -> Vec<RiskConfig> {
    stop_losses
        .iter()
        .flat_map(|&stop_loss_pct| {
            take_profits.iter().map(move |&take_profit_pct| RiskConfig {
                stop_loss_pct,
                take_profit_pct,
                ..base.clone()
            })
        })
        .collect()
}

//runs independent backtests over the same data in parallel
//each run owns its risk manager, ledger and broker, results keep grid order
pub fn run_sweep(
    engine: &BacktestEngine,
    grid: &[RiskConfig],
) -> Result<Vec<SweepResult>, EngineError> {
    tracing::info!(runs = grid.len(), "starting parameter sweep");

    grid.par_iter()
        .map(|risk| {
            let result = engine.run_with_risk(risk.clone())?;
            Ok(SweepResult {
                risk: risk.clone(),
                performance: result.performance,
                metrics: result.metrics,
            })
        })
        .collect()
}

//index of the run with the best sharpe ratio
pub fn best_by_sharpe(results: &[SweepResult]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.performance
                .sharpe_ratio
                .total_cmp(&b.performance.sharpe_ratio)
        })
        .map(|(index, _)| index)
}

pub fn sweep_table(results: &[SweepResult]) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(
        [
            "Stop Loss",
            "Take Profit",
            "Trailing",
            "Return",
            "Annual",
            "Max DD",
            "Sharpe",
            "Trades",
            "Win Rate",
        ]
        .iter()
        .map(|h| Cell::new(h))
        .collect(),
    ));

    for result in results {
        let trailing = result
            .risk
            .trailing_stop_pct
            .map(|t| format!("{:.1}%", t * 100.0))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(Row::new(vec![
            Cell::new(&format!("{:.1}%", result.risk.stop_loss_pct * 100.0)),
            Cell::new(&format!("{:.1}%", result.risk.take_profit_pct * 100.0)),
            Cell::new(&trailing),
            Cell::new(&format!("{:.2}%", result.performance.total_return_pct)),
            Cell::new(&format!("{:.2}%", result.performance.annual_return_pct)),
            Cell::new(&format!("{:.2}%", result.performance.max_drawdown * 100.0)),
            Cell::new(&format!("{:.3}", result.performance.sharpe_ratio)),
            Cell::new(&result.metrics.total_trades.to_string()),
            Cell::new(&format!("{:.2}%", result.metrics.win_rate)),
        ]));
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_cartesian_and_keeps_base() {
        let base = RiskConfig {
            trailing_stop_pct: Some(0.05),
            ..RiskConfig::default()
        };
        let grid = risk_grid(&base, &[0.05, 0.1], &[0.1, 0.2, 0.3]);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0].stop_loss_pct, 0.05);
        assert_eq!(grid[0].take_profit_pct, 0.1);
        assert_eq!(grid[5].stop_loss_pct, 0.1);
        assert_eq!(grid[5].take_profit_pct, 0.3);
        assert!(grid.iter().all(|r| r.trailing_stop_pct == Some(0.05)));
    }
}
