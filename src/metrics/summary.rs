use crate::metrics::timeseries::{max_drawdown, period_days, period_returns, EquityPoint};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//trading periods per year for daily bars
pub const PERIODS_PER_YEAR: f64 = 252.0;

//annualized return bounds, in percent
const MIN_ANNUAL_RETURN_PCT: f64 = -100.0;
const MAX_ANNUAL_RETURN_PCT: f64 = 1000.0;

//account-level performance of a backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub annual_return_pct: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub exposure: f64,
    pub days: i64,
}

impl PerformanceSummary {
    //calculate metrics from the equity curve
    pub fn from_equity_curve(
        equity_curve: &[EquityPoint],
        initial_balance: f64,
        risk_free_rate: f64,
    ) -> Self {
        let final_balance = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_balance);

        let total_return = final_balance - initial_balance;
        let total_return_pct = if initial_balance > 0.0 {
            total_return / initial_balance * 100.0
        } else {
            0.0
        };

        let days = period_days(equity_curve);
        let annual_return_pct = annualized_return_pct(total_return_pct, days);

        let returns = period_returns(equity_curve);
        let volatility = annualized_volatility(&returns);
        let sharpe_ratio = calculate_sharpe_ratio(&returns, risk_free_rate);
        let sortino_ratio = calculate_sortino_ratio(&returns);

        let exposure = if equity_curve.is_empty() {
            0.0
        } else {
            equity_curve.iter().filter(|p| p.in_market()).count() as f64
                / equity_curve.len() as f64
        };

        PerformanceSummary {
            initial_balance,
            final_balance,
            total_return,
            total_return_pct,
            annual_return_pct,
            max_drawdown: max_drawdown(equity_curve),
            volatility,
            sharpe_ratio,
            sortino_ratio,
            exposure,
            days,
        }
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let rows = [
            ("Initial Balance", format!("${:.2}", self.initial_balance)),
            ("Final Balance", format!("${:.2}", self.final_balance)),
            (
                "Total Return",
                format!("${:.2} ({:.2}%)", self.total_return, self.total_return_pct),
            ),
            ("Annual Return", format!("{:.2}%", self.annual_return_pct)),
            ("Period", format!("{} days", self.days)),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown * 100.0)),
            ("Volatility", format!("{:.2}%", self.volatility * 100.0)),
            ("Sharpe Ratio", format!("{:.3}", self.sharpe_ratio)),
            ("Sortino Ratio", format!("{:.3}", self.sortino_ratio)),
            ("Exposure", format!("{:.2}%", self.exposure * 100.0)),
        ];

        for (name, value) in rows {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
        }

        table.printstd();
    }
}

//compounds the total return over a 365 day year, clamped to [-100%, 1000%]
pub fn annualized_return_pct(total_return_pct: f64, days: i64) -> f64 {
    let days = days.max(1) as f64;
    let growth = 1.0 + total_return_pct / 100.0;
    if growth <= 0.0 {
        return MIN_ANNUAL_RETURN_PCT;
    }

    let annual = (growth.powf(365.0 / days) - 1.0) * 100.0;
    if annual.is_nan() {
        return 0.0;
    }
    annual.clamp(MIN_ANNUAL_RETURN_PCT, MAX_ANNUAL_RETURN_PCT)
}

pub fn annualized_volatility(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    returns.std_dev() * PERIODS_PER_YEAR.sqrt()
}

//excess return over the per-period risk-free rate, annualized
pub fn calculate_sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let period_rf = risk_free_rate / PERIODS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - period_rf).collect();

    let mean = excess.iter().mean();
    let std_dev = excess.iter().std_dev();

    if std_dev == 0.0 || !std_dev.is_finite() {
        return 0.0;
    }

    (mean / std_dev) * PERIODS_PER_YEAR.sqrt()
}

fn calculate_sortino_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }

    let mean = returns.mean();

    //downside deviation (only negative returns)
    let negative_returns: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();

    if negative_returns.len() < 2 {
        return 0.0;
    }

    let downside_dev = negative_returns.std_dev();

    if downside_dev == 0.0 {
        return 0.0;
    }

    (mean / downside_dev) * PERIODS_PER_YEAR.sqrt()
}
