use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//account snapshot taken after each timestamp is processed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquitySample {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub cash: f64,

    //gross value of open holdings
    pub position_value: f64,
}

//a point in the equity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub cash: f64,
    pub position_value: f64,
    pub drawdown: f64,
    pub returns: f64,
}

impl EquityPoint {
    pub fn in_market(&self) -> bool {
        self.position_value > 0.0
    }
}

//calculates the equity curve with drawdowns, measured from the initial balance
pub fn calculate_equity_curve(samples: &[EquitySample], initial_balance: f64) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(samples.len());
    let mut peak = initial_balance;
    let mut prev_equity = initial_balance;

    for sample in samples {
        peak = peak.max(sample.equity);

        let drawdown = if peak > 0.0 {
            (peak - sample.equity) / peak
        } else {
            0.0
        };

        let returns = if prev_equity != 0.0 {
            (sample.equity - prev_equity) / prev_equity
        } else {
            0.0
        };

        curve.push(EquityPoint {
            timestamp: sample.timestamp,
            equity: sample.equity,
            cash: sample.cash,
            position_value: sample.position_value,
            drawdown,
            returns,
        });
        prev_equity = sample.equity;
    }

    curve
}

//calculates maximum drawdown from equity curve
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::max)
}

//period returns, one per curve point
pub fn period_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve.iter().map(|point| point.returns).collect()
}

//calendar days covered by the curve, at least one
pub fn period_days(equity_curve: &[EquityPoint]) -> i64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_days().max(1),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn samples(values: &[f64]) -> Vec<EquitySample> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquitySample {
                timestamp: start + Duration::days(i as i64),
                equity,
                cash: equity,
                position_value: 0.0,
            })
            .collect()
    }

    #[test]
    fn drawdown_tracks_peak() {
        let curve = calculate_equity_curve(&samples(&[100.0, 120.0, 90.0, 130.0]), 100.0);
        assert_relative_eq!(curve[2].drawdown, 0.25);
        assert_relative_eq!(curve[3].drawdown, 0.0);
        assert_relative_eq!(max_drawdown(&curve), 0.25);
        assert_relative_eq!(curve[1].returns, 0.2);
        assert_eq!(period_days(&curve), 3);
    }

    #[test]
    fn first_point_measured_against_initial_balance() {
        let curve = calculate_equity_curve(&samples(&[95.0]), 100.0);
        assert_relative_eq!(curve[0].returns, -0.05);
        assert_relative_eq!(curve[0].drawdown, 0.05);
        assert_eq!(period_days(&curve), 1);
        assert_eq!(period_days(&[]), 1);
    }
}
