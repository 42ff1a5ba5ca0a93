use crate::config::{ConfigError, DynamicTakeProfit, RiskConfig};
use crate::risk::position::{Direction, TrackedPosition};
use crate::risk::{ExitSignal, RiskControl, RiskError, SizingRequest, StopTrigger, TrendStrength};
use std::collections::HashMap;

//stop-loss, take-profit and sizing decisions for open positions
//issues decisions only, never orders
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    positions: HashMap<String, TrackedPosition>,

    //cash committed to new positions since the last daily reset
    committed_today: f64,
}

impl RiskManager {
    //creates a risk manager, rejecting invalid configuration
    pub fn new(config: RiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(RiskManager {
            config,
            positions: HashMap::new(),
            committed_today: 0.0,
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn position(&self, symbol: &str) -> Option<&TrackedPosition> {
        self.positions.get(symbol)
    }

    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn committed_today(&self) -> f64 {
        self.committed_today
    }

    //overrides the thresholds of one tracked position
    //unknown symbols are ignored
    pub fn update_position_params(
        &mut self,
        symbol: &str,
        stop_loss_pct: Option<f64>,
        take_profit_pct: Option<f64>,
    ) -> Result<(), RiskError> {
        let Some(position) = self.positions.get_mut(symbol) else {
            return Ok(());
        };

        if let Some(pct) = stop_loss_pct {
            if !pct.is_finite() || !(0.0..1.0).contains(&pct) {
                return Err(RiskError::InvalidParameter {
                    symbol: symbol.to_string(),
                    field: "stop_loss_pct",
                    value: pct,
                });
            }
        }
        if let Some(pct) = take_profit_pct {
            if !pct.is_finite() || pct < 0.0 {
                return Err(RiskError::InvalidParameter {
                    symbol: symbol.to_string(),
                    field: "take_profit_pct",
                    value: pct,
                });
            }
        }

        if let Some(pct) = stop_loss_pct {
            position.set_stop_loss_pct(pct);
        }
        if let Some(pct) = take_profit_pct {
            position.set_take_profit_pct(pct);
        }

        tracing::debug!(
            symbol,
            stop_loss = position.stop_loss_price,
            take_profit = position.take_profit_price,
            "position thresholds overridden"
        );
        Ok(())
    }
}

//number of trend conditions that currently hold
fn trend_score(settings: &DynamicTakeProfit, trend: &TrendStrength) -> u32 {
    let mut score = 0;
    if trend.rsi > settings.rsi_threshold {
        score += 1;
    }
    if trend.volume_ratio > settings.volume_multiplier {
        score += 1;
    }
    score
}

impl RiskControl for RiskManager {
    fn add_position(
        &mut self,
        symbol: &str,
        entry_price: f64,
        direction: Direction,
    ) -> Result<(), RiskError> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(RiskError::InvalidPrice {
                symbol: symbol.to_string(),
                price: entry_price,
            });
        }

        if let Some(existing) = self.positions.get(symbol) {
            return Err(RiskError::AlreadyTracked {
                symbol: symbol.to_string(),
                entry_price: existing.entry_price,
            });
        }

        let position = TrackedPosition::open(
            symbol.to_string(),
            direction,
            entry_price,
            self.config.stop_loss_pct,
            self.config.take_profit_pct,
        );

        tracing::debug!(
            symbol,
            %direction,
            entry_price,
            stop_loss = position.stop_loss_price,
            take_profit = position.take_profit_price,
            "tracking position"
        );

        self.positions.insert(symbol.to_string(), position);
        Ok(())
    }

    fn remove_position(&mut self, symbol: &str) {
        self.positions.remove(symbol);
    }

    fn check_exit_signals(
        &mut self,
        symbol: &str,
        current_price: f64,
        trend: Option<TrendStrength>,
    ) -> ExitSignal {
        let Some(position) = self.positions.get_mut(symbol) else {
            return ExitSignal::Hold;
        };

        if !current_price.is_finite() || current_price <= 0.0 {
            tracing::warn!(symbol, current_price, "ignoring invalid price in exit check");
            return ExitSignal::Hold;
        }

        position.update_watermark(current_price);

        //stop family first, a stop beats a simultaneous take-profit
        let fixed = position
            .crossed_stop(position.stop_loss_price, current_price)
            .then_some(position.stop_loss_price);

        let trailing = self.config.trailing_stop_pct.and_then(|trail| {
            let level = position.trailing_stop_price(trail);
            position.crossed_stop(level, current_price).then_some(level)
        });

        let stop = match (fixed, trailing) {
            (Some(f), Some(t)) if position.is_tighter(t, f) => Some((StopTrigger::Trailing, t)),
            (Some(f), _) => Some((StopTrigger::Fixed, f)),
            (None, Some(t)) => Some((StopTrigger::Trailing, t)),
            (None, None) => None,
        };

        if let Some((trigger, threshold)) = stop {
            return ExitSignal::StopLoss { trigger, threshold };
        }

        if let (Some(settings), Some(trend)) = (&self.config.dynamic_take_profit, trend) {
            let score = trend_score(settings, &trend);
            let pct = position.take_profit_pct + score as f64 * settings.trend_bonus;
            position.take_profit_price = position.favorable_price(pct);
        }

        if position.reached_target(current_price) {
            return ExitSignal::TakeProfit {
                threshold: position.take_profit_price,
            };
        }

        ExitSignal::Hold
    }

    fn get_position_size(&mut self, request: &SizingRequest) -> u64 {
        let price = request.current_price;
        if !price.is_finite() || price <= 0.0 {
            tracing::warn!(price, "cannot size a position at a non-positive price");
            return 0;
        }

        let remaining_allocation = request.total_portfolio_value * request.max_position_fraction
            - request.current_total_position_value;

        //allocation cap already reached
        if remaining_allocation <= 0.0 {
            return 0;
        }

        let mut usable_cash =
            (request.available_cash - self.committed_today).min(remaining_allocation);
        if let Some(cap) = request.max_notional {
            usable_cash = usable_cash.min(cap);
        }

        if !usable_cash.is_finite() || usable_cash < price {
            return 0;
        }

        let size = (usable_cash / price).floor() as u64;
        if size > 0 {
            self.committed_today += size as f64 * price;
        }
        size
    }

    fn reset_daily_cash(&mut self) {
        self.committed_today = 0.0;
    }

    fn max_position_fraction(&self) -> f64 {
        self.config.max_position_size
    }

    fn trend_periods(&self) -> Option<(usize, usize)> {
        self.config
            .dynamic_take_profit
            .as_ref()
            .map(|d| (d.rsi_period, d.volume_period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn manager() -> RiskManager {
        RiskManager::new(RiskConfig::default()).unwrap()
    }

    fn request(available_cash: f64, price: f64) -> SizingRequest {
        SizingRequest {
            available_cash,
            current_price: price,
            total_portfolio_value: 100_000.0,
            current_total_position_value: 0.0,
            max_position_fraction: 1.0,
            max_notional: None,
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = RiskConfig {
            stop_loss_pct: -0.1,
            ..RiskConfig::default()
        };
        assert!(RiskManager::new(config).is_err());

        let config = RiskConfig {
            max_position_size: 0.0,
            ..RiskConfig::default()
        };
        assert!(RiskManager::new(config).is_err());
    }

    #[test]
    fn unknown_symbol_holds() {
        let mut rm = manager();
        assert_eq!(rm.check_exit_signals("NOPE", 1.0, None), ExitSignal::Hold);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut rm = manager();
        rm.remove_position("SPY");
        rm.add_position("SPY", 100.0, Direction::Long).unwrap();
        rm.remove_position("SPY");
        rm.remove_position("SPY");
        assert!(!rm.is_tracked("SPY"));
        assert_eq!(rm.check_exit_signals("SPY", 10.0, None), ExitSignal::Hold);
    }

    #[test]
    fn add_rejects_bad_price_and_duplicates() {
        let mut rm = manager();
        assert!(matches!(
            rm.add_position("SPY", -1.0, Direction::Long),
            Err(RiskError::InvalidPrice { .. })
        ));

        rm.add_position("SPY", 100.0, Direction::Long).unwrap();
        assert!(matches!(
            rm.add_position("SPY", 120.0, Direction::Long),
            Err(RiskError::AlreadyTracked { .. })
        ));
        assert_eq!(rm.position("SPY").unwrap().entry_price, 100.0);
    }

    #[test]
    fn fixed_stop_and_target() {
        let mut rm = manager();
        rm.add_position("SPY", 100.0, Direction::Long).unwrap();

        assert_eq!(rm.check_exit_signals("SPY", 95.0, None), ExitSignal::Hold);
        assert!(matches!(
            rm.check_exit_signals("SPY", 90.0, None),
            ExitSignal::StopLoss {
                trigger: StopTrigger::Fixed,
                ..
            }
        ));

        let signal = rm.check_exit_signals("SPY", 120.5, None);
        assert!(matches!(signal, ExitSignal::TakeProfit { .. }));
        assert_eq!(signal.exit_type(), Some(crate::ledger::ExitType::TakeProfit));
    }

    #[test]
    fn stop_loss_wins_when_both_cross() {
        let config = RiskConfig {
            stop_loss_pct: 0.1,
            take_profit_pct: 0.05,
            ..RiskConfig::default()
        };
        let mut rm = RiskManager::new(config).unwrap();
        rm.add_position("SPY", 100.0, Direction::Long).unwrap();
        assert_relative_eq!(
            rm.position("SPY").unwrap().take_profit_price,
            105.0,
            epsilon = 1e-9
        );

        //pull the target under the price so both conditions hold at 89
        rm.positions.get_mut("SPY").unwrap().take_profit_price = 85.0;

        let signal = rm.check_exit_signals("SPY", 89.0, None);
        assert!(matches!(signal, ExitSignal::StopLoss { .. }));
        assert_eq!(signal.exit_type(), Some(crate::ledger::ExitType::StopLoss));
    }

    #[test]
    fn short_exits_mirror_long() {
        let mut rm = manager();
        rm.add_position("QQQ", 100.0, Direction::Short).unwrap();
        assert_eq!(rm.check_exit_signals("QQQ", 105.0, None), ExitSignal::Hold);
        assert!(matches!(
            rm.check_exit_signals("QQQ", 110.0, None),
            ExitSignal::StopLoss { .. }
        ));

        rm.remove_position("QQQ");
        rm.add_position("QQQ", 100.0, Direction::Short).unwrap();
        assert!(matches!(
            rm.check_exit_signals("QQQ", 79.0, None),
            ExitSignal::TakeProfit { .. }
        ));
    }

    #[test]
    fn trailing_stop_follows_watermark() {
        let config = RiskConfig {
            trailing_stop_pct: Some(0.05),
            ..RiskConfig::default()
        };
        let mut rm = RiskManager::new(config).unwrap();
        rm.add_position("SPY", 100.0, Direction::Long).unwrap();

        assert_eq!(rm.check_exit_signals("SPY", 110.0, None), ExitSignal::Hold);
        assert_eq!(rm.position("SPY").unwrap().watermark, 110.0);

        //110 * 0.95 = 104.5
        match rm.check_exit_signals("SPY", 104.0, None) {
            ExitSignal::StopLoss { trigger, threshold } => {
                assert_eq!(trigger, StopTrigger::Trailing);
                assert_relative_eq!(threshold, 104.5, epsilon = 1e-9);
            }
            other => panic!("expected trailing stop, got {other:?}"),
        }
    }

    #[test]
    fn short_trailing_stop_follows_low_watermark() {
        let config = RiskConfig {
            trailing_stop_pct: Some(0.05),
            ..RiskConfig::default()
        };
        let mut rm = RiskManager::new(config).unwrap();
        rm.add_position("QQQ", 100.0, Direction::Short).unwrap();

        assert_eq!(rm.check_exit_signals("QQQ", 90.0, None), ExitSignal::Hold);
        assert_eq!(rm.position("QQQ").unwrap().watermark, 90.0);
        assert_eq!(rm.check_exit_signals("QQQ", 94.0, None), ExitSignal::Hold);

        //90 * 1.05 = 94.5, well inside the fixed stop at 110
        match rm.check_exit_signals("QQQ", 95.0, None) {
            ExitSignal::StopLoss { trigger, threshold } => {
                assert_eq!(trigger, StopTrigger::Trailing);
                assert_relative_eq!(threshold, 94.5, epsilon = 1e-9);
            }
            other => panic!("expected trailing stop, got {other:?}"),
        }
    }

    #[test]
    fn tighter_stop_is_reported_when_both_fire() {
        let config = RiskConfig {
            stop_loss_pct: 0.1,
            trailing_stop_pct: Some(0.05),
            ..RiskConfig::default()
        };
        let mut rm = RiskManager::new(config).unwrap();
        rm.add_position("SPY", 100.0, Direction::Long).unwrap();

        //fixed stop 90, trailing stop 95 off the entry watermark
        match rm.check_exit_signals("SPY", 85.0, None) {
            ExitSignal::StopLoss { trigger, threshold } => {
                assert_eq!(trigger, StopTrigger::Trailing);
                assert_relative_eq!(threshold, 95.0, epsilon = 1e-9);
            }
            other => panic!("expected stop, got {other:?}"),
        }
    }

    #[test]
    fn dynamic_take_profit_extends_target_on_strength() {
        let config = RiskConfig {
            dynamic_take_profit: Some(DynamicTakeProfit::default()),
            ..RiskConfig::default()
        };
        let mut rm = RiskManager::new(config).unwrap();
        rm.add_position("SPY", 100.0, Direction::Long).unwrap();

        let strong = TrendStrength {
            rsi: 75.0,
            volume_ratio: 1.0,
        };
        //target moves from 120 to 130, so 125 holds
        assert_eq!(rm.check_exit_signals("SPY", 125.0, Some(strong)), ExitSignal::Hold);
        assert_relative_eq!(
            rm.position("SPY").unwrap().take_profit_price,
            130.0,
            epsilon = 1e-9
        );

        let weak = TrendStrength {
            rsi: 50.0,
            volume_ratio: 1.0,
        };
        assert!(matches!(
            rm.check_exit_signals("SPY", 125.0, Some(weak)),
            ExitSignal::TakeProfit { .. }
        ));
    }

    #[test]
    fn dynamic_target_never_drops_below_baseline() {
        let config = RiskConfig {
            dynamic_take_profit: Some(DynamicTakeProfit::default()),
            ..RiskConfig::default()
        };
        let mut rm = RiskManager::new(config).unwrap();
        rm.add_position("SPY", 100.0, Direction::Long).unwrap();
        let weak = TrendStrength {
            rsi: 10.0,
            volume_ratio: 0.1,
        };
        rm.check_exit_signals("SPY", 101.0, Some(weak));
        assert!(rm.position("SPY").unwrap().take_profit_price >= 120.0 - 1e-9);
    }

    #[test]
    fn update_position_params_overrides_thresholds() {
        let mut rm = manager();
        rm.add_position("SPY", 100.0, Direction::Long).unwrap();
        rm.update_position_params("SPY", Some(0.05), Some(0.5)).unwrap();

        let p = rm.position("SPY").unwrap();
        assert_relative_eq!(p.stop_loss_price, 95.0, epsilon = 1e-9);
        assert_relative_eq!(p.take_profit_price, 150.0, epsilon = 1e-9);

        assert!(rm.update_position_params("SPY", Some(1.5), None).is_err());
        assert!(rm.update_position_params("NOPE", Some(0.2), None).is_ok());
    }

    #[test]
    fn sizing_is_capped_by_allocation() {
        let mut rm = manager();
        let size = rm.get_position_size(&SizingRequest {
            available_cash: 50_000.0,
            current_price: 10.0,
            total_portfolio_value: 100_000.0,
            current_total_position_value: 29_000.0,
            max_position_fraction: 0.3,
            max_notional: None,
        });
        assert_eq!(size, 100);
        assert_relative_eq!(rm.committed_today(), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn sizing_returns_zero_at_allocation_cap() {
        let mut rm = manager();
        let size = rm.get_position_size(&SizingRequest {
            available_cash: 50_000.0,
            current_price: 10.0,
            total_portfolio_value: 100_000.0,
            current_total_position_value: 30_000.0,
            max_position_fraction: 0.3,
            max_notional: None,
        });
        assert_eq!(size, 0);
        assert_eq!(rm.committed_today(), 0.0);
    }

    #[test]
    fn daily_cash_is_not_spent_twice() {
        let mut rm = manager();
        assert_eq!(rm.get_position_size(&request(10_000.0, 100.0)), 100);
        assert_eq!(rm.get_position_size(&request(10_000.0, 100.0)), 0);

        rm.reset_daily_cash();
        assert_eq!(rm.get_position_size(&request(10_000.0, 100.0)), 100);
    }

    #[test]
    fn sizing_floors_and_respects_notional_cap() {
        let mut rm = manager();
        assert_eq!(rm.get_position_size(&request(99.0, 100.0)), 0);
        assert_eq!(rm.get_position_size(&request(1_050.0, 100.0)), 10);

        rm.reset_daily_cash();
        let capped = SizingRequest {
            max_notional: Some(2_000.0),
            ..request(10_000.0, 30.0)
        };
        assert_eq!(rm.get_position_size(&capped), 66);
    }

    #[test]
    fn sizing_ignores_invalid_price() {
        let mut rm = manager();
        assert_eq!(rm.get_position_size(&request(10_000.0, 0.0)), 0);
        assert_eq!(rm.get_position_size(&request(10_000.0, f64::NAN)), 0);
    }
}
