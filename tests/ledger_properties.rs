use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use tradeguard::ledger::{ExitType, LedgerMetrics, OrderMetric};
use tradeguard::risk::Direction;

#[derive(Debug, Clone)]
struct TradePlan {
    symbol: usize,
    direction: Direction,
    entry_price: f64,
    exit_price: f64,
    size: u64,
    commission: f64,
    holding_days: i64,
    exit_type: ExitType,
    marks: Vec<f64>,
}

fn trade_plan() -> impl Strategy<Value = TradePlan> {
    (
        0usize..3,
        prop_oneof![Just(Direction::Long), Just(Direction::Short)],
        1.0f64..500.0,
        1.0f64..500.0,
        1u64..1_000,
        0.0f64..25.0,
        0i64..60,
        prop_oneof![
            Just(ExitType::StopLoss),
            Just(ExitType::TakeProfit),
            Just(ExitType::Signal)
        ],
        prop::collection::vec(1.0f64..500.0, 0..5),
    )
        .prop_map(
            |(symbol, direction, entry_price, exit_price, size, commission, holding_days, exit_type, marks)| {
                TradePlan {
                    symbol,
                    direction,
                    entry_price,
                    exit_price,
                    size,
                    commission,
                    holding_days,
                    exit_type,
                    marks,
                }
            },
        )
}

const SYMBOLS: [&str; 3] = ["SPY", "QQQ", "IWM"];

fn run_ledger(plans: &[TradePlan]) -> OrderMetric {
    let mut ledger = OrderMetric::new();
    let mut clock = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();

    for plan in plans {
        let symbol = SYMBOLS[plan.symbol];
        ledger
            .on_trade_entry(
                symbol,
                clock,
                plan.entry_price,
                plan.size,
                plan.direction,
                plan.commission,
            )
            .unwrap();
        for &price in &plan.marks {
            ledger.mark_price(symbol, price);
        }

        clock += Duration::days(plan.holding_days);
        ledger.on_trade_exit(symbol, clock, plan.exit_price, plan.commission, plan.exit_type);
        clock += Duration::days(1);
    }
    ledger
}

proptest! {
    #[test]
    fn metrics_match_a_replay_of_the_trade_log(plans in prop::collection::vec(trade_plan(), 0..40)) {
        let ledger = run_ledger(&plans);
        prop_assert_eq!(ledger.get_metrics(), LedgerMetrics::replay(ledger.trades()));
    }

    #[test]
    fn counts_and_totals_are_consistent(plans in prop::collection::vec(trade_plan(), 1..40)) {
        let ledger = run_ledger(&plans);
        let metrics = ledger.get_metrics();

        prop_assert_eq!(metrics.total_trades, plans.len());
        prop_assert_eq!(metrics.winning_trades + metrics.losing_trades, metrics.total_trades);
        prop_assert_eq!(metrics.exit_types.total(), metrics.total_trades);
        prop_assert_eq!(ledger.holding_periods().len(), metrics.total_trades);

        let per_symbol: usize = metrics.symbols.values().map(|s| s.total_trades).sum();
        prop_assert_eq!(per_symbol, metrics.total_trades);

        prop_assert!(metrics.win_rate >= 0.0 && metrics.win_rate <= 100.0);
        prop_assert!(metrics.max_loss <= 0.0);
        prop_assert!(metrics.max_profit >= 0.0);
        prop_assert!(ledger.trades().iter().all(|t| t.max_drawdown_pct >= 0.0));
        prop_assert!(!ledger.has_active_trade("SPY"));
    }
}
