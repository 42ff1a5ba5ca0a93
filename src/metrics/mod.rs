pub mod report;
pub mod summary;
pub mod timeseries;

pub use report::{print_ledger_report, write_equity_csv, write_trades_csv};
pub use summary::PerformanceSummary;
pub use timeseries::{calculate_equity_curve, EquityPoint, EquitySample};
