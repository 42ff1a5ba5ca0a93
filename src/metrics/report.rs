use crate::ledger::{ExitType, LedgerMetrics, TradeRecord};
use crate::metrics::timeseries::EquityPoint;
use anyhow::{Context, Result};
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::path::Path;

fn metric_row(name: &str, value: String) -> Row {
    Row::new(vec![Cell::new(name), Cell::new(&value)])
}

//ledger statistics as a two column table
pub fn ledger_table(metrics: &LedgerMetrics) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![Cell::new("Trade Metric"), Cell::new("Value")]));

    table.add_row(metric_row("Total Trades", metrics.total_trades.to_string()));
    table.add_row(metric_row("Winning Trades", metrics.winning_trades.to_string()));
    table.add_row(metric_row("Losing Trades", metrics.losing_trades.to_string()));
    table.add_row(metric_row("Win Rate", format!("{:.2}%", metrics.win_rate)));
    table.add_row(metric_row("Total PnL", format!("${:.2}", metrics.total_pnl)));
    table.add_row(metric_row("Max Profit", format!("${:.2}", metrics.max_profit)));
    table.add_row(metric_row("Max Loss", format!("${:.2}", metrics.max_loss)));
    table.add_row(metric_row(
        "Total Commission",
        format!("${:.2}", metrics.total_commission),
    ));
    table.add_row(metric_row("Profit Factor", format!("{:.3}", metrics.profit_factor)));
    table.add_row(metric_row(
        "Avg Holding Period",
        format!("{:.1} days", metrics.avg_holding_period),
    ));

    for exit_type in [ExitType::StopLoss, ExitType::TakeProfit, ExitType::Signal] {
        table.add_row(metric_row(
            &format!("Exits: {}", exit_type),
            metrics.exit_types.get(exit_type).to_string(),
        ));
    }

    table
}

//one row per traded symbol
pub fn symbol_table(metrics: &LedgerMetrics) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(
        [
            "Symbol",
            "Trades",
            "Wins",
            "Win Rate",
            "PnL",
            "Max Profit",
            "Max Loss",
            "Commission",
            "Max DD",
        ]
        .iter()
        .map(|h| Cell::new(h))
        .collect(),
    ));

    for (symbol, stats) in &metrics.symbols {
        table.add_row(Row::new(vec![
            Cell::new(symbol),
            Cell::new(&stats.total_trades.to_string()),
            Cell::new(&stats.winning_trades.to_string()),
            Cell::new(&format!("{:.2}%", stats.win_rate)),
            Cell::new(&format!("{:.2}", stats.total_pnl)),
            Cell::new(&format!("{:.2}", stats.max_profit)),
            Cell::new(&format!("{:.2}", stats.max_loss)),
            Cell::new(&format!("{:.2}", stats.total_commission)),
            Cell::new(&format!("{:.2}%", stats.max_drawdown_pct)),
        ]));
    }

    table
}

pub fn print_ledger_report(metrics: &LedgerMetrics) {
    ledger_table(metrics).printstd();
    if !metrics.symbols.is_empty() {
        symbol_table(metrics).printstd();
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .context(format!("Failed to create CSV file: {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

//writes the trade log
pub fn write_trades_csv<P: AsRef<Path>>(path: P, trades: &[TradeRecord]) -> Result<()> {
    write_rows(path.as_ref(), trades)
}

//writes the equity curve
pub fn write_equity_csv<P: AsRef<Path>>(path: P, equity_curve: &[EquityPoint]) -> Result<()> {
    write_rows(path.as_ref(), equity_curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::Direction;
    use chrono::{TimeZone, Utc};

    fn trade() -> TradeRecord {
        TradeRecord {
            symbol: "SPY".into(),
            entry_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            entry_price: 100.0,
            size: 10,
            direction: Direction::Long,
            commission: 2.0,
            exit_time: Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap(),
            exit_price: 90.0,
            exit_type: ExitType::StopLoss,
            pnl: -102.0,
            holding_days: 7,
            max_drawdown_pct: 0.1,
        }
    }

    #[test]
    fn trades_csv_uses_wire_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        write_trades_csv(&path, &[trade()]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("symbol,entry_time,entry_price,size,direction"));
        let row = lines.next().unwrap();
        assert!(row.contains(",buy,"));
        assert!(row.contains(",stop_loss,"));
    }

    #[test]
    fn tables_have_a_row_per_metric_and_symbol() {
        let metrics = LedgerMetrics::replay(&[trade()]);
        assert_eq!(ledger_table(&metrics).len(), 14);
        assert_eq!(symbol_table(&metrics).len(), 2);
    }
}
