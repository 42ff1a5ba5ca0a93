use crate::data::bar::Bar;
use crate::data::loader::parse_timestamp;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;

//cash dividend event
#[derive(Debug, Clone, PartialEq)]
pub struct Dividend {
    pub symbol: String,
    pub ex_date: NaiveDate,
    pub cash_amount: f64,
}

//split or reverse split event, split_from shares become split_to shares
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub symbol: String,
    pub execution_date: NaiveDate,
    pub split_from: f64,
    pub split_to: f64,
}

impl Split {
    pub fn factor(&self) -> f64 {
        self.split_from / self.split_to
    }
}

#[derive(Debug, Deserialize)]
struct DividendRecord {
    ticker: String,
    #[serde(default)]
    currency: Option<String>,
    ex_dividend_date: String,
    cash_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SplitRecord {
    ticker: String,
    execution_date: String,
    split_from: f64,
    split_to: f64,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|ts| ts.date_naive())
}

//loads usd cash dividends for the given symbols
pub fn load_dividends<P: AsRef<Path>>(path: P, symbols: &[String]) -> Result<Vec<Dividend>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open dividends file: {:?}", path))?;

    let mut dividends = Vec::new();
    for result in reader.deserialize() {
        let record: DividendRecord = result.context("Failed to parse dividend record")?;
        if !symbols.contains(&record.ticker) {
            continue;
        }
        if record.currency.as_deref().is_some_and(|c| c != "USD") {
            continue;
        }

        let (Some(ex_date), Some(cash_amount)) =
            (parse_date(&record.ex_dividend_date), record.cash_amount)
        else {
            tracing::warn!(symbol = %record.ticker, "skipping invalid dividend record");
            continue;
        };

        dividends.push(Dividend {
            symbol: record.ticker,
            ex_date,
            cash_amount,
        });
    }

    Ok(dividends)
}

//loads splits for the given symbols
pub fn load_splits<P: AsRef<Path>>(path: P, symbols: &[String]) -> Result<Vec<Split>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open splits file: {:?}", path))?;

    let mut splits = Vec::new();
    for result in reader.deserialize() {
        let record: SplitRecord = result.context("Failed to parse split record")?;
        if !symbols.contains(&record.ticker) {
            continue;
        }

        let Some(execution_date) = parse_date(&record.execution_date) else {
            tracing::warn!(symbol = %record.ticker, "skipping split with bad date");
            continue;
        };
        if record.split_from <= 0.0 || record.split_to <= 0.0 {
            tracing::warn!(symbol = %record.ticker, "skipping split with non-positive ratio");
            continue;
        }

        splits.push(Split {
            symbol: record.ticker,
            execution_date,
            split_from: record.split_from,
            split_to: record.split_to,
        });
    }

    Ok(splits)
}

//computes one back-adjustment factor per bar of a single symbol
//bars must be sorted by time, events dated outside the bar range are skipped
pub fn adjustment_factors(bars: &[Bar], dividends: &[Dividend], splits: &[Split]) -> Vec<f64> {
    let mut factors = vec![1.0; bars.len()];
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return factors;
    };
    let symbol = first.symbol.as_str();
    let (start, end) = (first.date(), last.date());

    //index of the first bar on or after a date
    let boundary = |date: NaiveDate| bars.partition_point(|bar| bar.date() < date);

    for dividend in dividends.iter().filter(|d| d.symbol == symbol) {
        if dividend.ex_date <= start || dividend.ex_date > end {
            tracing::warn!(symbol, ex_date = %dividend.ex_date, "dividend outside data range, skipped");
            continue;
        }

        let cut = boundary(dividend.ex_date);
        let prev_close = bars[cut - 1].close;
        let factor = (prev_close - dividend.cash_amount) / prev_close;
        if !(factor > 0.0 && factor.is_finite()) {
            tracing::warn!(symbol, ex_date = %dividend.ex_date, cash = dividend.cash_amount, "dividend exceeds close, skipped");
            continue;
        }

        tracing::debug!(symbol, ex_date = %dividend.ex_date, factor, "dividend adjustment");
        factors[..cut].iter_mut().for_each(|f| *f *= factor);
    }

    for split in splits.iter().filter(|s| s.symbol == symbol) {
        if split.execution_date <= start || split.execution_date > end {
            tracing::warn!(symbol, date = %split.execution_date, "split outside data range, skipped");
            continue;
        }

        let cut = boundary(split.execution_date);
        let factor = split.factor();
        tracing::debug!(symbol, date = %split.execution_date, factor, "split adjustment");
        factors[..cut].iter_mut().for_each(|f| *f *= factor);
    }

    factors
}

//returns back-adjusted copies of one symbol's bars
pub fn adjust_bars(bars: &[Bar], dividends: &[Dividend], splits: &[Split]) -> Vec<Bar> {
    let factors = adjustment_factors(bars, dividends, splits);
    bars.iter()
        .zip(factors)
        .map(|(bar, factor)| bar.scaled(factor))
        .collect()
}
