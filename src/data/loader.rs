use crate::data::bar::Bar;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

//accepts both the combined format (lowercase, with a symbol column) and
//per-symbol exports (capitalized columns, no symbol)
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "date", alias = "Date", alias = "datetime")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
    #[serde(default, alias = "Symbol", alias = "ticker")]
    symbol: Option<String>,
}

#[derive(Debug, Serialize)]
struct CsvOutRecord<'a> {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    symbol: &'a str,
}

//parses rfc3339, "YYYY-MM-DD HH:MM:SS" (utc) or a bare date
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn read_bars(path: &Path, default_symbol: Option<&str>) -> Result<Vec<Bar>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut bars = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let line = index + 2;
        let record: CsvRecord =
            result.context(format!("Failed to parse CSV record at line {}", line))?;

        let timestamp = parse_timestamp(&record.timestamp).context(format!(
            "Failed to parse timestamp '{}' at line {}",
            record.timestamp, line
        ))?;

        let symbol = match (default_symbol, record.symbol) {
            (Some(symbol), _) => symbol.to_string(),
            (None, Some(symbol)) => symbol,
            (None, None) => anyhow::bail!("Missing symbol at line {} of {:?}", line, path),
        };

        //bad rows are dropped, not fatal
        match Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
            symbol,
        ) {
            Ok(bar) => bars.push(bar),
            Err(err) => tracing::warn!(line, path = ?path, error = %err, "skipping invalid bar"),
        }
    }

    //sort by timestamp to ensure chronological order
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    Ok(bars)
}

//loads bars from a csv file with a symbol column
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    read_bars(path.as_ref(), None)
}

//loads one symbol's bars from a csv without a symbol column
pub fn load_symbol_csv<P: AsRef<Path>>(path: P, symbol: &str) -> Result<Vec<Bar>> {
    read_bars(path.as_ref(), Some(symbol))
}

//loads the configured symbols from a combined csv or a directory of
//SYMBOL.day.csv files and merges them into one time-ordered stream
pub fn load_bars<P: AsRef<Path>>(path: P, symbols: &[String]) -> Result<Vec<Bar>> {
    let path = path.as_ref();

    if path.is_dir() {
        let mut sets = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let file = path.join(format!("{}.day.csv", symbol));
            if !file.exists() {
                tracing::warn!(symbol = %symbol, file = ?file, "no data file for symbol");
                continue;
            }
            sets.push(load_symbol_csv(&file, symbol)?);
        }
        return Ok(merge_bars(sets));
    }

    let wanted: HashSet<&str> = symbols.iter().map(String::as_str).collect();
    let bars = load_csv(path)?
        .into_iter()
        .filter(|bar| wanted.contains(bar.symbol.as_str()))
        .collect();
    Ok(merge_bars(vec![bars]))
}

//merges per-symbol series ordered by (timestamp, symbol)
//a repeated (timestamp, symbol) keeps the first bar seen
pub fn merge_bars(sets: Vec<Vec<Bar>>) -> Vec<Bar> {
    let mut merged: Vec<Bar> = sets.into_iter().flatten().collect();
    merged.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let before = merged.len();
    merged.dedup_by(|later, earlier| {
        later.timestamp == earlier.timestamp && later.symbol == earlier.symbol
    });
    if merged.len() < before {
        tracing::warn!(dropped = before - merged.len(), "dropped duplicate bars");
    }

    merged
}

//filters bars by symbol
pub fn filter_by_symbol(bars: &[Bar], symbol: &str) -> Vec<Bar> {
    bars.iter()
        .filter(|bar| bar.symbol == symbol)
        .cloned()
        .collect()
}

//writes bars in the combined csv format
pub fn write_csv<P: AsRef<Path>>(path: P, bars: &[Bar]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .context(format!("Failed to create CSV file: {:?}", path))?;

    for bar in bars {
        writer.serialize(CsvOutRecord {
            timestamp: bar.timestamp.to_rfc3339(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            symbol: &bar.symbol,
        })?;
    }
    writer.flush()?;
    Ok(())
}
