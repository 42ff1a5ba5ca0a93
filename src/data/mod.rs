pub mod adjust;
pub mod bar;
pub mod loader;

pub use adjust::{adjust_bars, load_dividends, load_splits, Dividend, Split};
pub use bar::{Bar, BarError};
pub use loader::{filter_by_symbol, load_bars, load_csv, load_symbol_csv, merge_bars, write_csv};
