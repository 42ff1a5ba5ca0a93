use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tradeguard::data::{load_symbol_csv, write_csv};
use tradeguard::engine::{best_by_sharpe, risk_grid, run_sweep, sweep_table};
use tradeguard::logging::init_logging;
use tradeguard::metrics::{print_ledger_report, write_equity_csv, write_trades_csv};
use tradeguard::prelude::*;

#[derive(Parser)]
#[command(name = "tradeguard")]
#[command(about = "Risk-managed equity backtests", long_about = None)]
struct Cli {
    //log level filter, RUST_LOG overrides it
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run a backtest
    Run {
        #[command(flatten)]
        common: CommonArgs,

        //output path for equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,

        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,

        //write the effective configuration as json
        #[arg(long)]
        save_config: Option<PathBuf>,
    },

    //run a stop-loss / take-profit grid in parallel
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        //stop-loss fractions to try
        #[arg(long, value_delimiter = ',', default_value = "0.05,0.1,0.15")]
        stop_losses: Vec<f64>,

        //take-profit fractions to try
        #[arg(long, value_delimiter = ',', default_value = "0.1,0.2,0.3")]
        take_profits: Vec<f64>,
    },

    //back-adjust per-symbol csv files for splits and dividends
    Adjust {
        //directory of SYMBOL.day.csv files
        #[arg(long)]
        data: PathBuf,

        #[arg(long, value_delimiter = ',', required = true)]
        symbols: Vec<String>,

        //dividends csv (ticker, currency, ex_dividend_date, cash_amount)
        #[arg(long)]
        dividends: PathBuf,

        //splits csv (ticker, execution_date, split_from, split_to)
        #[arg(long)]
        splits: PathBuf,

        //output directory
        #[arg(long)]
        output: PathBuf,
    },
}

//settings shared by run and sweep, flags override the config file
#[derive(Args)]
struct CommonArgs {
    //json configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    //csv file with a symbol column or a directory of SYMBOL.day.csv files
    #[arg(long)]
    data: Option<PathBuf>,

    #[arg(long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    //strategy type (sma, macd_rsi, dual_thrust, dca)
    #[arg(long)]
    strategy: Option<String>,

    #[arg(long)]
    initial_cash: Option<f64>,

    #[arg(long)]
    commission_rate: Option<f64>,

    #[arg(long)]
    slippage_pct: Option<f64>,

    #[arg(long)]
    stop_loss: Option<f64>,

    #[arg(long)]
    take_profit: Option<f64>,

    //maximum fraction of portfolio value in positions
    #[arg(long)]
    max_position: Option<f64>,

    #[arg(long)]
    trailing_stop: Option<f64>,
}

impl CommonArgs {
    fn resolve(&self) -> Result<BacktestConfiguration> {
        let mut config = match &self.config {
            Some(path) => BacktestConfiguration::from_json_file(path)
                .context(format!("Failed to read config {:?}", path))?,
            None => BacktestConfiguration::default(),
        };

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(symbols) = &self.symbols {
            config.symbols = symbols.clone();
        }
        if let Some(name) = &self.strategy {
            let strategy_type = StrategyType::parse(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown strategy: {}", name))?;
            if config.strategy.strategy_type() != strategy_type {
                config.strategy = StrategyParams::defaults(strategy_type);
            }
        }
        if let Some(cash) = self.initial_cash {
            config.initial_cash = cash;
        }
        if let Some(rate) = self.commission_rate {
            config.commission_rate = rate;
        }
        if let Some(slippage) = self.slippage_pct {
            config.slippage_pct = slippage;
        }
        if let Some(stop_loss) = self.stop_loss {
            config.risk.stop_loss_pct = stop_loss;
        }
        if let Some(take_profit) = self.take_profit {
            config.risk.take_profit_pct = take_profit;
        }
        if let Some(max_position) = self.max_position {
            config.risk.max_position_size = max_position;
        }
        if self.trailing_stop.is_some() {
            config.risk.trailing_stop_pct = self.trailing_stop;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Run {
            common,
            output_equity_csv,
            output_trades_csv,
            save_config,
        } => {
            let mut config = common.resolve()?;
            if output_equity_csv.is_some() {
                config.output_equity_csv = output_equity_csv;
            }
            if output_trades_csv.is_some() {
                config.output_trades_csv = output_trades_csv;
            }
            if let Some(path) = save_config {
                config.to_json_file(&path)?;
                println!("Configuration saved to {:?}", path);
            }
            run_backtest(&config)?;
        }
        Commands::Sweep {
            common,
            stop_losses,
            take_profits,
        } => {
            let config = common.resolve()?;
            run_parameter_sweep(&config, &stop_losses, &take_profits)?;
        }
        Commands::Adjust {
            data,
            symbols,
            dividends,
            splits,
            output,
        } => {
            adjust_prices(&data, &symbols, &dividends, &splits, &output)?;
        }
    }

    Ok(())
}

fn load_engine(config: &BacktestConfiguration) -> Result<BacktestEngine> {
    println!("Loading data from {:?}...", config.data_path);
    let bars = load_bars(&config.data_path, &config.symbols)
        .context(format!("Failed to load data from {:?}", config.data_path))?;

    if bars.is_empty() {
        anyhow::bail!("No data found for symbols {:?}", config.symbols);
    }

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        println!(
            "Loaded {} bars for {} symbol(s), {} to {}\n",
            bars.len(),
            config.symbols.len(),
            first.timestamp,
            last.timestamp
        );
    }

    Ok(BacktestEngine::new(BacktestConfig::from(config), bars))
}

fn run_backtest(config: &BacktestConfiguration) -> Result<()> {
    println!("tradeguard backtest");
    println!("===================\n");

    let engine = load_engine(config)?;

    println!("Strategy: {:?}", config.strategy);
    println!(
        "Risk: stop loss {:.1}%, take profit {:.1}%, max position {:.1}%",
        config.risk.stop_loss_pct * 100.0,
        config.risk.take_profit_pct * 100.0,
        config.risk.max_position_size * 100.0
    );
    println!("Initial cash: ${:.2}\n", config.initial_cash);

    let result = engine.run().context("Backtest failed")?;

    println!("Results: {}", result.strategy);
    println!("================\n");
    result.performance.pretty_print_table();
    print_ledger_report(&result.metrics);
    println!(
        "Commission paid: ${:.2} (ledger ${:.2})",
        result.commission_paid, result.metrics.total_commission
    );

    //save outputs if requested
    if let Some(path) = &config.output_equity_csv {
        write_equity_csv(path, &result.equity_curve)?;
        println!("\nEquity curve saved to {:?}", path);
    }

    if let Some(path) = &config.output_trades_csv {
        write_trades_csv(path, &result.trades)?;
        println!("Trades saved to {:?}", path);
    }

    Ok(())
}

fn run_parameter_sweep(
    config: &BacktestConfiguration,
    stop_losses: &[f64],
    take_profits: &[f64],
) -> Result<()> {
    let engine = load_engine(config)?;
    let grid = risk_grid(&config.risk, stop_losses, take_profits);
    println!("Running {} backtests...\n", grid.len());

    let results = run_sweep(&engine, &grid).context("Sweep failed")?;
    sweep_table(&results).printstd();

    if let Some(best) = best_by_sharpe(&results).and_then(|i| results.get(i)) {
        println!(
            "\nBest Sharpe {:.3}: stop loss {:.1}%, take profit {:.1}%",
            best.performance.sharpe_ratio,
            best.risk.stop_loss_pct * 100.0,
            best.risk.take_profit_pct * 100.0
        );
    }

    Ok(())
}

fn adjust_prices(
    data: &Path,
    symbols: &[String],
    dividends_path: &Path,
    splits_path: &Path,
    output: &Path,
) -> Result<()> {
    let dividends = load_dividends(dividends_path, symbols)?;
    let splits = load_splits(splits_path, symbols)?;
    std::fs::create_dir_all(output)
        .context(format!("Failed to create output directory {:?}", output))?;

    for symbol in symbols {
        let source = data.join(format!("{}.day.csv", symbol));
        if !source.exists() {
            tracing::warn!(symbol = %symbol, file = ?source, "no data file for symbol");
            continue;
        }

        let bars = load_symbol_csv(&source, symbol)?;
        let adjusted = adjust_bars(&bars, &dividends, &splits);
        let target = output.join(format!("{}.day.csv", symbol));
        write_csv(&target, &adjusted)?;
        println!("{}: {} bars adjusted -> {:?}", symbol, adjusted.len(), target);
    }

    Ok(())
}
