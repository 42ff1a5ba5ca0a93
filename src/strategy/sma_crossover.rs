use crate::config::SmaParams;
use crate::risk::Direction;
use crate::strategy::indicators::sma;
use crate::strategy::{Signal, Strategy, SymbolHistory};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cross {
    Bullish,
    Bearish,
}

//sma crossover strategy, long only
//enters when fast sma crosses above slow sma
//exits when fast sma crosses below slow sma
#[derive(Debug, Clone)]
pub struct SmaCrossoverStrategy {
    fast_window: usize,
    slow_window: usize,
}

impl SmaCrossoverStrategy {
    pub fn new(params: SmaParams) -> Self {
        SmaCrossoverStrategy {
            fast_window: params.fast_window,
            slow_window: params.slow_window,
        }
    }

    //fast and slow sma over a close window ending at its last value
    fn averages(&self, closes: &[f64]) -> Option<(f64, f64)> {
        let fast = sma(&closes[closes.len().saturating_sub(self.fast_window)..])?;
        let slow = sma(&closes[closes.len().saturating_sub(self.slow_window)..])?;
        Some((fast, slow))
    }

    fn check_crossover(&self, closes: &[f64]) -> Option<Cross> {
        let (prev_fast, prev_slow) = self.averages(&closes[..closes.len() - 1])?;
        let (fast, slow) = self.averages(&closes[1..])?;

        //bullish crossover fast crosses above slow
        if prev_fast <= prev_slow && fast > slow {
            return Some(Cross::Bullish);
        }
        //bearish crossover fast crosses below slow
        if prev_fast >= prev_slow && fast < slow {
            return Some(Cross::Bearish);
        }
        None
    }
}

impl Strategy for SmaCrossoverStrategy {
    fn name(&self) -> &str {
        "SMA Crossover"
    }

    fn warmup(&self) -> usize {
        self.slow_window + 1
    }

    fn on_bar(&mut self, history: &SymbolHistory) -> Signal {
        //need slow_window bars for today and yesterday
        if history.bar_count() < self.warmup() {
            return Signal::Hold;
        }

        let closes = history.closes(self.warmup());
        match self.check_crossover(&closes) {
            Some(Cross::Bullish) => Signal::Enter(Direction::Long),
            Some(Cross::Bearish) => Signal::Exit,
            None => Signal::Hold,
        }
    }
}
