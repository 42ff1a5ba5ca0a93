use crate::config::MacdRsiParams;
use crate::risk::Direction;
use crate::strategy::indicators::{macd, rsi};
use crate::strategy::{Signal, Strategy, SymbolHistory};

//macd crossover filtered by rsi, long only
//enters on a golden cross while rsi is below the overbought level
//exits on a death cross or once rsi turns overbought
#[derive(Debug, Clone)]
pub struct MacdRsiStrategy {
    params: MacdRsiParams,
}

impl MacdRsiStrategy {
    pub fn new(params: MacdRsiParams) -> Self {
        MacdRsiStrategy { params }
    }
}

impl Strategy for MacdRsiStrategy {
    fn name(&self) -> &str {
        "MACD RSI"
    }

    fn warmup(&self) -> usize {
        //two signal-line points for the crossover
        (self.params.macd_slow + self.params.macd_signal).max(self.params.rsi_period + 1)
    }

    fn on_bar(&mut self, history: &SymbolHistory) -> Signal {
        if history.bar_count() < self.warmup() {
            return Signal::Hold;
        }

        let p = &self.params;
        let closes = history.closes(history.bar_count());
        let points = macd(&closes, p.macd_fast, p.macd_slow, p.macd_signal);
        let (Some(rsi_value), [.., prev, cur]) = (rsi(&closes, p.rsi_period), points.as_slice())
        else {
            return Signal::Hold;
        };

        let golden_cross = cur.macd > cur.signal && prev.macd <= prev.signal;
        let death_cross = cur.macd < cur.signal && prev.macd >= prev.signal;

        if golden_cross && rsi_value < p.rsi_upper {
            Signal::Enter(Direction::Long)
        } else if death_cross || rsi_value > p.rsi_upper {
            Signal::Exit
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::history_from_closes;

    fn strategy() -> MacdRsiStrategy {
        MacdRsiStrategy::new(MacdRsiParams {
            macd_fast: 3,
            macd_slow: 6,
            macd_signal: 3,
            rsi_period: 4,
            rsi_upper: 70.0,
            rsi_lower: 30.0,
        })
    }

    #[test]
    fn holds_until_warm() {
        let history = history_from_closes(&[10.0; 8]);
        assert_eq!(strategy().warmup(), 9);
        assert_eq!(strategy().on_bar(&history), Signal::Hold);
    }

    #[test]
    fn golden_cross_with_moderate_rsi_enters() {
        //accelerating decline then a bounce lifts macd through its signal line
        let closes = vec![20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 19.0, 17.0, 14.0, 10.0, 15.0];
        let history = history_from_closes(&closes);

        let points = macd(&closes, 3, 6, 3);
        let [.., prev, cur] = points.as_slice() else {
            panic!("not enough points");
        };
        assert!(prev.macd <= prev.signal && cur.macd > cur.signal);
        assert!(rsi(&closes, 4).unwrap() < 70.0);

        assert_eq!(strategy().on_bar(&history), Signal::Enter(Direction::Long));
    }

    #[test]
    fn overbought_rsi_exits() {
        let closes: Vec<f64> = (0..15).map(|i| 10.0 + i as f64).collect();
        let history = history_from_closes(&closes);
        assert_eq!(strategy().on_bar(&history), Signal::Exit);
    }
}
