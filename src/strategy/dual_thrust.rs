use crate::config::DualThrustParams;
use crate::risk::Direction;
use crate::strategy::indicators::{highest, lowest};
use crate::strategy::{Signal, Strategy, SymbolHistory};

//dual thrust breakout
//bands sit at open +/- k * max(HH - C, C - LL) over the previous n bars
#[derive(Debug, Clone)]
pub struct DualThrustStrategy {
    params: DualThrustParams,
}

impl DualThrustStrategy {
    pub fn new(params: DualThrustParams) -> Self {
        DualThrustStrategy { params }
    }
}

impl Strategy for DualThrustStrategy {
    fn name(&self) -> &str {
        "Dual Thrust"
    }

    fn warmup(&self) -> usize {
        self.params.n_days + 1
    }

    fn on_bar(&mut self, history: &SymbolHistory) -> Signal {
        if history.bar_count() < self.warmup() {
            return Signal::Hold;
        }

        let bars = history.get_bars(self.warmup());
        let Some((current, lookback)) = bars.split_last() else {
            return Signal::Hold;
        };

        let highs: Vec<f64> = lookback.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = lookback.iter().map(|b| b.low).collect();
        let (Some(hh), Some(ll), Some(prev)) = (highest(&highs), lowest(&lows), lookback.last())
        else {
            return Signal::Hold;
        };

        let range = (hh - prev.close).max(prev.close - ll);
        let buy_line = current.open + self.params.k1 * range;
        let sell_line = current.open - self.params.k2 * range;

        let up = current.high > buy_line;
        let down = current.low < sell_line;

        match (up, down) {
            (true, false) => Signal::Enter(Direction::Long),
            (false, true) if self.params.allow_short => Signal::Enter(Direction::Short),
            (false, true) => Signal::Exit,
            //both bands broken inside one bar, direction unknown
            _ => Signal::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bar;
    use chrono::{Duration, TimeZone, Utc};

    //(open, high, low, close)
    fn history(bars: &[(f64, f64, f64, f64)]) -> SymbolHistory {
        let mut history = SymbolHistory::new("QQQ".into(), 50);
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        for (i, &(o, h, l, c)) in bars.iter().enumerate() {
            let ts = start + Duration::days(i as i64);
            history.push_bar(Bar::new(ts, o, h, l, c, 1_000.0, "QQQ".into()).unwrap());
        }
        history
    }

    fn strategy(allow_short: bool) -> DualThrustStrategy {
        DualThrustStrategy::new(DualThrustParams {
            n_days: 2,
            k1: 0.5,
            k2: 0.5,
            allow_short,
        })
    }

    //hh = 104, ll = 96, prev close = 100, range = 4, bands = open +/- 2
    const BASE: [(f64, f64, f64, f64); 2] = [(100.0, 104.0, 98.0, 101.0), (101.0, 102.0, 96.0, 100.0)];

    #[test]
    fn upside_break_enters_long() {
        let h = history(&[BASE[0], BASE[1], (100.0, 102.5, 99.0, 102.0)]);
        assert_eq!(strategy(false).on_bar(&h), Signal::Enter(Direction::Long));
    }

    #[test]
    fn downside_break_exits_or_shorts() {
        let h = history(&[BASE[0], BASE[1], (100.0, 100.5, 97.5, 98.0)]);
        assert_eq!(strategy(false).on_bar(&h), Signal::Exit);
        assert_eq!(strategy(true).on_bar(&h), Signal::Enter(Direction::Short));
    }

    #[test]
    fn inside_bands_or_both_broken_holds() {
        let inside = history(&[BASE[0], BASE[1], (100.0, 101.0, 99.0, 100.5)]);
        assert_eq!(strategy(true).on_bar(&inside), Signal::Hold);

        let both = history(&[BASE[0], BASE[1], (100.0, 103.0, 97.0, 100.0)]);
        assert_eq!(strategy(true).on_bar(&both), Signal::Hold);

        let short = history(&BASE);
        assert_eq!(strategy(true).on_bar(&short), Signal::Hold);
    }
}
