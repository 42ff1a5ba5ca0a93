//indicator helpers over plain price slices, oldest value first

//simple moving average
pub fn sma(prices: &[f64]) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}

//exponential moving average seeded with the sma of the first `period` values
//one output per input from index period - 1 onward
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out.push(ema);

    for value in &values[period..] {
        ema = alpha * value + (1.0 - alpha) * ema;
        out.push(ema);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
}

impl MacdPoint {
    pub fn histogram(&self) -> f64 {
        self.macd - self.signal
    }
}

//macd line and its signal line, one point per bar once both are defined
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    if fast == 0 || fast >= slow {
        return Vec::new();
    }

    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);
    if slow_ema.is_empty() {
        return Vec::new();
    }

    //fast ema starts slow - fast bars earlier
    let offset = slow - fast;
    let line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(i, slow_value)| fast_ema[i + offset] - slow_value)
        .collect();

    let signal_line = ema_series(&line, signal);
    let skip = line.len() - signal_line.len();
    line[skip..]
        .iter()
        .zip(signal_line)
        .map(|(&macd, signal)| MacdPoint { macd, signal })
        .collect()
}

//relative strength index from simple average gains and losses
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - period - 1..];
    let (mut gains, mut losses) = (0.0, 0.0);
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

pub fn highest(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

pub fn lowest(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

//latest volume over its moving average across the last `period` bars
pub fn volume_ratio(volumes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || volumes.len() < period {
        return None;
    }
    let average = sma(&volumes[volumes.len() - period..])?;
    if average <= 0.0 {
        return None;
    }
    volumes.last().map(|latest| latest / average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sma_and_extremes() {
        assert_eq!(sma(&[]), None);
        assert_relative_eq!(sma(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_eq!(highest(&[3.0, 9.0, 1.0]), Some(9.0));
        assert_eq!(lowest(&[3.0, 9.0, 1.0]), Some(1.0));
        assert_eq!(highest(&[]), None);
    }

    #[test]
    fn ema_seeds_with_sma() {
        let ema = ema_series(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(ema.len(), 2);
        assert_relative_eq!(ema[0], 2.0);
        assert_relative_eq!(ema[1], 0.5 * 4.0 + 0.5 * 2.0);
        assert!(ema_series(&[1.0], 3).is_empty());
    }

    #[test]
    fn macd_turns_positive_in_uptrend() {
        let mut closes: Vec<f64> = (0..40).map(|_| 100.0).collect();
        closes.extend((1..=10).map(|i| 100.0 + i as f64));

        let points = macd(&closes, 12, 26, 9);
        assert_eq!(points.len(), closes.len() - 26 - 9 + 2);
        let last = points.last().unwrap();
        assert!(last.macd > 0.0);
        assert!(last.histogram() > 0.0);
        assert_relative_eq!(points[0].macd, 0.0);
    }

    #[test]
    fn rsi_bounds() {
        let rising: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(rsi(&rising, 14), Some(100.0));

        let mixed = [10.0, 11.0, 10.0, 11.0, 10.0];
        assert_relative_eq!(rsi(&mixed, 4).unwrap(), 50.0);
        assert_eq!(rsi(&mixed, 5), None);
    }

    #[test]
    fn volume_ratio_against_average() {
        assert_relative_eq!(volume_ratio(&[100.0, 100.0, 400.0], 3).unwrap(), 2.0);
        assert_eq!(volume_ratio(&[0.0, 0.0], 2), None);
        assert_eq!(volume_ratio(&[1.0], 2), None);
    }
}
