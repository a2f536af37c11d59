//! Indicator series over chronological close/volume data.
//!
//! Every function returns a vector aligned 1:1 with its input: index i holds
//! the indicator value at bar i, or None while the window has not yet filled.
//! A window that requires more history than exists yields None for the whole
//! insufficient prefix, never a partial value.

use analysis_core::Bar;

/// Simple Moving Average. None until `period` observations exist.
pub fn sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    let mut window_sum: f64 = data[..period].iter().sum();
    result[period - 1] = Some(window_sum / period as f64);
    for i in period..data.len() {
        window_sum += data[i] - data[i - period];
        result[i] = Some(window_sum / period as f64);
    }
    result
}

/// Exponential Moving Average with alpha = 2/(period+1), seeded by the
/// SMA of the first `period` points.
pub fn ema(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed: f64 = data[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = Some(seed);

    let mut prev = seed;
    for i in period..data.len() {
        prev = (data[i] - prev) * multiplier + prev;
        result[i] = Some(prev);
    }
    result
}

/// Relative Strength Index with Wilder smoothing. None until `period + 1`
/// observations exist; values clamped to [0, 100].
pub fn rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period + 1 {
        return result;
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);
    for w in data.windows(2) {
        let change = w[1] - w[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut avg_gain: f64 = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss: f64 = losses[..period].iter().sum::<f64>() / period as f64;
    result[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        result[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// MACD line (EMA12 - EMA26), signal (EMA9 of the MACD line) and histogram.
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd(data: &[f64]) -> MacdSeries {
    macd_with(data, 12, 26, 9)
}

pub fn macd_with(data: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let n = data.len();
    let ema_fast = ema(data, fast);
    let ema_slow = ema(data, slow);

    let mut macd_line = vec![None; n];
    for i in 0..n {
        if let (Some(f), Some(s)) = (ema_fast[i], ema_slow[i]) {
            macd_line[i] = Some(f - s);
        }
    }

    // Signal = EMA(signal_period) over the valid MACD values, re-aligned to
    // the input index space.
    let valid: Vec<f64> = macd_line.iter().filter_map(|v| *v).collect();
    let first_valid = macd_line.iter().position(|v| v.is_some());
    let mut signal = vec![None; n];
    if let Some(offset) = first_valid {
        for (j, v) in ema(&valid, signal_period).into_iter().enumerate() {
            signal[offset + j] = v;
        }
    }

    let mut histogram = vec![None; n];
    for i in 0..n {
        if let (Some(m), Some(s)) = (macd_line[i], signal[i]) {
            histogram[i] = Some(m - s);
        }
    }

    MacdSeries {
        macd: macd_line,
        signal,
        histogram,
    }
}

/// Bollinger Bands: middle = SMA(period), upper/lower = middle +/- k sigma
/// where sigma is the rolling sample standard deviation (n-1 divisor).
pub struct BollingerSeries {
    pub middle: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> BollingerSeries {
    let n = data.len();
    let middle = sma(data, period);
    let mut upper = vec![None; n];
    let mut lower = vec![None; n];

    if period >= 2 && n >= period {
        for i in period - 1..n {
            let window = &data[i + 1 - period..=i];
            let mean = middle[i].unwrap_or(0.0);
            let variance =
                window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
            let std = variance.sqrt();
            upper[i] = Some(mean + num_std * std);
            lower[i] = Some(mean - num_std * std);
        }
    }

    BollingerSeries {
        middle,
        upper,
        lower,
    }
}

/// Average True Range with Wilder smoothing. True range at bar i uses the
/// previous close, so the first value lands at index `period`.
pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; bars.len()];
    if period == 0 || bars.len() < period + 1 {
        return result;
    }

    let mut true_ranges = Vec::with_capacity(bars.len() - 1);
    for w in bars.windows(2) {
        let high_low = w[1].high - w[1].low;
        let high_close = (w[1].high - w[0].close).abs();
        let low_close = (w[1].low - w[0].close).abs();
        true_ranges.push(high_low.max(high_close).max(low_close));
    }

    let mut value: f64 = true_ranges[..period].iter().sum::<f64>() / period as f64;
    result[period] = Some(value);
    for i in period..true_ranges.len() {
        value = (value * (period - 1) as f64 + true_ranges[i]) / period as f64;
        result[i + 1] = Some(value);
    }
    result
}

/// Rate of change over `period` bars, in percent.
pub fn roc(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 {
        return result;
    }
    for i in period..data.len() {
        let base = data[i - period];
        if base != 0.0 {
            result[i] = Some((data[i] - base) / base * 100.0);
        }
    }
    result
}

/// Max of the trailing `window` values (or all values when fewer exist).
pub fn trailing_max(data: &[f64], window: usize) -> Option<f64> {
    let start = data.len().saturating_sub(window);
    data[start..]
        .iter()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

/// Min of the trailing `window` values (or all values when fewer exist).
pub fn trailing_min(data: &[f64], window: usize) -> Option<f64> {
    let start = data.len().saturating_sub(window);
    data[start..]
        .iter()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
}
