use analysis_core::{Bar, CompanyProfile, FinancialStatements, MarketSnapshot};
use chrono::{Duration, TimeZone, Utc};

use crate::analyzer::{TechnicalAnalysisEngine, TrendDirection, VolumeTrend};
use crate::indicators;

fn sample_bars(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::days(i as i64),
            open: close * 0.99,
            high: close * 1.01,
            low: close * 0.98,
            close,
            volume: 1_000_000.0 + i as f64 * 10_000.0,
        })
        .collect()
}

fn snapshot_from(closes: &[f64]) -> MarketSnapshot {
    MarketSnapshot {
        ticker: "TEST".to_string(),
        bars: sample_bars(closes),
        statements: FinancialStatements::default(),
        profile: CompanyProfile::default(),
        benchmark_bars: Vec::new(),
        news: Vec::new(),
    }
}

fn ramp(len: usize, start: f64, step: f64) -> Vec<f64> {
    (0..len).map(|i| start + step * i as f64).collect()
}

#[test]
fn sma_nulls_until_window_fills() {
    let data = ramp(10, 100.0, 1.0);
    let result = indicators::sma(&data, 5);

    assert_eq!(result.len(), data.len());
    for v in &result[..4] {
        assert!(v.is_none());
    }
    // First value is the mean of 100..=104
    assert!((result[4].unwrap() - 102.0).abs() < 1e-9);
    assert!((result[9].unwrap() - 107.0).abs() < 1e-9);
}

#[test]
fn sma_matches_window_mean() {
    let data = vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0];
    let result = indicators::sma(&data, 3);
    assert!((result[2].unwrap() - 4.0).abs() < 1e-9);
    assert!((result[5].unwrap() - 10.0).abs() < 1e-9);
}

#[test]
fn sma_all_none_when_history_too_short() {
    let data = ramp(10, 50.0, 1.0);
    let result = indicators::sma(&data, 20);
    assert!(result.iter().all(|v| v.is_none()));
}

#[test]
fn ema_seeded_by_initial_sma() {
    let data = ramp(20, 10.0, 1.0);
    let result = indicators::ema(&data, 10);

    for v in &result[..9] {
        assert!(v.is_none());
    }
    // Seed at index 9 is the mean of 10..=19
    assert!((result[9].unwrap() - 14.5).abs() < 1e-9);
    // EMA tracks a linear ramp from below
    assert!(result[19].unwrap() < data[19]);
    assert!(result[19].unwrap() > result[9].unwrap());
}

#[test]
fn rsi_stays_within_bounds() {
    let data: Vec<f64> = (0..60)
        .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0)
        .collect();
    let result = indicators::rsi(&data, 14);

    for v in &result[..14] {
        assert!(v.is_none());
    }
    for v in result[14..].iter().flatten() {
        assert!(*v >= 0.0 && *v <= 100.0);
    }
}

#[test]
fn rsi_saturates_on_monotonic_series() {
    let rising = ramp(40, 100.0, 1.0);
    let rsi_up = indicators::rsi(&rising, 14);
    assert!((rsi_up.last().unwrap().unwrap() - 100.0).abs() < 1e-9);

    let falling = ramp(40, 100.0, -1.0);
    let rsi_down = indicators::rsi(&falling, 14);
    assert!(rsi_down.last().unwrap().unwrap() < 1e-9);
}

#[test]
fn rsi_requires_period_plus_one_points() {
    let data = ramp(14, 100.0, 1.0);
    let result = indicators::rsi(&data, 14);
    assert!(result.iter().all(|v| v.is_none()));

    let data = ramp(15, 100.0, 1.0);
    let result = indicators::rsi(&data, 14);
    assert!(result[14].is_some());
}

#[test]
fn macd_histogram_is_line_minus_signal() {
    let data: Vec<f64> = (0..80)
        .map(|i| 50.0 + (i as f64 * 0.3).cos() * 8.0)
        .collect();
    let series = indicators::macd(&data);

    assert_eq!(series.macd.len(), data.len());
    let mut checked = 0;
    for i in 0..data.len() {
        if let (Some(m), Some(s), Some(h)) = (series.macd[i], series.signal[i], series.histogram[i])
        {
            assert!((h - (m - s)).abs() < 1e-9);
            checked += 1;
        }
    }
    assert!(checked > 0);
    // Signal needs 9 valid MACD points, so it starts later than the line
    let first_macd = series.macd.iter().position(|v| v.is_some()).unwrap();
    let first_signal = series.signal.iter().position(|v| v.is_some()).unwrap();
    assert_eq!(first_signal, first_macd + 8);
}

#[test]
fn bollinger_bands_bracket_the_middle() {
    let data: Vec<f64> = (0..40)
        .map(|i| 100.0 + (i as f64 * 0.9).sin() * 3.0)
        .collect();
    let bands = indicators::bollinger_bands(&data, 20, 2.0);

    for i in 19..data.len() {
        let (u, m, l) = (
            bands.upper[i].unwrap(),
            bands.middle[i].unwrap(),
            bands.lower[i].unwrap(),
        );
        assert!(u >= m && m >= l);
        // Bands are symmetric around the middle
        assert!(((u - m) - (m - l)).abs() < 1e-9);
    }
}

#[test]
fn bollinger_uses_sample_standard_deviation() {
    let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let bands = indicators::bollinger_bands(&data, 5, 2.0);

    // mean 3, sample variance 2.5, sigma sqrt(2.5)
    let sigma = 2.5_f64.sqrt();
    assert!((bands.middle[4].unwrap() - 3.0).abs() < 1e-9);
    assert!((bands.upper[4].unwrap() - (3.0 + 2.0 * sigma)).abs() < 1e-9);
    assert!((bands.lower[4].unwrap() - (3.0 - 2.0 * sigma)).abs() < 1e-9);
}

#[test]
fn atr_positive_and_nulls_before_window() {
    let closes = ramp(30, 100.0, 0.5);
    let bars = sample_bars(&closes);
    let result = indicators::atr(&bars, 14);

    for v in &result[..14] {
        assert!(v.is_none());
    }
    for v in result[14..].iter().flatten() {
        assert!(*v > 0.0);
    }
}

#[test]
fn roc_measures_percent_change() {
    let data = vec![100.0, 101.0, 102.0, 103.0, 104.0, 110.0];
    let result = indicators::roc(&data, 5);

    for v in &result[..5] {
        assert!(v.is_none());
    }
    assert!((result[5].unwrap() - 10.0).abs() < 1e-9);
}

#[test]
fn trailing_extremes_respect_window() {
    let data = vec![10.0, 50.0, 20.0, 30.0, 25.0];
    assert_eq!(indicators::trailing_max(&data, 3), Some(30.0));
    assert_eq!(indicators::trailing_min(&data, 3), Some(20.0));
    assert_eq!(indicators::trailing_max(&data, 100), Some(50.0));
    assert_eq!(indicators::trailing_max(&[], 3), None);
}

#[test]
fn snapshot_degrades_on_short_history() {
    let closes = ramp(10, 100.0, 1.0);
    let snapshot = snapshot_from(&closes);
    let result = TechnicalAnalysisEngine::analyze(&snapshot);

    assert_eq!(result.current_price, Some(109.0));
    assert!(result.moving_averages.sma_20.is_none());
    assert!(result.moving_averages.sma_50.is_none());
    assert!(result.moving_averages.sma_200.is_none());
    assert!(result.rsi_14.is_none());
    assert!(result.bollinger.upper.is_none());
    // Momentum over 5 days still works with 10 bars
    assert!(result.momentum.roc_5d.is_some());
    assert!(result.momentum.roc_60d.is_none());
    assert_eq!(result.volume.trend, VolumeTrend::InsufficientData);
}

#[test]
fn snapshot_full_history_populates_everything() {
    let closes: Vec<f64> = (0..300)
        .map(|i| 100.0 + i as f64 * 0.2 + (i as f64 * 0.5).sin() * 2.0)
        .collect();
    let snapshot = snapshot_from(&closes);
    let result = TechnicalAnalysisEngine::analyze(&snapshot);

    assert!(result.moving_averages.sma_200.is_some());
    assert!(result.rsi_14.is_some());
    assert!(result.macd.histogram.is_some());
    assert!(result.bollinger.bandwidth.unwrap() > 0.0);
    assert!(result.atr_14.unwrap() > 0.0);
    assert!(result.support_resistance.high_52_week.is_some());
    assert!(!result.signals.is_empty());
    assert_ne!(result.volume.trend, VolumeTrend::InsufficientData);
}

#[test]
fn uptrend_produces_bullish_signals() {
    let closes = ramp(300, 50.0, 0.5);
    let snapshot = snapshot_from(&closes);
    let result = TechnicalAnalysisEngine::analyze(&snapshot);

    let bullish = result
        .signals
        .iter()
        .filter(|s| s.direction == TrendDirection::Bullish)
        .count();
    let bearish = result
        .signals
        .iter()
        .filter(|s| s.direction == TrendDirection::Bearish)
        .count();
    assert!(bullish > bearish);
}
