use analysis_core::{finite, MarketSnapshot};
use serde::{Deserialize, Serialize};

use crate::indicators;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovingAverages {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub ema_50: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacdSummary {
    pub macd_line: Option<f64>,
    pub signal_line: Option<f64>,
    pub histogram: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BollingerSummary {
    pub upper: Option<f64>,
    pub middle: Option<f64>,
    pub lower: Option<f64>,
    /// (upper - lower) / middle, in percent.
    pub bandwidth: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl Default for VolumeTrend {
    fn default() -> Self {
        VolumeTrend::InsufficientData
    }
}

impl VolumeTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeTrend::Increasing => "increasing",
            VolumeTrend::Decreasing => "decreasing",
            VolumeTrend::Stable => "stable",
            VolumeTrend::InsufficientData => "insufficient data",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub avg_volume_20: Option<f64>,
    pub avg_volume_50: Option<f64>,
    pub trend: VolumeTrend,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportResistance {
    pub high_52_week: Option<f64>,
    pub low_52_week: Option<f64>,
    pub high_20_day: Option<f64>,
    pub low_20_day: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Momentum {
    pub roc_5d: Option<f64>,
    pub roc_20d: Option<f64>,
    pub roc_60d: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

/// A single qualitative observation derived from indicator state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSignal {
    pub direction: TrendDirection,
    pub label: String,
}

impl TrendSignal {
    fn new(direction: TrendDirection, label: impl Into<String>) -> Self {
        TrendSignal {
            direction,
            label: label.into(),
        }
    }
}

/// Current-bar indicator readout for one ticker. Fields degrade to None
/// independently when the price history is too short for their window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub current_price: Option<f64>,
    pub moving_averages: MovingAverages,
    pub rsi_14: Option<f64>,
    pub macd: MacdSummary,
    pub bollinger: BollingerSummary,
    pub atr_14: Option<f64>,
    pub volume: VolumeProfile,
    pub support_resistance: SupportResistance,
    pub momentum: Momentum,
    pub signals: Vec<TrendSignal>,
}

pub struct TechnicalAnalysisEngine;

impl TechnicalAnalysisEngine {
    pub fn analyze(snapshot: &MarketSnapshot) -> TechnicalSnapshot {
        let closes = snapshot.closes();
        if closes.is_empty() {
            return TechnicalSnapshot::default();
        }

        tracing::debug!(
            "Computing technical indicators for {} over {} bars",
            snapshot.ticker,
            closes.len()
        );

        let sma_20 = indicators::sma(&closes, 20);
        let sma_50 = indicators::sma(&closes, 50);
        let sma_200 = indicators::sma(&closes, 200);
        let moving_averages = MovingAverages {
            sma_20: last(&sma_20),
            sma_50: last(&sma_50),
            sma_200: last(&sma_200),
            ema_12: last(&indicators::ema(&closes, 12)),
            ema_26: last(&indicators::ema(&closes, 26)),
            ema_50: last(&indicators::ema(&closes, 50)),
        };

        let rsi_14 = last(&indicators::rsi(&closes, 14));

        let macd_series = indicators::macd(&closes);
        let macd = MacdSummary {
            macd_line: last(&macd_series.macd),
            signal_line: last(&macd_series.signal),
            histogram: last(&macd_series.histogram),
        };

        let bands = indicators::bollinger_bands(&closes, 20, 2.0);
        let bollinger = BollingerSummary {
            upper: last(&bands.upper),
            middle: last(&bands.middle),
            lower: last(&bands.lower),
            bandwidth: bandwidth(last(&bands.upper), last(&bands.middle), last(&bands.lower)),
        };

        let atr_14 = last(&indicators::atr(&snapshot.bars, 14));

        let volumes: Vec<f64> = snapshot.bars.iter().map(|b| b.volume).collect();
        let volume = volume_profile(&volumes);

        let support_resistance = SupportResistance {
            high_52_week: indicators::trailing_max(&closes, 252),
            low_52_week: indicators::trailing_min(&closes, 252),
            high_20_day: indicators::trailing_max(&closes, 20),
            low_20_day: indicators::trailing_min(&closes, 20),
        };

        let momentum = Momentum {
            roc_5d: last(&indicators::roc(&closes, 5)),
            roc_20d: last(&indicators::roc(&closes, 20)),
            roc_60d: last(&indicators::roc(&closes, 60)),
        };

        let current_price = snapshot.latest_close();
        let signals = trend_signals(
            current_price,
            &moving_averages,
            last(&sma_50),
            last(&sma_200),
            rsi_14,
            &macd,
        );

        TechnicalSnapshot {
            current_price,
            moving_averages,
            rsi_14,
            macd,
            bollinger,
            atr_14,
            volume,
            support_resistance,
            momentum,
            signals,
        }
    }
}

fn last(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

fn bandwidth(upper: Option<f64>, middle: Option<f64>, lower: Option<f64>) -> Option<f64> {
    match (upper, middle, lower) {
        (Some(u), Some(m), Some(l)) if m != 0.0 => finite((u - l) / m * 100.0),
        _ => None,
    }
}

fn volume_profile(volumes: &[f64]) -> VolumeProfile {
    let avg = |window: usize| -> Option<f64> {
        if volumes.is_empty() {
            return None;
        }
        let start = volumes.len().saturating_sub(window);
        let slice = &volumes[start..];
        finite(slice.iter().sum::<f64>() / slice.len() as f64)
    };

    // 50-day average needs enough history to be a meaningful baseline.
    let avg_volume_20 = avg(20);
    let avg_volume_50 = if volumes.len() >= 20 { avg(50) } else { None };

    let trend = match (avg_volume_20, avg_volume_50) {
        (Some(short), Some(long)) if long > 0.0 => {
            let ratio = short / long;
            if ratio > 1.2 {
                VolumeTrend::Increasing
            } else if ratio < 0.8 {
                VolumeTrend::Decreasing
            } else {
                VolumeTrend::Stable
            }
        }
        _ => VolumeTrend::InsufficientData,
    };

    VolumeProfile {
        avg_volume_20,
        avg_volume_50,
        trend,
    }
}

fn trend_signals(
    current_price: Option<f64>,
    mas: &MovingAverages,
    sma_50: Option<f64>,
    sma_200: Option<f64>,
    rsi_14: Option<f64>,
    macd: &MacdSummary,
) -> Vec<TrendSignal> {
    let mut signals = Vec::new();

    if let (Some(short), Some(long)) = (sma_50, sma_200) {
        if short > long {
            signals.push(TrendSignal::new(
                TrendDirection::Bullish,
                "Golden cross: 50-day SMA above 200-day SMA",
            ));
        } else if short < long {
            signals.push(TrendSignal::new(
                TrendDirection::Bearish,
                "Death cross: 50-day SMA below 200-day SMA",
            ));
        }
    }

    if let (Some(price), Some(long)) = (current_price, mas.sma_200) {
        if price > long {
            signals.push(TrendSignal::new(
                TrendDirection::Bullish,
                "Price above 200-day SMA",
            ));
        } else if price < long {
            signals.push(TrendSignal::new(
                TrendDirection::Bearish,
                "Price below 200-day SMA",
            ));
        }
    }

    if let Some(rsi) = rsi_14 {
        if rsi > 70.0 {
            signals.push(TrendSignal::new(
                TrendDirection::Bearish,
                "RSI overbought (above 70)",
            ));
        } else if rsi < 30.0 {
            signals.push(TrendSignal::new(
                TrendDirection::Bullish,
                "RSI oversold (below 30)",
            ));
        } else {
            signals.push(TrendSignal::new(TrendDirection::Neutral, "RSI neutral"));
        }
    }

    if let Some(hist) = macd.histogram {
        if hist > 0.0 {
            signals.push(TrendSignal::new(
                TrendDirection::Bullish,
                "MACD histogram positive",
            ));
        } else if hist < 0.0 {
            signals.push(TrendSignal::new(
                TrendDirection::Bearish,
                "MACD histogram negative",
            ));
        }
    }

    signals
}
