//! Chart-ready series for the report payload. All series share the bar
//! timeline index-for-index; unavailable points stay None so plots can show
//! gaps instead of zeroes.

use analysis_core::MarketSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use technical_analysis::indicators;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartData {
    pub timestamps: Vec<DateTime<Utc>>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
    pub sma_20: Vec<Option<f64>>,
    pub sma_50: Vec<Option<f64>>,
    pub sma_200: Vec<Option<f64>>,
    pub rsi_14: Vec<Option<f64>>,
    pub macd_line: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub macd_histogram: Vec<Option<f64>>,
    pub bollinger_upper: Vec<Option<f64>>,
    pub bollinger_middle: Vec<Option<f64>>,
    pub bollinger_lower: Vec<Option<f64>>,
}

impl ChartData {
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        let closes = snapshot.closes();
        let macd = indicators::macd(&closes);
        let bands = indicators::bollinger_bands(&closes, 20, 2.0);

        ChartData {
            timestamps: snapshot.bars.iter().map(|b| b.timestamp).collect(),
            volumes: snapshot.bars.iter().map(|b| b.volume).collect(),
            sma_20: indicators::sma(&closes, 20),
            sma_50: indicators::sma(&closes, 50),
            sma_200: indicators::sma(&closes, 200),
            rsi_14: indicators::rsi(&closes, 14),
            macd_line: macd.macd,
            macd_signal: macd.signal,
            macd_histogram: macd.histogram,
            bollinger_upper: bands.upper,
            bollinger_middle: bands.middle,
            bollinger_lower: bands.lower,
            closes,
        }
    }
}
