pub mod analyzer;
pub mod indicators;

pub use analyzer::{
    BollingerSummary, MacdSummary, Momentum, MovingAverages, SupportResistance,
    TechnicalAnalysisEngine, TechnicalSnapshot, TrendDirection, TrendSignal, VolumeProfile,
    VolumeTrend,
};
pub use indicators::{BollingerSeries, MacdSeries};

#[cfg(test)]
mod indicators_tests;
