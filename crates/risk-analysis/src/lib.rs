//! Return-distribution risk statistics for a single ticker.
//!
//! All stats are computed from daily simple returns of the close series.
//! With fewer than MIN_SAMPLES returns every metric is None and the rating
//! is Unknown rather than reporting noise from a handful of observations.

use analysis_core::{finite, AnalysisConfig, MarketSnapshot};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Minimum daily returns required before any statistic is reported.
const MIN_SAMPLES: usize = 30;
/// z-score for the 5th percentile of a normal distribution.
const Z_95: f64 = 1.645;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    Low,
    Moderate,
    High,
    VeryHigh,
    Unknown,
}

impl RiskRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRating::Low => "low",
            RiskRating::Moderate => "moderate",
            RiskRating::High => "high",
            RiskRating::VeryHigh => "very_high",
            RiskRating::Unknown => "unknown",
        }
    }

    fn from_annual_volatility(vol: Option<f64>) -> Self {
        match vol {
            Some(v) if v <= 0.15 => RiskRating::Low,
            Some(v) if v <= 0.30 => RiskRating::Moderate,
            Some(v) if v <= 0.50 => RiskRating::High,
            Some(_) => RiskRating::VeryHigh,
            None => RiskRating::Unknown,
        }
    }
}

impl Default for RiskRating {
    fn default() -> Self {
        RiskRating::Unknown
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub daily_volatility: Option<f64>,
    pub annual_volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    /// Largest peak-to-trough decline, as a non-positive decimal.
    pub max_drawdown: Option<f64>,
    pub beta: Option<f64>,
    /// Historical 95% one-day value at risk (5th percentile daily return).
    pub var_historical_95: Option<f64>,
    /// Parametric (normal) 95% one-day VaR: mean - 1.645 sigma.
    pub var_parametric_95: Option<f64>,
    /// Annualized mean return divided by annual volatility.
    pub risk_adjusted_return: Option<f64>,
    pub rating: RiskRating,
    pub sample_count: usize,
}

impl Default for RiskMetrics {
    fn default() -> Self {
        RiskMetrics {
            daily_volatility: None,
            annual_volatility: None,
            sharpe_ratio: None,
            sortino_ratio: None,
            max_drawdown: None,
            beta: None,
            var_historical_95: None,
            var_parametric_95: None,
            risk_adjusted_return: None,
            rating: RiskRating::Unknown,
            sample_count: 0,
        }
    }
}

pub struct RiskAnalysisEngine;

impl RiskAnalysisEngine {
    pub fn analyze(snapshot: &MarketSnapshot, config: &AnalysisConfig) -> RiskMetrics {
        let returns = daily_returns(&snapshot.closes());
        if returns.len() < MIN_SAMPLES {
            tracing::warn!(
                "Insufficient return history for {} ({} returns, need {})",
                snapshot.ticker,
                returns.len(),
                MIN_SAMPLES
            );
            return RiskMetrics {
                sample_count: returns.len(),
                ..RiskMetrics::default()
            };
        }

        let mean_daily = returns.as_slice().mean();
        let daily_vol = finite(returns.as_slice().std_dev());
        let annual_vol = daily_vol.map(|v| v * TRADING_DAYS_PER_YEAR.sqrt());
        let annual_return = mean_daily * TRADING_DAYS_PER_YEAR;

        let sharpe = annual_vol.and_then(|vol| {
            if vol > 0.0 {
                finite((annual_return - config.risk_free_rate) / vol)
            } else {
                None
            }
        });

        let sortino = sortino_ratio(&returns, annual_return, config.risk_free_rate);
        let drawdown = max_drawdown(&snapshot.closes());
        let beta = beta(&returns, snapshot, config);

        let var_historical = historical_var_95(&returns);
        let var_parametric = daily_vol.and_then(|sd| finite(mean_daily - Z_95 * sd));

        // Needs a full trading year of history to be meaningful.
        let risk_adjusted = if returns.len() >= TRADING_DAYS_PER_YEAR as usize {
            annual_vol.and_then(|vol| {
                if vol > 0.0 {
                    finite(annual_return / vol)
                } else {
                    None
                }
            })
        } else {
            None
        };

        RiskMetrics {
            daily_volatility: daily_vol,
            annual_volatility: annual_vol,
            sharpe_ratio: sharpe,
            sortino_ratio: sortino,
            max_drawdown: drawdown,
            beta,
            var_historical_95: var_historical,
            var_parametric_95: var_parametric,
            risk_adjusted_return: risk_adjusted,
            rating: RiskRating::from_annual_volatility(annual_vol),
            sample_count: returns.len(),
        }
    }
}

/// Daily simple returns from a chronological close series. Zero closes are
/// skipped rather than producing infinities.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .filter_map(|w| finite((w[1] - w[0]) / w[0]))
        .collect()
}

fn sortino_ratio(returns: &[f64], annual_return: f64, risk_free_rate: f64) -> Option<f64> {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return None;
    }
    let downside_var = downside.iter().map(|r| r * r).sum::<f64>() / downside.len() as f64;
    let downside_dev_annual = downside_var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
    if downside_dev_annual > 0.0 {
        finite((annual_return - risk_free_rate) / downside_dev_annual)
    } else {
        None
    }
}

/// Largest peak-to-trough decline as a non-positive decimal (-0.25 = -25%).
pub fn max_drawdown(closes: &[f64]) -> Option<f64> {
    if closes.is_empty() {
        return None;
    }
    let mut peak = closes[0];
    let mut worst = 0.0_f64;
    for &close in closes {
        if close > peak {
            peak = close;
        } else if peak > 0.0 {
            worst = worst.min((close - peak) / peak);
        }
    }
    finite(worst)
}

/// 5th-percentile daily return by sorting the empirical distribution.
fn historical_var_95(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((sorted.len() as f64) * 0.05).floor() as usize;
    finite(sorted[idx.min(sorted.len() - 1)])
}

/// Beta against the benchmark via covariance over paired daily returns.
/// Falls back to the profile beta when paired history is too short.
fn beta(returns: &[f64], snapshot: &MarketSnapshot, _config: &AnalysisConfig) -> Option<f64> {
    let bench_closes: Vec<f64> = snapshot.benchmark_bars.iter().map(|b| b.close).collect();
    let bench_returns = daily_returns(&bench_closes);

    let n = returns.len().min(bench_returns.len());
    if n < MIN_SAMPLES {
        return snapshot.profile.beta.and_then(finite);
    }

    // Align on the trailing n returns of each series.
    let asset = &returns[returns.len() - n..];
    let bench = &bench_returns[bench_returns.len() - n..];

    let asset_mean = asset.mean();
    let bench_mean = bench.mean();
    let mut covariance = 0.0;
    let mut bench_variance = 0.0;
    for i in 0..n {
        covariance += (asset[i] - asset_mean) * (bench[i] - bench_mean);
        bench_variance += (bench[i] - bench_mean).powi(2);
    }

    if bench_variance > 0.0 {
        finite(covariance / bench_variance)
    } else {
        snapshot.profile.beta.and_then(finite)
    }
}
