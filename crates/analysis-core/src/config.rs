/// Read-only analysis assumptions shared by every job. Passed explicitly
/// through each engine call; there is no other global state.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Annual risk-free rate used by Sharpe/Sortino and CAPM.
    pub risk_free_rate: f64,
    /// Expected annual market return for the CAPM equity risk premium.
    pub market_return: f64,
    /// Long-run growth rate for the Gordon terminal value. Must stay below
    /// the discount rate or the DCF resolves to null.
    pub perpetual_growth_rate: f64,
    /// Historical FCF growth is clamped to [min, max] before projection.
    pub min_fcf_growth: f64,
    pub max_fcf_growth: f64,
    /// DCF projection horizon in years.
    pub projection_years: u32,
    /// Calendar-day lookback for price history (>= 252 trading days, enough
    /// for the 200-period moving average).
    pub price_lookback_days: i64,
    /// Articles fed to the sentiment engine, most recent first.
    pub max_news_articles: usize,
    /// Benchmark symbol for beta.
    pub benchmark_symbol: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.04,
            market_return: 0.08,
            perpetual_growth_rate: 0.025,
            min_fcf_growth: -0.05,
            max_fcf_growth: 0.15,
            projection_years: 5,
            price_lookback_days: 400,
            max_news_articles: 20,
            benchmark_symbol: "SPY".to_string(),
        }
    }
}
