use analysis_core::{
    AnalysisConfig, AnalysisError, CompanyProfile, FinancialStatements, MarketDataProvider,
    MarketSnapshot,
};

/// Assemble a MarketSnapshot for one job.
///
/// Price history is the only hard requirement: a failed or empty price fetch
/// fails the job with DataUnavailable. Statements, profile, benchmark bars
/// and news all degrade to empty/default values so downstream engines can
/// still produce a best-effort report.
pub async fn gather_snapshot(
    provider: &dyn MarketDataProvider,
    config: &AnalysisConfig,
    ticker: &str,
) -> Result<MarketSnapshot, AnalysisError> {
    tracing::info!("Gathering market data for {}", ticker);

    let (bars_result, statements_result, profile_result, benchmark_result, news_result) = tokio::join!(
        provider.price_history(ticker),
        provider.financial_statements(ticker),
        provider.company_profile(ticker),
        provider.price_history(&config.benchmark_symbol),
        provider.news(ticker, config.max_news_articles),
    );

    let bars = bars_result?;
    if bars.is_empty() {
        return Err(AnalysisError::DataUnavailable(format!(
            "no price history for ticker {}",
            ticker
        )));
    }

    let statements = statements_result.unwrap_or_else(|e| {
        tracing::warn!("Financial statements unavailable for {}: {}", ticker, e);
        FinancialStatements::default()
    });

    let profile = profile_result.unwrap_or_else(|e| {
        tracing::warn!("Company profile unavailable for {}: {}", ticker, e);
        CompanyProfile {
            symbol: ticker.to_string(),
            ..CompanyProfile::default()
        }
    });

    let benchmark_bars = benchmark_result.unwrap_or_else(|e| {
        tracing::warn!(
            "Benchmark history unavailable ({}): {}",
            config.benchmark_symbol,
            e
        );
        Vec::new()
    });

    let mut news = news_result.unwrap_or_else(|e| {
        tracing::warn!("News unavailable for {}: {}", ticker, e);
        Vec::new()
    });
    news.truncate(config.max_news_articles);

    tracing::info!(
        "Data gathering complete for {}: {} bars, {} income periods, {} articles",
        ticker,
        bars.len(),
        statements.income.len(),
        news.len()
    );

    Ok(MarketSnapshot {
        ticker: ticker.to_string(),
        bars,
        statements,
        profile,
        benchmark_bars,
        news,
    })
}
