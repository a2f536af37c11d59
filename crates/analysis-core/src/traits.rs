use crate::{AnalysisError, Bar, CompanyProfile, FinancialStatements, NewsArticle};
use async_trait::async_trait;

/// Abstraction over the external financial-data and news providers.
/// Any provider satisfying this contract is interchangeable; the pipeline
/// has no other network dependency.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily price history over the configured lookback window,
    /// chronological (oldest first).
    async fn price_history(&self, ticker: &str) -> Result<Vec<Bar>, AnalysisError>;

    /// Income statement, balance sheet and cash flow statement,
    /// most-recent-first.
    async fn financial_statements(
        &self,
        ticker: &str,
    ) -> Result<FinancialStatements, AnalysisError>;

    /// Company profile (sector, market cap, beta, shares outstanding).
    async fn company_profile(&self, ticker: &str) -> Result<CompanyProfile, AnalysisError>;

    /// Recent news articles, most recent first.
    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError>;
}
