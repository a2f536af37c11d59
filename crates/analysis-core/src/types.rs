use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data. Series are stored in chronological order (oldest first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One income-statement period. Statement vectors are most-recent-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub fiscal_date: Option<String>,
    pub revenue: Option<f64>,
    pub cost_of_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub eps: Option<f64>,
    pub ebitda: Option<f64>,
    pub interest_expense: Option<f64>,
    pub income_before_tax: Option<f64>,
    pub income_tax_expense: Option<f64>,
    pub weighted_average_shares: Option<f64>,
}

/// One balance-sheet period (point-in-time).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub fiscal_date: Option<String>,
    pub total_assets: Option<f64>,
    pub total_current_assets: Option<f64>,
    pub total_current_liabilities: Option<f64>,
    pub inventory: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub total_equity: Option<f64>,
}

/// One cash-flow-statement period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub fiscal_date: Option<String>,
    pub operating_cash_flow: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub dividends_paid: Option<f64>,
}

/// The three statements for a company, each most-recent-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub income: Vec<IncomeStatement>,
    pub balance: Vec<BalanceSheet>,
    pub cash_flow: Vec<CashFlowStatement>,
}

impl FinancialStatements {
    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.balance.is_empty() && self.cash_flow.is_empty()
    }
}

/// Company profile (sector, market cap, beta, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub price: Option<f64>,
    pub last_dividend: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

/// News article (title + summary text)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

/// Normalized per-job data bundle. Built once by the market-data client,
/// then treated as read-only by every engine for the lifetime of the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    /// Daily bars, chronological (oldest first).
    pub bars: Vec<Bar>,
    pub statements: FinancialStatements,
    pub profile: CompanyProfile,
    /// Benchmark index bars for beta, chronological. May be empty.
    pub benchmark_bars: Vec<Bar>,
    /// Recent articles, most recent first, capped by config.
    pub news: Vec<NewsArticle>,
}

impl MarketSnapshot {
    /// Close prices in chronological order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The most recent close, if any price data exists.
    pub fn latest_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

/// Replace non-finite results with None so NaN/Infinity never leaves an engine.
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Divide two optional quantities, returning None on a missing input or a
/// zero/non-finite denominator.
pub fn safe_divide(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => finite(n / d),
        _ => None,
    }
}

/// Year-over-year growth rate as a decimal (0.10 = 10%).
pub fn growth_rate(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(c), Some(p)) if p != 0.0 => finite((c - p) / p.abs()),
        _ => None,
    }
}
