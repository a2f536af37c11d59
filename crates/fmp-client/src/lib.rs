use analysis_core::{
    AnalysisConfig, AnalysisError, Bar, BalanceSheet, CashFlowStatement, CompanyProfile,
    FinancialStatements, IncomeStatement, MarketDataProvider, NewsArticle,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub mod gather;
pub use gather::gather_snapshot;

const FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";
const NEWS_BASE_URL: &str = "https://newsapi.org/v2";

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;

/// Client for the Financial Modeling Prep /stable API plus a news provider.
#[derive(Clone)]
pub struct FmpClient {
    fmp_api_key: String,
    news_api_key: String,
    client: Client,
    lookback_days: i64,
}

impl FmpClient {
    pub fn new(fmp_api_key: String, news_api_key: String, config: &AnalysisConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            fmp_api_key,
            news_api_key,
            client,
            lookback_days: config.price_lookback_days,
        }
    }

    /// Send a request with bounded retry. Timeouts, 5xx and 429 are retried
    /// with exponential backoff; 404 fails immediately as DataUnavailable.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AnalysisError> {
        let request = builder
            .build()
            .map_err(|e| AnalysisError::UpstreamTransient(e.to_string()))?;

        let mut last_error = AnalysisError::UpstreamTransient("no attempts made".to_string());

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let wait = Duration::from_millis(BACKOFF_BASE_MS * (1 << attempt));
                tracing::warn!(
                    "Retrying upstream request in {:.1}s (attempt {}/{})",
                    wait.as_secs_f64(),
                    attempt + 1,
                    MAX_ATTEMPTS
                );
                tokio::time::sleep(wait).await;
            }

            let req_clone = request.try_clone().ok_or_else(|| {
                AnalysisError::UpstreamTransient("cannot clone request".to_string())
            })?;

            let response = match self.client.execute(req_clone).await {
                Ok(r) => r,
                Err(e) => {
                    // Connect errors and timeouts are transient
                    last_error = AnalysisError::UpstreamTransient(e.to_string());
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status.as_u16() == 429 {
                last_error = AnalysisError::RateLimited(format!("HTTP {}", status));
                continue;
            }

            if status.is_server_error() {
                last_error = AnalysisError::UpstreamTransient(format!("HTTP {}", status));
                continue;
            }

            // 4xx other than 429: the ticker/endpoint has no data. Never retried.
            return Err(AnalysisError::DataUnavailable(format!("HTTP {}", status)));
        }

        // Retries exhausted: transient failures escalate to DataUnavailable
        Err(match last_error {
            AnalysisError::RateLimited(m) => AnalysisError::RateLimited(m),
            other => AnalysisError::DataUnavailable(format!("retries exhausted: {}", other)),
        })
    }

    async fn fmp_get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        ticker: &str,
    ) -> Result<T, AnalysisError> {
        let url = format!("{}/{}", FMP_BASE_URL, endpoint);
        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("symbol", ticker), ("apikey", self.fmp_api_key.as_str())]),
            )
            .await?;

        response
            .json()
            .await
            .map_err(|e| AnalysisError::DataUnavailable(e.to_string()))
    }
}

#[async_trait]
impl MarketDataProvider for FmpClient {
    async fn price_history(&self, ticker: &str) -> Result<Vec<Bar>, AnalysisError> {
        let records: Vec<PriceRecord> = self.fmp_get("historical-price-eod/full", ticker).await?;

        let cutoff = Utc::now() - ChronoDuration::days(self.lookback_days);

        // Provider returns newest-first; the pipeline works chronologically.
        let mut bars: Vec<Bar> = records
            .into_iter()
            .filter_map(|r| r.into_bar())
            .filter(|b| b.timestamp >= cutoff)
            .collect();
        bars.sort_by_key(|b| b.timestamp);

        Ok(bars)
    }

    async fn financial_statements(
        &self,
        ticker: &str,
    ) -> Result<FinancialStatements, AnalysisError> {
        let income: Vec<IncomeRecord> = self.fmp_get("income-statement", ticker).await?;
        let balance: Vec<BalanceRecord> = self.fmp_get("balance-sheet-statement", ticker).await?;
        let cash_flow: Vec<CashFlowRecord> = self.fmp_get("cash-flow-statement", ticker).await?;

        Ok(FinancialStatements {
            income: income.into_iter().map(IncomeRecord::into_statement).collect(),
            balance: balance.into_iter().map(BalanceRecord::into_statement).collect(),
            cash_flow: cash_flow
                .into_iter()
                .map(CashFlowRecord::into_statement)
                .collect(),
        })
    }

    async fn company_profile(&self, ticker: &str) -> Result<CompanyProfile, AnalysisError> {
        // FMP wraps the profile in a single-element array
        let profiles: Vec<ProfileRecord> = self.fmp_get("profile", ticker).await?;

        profiles
            .into_iter()
            .next()
            .map(|p| p.into_profile(ticker))
            .ok_or_else(|| {
                AnalysisError::DataUnavailable(format!("no profile for ticker {}", ticker))
            })
    }

    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
        let url = format!("{}/everything", NEWS_BASE_URL);
        let response = self
            .send_request(self.client.get(&url).query(&[
                ("q", ticker),
                ("sortBy", "publishedAt"),
                ("pageSize", &limit.to_string()),
                ("apiKey", self.news_api_key.as_str()),
            ]))
            .await?;

        let body: NewsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::DataUnavailable(e.to_string()))?;

        Ok(body
            .articles
            .into_iter()
            .take(limit)
            .map(|a| NewsArticle {
                title: a.title.unwrap_or_default(),
                description: a.description,
                published_at: a
                    .published_at
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                url: a.url,
            })
            .collect())
    }
}

// Provider response structures

#[derive(Debug, Deserialize)]
struct PriceRecord {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl PriceRecord {
    fn into_bar(self) -> Option<Bar> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        let timestamp = date.and_hms_opt(0, 0, 0)?.and_utc();
        Some(Bar {
            timestamp,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomeRecord {
    date: Option<String>,
    revenue: Option<f64>,
    cost_of_revenue: Option<f64>,
    gross_profit: Option<f64>,
    operating_income: Option<f64>,
    net_income: Option<f64>,
    eps: Option<f64>,
    ebitda: Option<f64>,
    interest_expense: Option<f64>,
    income_before_tax: Option<f64>,
    income_tax_expense: Option<f64>,
    weighted_average_shs_out: Option<f64>,
}

impl IncomeRecord {
    fn into_statement(self) -> IncomeStatement {
        IncomeStatement {
            fiscal_date: self.date,
            revenue: self.revenue,
            cost_of_revenue: self.cost_of_revenue,
            gross_profit: self.gross_profit,
            operating_income: self.operating_income,
            net_income: self.net_income,
            eps: self.eps,
            ebitda: self.ebitda,
            interest_expense: self.interest_expense,
            income_before_tax: self.income_before_tax,
            income_tax_expense: self.income_tax_expense,
            weighted_average_shares: self.weighted_average_shs_out,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceRecord {
    date: Option<String>,
    total_assets: Option<f64>,
    total_current_assets: Option<f64>,
    total_current_liabilities: Option<f64>,
    inventory: Option<f64>,
    total_debt: Option<f64>,
    cash_and_cash_equivalents: Option<f64>,
    total_stockholders_equity: Option<f64>,
}

impl BalanceRecord {
    fn into_statement(self) -> BalanceSheet {
        BalanceSheet {
            fiscal_date: self.date,
            total_assets: self.total_assets,
            total_current_assets: self.total_current_assets,
            total_current_liabilities: self.total_current_liabilities,
            inventory: self.inventory,
            total_debt: self.total_debt,
            cash_and_equivalents: self.cash_and_cash_equivalents,
            total_equity: self.total_stockholders_equity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CashFlowRecord {
    date: Option<String>,
    operating_cash_flow: Option<f64>,
    free_cash_flow: Option<f64>,
    common_dividends_paid: Option<f64>,
}

impl CashFlowRecord {
    fn into_statement(self) -> CashFlowStatement {
        CashFlowStatement {
            fiscal_date: self.date,
            operating_cash_flow: self.operating_cash_flow,
            free_cash_flow: self.free_cash_flow,
            dividends_paid: self.common_dividends_paid,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRecord {
    company_name: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    market_cap: Option<f64>,
    beta: Option<f64>,
    price: Option<f64>,
    last_dividend: Option<f64>,
    shares_outstanding: Option<f64>,
}

impl ProfileRecord {
    fn into_profile(self, ticker: &str) -> CompanyProfile {
        CompanyProfile {
            symbol: ticker.to_string(),
            company_name: self.company_name,
            sector: self.sector,
            industry: self.industry,
            market_cap: self.market_cap,
            beta: self.beta,
            price: self.price,
            last_dividend: self.last_dividend,
            shares_outstanding: self.shares_outstanding,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticleRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsArticleRecord {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    url: Option<String>,
}
