//! Drives one analysis job through its lifecycle: validate the ticker,
//! gather market data, fan the engines out, synthesize the report and hand
//! it to the sink. Engine failures degrade their report section; only a
//! total absence of price data fails the job.

pub mod job;

pub use job::{validate_ticker, AnalysisJob, JobStatus};

use analysis_core::{AnalysisConfig, AnalysisError, MarketDataProvider, MarketSnapshot};
use async_trait::async_trait;
use chrono::Utc;
use financial_metrics::FinancialMetricsEngine;
use fmp_client::gather_snapshot;
use report_synthesis::{ReportGenerator, ReportInputs, ReportPayload};
use risk_analysis::RiskAnalysisEngine;
use sentiment_analysis::SentimentAnalysisEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use technical_analysis::TechnicalAnalysisEngine;
use valuation_engine::ValuationEngine;

/// Receives every job state change, in order.
#[async_trait]
pub trait StatusObserver: Send + Sync {
    async fn job_updated(&self, job: &AnalysisJob);
}

/// Stores the finished report. Called exactly once per successful job;
/// returns the stored report's identifier.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn store(
        &self,
        job: &AnalysisJob,
        payload: &ReportPayload,
    ) -> Result<String, AnalysisError>;
}

pub struct Orchestrator {
    provider: Arc<dyn MarketDataProvider>,
    observer: Arc<dyn StatusObserver>,
    sink: Arc<dyn ReportSink>,
    config: AnalysisConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        observer: Arc<dyn StatusObserver>,
        sink: Arc<dyn ReportSink>,
        config: AnalysisConfig,
    ) -> Self {
        Orchestrator {
            provider,
            observer,
            sink,
            config,
        }
    }

    pub async fn run(&self, ticker: &str, job_id: &str) -> AnalysisJob {
        self.run_with_cancel(ticker, job_id, &AtomicBool::new(false))
            .await
    }

    /// Run one job to a terminal state. The job id is opaque and comes from
    /// the caller that created the job. A cancellation observed after
    /// analysis but before the sink suppresses the report.
    pub async fn run_with_cancel(
        &self,
        ticker: &str,
        job_id: &str,
        cancel: &AtomicBool,
    ) -> AnalysisJob {
        let mut job = AnalysisJob::new(ticker, job_id);
        self.observer.job_updated(&job).await;

        if !validate_ticker(ticker) {
            return self
                .fail(job, format!("invalid ticker symbol: {:?}", ticker))
                .await;
        }

        self.transition(&mut job, JobStatus::GatheringData).await;
        let snapshot = match gather_snapshot(&*self.provider, &self.config, ticker).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => return self.fail(job, e.to_string()).await,
        };

        self.transition(&mut job, JobStatus::Analyzing).await;
        let inputs = self.run_engines(Arc::clone(&snapshot)).await;

        self.transition(&mut job, JobStatus::GeneratingReport).await;
        let payload = ReportGenerator::generate(&snapshot, &inputs);

        if cancel.load(Ordering::SeqCst) {
            tracing::info!("Job {} cancelled before publication", job.id);
            return self.fail(job, "cancelled".to_string()).await;
        }

        match self.sink.store(&job, &payload).await {
            Ok(report_id) => job.report_id = Some(report_id),
            Err(e) => {
                return self
                    .fail(job, format!("report storage failed: {}", e))
                    .await
            }
        }

        self.transition(&mut job, JobStatus::Complete).await;
        tracing::info!("Job {} complete for {}", job.id, job.ticker);
        job
    }

    /// Fan the engines out on blocking threads. Valuation consumes the FCF
    /// growth figure from financial metrics, so it starts once that engine
    /// finishes; the rest run concurrently. A panicking engine is logged
    /// and its output slot left None; the others are unaffected.
    async fn run_engines(&self, snapshot: Arc<MarketSnapshot>) -> ReportInputs {
        let config = self.config.clone();

        let metrics_task = {
            let snap = Arc::clone(&snapshot);
            tokio::task::spawn_blocking(move || FinancialMetricsEngine::new().analyze(&snap))
        };
        let technicals_task = {
            let snap = Arc::clone(&snapshot);
            tokio::task::spawn_blocking(move || TechnicalAnalysisEngine::analyze(&snap))
        };
        let risk_task = {
            let snap = Arc::clone(&snapshot);
            let cfg = config.clone();
            tokio::task::spawn_blocking(move || RiskAnalysisEngine::analyze(&snap, &cfg))
        };
        let sentiment_task = {
            let snap = Arc::clone(&snapshot);
            tokio::task::spawn_blocking(move || SentimentAnalysisEngine::new().analyze(&snap.news))
        };

        let metrics = unwrap_engine("financial-metrics", metrics_task.await);

        let valuation_task = {
            let snap = Arc::clone(&snapshot);
            let cfg = config.clone();
            let fcf_growth = metrics.as_ref().and_then(|m| m.growth.fcf_growth);
            tokio::task::spawn_blocking(move || ValuationEngine::analyze(&snap, fcf_growth, &cfg))
        };

        let (technicals, risk, valuation, sentiment) = tokio::join!(
            technicals_task,
            risk_task,
            valuation_task,
            sentiment_task,
        );

        ReportInputs {
            metrics,
            technicals: unwrap_engine("technical-analysis", technicals),
            risk: unwrap_engine("risk-analysis", risk),
            valuation: unwrap_engine("valuation", valuation),
            sentiment: unwrap_engine("sentiment", sentiment),
        }
    }

    async fn transition(&self, job: &mut AnalysisJob, next: JobStatus) {
        debug_assert!(job.status.can_transition_to(next));
        job.status = next;
        job.updated_at = Utc::now();
        self.observer.job_updated(job).await;
    }

    async fn fail(&self, mut job: AnalysisJob, reason: String) -> AnalysisJob {
        tracing::warn!("Job {} failed: {}", job.id, reason);
        job.status = JobStatus::Failed;
        job.error = Some(reason);
        job.updated_at = Utc::now();
        self.observer.job_updated(&job).await;
        job
    }
}

fn unwrap_engine<T>(name: &str, result: Result<T, tokio::task::JoinError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("{} engine failed, degrading its section: {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{
        Bar, BalanceSheet, CashFlowStatement, CompanyProfile, FinancialStatements,
        IncomeStatement, NewsArticle,
    };
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    struct FakeProvider {
        bars: Vec<Bar>,
        statements: FinancialStatements,
        profile: CompanyProfile,
        news: Vec<NewsArticle>,
        fail_prices: bool,
        fail_statements: bool,
    }

    impl FakeProvider {
        fn healthy(bar_count: usize) -> Self {
            FakeProvider {
                bars: bars(bar_count),
                statements: statements(),
                profile: profile(),
                news: vec![NewsArticle {
                    title: "Shares surge on strong earnings beat".to_string(),
                    description: None,
                    published_at: Some(Utc::now()),
                    url: None,
                }],
                fail_prices: false,
                fail_statements: false,
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        async fn price_history(&self, ticker: &str) -> Result<Vec<Bar>, AnalysisError> {
            if self.fail_prices {
                return Err(AnalysisError::DataUnavailable(format!(
                    "no data for {}",
                    ticker
                )));
            }
            Ok(self.bars.clone())
        }

        async fn financial_statements(
            &self,
            _ticker: &str,
        ) -> Result<FinancialStatements, AnalysisError> {
            if self.fail_statements {
                return Err(AnalysisError::UpstreamTransient(
                    "statements endpoint down".to_string(),
                ));
            }
            Ok(self.statements.clone())
        }

        async fn company_profile(&self, _ticker: &str) -> Result<CompanyProfile, AnalysisError> {
            Ok(self.profile.clone())
        }

        async fn news(&self, _ticker: &str, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
            Ok(self.news.iter().take(limit).cloned().collect())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        statuses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StatusObserver for RecordingObserver {
        async fn job_updated(&self, job: &AnalysisJob) {
            self.statuses
                .lock()
                .unwrap()
                .push(job.status.as_str().to_string());
        }
    }

    #[derive(Default)]
    struct MemorySink {
        reports: Mutex<Vec<ReportPayload>>,
    }

    #[async_trait]
    impl ReportSink for MemorySink {
        async fn store(
            &self,
            _job: &AnalysisJob,
            payload: &ReportPayload,
        ) -> Result<String, AnalysisError> {
            let mut reports = self.reports.lock().unwrap();
            reports.push(payload.clone());
            Ok(format!("report-{}", reports.len()))
        }
    }

    fn bars(count: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let close = 150.0 + (i as f64 * 0.2).sin() * 5.0 + i as f64 * 0.05;
                Bar {
                    timestamp: start + Duration::days(i as i64),
                    open: close,
                    high: close + 2.0,
                    low: close - 2.0,
                    close,
                    volume: 40_000_000.0,
                }
            })
            .collect()
    }

    fn statements() -> FinancialStatements {
        FinancialStatements {
            income: vec![
                IncomeStatement {
                    revenue: Some(380_000_000_000.0),
                    gross_profit: Some(170_000_000_000.0),
                    operating_income: Some(115_000_000_000.0),
                    net_income: Some(95_000_000_000.0),
                    eps: Some(6.1),
                    income_before_tax: Some(113_000_000_000.0),
                    income_tax_expense: Some(18_000_000_000.0),
                    weighted_average_shares: Some(15_600_000_000.0),
                    ..IncomeStatement::default()
                },
                IncomeStatement {
                    revenue: Some(365_000_000_000.0),
                    net_income: Some(90_000_000_000.0),
                    eps: Some(5.6),
                    ..IncomeStatement::default()
                },
            ],
            balance: vec![BalanceSheet {
                total_assets: Some(350_000_000_000.0),
                total_current_assets: Some(140_000_000_000.0),
                total_current_liabilities: Some(130_000_000_000.0),
                total_debt: Some(110_000_000_000.0),
                cash_and_equivalents: Some(60_000_000_000.0),
                total_equity: Some(70_000_000_000.0),
                ..BalanceSheet::default()
            }],
            cash_flow: vec![
                CashFlowStatement {
                    operating_cash_flow: Some(110_000_000_000.0),
                    free_cash_flow: Some(95_000_000_000.0),
                    ..CashFlowStatement::default()
                },
                CashFlowStatement {
                    free_cash_flow: Some(88_000_000_000.0),
                    ..CashFlowStatement::default()
                },
            ],
        }
    }

    fn profile() -> CompanyProfile {
        CompanyProfile {
            symbol: "AAPL".to_string(),
            company_name: Some("Apple Inc.".to_string()),
            sector: Some("Technology".to_string()),
            industry: Some("Consumer Electronics".to_string()),
            market_cap: Some(2_800_000_000_000.0),
            beta: Some(1.2),
            price: Some(180.0),
            last_dividend: Some(0.96),
            shares_outstanding: Some(15_500_000_000.0),
        }
    }

    fn setup(
        provider: FakeProvider,
    ) -> (Orchestrator, Arc<RecordingObserver>, Arc<MemorySink>) {
        let observer = Arc::new(RecordingObserver::default());
        let sink = Arc::new(MemorySink::default());
        let orchestrator = Orchestrator::new(
            Arc::new(provider),
            Arc::clone(&observer) as Arc<dyn StatusObserver>,
            Arc::clone(&sink) as Arc<dyn ReportSink>,
            AnalysisConfig::default(),
        );
        (orchestrator, observer, sink)
    }

    #[tokio::test]
    async fn happy_path_walks_every_state_and_stores_one_report() {
        let (orchestrator, observer, sink) = setup(FakeProvider::healthy(300));
        let job = orchestrator.run("AAPL", "job-1").await;

        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.error.is_none());
        assert_eq!(job.id, "job-1");
        assert_eq!(job.report_id.as_deref(), Some("report-1"));
        assert_eq!(
            *observer.statuses.lock().unwrap(),
            vec![
                "pending",
                "gathering_data",
                "analyzing",
                "generating_report",
                "complete"
            ]
        );

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.ticker, "AAPL");
        assert!(report.markdown.contains("## Recommendation"));
        assert!(report.markdown.contains("Apple Inc."));
        assert_eq!(report.chart_data.closes.len(), 300);
    }

    #[tokio::test]
    async fn missing_price_data_fails_without_a_report() {
        let mut provider = FakeProvider::healthy(300);
        provider.fail_prices = true;
        let (orchestrator, observer, sink) = setup(provider);
        let job = orchestrator.run("AAPL", "job-1").await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.is_some());
        assert!(sink.reports.lock().unwrap().is_empty());
        let statuses = observer.statuses.lock().unwrap();
        assert_eq!(statuses.last().unwrap(), "failed");
        assert!(!statuses.contains(&"analyzing".to_string()));
    }

    #[tokio::test]
    async fn invalid_ticker_fails_before_gathering() {
        let (orchestrator, observer, sink) = setup(FakeProvider::healthy(300));
        let job = orchestrator.run("aapl!", "job-1").await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(sink.reports.lock().unwrap().is_empty());
        let statuses = observer.statuses.lock().unwrap();
        assert_eq!(*statuses, vec!["pending", "failed"]);
    }

    #[tokio::test]
    async fn short_history_still_completes_with_degraded_sections() {
        let (orchestrator, _observer, sink) = setup(FakeProvider::healthy(10));
        let job = orchestrator.run("AAPL", "job-1").await;

        assert_eq!(job.status, JobStatus::Complete);
        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let md = &reports[0].markdown;
        // Moving averages cannot fill their windows, fundamentals still print
        assert!(md.contains("**SMA 20/50/200:** N/A / N/A / N/A"));
        assert!(md.contains("**RSI (14):** N/A"));
        // Fundamentals do not depend on price history depth
        assert!(md.contains("**Gross Margin:** 44.74%"));
        assert!(md.contains("**Risk Rating:** unknown"));
    }

    #[tokio::test]
    async fn statement_failure_degrades_but_completes() {
        let mut provider = FakeProvider::healthy(300);
        provider.fail_statements = true;
        let (orchestrator, _observer, sink) = setup(provider);
        let job = orchestrator.run("AAPL", "job-1").await;

        assert_eq!(job.status, JobStatus::Complete);
        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        // No statements means no growth figures, but the report still exists
        assert!(reports[0].markdown.contains("**Revenue Growth (YoY):** N/A"));
    }

    #[tokio::test]
    async fn cancellation_suppresses_the_report() {
        let (orchestrator, _observer, sink) = setup(FakeProvider::healthy(300));
        let cancel = AtomicBool::new(true);
        let job = orchestrator.run_with_cancel("AAPL", "job-1", &cancel).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("cancelled"));
        assert!(sink.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn valuation_consumes_fcf_growth_from_financial_metrics() {
        let (orchestrator, _observer, sink) = setup(FakeProvider::healthy(300));
        orchestrator.run("AAPL", "job-1").await;

        let reports = sink.reports.lock().unwrap();
        let engines = &reports[0].engines;
        let metric = engines
            .metrics
            .as_ref()
            .and_then(|m| m.growth.fcf_growth)
            .unwrap();
        let used = engines
            .valuation
            .as_ref()
            .and_then(|v| v.growth_rate_used)
            .unwrap();

        // 95B over 88B year over year, within the clamp range
        assert!((metric - (95.0 / 88.0 - 1.0)).abs() < 1e-9);
        assert!((used - metric).abs() < 1e-12);
    }

    #[tokio::test]
    async fn supplied_job_id_flows_through_observer_updates() {
        struct IdCapture {
            ids: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl StatusObserver for IdCapture {
            async fn job_updated(&self, job: &AnalysisJob) {
                self.ids.lock().unwrap().push(job.id.clone());
            }
        }

        let capture = Arc::new(IdCapture {
            ids: Mutex::new(Vec::new()),
        });
        let orchestrator = Orchestrator::new(
            Arc::new(FakeProvider::healthy(300)),
            Arc::clone(&capture) as Arc<dyn StatusObserver>,
            Arc::new(MemorySink::default()),
            AnalysisConfig::default(),
        );
        let job = orchestrator.run("MSFT", "external-7").await;

        assert_eq!(job.id, "external-7");
        let ids = capture.ids.lock().unwrap();
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|id| id == "external-7"));
    }

    #[tokio::test]
    async fn recommendation_is_deterministic_across_runs() {
        let (orchestrator, _o1, sink_a) = setup(FakeProvider::healthy(300));
        let (orchestrator_b, _o2, sink_b) = setup(FakeProvider::healthy(300));

        orchestrator.run("AAPL", "job-1").await;
        orchestrator_b.run("AAPL", "job-b").await;

        let a = sink_a.reports.lock().unwrap();
        let b = sink_b.reports.lock().unwrap();
        assert_eq!(a[0].recommendation.action, b[0].recommendation.action);
        assert_eq!(a[0].recommendation.confidence, b[0].recommendation.confidence);
    }
}
