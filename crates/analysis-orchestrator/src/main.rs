use std::sync::Arc;

use analysis_core::{AnalysisConfig, AnalysisError, MarketDataProvider};
use analysis_orchestrator::{AnalysisJob, JobStatus, Orchestrator, ReportSink, StatusObserver};
use async_trait::async_trait;
use fmp_client::FmpClient;
use report_synthesis::ReportPayload;

/// Logs every job state change.
struct LogObserver;

#[async_trait]
impl StatusObserver for LogObserver {
    async fn job_updated(&self, job: &AnalysisJob) {
        tracing::info!("Job {} -> {}", job.id, job.status.as_str());
    }
}

/// Writes the markdown report and chart data next to the working directory.
struct FileSink {
    out_dir: std::path::PathBuf,
}

#[async_trait]
impl ReportSink for FileSink {
    async fn store(
        &self,
        job: &AnalysisJob,
        payload: &ReportPayload,
    ) -> Result<String, AnalysisError> {
        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| AnalysisError::ComputationDegraded(e.to_string()))?;

        let md_path = self.out_dir.join(format!("{}.md", job.ticker));
        tokio::fs::write(&md_path, &payload.markdown)
            .await
            .map_err(|e| AnalysisError::ComputationDegraded(e.to_string()))?;

        let chart_json = serde_json::to_vec_pretty(&payload.chart_data)
            .map_err(|e| AnalysisError::ComputationDegraded(e.to_string()))?;
        let json_path = self.out_dir.join(format!("{}.chart.json", job.ticker));
        tokio::fs::write(&json_path, chart_json)
            .await
            .map_err(|e| AnalysisError::ComputationDegraded(e.to_string()))?;

        tracing::info!("Report written to {}", md_path.display());
        Ok(md_path.display().to_string())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let ticker = match std::env::args().nth(1) {
        Some(t) => t.to_uppercase(),
        None => {
            eprintln!("usage: analysis-orchestrator <TICKER>");
            std::process::exit(2);
        }
    };

    let fmp_api_key = match std::env::var("FMP_API_KEY") {
        Ok(k) => k,
        Err(_) => {
            eprintln!("FMP_API_KEY must be set");
            std::process::exit(2);
        }
    };
    let news_api_key = std::env::var("NEWS_API_KEY").unwrap_or_default();

    let config = AnalysisConfig::default();
    let provider: Arc<dyn MarketDataProvider> =
        Arc::new(FmpClient::new(fmp_api_key, news_api_key, &config));

    let orchestrator = Orchestrator::new(
        provider,
        Arc::new(LogObserver),
        Arc::new(FileSink {
            out_dir: "reports".into(),
        }),
        config,
    );

    let job_id = format!("{}-{}", ticker.to_lowercase(), chrono::Utc::now().timestamp_millis());
    let job = orchestrator.run(&ticker, &job_id).await;
    if job.status != JobStatus::Complete {
        eprintln!(
            "analysis failed: {}",
            job.error.unwrap_or_else(|| "unknown error".to_string())
        );
        std::process::exit(1);
    }
}
