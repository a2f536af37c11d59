use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Ticker not found or the provider has no data. Fatal for the job.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Provider throttled us and retries were exhausted.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Timeout / 5xx from the provider. Retried, then escalated to
    /// DataUnavailable when retries exhaust.
    #[error("Transient upstream failure: {0}")]
    UpstreamTransient(String),

    /// An individual engine failed internally. Caught by the orchestrator
    /// and converted to nulls; never fails the job.
    #[error("Computation degraded: {0}")]
    ComputationDegraded(String),

    /// Ticker rejected before the pipeline started.
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),
}

impl AnalysisError {
    /// Whether the market-data client should retry the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::UpstreamTransient(_) | AnalysisError::RateLimited(_)
        )
    }
}
