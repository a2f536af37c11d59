use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of one analysis job. Transitions only move forward:
/// pending -> gathering_data -> analyzing -> generating_report -> complete,
/// with failed reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    GatheringData,
    Analyzing,
    GeneratingReport,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::GatheringData => "gathering_data",
            JobStatus::Analyzing => "analyzing",
            JobStatus::GeneratingReport => "generating_report",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::GatheringData => 1,
            JobStatus::Analyzing => 2,
            JobStatus::GeneratingReport => 3,
            JobStatus::Complete => 4,
            JobStatus::Failed => 4,
        }
    }

    /// A transition is legal only when it moves forward from a non-terminal
    /// state. Failed is reachable from anything non-terminal.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == JobStatus::Failed {
            return true;
        }
        next.rank() == self.rank() + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: String,
    pub ticker: String,
    pub status: JobStatus,
    pub error: Option<String>,
    /// Identifier returned by the report sink; set only on completion.
    pub report_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisJob {
    /// The id is opaque and supplied by whoever created the job, so status
    /// updates can be correlated with it.
    pub fn new(ticker: &str, id: impl Into<String>) -> Self {
        let now = Utc::now();
        AnalysisJob {
            id: id.into(),
            ticker: ticker.to_string(),
            status: JobStatus::Pending,
            error: None,
            report_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tickers are 1-10 characters of uppercase letters and periods (class
/// shares like BRK.B).
pub fn validate_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && ticker.len() <= 10
        && ticker
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '.')
}
